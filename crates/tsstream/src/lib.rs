//! Thin facade over `tsstream-core`: re-exports the prelude an embedder
//! needs to implement `Stream`/`HashSink` and dispatch commands, without
//! pulling in the engine's internal module paths.

pub use tsstream_core::prelude::*;
