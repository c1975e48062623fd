//! A univariate timeseries engine layered over an append-only keyed stream
//! store: query compiler, incremental aggregation engine, merge/copy
//! planner, and command dispatcher. The engine never touches storage
//! directly — it is driven entirely through the `Stream`/`HashSink`
//! collaborator traits an embedder supplies.

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod id;
pub mod merge;
pub mod obs;
pub mod options;
pub mod range;
pub mod record;
pub mod reply;
pub mod store;
pub mod stream;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod prelude {
    pub use crate::aggregate::{AggregateKind, AggregateSpec};
    pub use crate::config::EngineLimits;
    pub use crate::dispatch::{self, Command};
    pub use crate::error::{EngineError, EngineResult, ErrorClass};
    pub use crate::filter::{self, CompareOp, Predicate};
    pub use crate::id::{EntryId, RangeBound};
    pub use crate::obs::{ExecutionTrace, MetricsSink, NullSink};
    pub use crate::options::{AllowedOptions, Format, QuerySpec, Storage};
    pub use crate::record::{ProjectionMode, Record};
    pub use crate::reply::Reply;
    pub use crate::store::HashSink;
    pub use crate::stream::Stream;
    pub use crate::value::Value;
}
