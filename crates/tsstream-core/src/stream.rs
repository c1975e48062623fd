//! Module: stream
//! Responsibility: the `Stream` trait — the storage collaborator this crate
//! is layered over. The engine never touches bytes on disk directly; every
//! read or write goes through an implementor of this trait.
//! Does not own: query compilation, aggregation, or reply shaping.

use crate::error::EngineResult;
use crate::id::EntryId;
use crate::record::Record;

///
/// Stream
///
/// An append-only keyed sequence of `(EntryId, Record)` pairs, ordered by
/// `EntryId`. One `Stream` is one timeseries key. Implementors own
/// durability and concurrency control; this crate only ever issues one
/// scripted transaction per dispatched command (see the crate docs'
/// concurrency model) and assumes each call here observes a consistent
/// snapshot of the key.
///

pub trait Stream {
    /// Append one entry. `id` must compare strictly greater than every
    /// existing entry id in this stream; implementors reject otherwise with
    /// a `Collaborator` error.
    fn append(&mut self, id: EntryId, record: Record) -> EngineResult<()>;

    /// Scan entries with `min <= id <= max`, ascending, yielding at most
    /// `limit` entries (`None` for unbounded).
    fn scan(&self, min: EntryId, max: EntryId, limit: Option<usize>) -> EngineResult<Vec<(EntryId, Record)>>;

    /// Scan entries with `min <= id <= max`, descending, yielding at most
    /// `limit` entries (`None` for unbounded).
    fn scan_rev(&self, min: EntryId, max: EntryId, limit: Option<usize>) -> EngineResult<Vec<(EntryId, Record)>>;

    /// Point lookup by id.
    fn get(&self, id: EntryId) -> EngineResult<Option<Record>>;

    /// Remove every entry with `min <= id <= max`, returning the count
    /// removed.
    fn remove_range(&mut self, min: EntryId, max: EntryId) -> EngineResult<u64>;

    /// Total number of entries currently stored.
    fn len(&self) -> EngineResult<u64>;

    #[must_use = "len() is fallible; use is_empty() only when you already have the length"]
    fn is_empty_stream(&self) -> EngineResult<bool> {
        Ok(self.len()? == 0)
    }

    /// The lowest and highest entry ids currently stored, if any.
    fn span(&self) -> EngineResult<Option<(EntryId, EntryId)>>;

    /// Drop entries from the head of the stream until at most
    /// `keep_newest` remain, returning the count removed. Implementors
    /// interpret "newest" as highest `EntryId`. `approximate` is a hint that
    /// the collaborator may round the trim point to whatever boundary its
    /// own storage makes cheap (e.g. a macro-node granularity); an
    /// implementor with no such primitive is free to always trim exactly.
    fn trim_to(&mut self, keep_newest: u64, approximate: bool) -> EngineResult<u64>;

    /// Remove every entry, returning the count removed.
    fn clear(&mut self) -> EngineResult<u64> {
        let (min, max) = match self.span()? {
            Some(span) => span,
            None => return Ok(0),
        };
        self.remove_range(min, max)
    }
}
