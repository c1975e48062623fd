//! In-process `Stream` fixture, gated behind the `testing` feature. Used by
//! this crate's own tests and by the demo shell in the `tsstream` facade
//! crate; never compiled into a release build.

use crate::error::{EngineError, EngineResult};
use crate::id::EntryId;
use crate::record::Record;
use crate::stream::Stream;
use std::collections::BTreeMap;

///
/// MemoryStream
///
/// A `BTreeMap`-backed `Stream` with no durability and no concurrency
/// control of its own — every call assumes exclusive access, matching the
/// single-scripted-transaction model this crate expects of a collaborator.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStream {
    entries: BTreeMap<EntryId, Record>,
}

impl MemoryStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stream for MemoryStream {
    fn append(&mut self, id: EntryId, record: Record) -> EngineResult<()> {
        if let Some(max_id) = self.entries.keys().next_back() {
            if id <= *max_id {
                return Err(EngineError::collaborator(format!(
                    "id '{id}' is not greater than the stream's current max '{max_id}'"
                )));
            }
        }
        self.entries.insert(id, record);
        Ok(())
    }

    fn scan(&self, min: EntryId, max: EntryId, limit: Option<usize>) -> EngineResult<Vec<(EntryId, Record)>> {
        let iter = self.entries.range(min..=max).map(|(id, record)| (*id, record.clone()));
        Ok(match limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    fn scan_rev(&self, min: EntryId, max: EntryId, limit: Option<usize>) -> EngineResult<Vec<(EntryId, Record)>> {
        let iter = self.entries.range(min..=max).rev().map(|(id, record)| (*id, record.clone()));
        Ok(match limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    fn get(&self, id: EntryId) -> EngineResult<Option<Record>> {
        Ok(self.entries.get(&id).cloned())
    }

    fn remove_range(&mut self, min: EntryId, max: EntryId) -> EngineResult<u64> {
        let keys: Vec<EntryId> = self.entries.range(min..=max).map(|(id, _)| *id).collect();
        for key in &keys {
            self.entries.remove(key);
        }
        Ok(keys.len() as u64)
    }

    fn len(&self) -> EngineResult<u64> {
        Ok(self.entries.len() as u64)
    }

    fn span(&self) -> EngineResult<Option<(EntryId, EntryId)>> {
        let min = self.entries.keys().next().copied();
        let max = self.entries.keys().next_back().copied();
        Ok(min.zip(max))
    }

    fn trim_to(&mut self, keep_newest: u64, _approximate: bool) -> EngineResult<u64> {
        // No coarser-grained storage boundary to round to; always exact.
        let total = self.entries.len() as u64;
        if total <= keep_newest {
            return Ok(0);
        }
        let drop_count = (total - keep_newest) as usize;
        let keys: Vec<EntryId> = self.entries.keys().take(drop_count).copied().collect();
        for key in &keys {
            self.entries.remove(key);
        }
        Ok(keys.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_increasing_append() {
        let mut stream = MemoryStream::new();
        stream.append(EntryId::new(10, 0), Record::new(vec![])).unwrap();
        assert!(stream.append(EntryId::new(10, 0), Record::new(vec![])).is_err());
        assert!(stream.append(EntryId::new(5, 0), Record::new(vec![])).is_err());
    }

    #[test]
    fn trim_drops_oldest_first() {
        let mut stream = MemoryStream::new();
        for ts in 0..5u64 {
            stream.append(EntryId::new(ts, 0), Record::new(vec![])).unwrap();
        }
        let removed = stream.trim_to(2, false).unwrap();
        assert_eq!(removed, 3);
        let span = stream.span().unwrap().unwrap();
        assert_eq!(span, (EntryId::new(2, 0), EntryId::new(4, 0)));
    }

    #[test]
    fn span_is_none_when_empty() {
        let stream = MemoryStream::new();
        assert_eq!(stream.span().unwrap(), None);
    }
}
