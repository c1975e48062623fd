//! Module: store
//! Responsibility: the two output sinks `copy`/`merge` can write through —
//! appending new stream entries, or stringifying into a keyed hash.
//! Does not own: the `Stream` collaborator itself (see `stream`); this
//! module only decides what to hand it.

use crate::error::EngineResult;
use crate::id::EntryId;
use crate::record::Record;
use crate::reply::record_to_json;
use crate::stream::Stream;

///
/// HashSink
///
/// The second collaborator shape `copy`/`merge` can target: a keyed hash
/// where each timeseries entry is stringified to JSON and stored at field
/// `ts` — the bare timestamp, not the composite entry id (§4.H). An embedder
/// supplies an implementation alongside its `Stream`.
///

pub trait HashSink {
    fn put(&mut self, field: &str, json_text: String) -> EngineResult<()>;
}

/// Append one entry to a stream sink, as `copy`/`merge` do for
/// `STORAGE timeseries` (the default).
pub fn write_stream_entry(stream: &mut impl Stream, id: EntryId, record: Record) -> EngineResult<()> {
    stream.append(id, record)
}

/// Store one entry in a hash sink, as `copy` does for `STORAGE hash`: the
/// record is stringified to a JSON object and stored at field `ts` (the bare
/// timestamp — two entries in the same bucket boundary but different
/// sequence numbers collapse onto one hash field, matching the collaborator
/// primitive §4.H describes).
pub fn write_hash_entry(sink: &mut impl HashSink, id: EntryId, record: &Record) -> EngineResult<()> {
    sink.put(&id.timestamp.to_string(), record_to_json(record).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStream;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryHash {
        fields: HashMap<String, String>,
    }

    impl HashSink for MemoryHash {
        fn put(&mut self, field: &str, json_text: String) -> EngineResult<()> {
            self.fields.insert(field.to_string(), json_text);
            Ok(())
        }
    }

    #[test]
    fn stream_sink_appends_via_collaborator() {
        let mut stream = MemoryStream::new();
        let record = Record::new(vec![("value".to_string(), "1".to_string())]);
        write_stream_entry(&mut stream, EntryId::new(10, 0), record).unwrap();
        assert_eq!(stream.len().unwrap(), 1);
    }

    #[test]
    fn hash_sink_stringifies_at_bare_timestamp_field() {
        let mut hash = MemoryHash::default();
        let record = Record::new(vec![("value".to_string(), "1".to_string())]);
        write_hash_entry(&mut hash, EntryId::new(10, 3), &record).unwrap();
        let stored = hash.fields.get("10").unwrap();
        assert!(stored.contains("\"value\":1"));
        assert!(!hash.fields.contains_key("10-3"));
    }
}
