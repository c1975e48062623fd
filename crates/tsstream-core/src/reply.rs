//! Module: reply
//! Responsibility: shape engine output into the native reply tree (integers,
//! bulk strings, arrays, null) or, when `FORMAT json` was requested, a single
//! JSON-text bulk reply.
//! Does not own: what a transport does with a `Reply` — that is the host's
//! job (see §1, out of scope).

use crate::aggregate::BucketFields;
use crate::error::EngineError;
use crate::id::EntryId;
use crate::options::Format;
use crate::record::Record;
use crate::value::Value;
use serde_json::{json, Map, Value as JsonValue};

///
/// Reply
///
/// The engine's native output shape. A transport layer maps this onto
/// whatever wire protocol it speaks; this crate only ever constructs one.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Nil,
    Int(i64),
    Bulk(String),
    Array(Vec<Reply>),
}

/// Build a JSON value for one record, typing each field via `Value::coerce`
/// so integers/floats/bools serialise as JSON numbers/bools rather than
/// strings.
#[must_use]
pub fn record_to_json(record: &Record) -> JsonValue {
    let mut map = Map::new();
    for (name, raw) in record.fields() {
        map.insert(name.clone(), value_to_json(&Value::coerce(raw)));
    }
    JsonValue::Object(map)
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Int(i) => json!(i),
        Value::Float(f, _) => json!(f),
        Value::Bool(b) => json!(b),
        Value::Str(s) => json!(s),
    }
}

fn record_to_native(record: &Record) -> Reply {
    let mut fields = Vec::with_capacity(record.fields().len() * 2);
    for (name, raw) in record.fields() {
        fields.push(Reply::Bulk(name.clone()));
        fields.push(Reply::Bulk(raw.clone()));
    }
    Reply::Array(fields)
}

/// Guard against the grammar-legal but execution-unsupported `FORMAT
/// msgpack` (see §REDESIGN FLAGS).
fn reject_msgpack(format: Format) -> Result<(), EngineError> {
    if format == Format::Msgpack {
        return Err(EngineError::argument("Unsupported: FORMAT msgpack is not implemented by this engine"));
    }
    Ok(())
}

/// Shape one `(id, record)` row for `get`/`pop`.
pub fn entry_reply(id: EntryId, record: &Record, format: Format) -> Result<Reply, EngineError> {
    reject_msgpack(format)?;
    if format == Format::Json {
        let value = json!({ "id": id.to_string(), "fields": record_to_json(record) });
        return Ok(Reply::Bulk(value.to_string()));
    }
    Ok(Reply::Array(vec![Reply::Bulk(id.to_string()), record_to_native(record)]))
}

/// Shape an ordered `[id, fields]…` row set for `range`/`revrange`/`poprange`.
pub fn rows_reply(rows: &[(EntryId, Record)], format: Format) -> Result<Reply, EngineError> {
    reject_msgpack(format)?;
    if format == Format::Json {
        let array: Vec<JsonValue> = rows
            .iter()
            .map(|(id, record)| json!({ "id": id.to_string(), "fields": record_to_json(record) }))
            .collect();
        return Ok(Reply::Bulk(JsonValue::Array(array).to_string()));
    }
    let mut out = Vec::with_capacity(rows.len());
    for (id, record) in rows {
        out.push(Reply::Array(vec![Reply::Bulk(id.to_string()), record_to_native(record)]));
    }
    Ok(Reply::Array(out))
}

/// Shape a bucketed `[bucket_ts, fields]…` set for an aggregated range: each
/// bucket's `fields` is the nested `field → [kind, value, …]` mapping (§4.F),
/// kept distinct from the flattened `field_kind` shape the `copy` store
/// writer persists (see `aggregate::flatten_to_record`).
pub fn buckets_reply(buckets: &[(u64, BucketFields)], format: Format) -> Result<Reply, EngineError> {
    reject_msgpack(format)?;
    if format == Format::Json {
        let array: Vec<JsonValue> = buckets
            .iter()
            .map(|(bucket, fields)| json!({ "bucket": bucket, "fields": bucket_fields_to_json(fields) }))
            .collect();
        return Ok(Reply::Bulk(JsonValue::Array(array).to_string()));
    }
    let mut out = Vec::with_capacity(buckets.len());
    for (bucket, fields) in buckets {
        out.push(Reply::Array(vec![Reply::Int(*bucket as i64), bucket_fields_to_native(fields)]));
    }
    Ok(Reply::Array(out))
}

fn bucket_fields_to_json(fields: &BucketFields) -> JsonValue {
    let mut map = Map::new();
    for (field, kinds) in fields {
        let mut rendered = Vec::with_capacity(kinds.len() * 2);
        for (kind, value) in kinds {
            rendered.push(json!(kind.as_str()));
            rendered.push(value_to_json(&Value::coerce(value)));
        }
        map.insert(field.clone(), JsonValue::Array(rendered));
    }
    JsonValue::Object(map)
}

fn bucket_fields_to_native(fields: &BucketFields) -> Reply {
    let mut out = Vec::with_capacity(fields.len() * 2);
    for (field, kinds) in fields {
        out.push(Reply::Bulk(field.clone()));
        let mut rendered = Vec::with_capacity(kinds.len() * 2);
        for (kind, value) in kinds {
            rendered.push(Reply::Bulk(kind.as_str().to_string()));
            rendered.push(Reply::Bulk(value.clone()));
        }
        out.push(Reply::Array(rendered));
    }
    Reply::Array(out)
}
