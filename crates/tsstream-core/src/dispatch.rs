//! Module: dispatch
//! Responsibility: command name resolution, key arity, and the per-command
//! handlers that wire together the range pipeline, aggregation, merge, and
//! store-writer modules.
//! Does not own: key-to-`Stream` resolution — an embedder resolves the key
//! strings named in §6 to concrete `Stream`/`HashSink` values before calling
//! into any function here, nor the `MetricsSink` call site — that lives at
//! whatever loop actually resolves a command name and calls the handler
//! below (see the demo shell in the `tsstream` facade crate).

use crate::aggregate::{flatten_to_record, BucketFields};
use crate::config::EngineLimits;
use crate::error::{EngineError, EngineResult};
use crate::id::{EntryId, RangeBound};
use crate::merge as merge_planner;
use crate::obs::ExecutionTrace;
use crate::options::{self, AllowedOptions, Format, QuerySpec, Storage};
use crate::range::{scan_backward, scan_forward, RangeOptions, ScanReport};
use crate::record::{ProjectionMode, Record};
use crate::reply::{buckets_reply, entry_reply, rows_reply, Reply};
use crate::store::{write_hash_entry, write_stream_entry, HashSink};
use crate::stream::Stream;
use crate::value::Value;
use std::collections::BTreeMap;

///
/// Command
///
/// The 20 canonical commands plus `info`. `key_arity` drives how many
/// leading key arguments an embedder must peel off before handing the rest
/// to the matching handler.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Add,
    Get,
    Pop,
    Del,
    Size,
    Span,
    Exists,
    Count,
    Range,
    RevRange,
    PopRange,
    RemRange,
    TrimLength,
    Times,
    Copy,
    Merge,
    Distinct,
    CountDistinct,
    BasicStats,
    BulkAdd,
    Info,
}

impl Command {
    #[must_use]
    pub const fn key_arity(self) -> usize {
        match self {
            Self::Copy => 2,
            Self::Merge => 3,
            _ => 1,
        }
    }

    const fn canonical_name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Get => "get",
            Self::Pop => "pop",
            Self::Del => "del",
            Self::Size => "size",
            Self::Span => "span",
            Self::Exists => "exists",
            Self::Count => "count",
            Self::Range => "range",
            Self::RevRange => "revrange",
            Self::PopRange => "poprange",
            Self::RemRange => "remrange",
            Self::TrimLength => "trimlength",
            Self::Times => "times",
            Self::Copy => "copy",
            Self::Merge => "merge",
            Self::Distinct => "distinct",
            Self::CountDistinct => "count_distinct",
            Self::BasicStats => "basic_stats",
            Self::BulkAdd => "bulk_add",
            Self::Info => "info",
        }
    }
}

const ALL_COMMANDS: &[Command] = &[
    Command::Add,
    Command::Get,
    Command::Pop,
    Command::Del,
    Command::Size,
    Command::Span,
    Command::Exists,
    Command::Count,
    Command::Range,
    Command::RevRange,
    Command::PopRange,
    Command::RemRange,
    Command::TrimLength,
    Command::Times,
    Command::Copy,
    Command::Merge,
    Command::Distinct,
    Command::CountDistinct,
    Command::BasicStats,
    Command::BulkAdd,
    Command::Info,
];

/// Resolve a command name: case-preserving match first, then a case-folded
/// fallback, matching the teacher's global-table-plus-secondary-index
/// pattern (see §4.I / §9).
pub fn lookup(name: &str) -> Result<Command, EngineError> {
    if let Some(command) = ALL_COMMANDS.iter().find(|c| c.canonical_name() == name) {
        return Ok(*command);
    }
    ALL_COMMANDS
        .iter()
        .find(|c| c.canonical_name().eq_ignore_ascii_case(name))
        .copied()
        .ok_or_else(|| EngineError::lookup(format!("unknown command '{name}'")))
}

fn parse_bounds(min: &str, max: &str) -> EngineResult<(EntryId, EntryId)> {
    let min = RangeBound::parse(min)?.resolve_min();
    let max = RangeBound::parse(max)?.resolve_max();
    Ok((min, max))
}

fn range_options(spec: &QuerySpec) -> RangeOptions {
    RangeOptions {
        limit: spec.limit,
        filter: spec.filter.clone(),
        projection: spec.projection.clone(),
    }
}

/// Resolve a unique-id point lookup via `scan(id, id, None)` rather than
/// `Stream::get` directly, so a collaborator that (incorrectly) surfaces
/// more than one entry at the same id is caught as an `InvariantViolation`
/// instead of silently returning one of them (§4.I/§7).
fn point_lookup(stream: &impl Stream, id: EntryId) -> EngineResult<Option<Record>> {
    let mut rows = stream.scan(id, id, None)?;
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.pop().expect("checked len == 1").1)),
        n => Err(EngineError::invariant(format!(
            "entry id '{id}' resolved to {n} entries; a unique id must resolve to at most one"
        ))),
    }
}

// ---------------------------------------------------------------------
// add / bulk_add
// ---------------------------------------------------------------------

/// `add K ts field val [field val]...`
pub fn add(stream: &mut impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let [ts_token, fields @ ..] = args else {
        return Err(EngineError::argument("add requires a timestamp and at least one field/value pair"));
    };
    if fields.is_empty() || fields.len() % 2 != 0 {
        return Err(EngineError::argument("add requires an even, non-empty list of field/value pairs"));
    }
    let id = EntryId::parse(ts_token)?;
    let mut pairs = Vec::with_capacity(fields.len() / 2);
    for chunk in fields.chunks_exact(2) {
        let name = &chunk[0];
        if !Record::is_valid_field_name(name) {
            return Err(EngineError::argument(format!("invalid field name '{name}'")));
        }
        pairs.push((name.clone(), chunk[1].clone()));
    }
    stream.append(id, Record::new(pairs))?;
    Ok((Reply::Bulk(id.to_string()), ExecutionTrace::new()))
}

/// `bulk_add K (ts json_encoded_record)...`
pub fn bulk_add(stream: &mut impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(EngineError::argument("bulk_add requires an even list of (ts, json) pairs"));
    }
    let mut ids = Vec::with_capacity(args.len() / 2);
    for chunk in args.chunks_exact(2) {
        let id = EntryId::parse(&chunk[0])?;
        let json: serde_json::Value = serde_json::from_str(&chunk[1])
            .map_err(|e| EngineError::argument(format!("invalid JSON for entry '{}': {e}", chunk[0])))?;
        let record = json_to_record(json)?;
        stream.append(id, record)?;
        ids.push(Reply::Bulk(id.to_string()));
    }
    Ok((Reply::Array(ids), ExecutionTrace::new()))
}

fn json_to_record(value: serde_json::Value) -> EngineResult<Record> {
    match value {
        serde_json::Value::Object(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (name, v) in map {
                if !Record::is_valid_field_name(&name) {
                    return Err(EngineError::argument(format!("invalid field name '{name}' in bulk_add record")));
                }
                fields.push((name, json_scalar_to_text(&v)));
            }
            Ok(Record::new(fields))
        }
        other => Ok(Record::new(vec![("value".to_string(), json_scalar_to_text(&other))])),
    }
}

fn json_scalar_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------
// del / size / span / exists / info
// ---------------------------------------------------------------------

/// `del K id...`
pub fn del(stream: &mut impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    if args.is_empty() {
        return Err(EngineError::argument("del requires at least one id"));
    }
    let mut removed = 0i64;
    for token in args {
        let id = EntryId::parse(token)?;
        removed += stream.remove_range(id, id)? as i64;
    }
    Ok((Reply::Int(removed), ExecutionTrace::new()))
}

/// `size K`
pub fn size(stream: &impl Stream) -> EngineResult<(Reply, ExecutionTrace)> {
    let len = stream.len()?;
    let reply = if len == 0 { Reply::Nil } else { Reply::Int(len as i64) };
    Ok((reply, ExecutionTrace::new()))
}

/// `span K`
pub fn span(stream: &impl Stream) -> EngineResult<(Reply, ExecutionTrace)> {
    let reply = match stream.span()? {
        None => Reply::Nil,
        Some((first, last)) => Reply::Array(vec![Reply::Bulk(first.to_string()), Reply::Bulk(last.to_string())]),
    };
    Ok((reply, ExecutionTrace::new()))
}

/// `exists K ts`
pub fn exists(stream: &impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let [ts_token] = args else {
        return Err(EngineError::argument("exists requires exactly one timestamp"));
    };
    let id = EntryId::parse(ts_token)?;
    let found = point_lookup(stream, id)?.is_some();
    let mut trace = ExecutionTrace::new();
    trace.record_scan(1, u64::from(found));
    Ok((Reply::Int(i64::from(found)), trace))
}

/// `info K` — pass-through metadata: length plus span, or nil if absent.
pub fn info(stream: &impl Stream) -> EngineResult<(Reply, ExecutionTrace)> {
    let len = stream.len()?;
    if len == 0 {
        return Ok((Reply::Nil, ExecutionTrace::new()));
    }
    let span = stream.span()?;
    let mut fields = vec![Reply::Bulk("length".to_string()), Reply::Int(len as i64)];
    if let Some((first, last)) = span {
        fields.push(Reply::Bulk("first_id".to_string()));
        fields.push(Reply::Bulk(first.to_string()));
        fields.push(Reply::Bulk("last_id".to_string()));
        fields.push(Reply::Bulk(last.to_string()));
    }
    Ok((Reply::Array(fields), ExecutionTrace::new()))
}

// ---------------------------------------------------------------------
// get / pop
// ---------------------------------------------------------------------

/// `get K ts [LABELS...|REDACT...] [FORMAT ...]`
pub fn get(stream: &impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let [ts_token, rest @ ..] = args else {
        return Err(EngineError::argument("get requires a timestamp"));
    };
    let id = EntryId::parse(ts_token)?;
    let spec = options::parse(rest, AllowedOptions::LABELS_REDACT_FORMAT)?;
    limits.check(&spec)?;

    let record = point_lookup(stream, id)?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(1, u64::from(record.is_some()));

    let Some(record) = record else {
        return Ok((Reply::Nil, trace));
    };
    let projected = spec.projection.apply(&record);
    Ok((entry_reply(id, &projected, spec.format)?, trace))
}

/// `pop K ts [opts]` — as `get`, then deletes the id.
pub fn pop(stream: &mut impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let (reply, trace) = get(stream, args, limits)?;
    if reply != Reply::Nil {
        let id = EntryId::parse(&args[0])?;
        stream.remove_range(id, id)?;
    }
    Ok((reply, trace))
}

// ---------------------------------------------------------------------
// count / range / revrange / poprange / remrange
// ---------------------------------------------------------------------

/// `count K min max [FILTER ...]`
pub fn count(stream: &impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("count requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions::FILTER_ONLY)?;
    limits.check(&spec)?;
    let report = scan_forward(stream, min, max, &range_options(&spec))?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(report.scanned as u64, report.rows.len() as u64);
    Ok((Reply::Int(report.rows.len() as i64), trace))
}

enum RangeReply {
    Rows(Vec<(EntryId, Record)>, Format),
    Buckets(Vec<(u64, BucketFields)>, Format),
}

fn run_range(
    stream: &impl Stream,
    args: &[String],
    limits: &EngineLimits,
    reverse: bool,
) -> EngineResult<(RangeReply, ExecutionTrace)> {
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("range requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions::RANGE)?;
    limits.check(&spec)?;

    let mut trace = ExecutionTrace::new();
    let report: ScanReport = if reverse {
        scan_backward(stream, min, max, &range_options(&spec))?
    } else {
        scan_forward(stream, min, max, &range_options(&spec))?
    };
    trace.record_scan(report.scanned as u64, report.rows.len() as u64);
    let rows = report.rows;

    match spec.aggregate {
        Some(aggregate) => {
            let buckets = aggregate.run(rows.iter().map(|(id, record)| (*id, record)));
            trace.record_buckets(buckets.len() as u64);
            Ok((RangeReply::Buckets(buckets, spec.format), trace))
        }
        None => Ok((RangeReply::Rows(rows, spec.format), trace)),
    }
}

/// `range K min max [opts]`. Returns the reply alongside the per-invocation
/// trace (§4.J); the engine never emits the trace anywhere on its own.
pub fn range(stream: &impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let (reply, trace) = run_range(stream, args, limits, false)?;
    Ok((shape_range_reply(reply)?, trace))
}

/// `revrange K min max [opts]`
pub fn revrange(stream: &impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let (reply, trace) = run_range(stream, args, limits, true)?;
    Ok((shape_range_reply(reply)?, trace))
}

fn shape_range_reply(reply: RangeReply) -> EngineResult<Reply> {
    match reply {
        RangeReply::Rows(rows, format) => rows_reply(&rows, format),
        RangeReply::Buckets(buckets, format) => buckets_reply(&buckets, format),
    }
}

/// `poprange K min max [opts]` — as `range`, then deletes matched ids.
pub fn poprange(stream: &mut impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("poprange requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions::RANGE)?;
    limits.check(&spec)?;

    let report = scan_forward(stream, min, max, &range_options(&spec))?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(report.scanned as u64, report.rows.len() as u64);
    let rows = report.rows;
    for (id, _) in &rows {
        stream.remove_range(*id, *id)?;
    }

    let reply = match spec.aggregate {
        Some(aggregate) => {
            let buckets = aggregate.run(rows.iter().map(|(id, record)| (*id, record)));
            trace.record_buckets(buckets.len() as u64);
            buckets_reply(&buckets, spec.format)?
        }
        None => rows_reply(&rows, spec.format)?,
    };
    Ok((reply, trace))
}

/// `remrange K min max [opts]` — count of ids deleted.
pub fn remrange(stream: &mut impl Stream, args: &[String], limits: &EngineLimits) -> EngineResult<(Reply, ExecutionTrace)> {
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("remrange requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions::FILTER_ONLY)?;
    limits.check(&spec)?;

    let mut trace = ExecutionTrace::new();
    if spec.filter.is_none() {
        let removed = stream.remove_range(min, max)?;
        trace.record_scan(removed, removed);
        return Ok((Reply::Int(removed as i64), trace));
    }
    let report = scan_forward(stream, min, max, &range_options(&spec))?;
    trace.record_scan(report.scanned as u64, report.rows.len() as u64);
    for (id, _) in &report.rows {
        stream.remove_range(*id, *id)?;
    }
    Ok((Reply::Int(report.rows.len() as i64), trace))
}

// ---------------------------------------------------------------------
// trimlength / times
// ---------------------------------------------------------------------

/// `trimlength K n [approximate]`
pub fn trimlength(stream: &mut impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let [n_token, rest @ ..] = args else {
        return Err(EngineError::argument("trimlength requires a count"));
    };
    let approximate = match rest {
        [] => false,
        [flag] if flag.eq_ignore_ascii_case("approximate") => true,
        _ => return Err(EngineError::argument("trimlength takes an optional trailing 'approximate' flag")),
    };
    let n: u64 = n_token.parse().map_err(|_| EngineError::argument(format!("invalid trimlength count '{n_token}'")))?;
    let removed = stream.trim_to(n, approximate)?;
    Ok((Reply::Int(removed as i64), ExecutionTrace::new()))
}

/// `times K [min max]`
pub fn times(stream: &impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let (min, max) = match args {
        [] => (EntryId::min(), EntryId::max()),
        [min_token, max_token] => parse_bounds(min_token, max_token)?,
        _ => return Err(EngineError::argument("times takes either no arguments or a min/max pair")),
    };
    let rows = stream.scan(min, max, None)?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(rows.len() as u64, rows.len() as u64);
    Ok((Reply::Array(rows.into_iter().map(|(id, _)| Reply::Bulk(id.to_string())).collect()), trace))
}

// ---------------------------------------------------------------------
// copy / merge
// ---------------------------------------------------------------------

/// `copy K_src K_dst min max [opts]`
pub fn copy<S, D, H>(
    src: &S,
    dst_stream: Option<&mut D>,
    dst_hash: Option<&mut H>,
    args: &[String],
    limits: &EngineLimits,
) -> EngineResult<(Reply, ExecutionTrace)>
where
    S: Stream,
    D: Stream,
    H: HashSink,
{
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("copy requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions::COPY)?;
    limits.check(&spec)?;

    let report = scan_forward(src, min, max, &range_options(&spec))?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(report.scanned as u64, report.rows.len() as u64);
    let rows = report.rows;
    let storage = spec.storage.unwrap_or(Storage::Stream);

    let written = match (storage, spec.aggregate) {
        (Storage::Stream, None) => {
            let dst = dst_stream.ok_or_else(|| EngineError::argument("STORAGE timeseries requires a stream destination"))?;
            for (id, record) in &rows {
                write_stream_entry(dst, *id, record.clone())?;
            }
            rows.len()
        }
        (Storage::Stream, Some(aggregate)) => {
            let dst = dst_stream.ok_or_else(|| EngineError::argument("STORAGE timeseries requires a stream destination"))?;
            let buckets = aggregate.run(rows.iter().map(|(id, record)| (*id, record)));
            trace.record_buckets(buckets.len() as u64);
            for (bucket, fields) in &buckets {
                write_stream_entry(dst, EntryId::new(*bucket, 0), flatten_to_record(fields))?;
            }
            buckets.len()
        }
        (Storage::Hash, None) => {
            let dst = dst_hash.ok_or_else(|| EngineError::argument("STORAGE hash requires a hash destination"))?;
            for (id, record) in &rows {
                write_hash_entry(dst, *id, record)?;
            }
            rows.len()
        }
        (Storage::Hash, Some(aggregate)) => {
            let dst = dst_hash.ok_or_else(|| EngineError::argument("STORAGE hash requires a hash destination"))?;
            let buckets = aggregate.run(rows.iter().map(|(id, record)| (*id, record)));
            trace.record_buckets(buckets.len() as u64);
            for (bucket, fields) in &buckets {
                let record = flatten_to_record(fields);
                write_hash_entry(dst, EntryId::new(*bucket, 0), &record)?;
            }
            buckets.len()
        }
    };

    Ok((Reply::Int(written as i64), trace))
}

/// `merge K_a K_b K_dst min max [opts]`
pub fn merge<A, B, D>(
    a: &A,
    b: &B,
    dst: &mut D,
    args: &[String],
    limits: &EngineLimits,
) -> EngineResult<(Reply, ExecutionTrace)>
where
    A: Stream,
    B: Stream,
    D: Stream,
{
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("merge requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions::MERGE)?;
    limits.check(&spec)?;

    let options = range_options(&spec);
    let left = scan_forward(a, min, max, &options)?;
    let right = scan_forward(b, min, max, &options)?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(left.scanned as u64, left.rows.len() as u64);
    trace.record_scan(right.scanned as u64, right.rows.len() as u64);

    let merged = merge_planner::merge(left.rows, right.rows);
    for (id, record) in &merged {
        write_stream_entry(dst, *id, record.clone())?;
    }
    Ok((Reply::Int(merged.len() as i64), trace))
}

// ---------------------------------------------------------------------
// distinct / count_distinct / basic_stats
// ---------------------------------------------------------------------

fn group_by_labels(stream: &impl Stream, args: &[String]) -> EngineResult<(BTreeMap<Vec<String>, u64>, ExecutionTrace)> {
    let [min_token, max_token, rest @ ..] = args else {
        return Err(EngineError::argument("this command requires min and max bounds"));
    };
    let (min, max) = parse_bounds(min_token, max_token)?;
    let spec = options::parse(rest, AllowedOptions { labels_redact: true, ..AllowedOptions::NONE })?;
    let ProjectionMode::Include(labels) = &spec.projection else {
        return Err(EngineError::argument("LABELS is required"));
    };
    let mut label_names: Vec<String> = labels.iter().cloned().collect();
    label_names.sort();

    let rows = stream.scan(min, max, None)?;
    let mut trace = ExecutionTrace::new();
    trace.record_scan(rows.len() as u64, rows.len() as u64);

    let mut groups: BTreeMap<Vec<String>, u64> = BTreeMap::new();
    for (_, record) in rows {
        let key: Vec<String> = label_names
            .iter()
            .map(|name| record.get(name).as_ref().map(Value::to_raw).unwrap_or_default())
            .collect();
        *groups.entry(key).or_insert(0) += 1;
    }
    Ok((groups, trace))
}

/// `distinct K min max LABELS name+`
pub fn distinct(stream: &impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let (groups, trace) = group_by_labels(stream, args)?;
    let reply = Reply::Array(groups.into_keys().map(|key| Reply::Array(key.into_iter().map(Reply::Bulk).collect())).collect());
    Ok((reply, trace))
}

/// `count_distinct K min max LABELS name+`
pub fn count_distinct(stream: &impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let (groups, trace) = group_by_labels(stream, args)?;
    Ok((Reply::Int(groups.len() as i64), trace))
}

/// `basic_stats K min max LABELS name+`
///
/// The grammar names no aggregation field for this command (only the
/// grouping labels), so the statistic computed is over group population
/// sizes: how many entries fall under each distinct label combination.
pub fn basic_stats(stream: &impl Stream, args: &[String]) -> EngineResult<(Reply, ExecutionTrace)> {
    let (groups, trace) = group_by_labels(stream, args)?;
    let sizes: Vec<u64> = groups.values().copied().collect();
    if sizes.is_empty() {
        let reply = Reply::Array(vec![
            Reply::Bulk("groups".to_string()),
            Reply::Int(0),
            Reply::Bulk("min".to_string()),
            Reply::Int(0),
            Reply::Bulk("max".to_string()),
            Reply::Int(0),
            Reply::Bulk("avg".to_string()),
            Reply::Int(0),
        ]);
        return Ok((reply, trace));
    }
    let sum: u64 = sizes.iter().sum();
    let min = *sizes.iter().min().expect("non-empty sizes");
    let max = *sizes.iter().max().expect("non-empty sizes");
    let avg = sum as f64 / sizes.len() as f64;
    let reply = Reply::Array(vec![
        Reply::Bulk("groups".to_string()),
        Reply::Int(sizes.len() as i64),
        Reply::Bulk("min".to_string()),
        Reply::Int(min as i64),
        Reply::Bulk("max".to_string()),
        Reply::Int(max as i64),
        Reply::Bulk("avg".to_string()),
        Reply::Bulk(format!("{avg}")),
    ]);
    Ok((reply, trace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::testing::MemoryStream;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("RANGE").unwrap(), Command::Range);
        assert_eq!(lookup("range").unwrap(), Command::Range);
        assert_eq!(lookup("RaNgE").unwrap(), Command::Range);
    }

    #[test]
    fn lookup_rejects_unknown_command() {
        assert!(lookup("frobnicate").is_err());
    }

    #[test]
    fn key_arity_matches_copy_and_merge() {
        assert_eq!(Command::Copy.key_arity(), 2);
        assert_eq!(Command::Merge.key_arity(), 3);
        assert_eq!(Command::Range.key_arity(), 1);
    }

    #[test]
    fn add_then_get_round_trips() {
        let mut stream = MemoryStream::new();
        let limits = EngineLimits::default();
        add(&mut stream, &["1000".to_string(), "active".to_string(), "1".to_string()]).unwrap();
        let (reply, _) = get(&stream, &["1000".to_string()], &limits).unwrap();
        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Bulk("1000-0".to_string()),
                Reply::Array(vec![Reply::Bulk("active".to_string()), Reply::Bulk("1".to_string())])
            ])
        );
    }

    #[test]
    fn duplicate_add_fails_and_size_stays_one() {
        let mut stream = MemoryStream::new();
        add(&mut stream, &["1000".to_string(), "active".to_string(), "1".to_string()]).unwrap();
        assert!(add(&mut stream, &["1000".to_string(), "active".to_string(), "1".to_string()]).is_err());
        assert_eq!(size(&stream).unwrap().0, Reply::Int(1));
    }

    #[test]
    fn add_rejects_odd_field_count() {
        let mut stream = MemoryStream::new();
        assert!(add(&mut stream, &["1000".to_string(), "active".to_string()]).is_err());
    }

    #[test]
    fn trimlength_keeps_newest_entries() {
        let mut stream = MemoryStream::new();
        for ts in 0..200u64 {
            add(&mut stream, &[ts.to_string(), "v".to_string(), ts.to_string()]).unwrap();
        }
        let (reply, _) = trimlength(&mut stream, &["100".to_string()]).unwrap();
        assert_eq!(reply, Reply::Int(100));
        assert_eq!(size(&stream).unwrap().0, Reply::Int(100));
    }

    #[test]
    fn trimlength_accepts_approximate_flag() {
        let mut stream = MemoryStream::new();
        for ts in 0..10u64 {
            add(&mut stream, &[ts.to_string(), "v".to_string(), ts.to_string()]).unwrap();
        }
        let (reply, _) = trimlength(&mut stream, &["5".to_string(), "approximate".to_string()]).unwrap();
        assert_eq!(reply, Reply::Int(5));
    }

    #[test]
    fn trimlength_rejects_unknown_trailing_token() {
        let mut stream = MemoryStream::new();
        assert!(trimlength(&mut stream, &["5".to_string(), "garbage".to_string()]).is_err());
    }

    #[test]
    fn bulk_add_wraps_scalar_payload() {
        let mut stream = MemoryStream::new();
        bulk_add(&mut stream, &["1".to_string(), "42".to_string()]).unwrap();
        let record = stream.get(EntryId::new(1, 0)).unwrap().unwrap();
        assert_eq!(record.fields(), &[("value".to_string(), "42".to_string())]);
    }

    #[test]
    fn bulk_add_flattens_object_payload() {
        let mut stream = MemoryStream::new();
        bulk_add(&mut stream, &["1".to_string(), r#"{"a":1,"b":"x"}"#.to_string()]).unwrap();
        let record = stream.get(EntryId::new(1, 0)).unwrap().unwrap();
        assert_eq!(record.fields(), &[("a".to_string(), "1".to_string()), ("b".to_string(), "x".to_string())]);
    }

    #[test]
    fn distinct_and_count_distinct_group_by_labels() {
        let mut stream = MemoryStream::new();
        add(&mut stream, &["1".to_string(), "name".to_string(), "april".to_string(), "rating".to_string(), "high".to_string()]).unwrap();
        add(&mut stream, &["2".to_string(), "name".to_string(), "april".to_string(), "rating".to_string(), "high".to_string()]).unwrap();
        add(&mut stream, &["3".to_string(), "name".to_string(), "may".to_string(), "rating".to_string(), "low".to_string()]).unwrap();

        let args = ["-".to_string(), "+".to_string(), "LABELS".to_string(), "name".to_string(), "rating".to_string()];
        assert_eq!(count_distinct(&stream, &args).unwrap().0, Reply::Int(2));

        let (groups, _) = distinct(&stream, &args).unwrap();
        match groups {
            Reply::Array(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn merge_of_disjoint_sources_sums_lengths() {
        let mut a = MemoryStream::new();
        let mut b = MemoryStream::new();
        let mut dst = MemoryStream::new();
        for ts in [1u64, 3, 5] {
            add(&mut a, &[ts.to_string(), "v".to_string(), "1".to_string()]).unwrap();
        }
        for ts in [2u64, 4, 6] {
            add(&mut b, &[ts.to_string(), "v".to_string(), "1".to_string()]).unwrap();
        }
        let limits = EngineLimits::default();
        let (reply, _) = merge(&a, &b, &mut dst, &["-".to_string(), "+".to_string()], &limits).unwrap();
        assert_eq!(reply, Reply::Int(6));
        assert_eq!(dst.len().unwrap(), 6);
    }

    #[test]
    fn range_trace_reports_rows_filtered_out() {
        let mut stream = MemoryStream::new();
        for ts in 0..10u64 {
            add(&mut stream, &[ts.to_string(), "v".to_string(), ts.to_string()]).unwrap();
        }
        let limits = EngineLimits::default();
        let args = ["-".to_string(), "+".to_string(), "FILTER".to_string(), "v>4".to_string()];
        let (_, trace) = range(&stream, &args, &limits).unwrap();
        assert_eq!(trace.rows_scanned, 10);
        assert_eq!(trace.rows_emitted, 5);
        assert_eq!(trace.rows_filtered, 5);
    }

    /// A deliberately misbehaving `Stream` whose `scan` returns two entries
    /// for the same id, to exercise the invariant check `get`/`pop` apply
    /// around a point lookup.
    struct DuplicateIdStream;

    impl Stream for DuplicateIdStream {
        fn append(&mut self, _id: EntryId, _record: Record) -> EngineResult<()> {
            Ok(())
        }
        fn scan(&self, _min: EntryId, _max: EntryId, _limit: Option<usize>) -> EngineResult<Vec<(EntryId, Record)>> {
            Ok(vec![
                (EntryId::new(1, 0), Record::new(vec![])),
                (EntryId::new(1, 0), Record::new(vec![])),
            ])
        }
        fn scan_rev(&self, min: EntryId, max: EntryId, limit: Option<usize>) -> EngineResult<Vec<(EntryId, Record)>> {
            self.scan(min, max, limit)
        }
        fn get(&self, _id: EntryId) -> EngineResult<Option<Record>> {
            Ok(Some(Record::new(vec![])))
        }
        fn remove_range(&mut self, _min: EntryId, _max: EntryId) -> EngineResult<u64> {
            Ok(0)
        }
        fn len(&self) -> EngineResult<u64> {
            Ok(1)
        }
        fn span(&self) -> EngineResult<Option<(EntryId, EntryId)>> {
            Ok(Some((EntryId::new(1, 0), EntryId::new(1, 0))))
        }
        fn trim_to(&mut self, _keep_newest: u64, _approximate: bool) -> EngineResult<u64> {
            Ok(0)
        }
    }

    #[test]
    fn get_raises_invariant_violation_on_duplicate_id() {
        let stream = DuplicateIdStream;
        let limits = EngineLimits::default();
        let err = get(&stream, &["1".to_string()], &limits).unwrap_err();
        assert_eq!(err.class, ErrorClass::InvariantViolation);
    }
}
