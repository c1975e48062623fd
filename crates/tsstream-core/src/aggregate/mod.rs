//! Module: aggregate
//! Responsibility: compile and run `AGGREGATION bucket (kind(field))+`
//! against a stream of entries, producing one bucketed output row per
//! distinct timestamp bucket.
//! Does not own: scanning or filtering entries; see `range`.

mod accumulator;
mod engine;
mod kind;

pub use kind::AggregateKind;

use crate::error::EngineError;
use crate::id::EntryId;
use crate::record::Record;

///
/// BucketFields
///
/// One bucket's aggregation output, grouped by field name in first-occurrence
/// order: `field → [(kind, value), (kind, value), …]`, repeating entries when
/// the same field was requested under multiple kinds. This is the shape
/// `range`/`revrange`/`poprange` reply on directly (§4.F); the `field_kind`
/// flattened form used by the `copy` store writer (§4.H) is a distinct
/// projection of this, built by `flatten_to_record`.
///
pub type BucketFields = Vec<(String, Vec<(AggregateKind, String)>)>;

///
/// AggregateSpec
///
/// One compiled `AGGREGATION` option: the bucket width and the ordered list
/// of `(field, kind)` requests. The same field name may repeat with
/// different kinds; repeats are kept in request order, not deduplicated.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateSpec {
    pub time_bucket: u64,
    pub fields: Vec<(String, AggregateKind)>,
}

impl AggregateSpec {
    /// Parse the tokens following `AGGREGATION`: a bucket width followed by
    /// one or more `kind(field)` requests.
    pub fn parse(tokens: &[String]) -> Result<Self, EngineError> {
        let [bucket_token, rest @ ..] = tokens else {
            return Err(EngineError::argument(
                "AGGREGATION requires a bucket size followed by at least one kind(field) request",
            ));
        };
        let time_bucket: u64 = bucket_token
            .parse()
            .map_err(|_| EngineError::argument(format!("invalid aggregation bucket size '{bucket_token}'")))?;
        if time_bucket == 0 {
            return Err(EngineError::argument("aggregation bucket size must be greater than zero"));
        }
        if rest.is_empty() {
            return Err(EngineError::argument("AGGREGATION requires at least one kind(field) request"));
        }

        let fields = rest.iter().map(|token| parse_request(token)).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { time_bucket, fields })
    }

    /// Run this spec over an ordered sequence of `(id, record)` pairs,
    /// returning one `(bucket_start, BucketFields)` per populated bucket in
    /// ascending bucket order. Every scanned entry lands in exactly one
    /// bucket and is fed to every requested accumulator for that bucket,
    /// regardless of whether its target field is present.
    #[must_use]
    pub fn run<'a>(&self, entries: impl Iterator<Item = (EntryId, &'a Record)>) -> Vec<(u64, BucketFields)> {
        engine::run(self, entries)
    }
}

/// Flatten one bucket's grouped aggregation output into a flat `Record`
/// using `field_kind` names, the shape the `copy` store writer persists
/// (§4.H) — distinct from the nested shape `range`-family replies use.
#[must_use]
pub fn flatten_to_record(fields: &BucketFields) -> Record {
    let mut out = Vec::new();
    for (field, kinds) in fields {
        for (kind, value) in kinds {
            out.push((format!("{field}_{}", kind.as_str()), value.clone()));
        }
    }
    Record::new(out)
}

fn parse_request(token: &str) -> Result<(String, AggregateKind), EngineError> {
    let open = token
        .find('(')
        .ok_or_else(|| EngineError::argument(format!("aggregation request '{token}' is missing '('")))?;
    if !token.ends_with(')') {
        return Err(EngineError::argument(format!("aggregation request '{token}' is missing ')'")));
    }
    let kind = AggregateKind::parse(&token[..open])?;
    let field = &token[open + 1..token.len() - 1];
    if field.is_empty() || !Record::is_valid_field_name(field) {
        return Err(EngineError::argument(format!("aggregation request '{token}' has an invalid field name")));
    }
    Ok((field.to_string(), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_single_request() {
        let spec = AggregateSpec::parse(&tokens(&["10", "avg(value)"])).unwrap();
        assert_eq!(spec.time_bucket, 10);
        assert_eq!(spec.fields, vec![("value".to_string(), AggregateKind::Avg)]);
    }

    #[test]
    fn parses_multiple_requests_including_repeats() {
        let spec = AggregateSpec::parse(&tokens(&["5", "min(value)", "max(value)", "count(value)"])).unwrap();
        assert_eq!(spec.fields.len(), 3);
    }

    #[test]
    fn rejects_zero_bucket() {
        assert!(AggregateSpec::parse(&tokens(&["0", "count(value)"])).is_err());
    }

    #[test]
    fn rejects_malformed_request() {
        assert!(AggregateSpec::parse(&tokens(&["10", "avgvalue)"])).is_err());
        assert!(AggregateSpec::parse(&tokens(&["10", "avg(value"])).is_err());
    }
}
