//! Module: options
//! Responsibility: compile the token tail following `(min, max)` into a
//! validated `QuerySpec`, honouring each command's allowed-option subset.
//! Does not own: range bound parsing (`id::RangeBound`) or filter/aggregation
//! grammar internals (`filter`, `aggregate`).

use crate::aggregate::AggregateSpec;
use crate::error::EngineError;
use crate::filter::{self, Predicate};
use crate::record::ProjectionMode;
use std::collections::HashSet;
use std::fmt;

const KEYWORDS: &[&str] = &["LIMIT", "AGGREGATION", "FILTER", "LABELS", "REDACT", "FORMAT", "STORAGE"];

fn is_keyword(token: &str) -> bool {
    KEYWORDS.iter().any(|k| token.eq_ignore_ascii_case(k))
}

///
/// Format
///
/// `msgpack` is grammar-legal but execution-unsupported; see `reply::format`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Format {
    #[default]
    Native,
    Json,
    Msgpack,
}

impl Format {
    fn parse(token: &str) -> Result<Self, EngineError> {
        match token.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" => Ok(Self::Msgpack),
            _ => Err(EngineError::argument(format!("unknown FORMAT '{token}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Storage {
    Stream,
    Hash,
}

impl Storage {
    fn parse(token: &str) -> Result<Self, EngineError> {
        match token.to_ascii_lowercase().as_str() {
            "timeseries" => Ok(Self::Stream),
            "hash" => Ok(Self::Hash),
            _ => Err(EngineError::argument(format!("unknown STORAGE '{token}'"))),
        }
    }
}

///
/// QuerySpec
///
/// The compiled option tail. `parse_ts` is derived, not settable directly:
/// it tracks whether aggregation is installed.
///

#[derive(Clone, Debug, Default)]
pub struct QuerySpec {
    pub limit: Option<usize>,
    pub filter: Option<Predicate>,
    pub projection: ProjectionMode,
    pub aggregate: Option<AggregateSpec>,
    pub storage: Option<Storage>,
    pub format: Format,
}

impl QuerySpec {
    #[must_use]
    pub const fn parse_ts(&self) -> bool {
        self.aggregate.is_some()
    }
}

///
/// AllowedOptions
///
/// Which option keywords a given command accepts. Constructed per command in
/// `dispatch`; see §4.C.
///

#[derive(Clone, Copy, Debug)]
pub struct AllowedOptions {
    pub limit: bool,
    pub aggregation: bool,
    pub filter: bool,
    pub labels_redact: bool,
    pub format: bool,
    pub storage: bool,
}

impl AllowedOptions {
    pub const NONE: Self = Self {
        limit: false,
        aggregation: false,
        filter: false,
        labels_redact: false,
        format: false,
        storage: false,
    };

    pub const FILTER_ONLY: Self = Self {
        filter: true,
        ..Self::NONE
    };

    pub const LABELS_REDACT_FORMAT: Self = Self {
        labels_redact: true,
        format: true,
        ..Self::NONE
    };

    pub const RANGE: Self = Self {
        limit: true,
        aggregation: true,
        filter: true,
        labels_redact: true,
        format: true,
        ..Self::NONE
    };

    pub const MERGE: Self = Self {
        limit: true,
        filter: true,
        labels_redact: true,
        ..Self::NONE
    };

    pub const COPY: Self = Self {
        limit: true,
        aggregation: true,
        filter: true,
        labels_redact: true,
        storage: true,
        ..Self::NONE
    };
}

impl fmt::Display for AllowedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AllowedOptions")
    }
}

/// Parse the token tail following `(min, max)` into a `QuerySpec`, rejecting
/// any option not present in `allowed`, duplicate options, and a
/// `LABELS`/`REDACT` collision.
pub fn parse(tokens: &[String], allowed: AllowedOptions) -> Result<QuerySpec, EngineError> {
    let mut spec = QuerySpec::default();
    let mut seen_limit = false;
    let mut seen_aggregation = false;
    let mut seen_filter = false;
    let mut seen_labels = false;
    let mut seen_redact = false;
    let mut seen_format = false;
    let mut seen_storage = false;

    let mut i = 0;
    while i < tokens.len() {
        let keyword = tokens[i].to_ascii_uppercase();
        i += 1;

        match keyword.as_str() {
            "LIMIT" => {
                if !allowed.limit {
                    return Err(EngineError::argument("LIMIT is not accepted by this command"));
                }
                if seen_limit {
                    return Err(EngineError::argument("duplicate LIMIT option"));
                }
                seen_limit = true;
                let count_token = tokens.get(i).ok_or_else(|| EngineError::argument("LIMIT requires a count"))?;
                let count: i64 = count_token
                    .parse()
                    .map_err(|_| EngineError::argument(format!("invalid LIMIT count '{count_token}'")))?;
                if count < 0 {
                    return Err(EngineError::argument("LIMIT count must be non-negative"));
                }
                i += 1;
                spec.limit = Some(count as usize);
                // Offset is parsed but discarded per §3 invariants; only
                // consume it if present and it isn't the next keyword.
                if let Some(next) = tokens.get(i) {
                    if !is_keyword(next) && next.parse::<i64>().is_ok() {
                        i += 1;
                    }
                }
            }
            "AGGREGATION" => {
                if !allowed.aggregation {
                    return Err(EngineError::argument("AGGREGATION is not accepted by this command"));
                }
                if seen_aggregation {
                    return Err(EngineError::argument("duplicate AGGREGATION option"));
                }
                seen_aggregation = true;
                let (body, next) = take_until_keyword(tokens, i);
                spec.aggregate = Some(AggregateSpec::parse(body)?);
                i = next;
            }
            "FILTER" => {
                if !allowed.filter {
                    return Err(EngineError::argument("FILTER is not accepted by this command"));
                }
                if seen_filter {
                    return Err(EngineError::argument("duplicate FILTER option"));
                }
                seen_filter = true;
                let (body, next) = take_until_keyword(tokens, i);
                spec.filter = Some(filter::compile(body)?);
                i = next;
            }
            "LABELS" => {
                if !allowed.labels_redact {
                    return Err(EngineError::argument("LABELS is not accepted by this command"));
                }
                if seen_labels {
                    return Err(EngineError::argument("duplicate LABELS option"));
                }
                if seen_redact {
                    return Err(EngineError::argument("LABELS and REDACT are mutually exclusive"));
                }
                seen_labels = true;
                let (body, next) = take_until_keyword(tokens, i);
                if body.is_empty() {
                    return Err(EngineError::argument("LABELS requires at least one field name"));
                }
                spec.projection = ProjectionMode::Include(body.iter().cloned().collect::<HashSet<_>>());
                i = next;
            }
            "REDACT" => {
                if !allowed.labels_redact {
                    return Err(EngineError::argument("REDACT is not accepted by this command"));
                }
                if seen_redact {
                    return Err(EngineError::argument("duplicate REDACT option"));
                }
                if seen_labels {
                    return Err(EngineError::argument("LABELS and REDACT are mutually exclusive"));
                }
                seen_redact = true;
                let (body, next) = take_until_keyword(tokens, i);
                if body.is_empty() {
                    return Err(EngineError::argument("REDACT requires at least one field name"));
                }
                spec.projection = ProjectionMode::Exclude(body.iter().cloned().collect::<HashSet<_>>());
                i = next;
            }
            "FORMAT" => {
                if !allowed.format {
                    return Err(EngineError::argument("FORMAT is not accepted by this command"));
                }
                if seen_format {
                    return Err(EngineError::argument("duplicate FORMAT option"));
                }
                seen_format = true;
                let token = tokens.get(i).ok_or_else(|| EngineError::argument("FORMAT requires a value"))?;
                spec.format = Format::parse(token)?;
                i += 1;
            }
            "STORAGE" => {
                if !allowed.storage {
                    return Err(EngineError::argument("STORAGE is not accepted by this command"));
                }
                if seen_storage {
                    return Err(EngineError::argument("duplicate STORAGE option"));
                }
                seen_storage = true;
                let token = tokens.get(i).ok_or_else(|| EngineError::argument("STORAGE requires a value"))?;
                spec.storage = Some(Storage::parse(token)?);
                i += 1;
            }
            other => {
                return Err(EngineError::argument(format!("unknown query option '{other}'")));
            }
        }
    }

    Ok(spec)
}

fn take_until_keyword(tokens: &[String], start: usize) -> (&[String], usize) {
    let mut end = start;
    while end < tokens.len() && !is_keyword(&tokens[end]) {
        end += 1;
    }
    (&tokens[start..end], end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_limit_with_discarded_offset() {
        let spec = parse(&tokens(&["LIMIT", "5", "10"]), AllowedOptions::RANGE).unwrap();
        assert_eq!(spec.limit, Some(5));
    }

    #[test]
    fn parses_filter_and_labels() {
        let spec = parse(&tokens(&["FILTER", "a=1", "LABELS", "a", "b"]), AllowedOptions::RANGE).unwrap();
        assert!(spec.filter.is_some());
        assert_eq!(spec.projection, ProjectionMode::Include(["a", "b"].into_iter().map(String::from).collect()));
    }

    #[test]
    fn rejects_labels_and_redact_together() {
        assert!(parse(&tokens(&["LABELS", "a", "REDACT", "b"]), AllowedOptions::RANGE).is_err());
    }

    #[test]
    fn rejects_duplicate_option() {
        assert!(parse(&tokens(&["FILTER", "a=1", "FILTER", "b=2"]), AllowedOptions::RANGE).is_err());
    }

    #[test]
    fn rejects_option_not_in_allowed_set() {
        assert!(parse(&tokens(&["AGGREGATION", "10", "count(v)"]), AllowedOptions::FILTER_ONLY).is_err());
    }

    #[test]
    fn derives_parse_ts_from_aggregation() {
        let spec = parse(&tokens(&["AGGREGATION", "10", "count(v)"]), AllowedOptions::RANGE).unwrap();
        assert!(spec.parse_ts());
        let spec = parse(&tokens(&[]), AllowedOptions::RANGE).unwrap();
        assert!(!spec.parse_ts());
    }

    #[test]
    fn accepts_msgpack_at_parse_time() {
        let spec = parse(&tokens(&["FORMAT", "msgpack"]), AllowedOptions::RANGE).unwrap();
        assert_eq!(spec.format, Format::Msgpack);
    }
}
