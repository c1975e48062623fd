//! Module: config
//! Responsibility: the engine's only "configuration" — conservative caps an
//! embedder may tighten, checked against a compiled `QuerySpec`.
//! Does not own: the `Stream` collaborator an embedder supplies at
//! construction time; that is configuration too, but it is a trait object,
//! not a tunable struct.

use crate::error::EngineError;
use crate::options::QuerySpec;

///
/// EngineLimits
///
/// There is no daemon and no network listener in this crate's scope, so
/// there is no file-based configuration to load. What little is tunable
/// lives here as a small explicit struct, the way the rest of this crate
/// prefers explicit structs over global state.
///

#[derive(Clone, Copy, Debug)]
pub struct EngineLimits {
    pub max_filter_set_literal: usize,
    pub max_aggregation_fields: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_filter_set_literal: 256,
            max_aggregation_fields: 32,
        }
    }
}

impl EngineLimits {
    /// Validate a compiled `QuerySpec` against these limits. Called after
    /// `options::parse` succeeds, before the query runs.
    pub fn check(&self, spec: &QuerySpec) -> Result<(), EngineError> {
        if let Some(predicate) = &spec.filter {
            let largest = predicate.max_set_literal_size();
            if largest > self.max_filter_set_literal {
                return Err(EngineError::argument(format!(
                    "filter set literal of {largest} values exceeds the configured limit of {}",
                    self.max_filter_set_literal
                )));
            }
        }
        if let Some(aggregate) = &spec.aggregate {
            if aggregate.fields.len() > self.max_aggregation_fields {
                return Err(EngineError::argument(format!(
                    "aggregation request of {} fields exceeds the configured limit of {}",
                    aggregate.fields.len(),
                    self.max_aggregation_fields
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{self, AllowedOptions};

    fn tokens(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_oversized_set_literal() {
        let limits = EngineLimits {
            max_filter_set_literal: 2,
            ..EngineLimits::default()
        };
        let spec = options::parse(&tokens(&["FILTER", "name=(a,b,c)"]), AllowedOptions::RANGE).unwrap();
        assert!(limits.check(&spec).is_err());
    }

    #[test]
    fn default_limits_allow_typical_queries() {
        let limits = EngineLimits::default();
        let spec = options::parse(&tokens(&["FILTER", "name=(a,b,c)"]), AllowedOptions::RANGE).unwrap();
        assert!(limits.check(&spec).is_ok());
    }
}
