//! The eleven aggregation kinds accepted by `AGGREGATION bucket (kind(field))+`.

use crate::error::EngineError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Median,
    Stdev,
    Min,
    Max,
    Range,
    First,
    Last,
    Rate,
}

impl AggregateKind {
    pub fn parse(token: &str) -> Result<Self, EngineError> {
        let kind = match token.to_ascii_lowercase().as_str() {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "median" => Self::Median,
            "stdev" => Self::Stdev,
            "min" => Self::Min,
            "max" => Self::Max,
            "range" => Self::Range,
            "first" => Self::First,
            "last" => Self::Last,
            "rate" => Self::Rate,
            _ => return Err(EngineError::argument(format!("unknown aggregation kind '{token}'"))),
        };
        Ok(kind)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Median => "median",
            Self::Stdev => "stdev",
            Self::Min => "min",
            Self::Max => "max",
            Self::Range => "range",
            Self::First => "first",
            Self::Last => "last",
            Self::Rate => "rate",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
