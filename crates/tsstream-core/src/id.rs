//! Module: id
//! Responsibility: the composite entry id and its codec, plus range bounds.
//! Does not own: entry payload shape; see `record`.
//! Boundary: every scan, sort, and merge decision in this crate is made in
//! terms of `EntryId` ordering.

use crate::error::EngineError;
use std::cmp::Ordering;
use std::fmt;

///
/// EntryId
///
/// Composite `(timestamp, sequence)` pair. Lexicographic total order:
/// timestamps compare first, sequences break ties. Appending an id less than
/// or equal to a series' current maximum is rejected by the collaborator,
/// not by this crate (see `stream::Stream::append`).
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EntryId {
    pub timestamp: u64,
    pub sequence: u64,
}

impl EntryId {
    #[must_use]
    pub const fn new(timestamp: u64, sequence: u64) -> Self {
        Self {
            timestamp,
            sequence,
        }
    }

    #[must_use]
    pub const fn min() -> Self {
        Self::new(0, 0)
    }

    #[must_use]
    pub const fn max() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }

    /// Parse a token of the form `timestamp[-sequence]`, splitting on the
    /// first `-`. A bare timestamp defaults its sequence to `0`.
    pub fn parse(token: &str) -> Result<Self, EngineError> {
        match token.split_once('-') {
            Some((ts, seq)) => {
                let timestamp = ts
                    .parse()
                    .map_err(|_| EngineError::argument(format!("malformed id '{token}'")))?;
                let sequence = seq
                    .parse()
                    .map_err(|_| EngineError::argument(format!("malformed id '{token}'")))?;
                Ok(Self::new(timestamp, sequence))
            }
            None => {
                let timestamp = token
                    .parse()
                    .map_err(|_| EngineError::argument(format!("malformed id '{token}'")))?;
                Ok(Self::new(timestamp, 0))
            }
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.sequence)
    }
}

impl Ord for EntryId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EntryId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

///
/// RangeBound
///
/// One end of a `min`/`max` range argument: the reserved sentinels `-`/`+`,
/// or an explicit composite id. Both ends are inclusive wherever a range is
/// scanned.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeBound {
    Lowest,
    Highest,
    Id(EntryId),
}

impl RangeBound {
    pub fn parse(token: &str) -> Result<Self, EngineError> {
        match token {
            "-" => Ok(Self::Lowest),
            "+" => Ok(Self::Highest),
            _ => Ok(Self::Id(EntryId::parse(token)?)),
        }
    }

    #[must_use]
    pub const fn resolve_min(self) -> EntryId {
        match self {
            Self::Lowest => EntryId::min(),
            Self::Highest => EntryId::max(),
            Self::Id(id) => id,
        }
    }

    #[must_use]
    pub const fn resolve_max(self) -> EntryId {
        match self {
            Self::Lowest => EntryId::min(),
            Self::Highest => EntryId::max(),
            Self::Id(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_timestamp() {
        let id = EntryId::parse("1000").unwrap();
        assert_eq!(id, EntryId::new(1000, 0));
    }

    #[test]
    fn parses_timestamp_and_sequence() {
        let id = EntryId::parse("1000-3").unwrap();
        assert_eq!(id, EntryId::new(1000, 3));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(EntryId::new(5, 9) < EntryId::new(6, 0));
        assert!(EntryId::new(5, 0) < EntryId::new(5, 1));
    }

    #[test]
    fn sentinels_resolve_to_extremes() {
        assert_eq!(RangeBound::Lowest.resolve_min(), EntryId::min());
        assert_eq!(RangeBound::Highest.resolve_max(), EntryId::max());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(EntryId::parse("abc").is_err());
        assert!(EntryId::parse("10-xyz").is_err());
    }
}
