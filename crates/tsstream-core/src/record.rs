//! Module: record
//! Responsibility: the ordered field/value list carried by one entry, plus
//! projection (LABELS/REDACT) over it.
//! Does not own: filter evaluation (`filter::eval`) or aggregation grouping.
//! Boundary: field insertion order must survive every transform in this
//! crate except aggregation, which replaces fields with bucket groupings.

use crate::value::Value;
use std::collections::HashSet;

///
/// Record
///
/// An ordered sequence of `(name, raw_text)` pairs. Field names match
/// `[A-Za-z_][A-Za-z0-9_]*`; the filter grammar depends on this shape.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    #[must_use]
    pub const fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[must_use]
    pub fn into_fields(self) -> Vec<(String, String)> {
        self.fields
    }

    /// Look up a field by name and coerce it, without disturbing order.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Value::coerce(v))
    }

    /// Validate that a field name matches `[A-Za-z_][A-Za-z0-9_]*`.
    #[must_use]
    pub fn is_valid_field_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

///
/// ProjectionMode
///
/// `LABELS` and `REDACT` are mutually exclusive in one query; the option
/// parser enforces that before a `ProjectionMode` is ever constructed.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ProjectionMode {
    #[default]
    None,
    Include(HashSet<String>),
    Exclude(HashSet<String>),
}

impl ProjectionMode {
    /// Apply this projection to a record's ordered fields, preserving the
    /// order of surviving fields exactly.
    #[must_use]
    pub fn apply(&self, record: &Record) -> Record {
        match self {
            Self::None => record.clone(),
            Self::Include(names) => Record::new(
                record
                    .fields()
                    .iter()
                    .filter(|(n, _)| names.contains(n))
                    .cloned()
                    .collect(),
            ),
            Self::Exclude(names) => Record::new(
                record
                    .fields()
                    .iter()
                    .filter(|(n, _)| !names.contains(n))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new(vec![
            ("id".into(), "1".into()),
            ("name".into(), "ada".into()),
            ("last_name".into(), "lovelace".into()),
            ("coolness".into(), "high".into()),
        ])
    }

    #[test]
    fn include_preserves_original_order() {
        let mode = ProjectionMode::Include(["last_name", "name"].into_iter().map(String::from).collect());
        let projected = mode.apply(&sample());
        let names: Vec<_> = projected.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["name", "last_name"]);
    }

    #[test]
    fn exclude_preserves_remaining_order() {
        let mode = ProjectionMode::Exclude(["coolness"].into_iter().map(String::from).collect());
        let projected = mode.apply(&sample());
        let names: Vec<_> = projected.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["id", "name", "last_name"]);
    }

    #[test]
    fn field_name_validation() {
        assert!(Record::is_valid_field_name("_foo"));
        assert!(Record::is_valid_field_name("foo_123"));
        assert!(!Record::is_valid_field_name("1foo"));
        assert!(!Record::is_valid_field_name(""));
        assert!(!Record::is_valid_field_name("foo-bar"));
    }
}
