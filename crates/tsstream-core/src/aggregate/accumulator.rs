//! Per-kind, per-bucket accumulator state machines and their finalisers.
//! Each kind owns exactly the running state it needs; none buffer the full
//! bucket except `median`, which must sort to find the middle.

use super::kind::AggregateKind;
use crate::value::Value;

///
/// Accumulator
///
/// One running reducer bound to one `(field, kind)` request slot. `apply`
/// is called once per scanned entry that lands in this accumulator's
/// bucket, regardless of whether the target field is present.
///

#[derive(Clone, Debug)]
pub(crate) enum Accumulator {
    Count(u64),
    Sum { total: f64, all_integer: bool, saw_any: bool },
    Avg { mean: f64, count: u64 },
    Median { values: Vec<f64> },
    Stdev { mean: f64, m2: f64, count: u64 },
    MinMax { best: Option<Value>, want_max: bool },
    Range { min: Option<f64>, max: Option<f64> },
    First(Option<Value>),
    Last(Option<Value>),
    Rate(u64),
}

impl Accumulator {
    pub(crate) fn new(kind: AggregateKind) -> Self {
        match kind {
            AggregateKind::Count => Self::Count(0),
            AggregateKind::Sum => Self::Sum {
                total: 0.0,
                all_integer: true,
                saw_any: false,
            },
            AggregateKind::Avg => Self::Avg { mean: 0.0, count: 0 },
            AggregateKind::Median => Self::Median { values: Vec::new() },
            AggregateKind::Stdev => Self::Stdev {
                mean: 0.0,
                m2: 0.0,
                count: 0,
            },
            AggregateKind::Min => Self::MinMax {
                best: None,
                want_max: false,
            },
            AggregateKind::Max => Self::MinMax {
                best: None,
                want_max: true,
            },
            AggregateKind::Range => Self::Range { min: None, max: None },
            AggregateKind::First => Self::First(None),
            AggregateKind::Last => Self::Last(None),
            AggregateKind::Rate => Self::Rate(0),
        }
    }

    /// Feed one entry's (possibly absent) target-field value into this
    /// accumulator.
    pub(crate) fn apply(&mut self, value: Option<Value>) {
        match self {
            Self::Count(n) | Self::Rate(n) => *n += 1,
            Self::Sum {
                total,
                all_integer,
                saw_any,
            } => {
                *saw_any = true;
                match &value {
                    Some(Value::Int(i)) => *total += *i as f64,
                    Some(Value::Float(f, _)) => {
                        *total += f;
                        *all_integer = false;
                    }
                    _ => {}
                }
            }
            Self::Avg { mean, count } => {
                if let Some(x) = value.as_ref().and_then(Value::as_f64) {
                    *count += 1;
                    *mean += (x - *mean) / (*count as f64);
                }
            }
            Self::Median { values } => {
                if let Some(x) = value.as_ref().and_then(Value::as_f64) {
                    values.push(x);
                }
            }
            Self::Stdev { mean, m2, count } => {
                if let Some(x) = value.as_ref().and_then(Value::as_f64) {
                    *count += 1;
                    let delta = x - *mean;
                    *mean += delta / (*count as f64);
                    let delta2 = x - *mean;
                    *m2 += delta * delta2;
                }
            }
            Self::MinMax { best, want_max } => {
                if let Some(candidate) = value {
                    let replace = match best {
                        None => true,
                        Some(current) => {
                            let ord = candidate.compare(current);
                            if *want_max {
                                ord == std::cmp::Ordering::Greater
                            } else {
                                ord == std::cmp::Ordering::Less
                            }
                        }
                    };
                    if replace {
                        *best = Some(candidate);
                    }
                }
            }
            Self::Range { min, max } => {
                if let Some(x) = value.as_ref().and_then(Value::as_f64) {
                    *min = Some(min.map_or(x, |m| m.min(x)));
                    *max = Some(max.map_or(x, |m| m.max(x)));
                }
            }
            Self::First(slot) => {
                if slot.is_none() {
                    *slot = value;
                }
            }
            Self::Last(slot) => {
                if value.is_some() {
                    *slot = value;
                }
            }
        }
    }

    /// Render this accumulator's finished value as output text.
    pub(crate) fn finalize(self, time_bucket: u64) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Sum {
                total,
                all_integer,
                saw_any,
            } => {
                if !saw_any {
                    "0".to_string()
                } else if all_integer {
                    (total.round() as i64).to_string()
                } else {
                    format_f64(total)
                }
            }
            Self::Avg { mean, count } => {
                if count == 0 {
                    "0".to_string()
                } else {
                    format_f64(mean)
                }
            }
            Self::Median { mut values } => {
                if values.is_empty() {
                    return "0".to_string();
                }
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let n = values.len();
                let mid = n / 2;
                let median = if n % 2 == 1 {
                    values[mid]
                } else {
                    (values[mid - 1] + values[mid]) / 2.0
                };
                format_f64(median)
            }
            Self::Stdev { m2, count, .. } => {
                if count < 2 {
                    "0".to_string()
                } else {
                    format_f64((m2 / (count as f64 - 1.0)).sqrt())
                }
            }
            Self::MinMax { best, .. } => best.map_or_else(String::new, |v| v.to_raw()),
            Self::Range { min, max } => match (min, max) {
                (Some(min), Some(max)) => format_f64(max - min),
                _ => "0".to_string(),
            },
            Self::First(value) | Self::Last(value) => value.map_or_else(String::new, |v| v.to_raw()),
            Self::Rate(count) => {
                if time_bucket == 0 {
                    "0".to_string()
                } else {
                    format_f64(count as f64 / time_bucket as f64)
                }
            }
        }
    }
}

/// Render an `f64` the way the rest of the engine renders numbers: no
/// trailing `.0` for integer-valued results, fractional digits kept
/// otherwise. Rust's default `f64` `Display` already produces the shortest
/// round-trippable representation, so this is a thin, self-documenting
/// wrapper rather than custom formatting logic.
fn format_f64(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: AggregateKind, values: &[Option<&str>], time_bucket: u64) -> String {
        let mut acc = Accumulator::new(kind);
        for v in values {
            acc.apply(v.map(Value::coerce));
        }
        acc.finalize(time_bucket)
    }

    const BUCKET: &[&str] = &["131", "141", "159", "126", "153", "158", "197", "193", "123", "184"];

    fn opts(values: &[&str]) -> Vec<Option<&str>> {
        values.iter().map(|v| Some(*v)).collect()
    }

    #[test]
    fn sum_and_count() {
        assert_eq!(run(AggregateKind::Count, &opts(BUCKET), 10), "10");
        assert_eq!(run(AggregateKind::Sum, &opts(BUCKET), 10), "1565");
    }

    #[test]
    fn min_max_and_range() {
        assert_eq!(run(AggregateKind::Min, &opts(BUCKET), 10), "123");
        assert_eq!(run(AggregateKind::Max, &opts(BUCKET), 10), "197");
        assert_eq!(run(AggregateKind::Range, &opts(BUCKET), 10), "74");
    }

    #[test]
    fn avg_and_median() {
        assert_eq!(run(AggregateKind::Avg, &opts(BUCKET), 10), "156.5");
        assert_eq!(run(AggregateKind::Median, &opts(BUCKET), 10), "155.5");
    }

    #[test]
    fn first_and_last_preserve_text() {
        assert_eq!(run(AggregateKind::First, &opts(BUCKET), 10), "131");
        assert_eq!(run(AggregateKind::Last, &opts(BUCKET), 10), "184");
    }

    #[test]
    fn stdev_single_value_is_zero() {
        assert_eq!(run(AggregateKind::Stdev, &opts(&["42"]), 10), "0");
    }

    #[test]
    fn stdev_matches_sample_formula() {
        let values = [Some("2"), Some("4"), Some("4"), Some("4"), Some("5"), Some("5"), Some("7"), Some("9")];
        let result = run(AggregateKind::Stdev, &values, 10);
        let parsed: f64 = result.parse().unwrap();
        assert!((parsed - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn rate_divides_count_by_bucket() {
        assert_eq!(run(AggregateKind::Rate, &opts(BUCKET), 10), "1");
    }

    #[test]
    fn sum_stays_float_when_any_input_is_fractional() {
        let values = [Some("1"), Some("2.5")];
        assert_eq!(run(AggregateKind::Sum, &values, 10), "3.5");
    }
}
