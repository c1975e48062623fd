//! Compiles the token stream following `FILTER` into a `Predicate` tree.
//!
//! Each condition arrives as one token of the form `field OP value`; `AND`
//! and `OR` arrive as separate tokens joining conditions. See
//! `SPEC_FULL.md` §4.B for the full grammar and the chaining rule.

use super::ast::{CompareOp, Predicate};
use super::csv::split_csv;
use crate::error::EngineError;
use crate::record::Record;
use crate::value::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Joiner {
    And,
    Or,
}

/// Compile the tokens following `FILTER` into one predicate.
pub fn compile(tokens: &[String]) -> Result<Predicate, EngineError> {
    if tokens.is_empty() {
        return Err(EngineError::argument("FILTER requires at least one condition"));
    }

    let mut predicates = Vec::new();
    let mut joiners = Vec::new();

    let mut expect_condition = true;
    for token in tokens {
        if expect_condition {
            predicates.push(parse_condition(token)?);
            expect_condition = false;
        } else if token.eq_ignore_ascii_case("AND") {
            joiners.push(Joiner::And);
            expect_condition = true;
        } else if token.eq_ignore_ascii_case("OR") {
            joiners.push(Joiner::Or);
            expect_condition = true;
        } else {
            return Err(EngineError::argument(format!(
                "expected AND/OR in filter expression, found '{token}'"
            )));
        }
    }
    if expect_condition {
        return Err(EngineError::argument("filter expression ends with a dangling joiner"));
    }

    Ok(fold_chain(predicates, &joiners))
}

/// Fold a flat `P0 J1 P1 J2 P2 …` chain: greedily group maximal runs of one
/// joiner into a single `All`/`Any` node, then AND the runs together.
fn fold_chain(predicates: Vec<Predicate>, joiners: &[Joiner]) -> Predicate {
    let mut predicates = predicates.into_iter();
    let mut runs: Vec<(Option<Joiner>, Vec<Predicate>)> = Vec::new();
    let mut current_run: Vec<Predicate> = vec![predicates.next().expect("at least one predicate")];
    let mut current_joiner: Option<Joiner> = None;

    for (joiner, predicate) in joiners.iter().copied().zip(predicates) {
        match current_joiner {
            None => {
                current_joiner = Some(joiner);
                current_run.push(predicate);
            }
            Some(existing) if existing == joiner => {
                current_run.push(predicate);
            }
            Some(_) => {
                runs.push((current_joiner, std::mem::take(&mut current_run)));
                current_run = vec![predicate];
                current_joiner = Some(joiner);
            }
        }
    }
    runs.push((current_joiner, current_run));

    let mut top: Vec<Predicate> = runs
        .into_iter()
        .map(|(joiner, mut preds)| {
            if preds.len() == 1 {
                preds.pop().expect("non-empty run")
            } else {
                match joiner {
                    Some(Joiner::Or) => Predicate::Any(preds),
                    _ => Predicate::All(preds),
                }
            }
        })
        .collect();

    if top.len() == 1 {
        top.pop().expect("non-empty top list")
    } else {
        Predicate::All(top)
    }
}

fn parse_condition(token: &str) -> Result<Predicate, EngineError> {
    let (field, op_idx) = split_field(token)?;
    let rest = &token[op_idx..];

    let (op, value_start) = parse_operator(rest)?;
    let value = rest[value_start..].trim();
    if value.is_empty() {
        return Err(EngineError::argument(format!("filter condition '{token}' is missing a value")));
    }

    if let Some(body) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        let negated = match op {
            CompareOp::Eq => false,
            CompareOp::Ne => true,
            _ => {
                return Err(EngineError::argument(
                    "set membership filters only support '=' and '!='",
                ));
            }
        };
        let set = split_csv(body)?
            .into_iter()
            .map(|v| Value::coerce(&v))
            .collect();
        return Ok(Predicate::Contains {
            field: field.to_string(),
            set,
            negated,
        });
    }

    Ok(Predicate::Cmp {
        field: field.to_string(),
        op,
        literal: Value::coerce(value),
    })
}

fn split_field(token: &str) -> Result<(&str, usize), EngineError> {
    let mut end = 0;
    for (i, c) in token.char_indices() {
        if i == 0 {
            if !(c.is_ascii_alphabetic() || c == '_') {
                return Err(EngineError::argument(format!("filter condition '{token}' has an invalid field name")));
            }
            end = i + c.len_utf8();
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if end == 0 || end >= token.len() {
        return Err(EngineError::argument(format!("filter condition '{token}' is missing an operator")));
    }
    Ok((&token[..end], end))
}

fn parse_operator(rest: &str) -> Result<(CompareOp, usize), EngineError> {
    for (prefix, op) in [
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("=", CompareOp::Eq),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ] {
        if let Some(tail) = rest.strip_prefix(prefix) {
            return Ok((op, rest.len() - tail.len()));
        }
    }
    Err(EngineError::argument(format!(
        "filter condition '{rest}' does not contain a recognised operator"
    )))
}

/// Evaluate a compiled predicate against one record.
#[must_use]
pub fn evaluate(predicate: &Predicate, record: &Record) -> bool {
    match predicate {
        Predicate::All(children) => children.iter().all(|p| evaluate(p, record)),
        Predicate::Any(children) => children.iter().any(|p| evaluate(p, record)),
        Predicate::Cmp { field, op, literal } => {
            let Some(field_value) = record.get(field) else {
                return false;
            };
            compare(&field_value, *op, literal)
        }
        Predicate::Contains { field, set, negated } => {
            let Some(field_value) = record.get(field) else {
                return false;
            };
            let found = set.iter().any(|v| field_value.compare(v) == std::cmp::Ordering::Equal);
            found != *negated
        }
    }
}

fn compare(field_value: &Value, op: CompareOp, literal: &Value) -> bool {
    use std::cmp::Ordering::*;
    let ordering = field_value.compare(literal);
    match op {
        CompareOp::Eq => ordering == Equal,
        CompareOp::Ne => ordering != Equal,
        CompareOp::Lt => ordering == Less,
        CompareOp::Gt => ordering == Greater,
        CompareOp::Le => ordering != Greater,
        CompareOp::Ge => ordering != Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        Record::new(pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect())
    }

    fn tokens(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn simple_equality() {
        let pred = compile(&tokens(&["name=april"])).unwrap();
        assert!(evaluate(&pred, &record(&[("name", "april")])));
        assert!(!evaluate(&pred, &record(&[("name", "may")])));
    }

    #[test]
    fn compound_and() {
        let pred = compile(&tokens(&["name=april", "AND", "rating=high"])).unwrap();
        assert!(evaluate(&pred, &record(&[("name", "april"), ("rating", "high")])));
        assert!(!evaluate(&pred, &record(&[("name", "april"), ("rating", "low")])));
    }

    #[test]
    fn left_to_right_chain_folding() {
        // p1 OR p2 AND p3 -> (p1 OR p2) AND p3
        let pred = compile(&tokens(&["a=1", "OR", "b=2", "AND", "c=3"])).unwrap();
        assert!(evaluate(&pred, &record(&[("a", "1"), ("b", "0"), ("c", "3")])));
        assert!(!evaluate(&pred, &record(&[("a", "1"), ("b", "0"), ("c", "9")])));
        assert!(!evaluate(&pred, &record(&[("a", "0"), ("b", "0"), ("c", "3")])));
    }

    #[test]
    fn set_membership() {
        let pred = compile(&tokens(&["name=(april,may,june)"])).unwrap();
        assert!(evaluate(&pred, &record(&[("name", "may")])));
        assert!(!evaluate(&pred, &record(&[("name", "july")])));

        let not_pred = compile(&tokens(&["name!=(april,may)"])).unwrap();
        assert!(evaluate(&not_pred, &record(&[("name", "july")])));
        assert!(!evaluate(&not_pred, &record(&[("name", "april")])));
    }

    #[test]
    fn ordering_operators() {
        let pred = compile(&tokens(&["score>=10"])).unwrap();
        assert!(evaluate(&pred, &record(&[("score", "10")])));
        assert!(evaluate(&pred, &record(&[("score", "11")])));
        assert!(!evaluate(&pred, &record(&[("score", "9")])));
    }

    #[test]
    fn missing_field_is_always_false() {
        let pred = compile(&tokens(&["name!=april"])).unwrap();
        assert!(!evaluate(&pred, &record(&[])));
    }

    #[test]
    fn rejects_ordering_operator_on_set() {
        assert!(compile(&tokens(&["name<(april,may)"])).is_err());
    }

    #[test]
    fn rejects_malformed_chain() {
        assert!(compile(&tokens(&["name=april", "AND"])).is_err());
        assert!(compile(&tokens(&[])).is_err());
    }
}
