//! Compiled predicate shapes. Kept as a small explicit AST rather than a
//! closure chain so evaluation stays a plain tree-walk (see `filter::eval`).

use crate::value::Value;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

///
/// Predicate
///
/// `Cmp` and `Contains` are leaves; `All`/`Any` are the folded AND/OR runs
/// produced by the condition-chain parser (see `filter::parse`).
///

#[derive(Clone, Debug)]
pub enum Predicate {
    Cmp {
        field: String,
        op: CompareOp,
        literal: Value,
    },
    Contains {
        field: String,
        set: Vec<Value>,
        negated: bool,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Largest set literal anywhere in this predicate tree, used by
    /// `EngineLimits` to bound adversarially large `FILTER field=(...)` lists.
    #[must_use]
    pub fn max_set_literal_size(&self) -> usize {
        match self {
            Self::Cmp { .. } => 0,
            Self::Contains { set, .. } => set.len(),
            Self::All(children) | Self::Any(children) => {
                children.iter().map(Self::max_set_literal_size).max().unwrap_or(0)
            }
        }
    }
}
