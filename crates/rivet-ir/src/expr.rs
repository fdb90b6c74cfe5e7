//! Symbolic expression language for step guards and payloads.
//!
//! Expressions are produced by the (external) symbolic execution engine and
//! consumed by the slicer, the memory model, and the constraint converter.
//! The language is deliberately small: linear integer arithmetic,
//! comparisons, and boolean structure.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::namespace::{Namespace, Sort};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to a declared symbol.
    Symbol(String),
    IntLit(i64),
    BoolLit(bool),

    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),

    Eq(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),

    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),

    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Sort-checking failure for a single expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("`{context}` expects a {expected} operand")]
    Expected { expected: Sort, context: &'static str },
    #[error("operands of `{0}` have mismatched sorts")]
    Mismatched(&'static str),
}

/// Result of constant folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Folded {
    Int(i64),
    Bool(bool),
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        Expr::BoolLit(b)
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<Expr>) -> Self {
        Expr::And(terms)
    }

    pub fn or(terms: Vec<Expr>) -> Self {
        Expr::Or(terms)
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn implies(self, other: Expr) -> Self {
        Expr::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Collect referenced symbol names into `out`.
    pub fn free_symbols_into(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::IntLit(_) | Expr::BoolLit(_) => {}
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Eq(a, b)
            | Expr::Lt(a, b)
            | Expr::Le(a, b)
            | Expr::Gt(a, b)
            | Expr::Ge(a, b)
            | Expr::Implies(a, b) => {
                a.free_symbols_into(out);
                b.free_symbols_into(out);
            }
            Expr::And(terms) | Expr::Or(terms) => {
                for t in terms {
                    t.free_symbols_into(out);
                }
            }
            Expr::Not(inner) => inner.free_symbols_into(out),
            Expr::Ite(c, t, e) => {
                c.free_symbols_into(out);
                t.free_symbols_into(out);
                e.free_symbols_into(out);
            }
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.free_symbols_into(&mut out);
        out
    }

    fn fold(&self) -> Option<Folded> {
        match self {
            Expr::Symbol(_) => None,
            Expr::IntLit(n) => Some(Folded::Int(*n)),
            Expr::BoolLit(b) => Some(Folded::Bool(*b)),
            Expr::Add(a, b) => fold_int2(a, b, i64::checked_add),
            Expr::Sub(a, b) => fold_int2(a, b, i64::checked_sub),
            Expr::Mul(a, b) => fold_int2(a, b, i64::checked_mul),
            Expr::Eq(a, b) => match (a.fold()?, b.fold()?) {
                (Folded::Int(x), Folded::Int(y)) => Some(Folded::Bool(x == y)),
                (Folded::Bool(x), Folded::Bool(y)) => Some(Folded::Bool(x == y)),
                _ => None,
            },
            Expr::Lt(a, b) => fold_cmp(a, b, |x, y| x < y),
            Expr::Le(a, b) => fold_cmp(a, b, |x, y| x <= y),
            Expr::Gt(a, b) => fold_cmp(a, b, |x, y| x > y),
            Expr::Ge(a, b) => fold_cmp(a, b, |x, y| x >= y),
            Expr::And(terms) => {
                let mut all_true = true;
                for t in terms {
                    match t.fold() {
                        Some(Folded::Bool(false)) => return Some(Folded::Bool(false)),
                        Some(Folded::Bool(true)) => {}
                        _ => all_true = false,
                    }
                }
                all_true.then_some(Folded::Bool(true))
            }
            Expr::Or(terms) => {
                let mut all_false = true;
                for t in terms {
                    match t.fold() {
                        Some(Folded::Bool(true)) => return Some(Folded::Bool(true)),
                        Some(Folded::Bool(false)) => {}
                        _ => all_false = false,
                    }
                }
                all_false.then_some(Folded::Bool(false))
            }
            Expr::Not(inner) => match inner.fold()? {
                Folded::Bool(b) => Some(Folded::Bool(!b)),
                Folded::Int(_) => None,
            },
            Expr::Implies(a, b) => {
                if let Some(Folded::Bool(false)) = a.fold() {
                    return Some(Folded::Bool(true));
                }
                match (a.fold()?, b.fold()?) {
                    (Folded::Bool(x), Folded::Bool(y)) => Some(Folded::Bool(!x || y)),
                    _ => None,
                }
            }
            Expr::Ite(c, t, e) => match c.fold()? {
                Folded::Bool(true) => t.fold(),
                Folded::Bool(false) => e.fold(),
                Folded::Int(_) => None,
            },
        }
    }

    /// True when the expression evaluates to `true` independently of any
    /// symbol assignment.
    pub fn is_trivially_true(&self) -> bool {
        matches!(self.fold(), Some(Folded::Bool(true)))
    }

    /// True when the expression evaluates to `false` independently of any
    /// symbol assignment.
    pub fn is_trivially_false(&self) -> bool {
        matches!(self.fold(), Some(Folded::Bool(false)))
    }

    /// Sort-check against a namespace.
    pub fn sort(&self, ns: &Namespace) -> Result<Sort, SortError> {
        match self {
            Expr::Symbol(name) => ns
                .sort_of(name)
                .ok_or_else(|| SortError::UnknownSymbol(name.clone())),
            Expr::IntLit(_) => Ok(Sort::Int),
            Expr::BoolLit(_) => Ok(Sort::Bool),
            Expr::Add(a, b) => expect_ints(ns, a, b, "+"),
            Expr::Sub(a, b) => expect_ints(ns, a, b, "-"),
            Expr::Mul(a, b) => expect_ints(ns, a, b, "*"),
            Expr::Eq(a, b) => {
                if a.sort(ns)? != b.sort(ns)? {
                    return Err(SortError::Mismatched("="));
                }
                Ok(Sort::Bool)
            }
            Expr::Lt(a, b) => expect_ints(ns, a, b, "<").map(|_| Sort::Bool),
            Expr::Le(a, b) => expect_ints(ns, a, b, "<=").map(|_| Sort::Bool),
            Expr::Gt(a, b) => expect_ints(ns, a, b, ">").map(|_| Sort::Bool),
            Expr::Ge(a, b) => expect_ints(ns, a, b, ">=").map(|_| Sort::Bool),
            Expr::And(terms) => expect_bools(ns, terms, "and"),
            Expr::Or(terms) => expect_bools(ns, terms, "or"),
            Expr::Not(inner) => {
                expect_bool(ns, inner, "not")?;
                Ok(Sort::Bool)
            }
            Expr::Implies(a, b) => {
                expect_bool(ns, a, "=>")?;
                expect_bool(ns, b, "=>")?;
                Ok(Sort::Bool)
            }
            Expr::Ite(c, t, e) => {
                expect_bool(ns, c, "ite")?;
                let ts = t.sort(ns)?;
                if ts != e.sort(ns)? {
                    return Err(SortError::Mismatched("ite"));
                }
                Ok(ts)
            }
        }
    }
}

fn fold_int2(a: &Expr, b: &Expr, op: fn(i64, i64) -> Option<i64>) -> Option<Folded> {
    match (a.fold()?, b.fold()?) {
        (Folded::Int(x), Folded::Int(y)) => op(x, y).map(Folded::Int),
        _ => None,
    }
}

fn fold_cmp(a: &Expr, b: &Expr, op: fn(i64, i64) -> bool) -> Option<Folded> {
    match (a.fold()?, b.fold()?) {
        (Folded::Int(x), Folded::Int(y)) => Some(Folded::Bool(op(x, y))),
        _ => None,
    }
}

fn expect_ints(ns: &Namespace, a: &Expr, b: &Expr, context: &'static str) -> Result<Sort, SortError> {
    for side in [a, b] {
        if side.sort(ns)? != Sort::Int {
            return Err(SortError::Expected {
                expected: Sort::Int,
                context,
            });
        }
    }
    Ok(Sort::Int)
}

fn expect_bool(ns: &Namespace, e: &Expr, context: &'static str) -> Result<(), SortError> {
    if e.sort(ns)? != Sort::Bool {
        return Err(SortError::Expected {
            expected: Sort::Bool,
            context,
        });
    }
    Ok(())
}

fn expect_bools(ns: &Namespace, terms: &[Expr], context: &'static str) -> Result<Sort, SortError> {
    for t in terms {
        expect_bool(ns, t, context)?;
    }
    Ok(Sort::Bool)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(name) => write!(f, "{name}"),
            Expr::IntLit(n) => write!(f, "{n}"),
            Expr::BoolLit(b) => write!(f, "{b}"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Eq(a, b) => write!(f, "{a} = {b}"),
            Expr::Lt(a, b) => write!(f, "{a} < {b}"),
            Expr::Le(a, b) => write!(f, "{a} <= {b}"),
            Expr::Gt(a, b) => write!(f, "{a} > {b}"),
            Expr::Ge(a, b) => write!(f, "{a} >= {b}"),
            Expr::And(terms) => write_joined(f, terms, " && ", "true"),
            Expr::Or(terms) => write_joined(f, terms, " || ", "false"),
            Expr::Not(inner) => write!(f, "!({inner})"),
            Expr::Implies(a, b) => write!(f, "({a} => {b})"),
            Expr::Ite(c, t, e) => write!(f, "({c} ? {t} : {e})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[Expr], sep: &str, empty: &str) -> fmt::Result {
    if terms.is_empty() {
        // Empty conjunction/disjunction renders as its neutral element.
        return write!(f, "{empty}");
    }
    write!(f, "(")?;
    for (i, t) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{t}")?;
    }
    write!(f, ")")
}
