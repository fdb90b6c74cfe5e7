//! SMT-LIB2 rendering of terms and sorts.

use crate::terms::{SmtSort, SmtTerm};

pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    match sort {
        SmtSort::Bool => "Bool",
        SmtSort::Int => "Int",
    }
}

/// Render a term as an SMT-LIB2 s-expression.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => name.clone(),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                // SMT-LIB has no negative literals.
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::BoolLit(b) => b.to_string(),
        SmtTerm::Add(a, b) => binary("+", a, b),
        SmtTerm::Sub(a, b) => binary("-", a, b),
        SmtTerm::Mul(a, b) => binary("*", a, b),
        SmtTerm::Eq(a, b) => binary("=", a, b),
        SmtTerm::Lt(a, b) => binary("<", a, b),
        SmtTerm::Le(a, b) => binary("<=", a, b),
        SmtTerm::Gt(a, b) => binary(">", a, b),
        SmtTerm::Ge(a, b) => binary(">=", a, b),
        SmtTerm::And(terms) => nary("and", terms, "true"),
        SmtTerm::Or(terms) => nary("or", terms, "false"),
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(a, b) => binary("=>", a, b),
        SmtTerm::Ite(c, t, e) => {
            format!("(ite {} {} {})", to_smtlib(c), to_smtlib(t), to_smtlib(e))
        }
    }
}

fn binary(op: &str, a: &SmtTerm, b: &SmtTerm) -> String {
    format!("({op} {} {})", to_smtlib(a), to_smtlib(b))
}

fn nary(op: &str, terms: &[SmtTerm], empty: &str) -> String {
    match terms {
        [] => empty.to_string(),
        [single] => to_smtlib(single),
        _ => {
            let mut out = String::from("(");
            out.push_str(op);
            for t in terms {
                out.push(' ');
                out.push_str(&to_smtlib(t));
            }
            out.push(')');
            out
        }
    }
}
