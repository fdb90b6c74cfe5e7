//! Proptest strategies for randomized pipeline tests.
//!
//! Generated equations are well-sorted by construction over a fixed symbol
//! pool, so they pass [`crate::equation::Equation::validate`] against
//! [`symbol_pool_namespace`].

use proptest::prelude::*;

use crate::equation::{Equation, Step, StepKind};
use crate::expr::Expr;
use crate::namespace::{Namespace, Sort};

pub const INT_POOL: [&str; 4] = ["x0", "x1", "x2", "x3"];
pub const BOOL_POOL: [&str; 2] = ["b0", "b1"];
pub const SHARED_POOL: [&str; 2] = ["g0", "g1"];
pub const PROPERTY_POOL: [&str; 3] = ["prop.a", "prop.b", "prop.c"];

/// Namespace declaring every symbol the strategies may reference.
pub fn symbol_pool_namespace() -> Namespace {
    let mut ns = Namespace::new();
    for name in INT_POOL {
        ns.declare(name, Sort::Int);
    }
    for name in BOOL_POOL {
        ns.declare(name, Sort::Bool);
    }
    for name in SHARED_POOL {
        ns.declare_shared(name, Sort::Int);
    }
    ns
}

/// Integer-sorted expressions over the int pool.
pub fn arb_int_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-8i64..8).prop_map(Expr::int),
        proptest::sample::select(INT_POOL.to_vec()).prop_map(Expr::symbol),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.add(b)),
            (inner.clone(), inner).prop_map(|(a, b)| a.sub(b)),
        ]
    })
}

/// Boolean-sorted expressions over both pools.
pub fn arb_bool_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Expr::bool),
        proptest::sample::select(BOOL_POOL.to_vec()).prop_map(Expr::symbol),
        (arb_int_expr(), arb_int_expr()).prop_map(|(a, b)| a.lt(b)),
        (arb_int_expr(), arb_int_expr()).prop_map(|(a, b)| a.eq(b)),
    ];
    leaf.prop_recursive(2, 16, 2, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 1..3).prop_map(Expr::and),
            proptest::collection::vec(inner.clone(), 1..3).prop_map(Expr::or),
            inner.prop_map(Expr::not),
        ]
    })
}

pub fn arb_step() -> impl Strategy<Value = Step> {
    let kind = prop_oneof![
        (
            proptest::sample::select(INT_POOL.to_vec()),
            arb_int_expr()
        )
            .prop_map(|(lhs, rhs)| StepKind::Assignment {
                lhs: lhs.to_string(),
                rhs,
            }),
        arb_bool_expr().prop_map(|cond| StepKind::Assume { cond }),
        (
            proptest::sample::select(PROPERTY_POOL.to_vec()),
            arb_bool_expr()
        )
            .prop_map(|(id, cond)| StepKind::Assert {
                property_id: id.to_string(),
                cond,
                description: String::new(),
            }),
        proptest::sample::select(SHARED_POOL.to_vec()).prop_map(|s| StepKind::SharedRead {
            symbol: s.to_string(),
        }),
        proptest::sample::select(SHARED_POOL.to_vec()).prop_map(|s| StepKind::SharedWrite {
            symbol: s.to_string(),
        }),
        Just(StepKind::Location),
    ];
    (kind, arb_bool_expr(), 0usize..3).prop_map(|(kind, guard, thread)| {
        Step::new(kind, guard).with_thread(thread)
    })
}

pub fn arb_equation(max_steps: usize) -> impl Strategy<Value = Equation> {
    proptest::collection::vec(arb_step(), 0..max_steps).prop_map(Equation::from_steps)
}
