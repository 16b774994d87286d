use std::collections::HashSet;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::{
    evm::dialect::Dialect,
    parse::ast::{Block, Expression, IdentStr, Literal},
    utils::cli::Optimization,
};

pub mod call_graph;
pub mod control_flow;
pub mod knowledge;
pub mod remover;
pub mod side_effects;
pub mod ssa_values;
pub mod store_base;
pub mod unused_assign;
pub mod unused_store;

/// Reserved value names for constants implied by opcode semantics (the
/// one-byte and one-word write widths, and the zero offset). `@` cannot
/// start an IL identifier, so these can never collide with source names.
pub const ZERO_VALUE: &str = "@0";
pub const ONE_VALUE: &str = "@1";
pub const THIRTY_TWO_VALUE: &str = "@32";

/// The bindings for the reserved names, to be injected into a value map so
/// that opcode-implied constants fold like any other known value.
pub fn pseudo_constant_values() -> [(IdentStr, Expression); 3] {
    [
        (
            ZERO_VALUE.into(),
            Expression::Literal(Literal::number(BigUint::zero())),
        ),
        (
            ONE_VALUE.into(),
            Expression::Literal(Literal::number(BigUint::one())),
        ),
        (
            THIRTY_TWO_VALUE.into(),
            Expression::Literal(Literal::number(BigUint::from(32u32))),
        ),
    ]
}

/// The reserved name standing for a literal value, for the values that
/// have one.
pub fn pseudo_constant_name(value: &BigUint) -> Option<IdentStr> {
    match value.to_u32()? {
        0 => Some(ZERO_VALUE.into()),
        1 => Some(ONE_VALUE.into()),
        32 => Some(THIRTY_TWO_VALUE.into()),
        _ => None,
    }
}

pub fn optimize(dialect: &Dialect, ast: &mut Block, optimizations: &[Optimization]) {
    let mut optimizations: HashSet<_> = optimizations.iter().cloned().collect();
    if optimizations.remove(&Optimization::All) {
        optimizations.extend([
            Optimization::UnusedAssignElimination,
            Optimization::UnusedStoreElimination,
        ]);
    }

    if optimizations.contains(&Optimization::UnusedAssignElimination) {
        unused_assign::eliminate_unused_assignments(dialect, ast);
    }
    if optimizations.contains(&Optimization::UnusedStoreElimination) {
        unused_store::eliminate_unused_stores(dialect, ast);
    }
}
