//! Constant reasoning over symbolic values. Each symbol is resolved to a
//! base variable plus a constant offset by chasing definitions through the
//! value map and folding `add`/`sub` chains; two symbols with the same base
//! have a known difference.

use std::cell::RefCell;
use std::collections::HashMap;

use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::{
    evm::{dialect::Dialect, instruction::Instruction},
    parse::ast::{Expression, IdentStr},
};

lazy_static! {
    pub static ref WORD_MODULUS: BigUint = BigUint::one() << 256u32;
    static ref THIRTY_TWO: BigUint = BigUint::from(32u32);
}

fn wrapped_add(a: &BigUint, b: &BigUint) -> BigUint {
    (a + b) % &*WORD_MODULUS
}

fn wrapped_sub(a: &BigUint, b: &BigUint) -> BigUint {
    (a + &*WORD_MODULUS - b) % &*WORD_MODULUS
}

/// A symbol resolved to an optional base variable plus a constant offset
/// modulo 2^256. A resolution without a base is a known constant.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VariableOffset {
    base: Option<IdentStr>,
    offset: BigUint,
}

pub struct KnowledgeBase<'a> {
    dialect: &'a Dialect,
    values: &'a HashMap<IdentStr, Expression>,
    /// Resolution cache. Populated with a placeholder before descending so
    /// that malformed, cyclic value maps resolve to unknown instead of
    /// recursing forever.
    offsets: RefCell<HashMap<IdentStr, Option<VariableOffset>>>,
}

impl<'a> KnowledgeBase<'a> {
    pub fn new(dialect: &'a Dialect, values: &'a HashMap<IdentStr, Expression>) -> Self {
        KnowledgeBase {
            dialect,
            values,
            offsets: RefCell::new(HashMap::new()),
        }
    }

    pub fn value_if_known_constant(&self, name: &IdentStr) -> Option<BigUint> {
        let resolved = self.resolve(name)?;
        resolved.base.is_none().then_some(resolved.offset)
    }

    pub fn known_to_be_zero(&self, name: &IdentStr) -> bool {
        self.value_if_known_constant(name)
            .is_some_and(|value| value.is_zero())
    }

    pub fn known_to_be_equal(&self, a: &IdentStr, b: &IdentStr) -> bool {
        a == b
            || self
                .difference_if_known_constant(a, b)
                .is_some_and(|difference| difference.is_zero())
    }

    pub fn known_to_be_different(&self, a: &IdentStr, b: &IdentStr) -> bool {
        self.difference_if_known_constant(a, b)
            .is_some_and(|difference| !difference.is_zero())
    }

    pub fn known_to_be_different_by_at_least_32(&self, a: &IdentStr, b: &IdentStr) -> bool {
        match self.difference_if_known_constant(a, b) {
            Some(difference) => {
                difference >= *THIRTY_TWO && difference <= &*WORD_MODULUS - &*THIRTY_TWO
            }
            None => false,
        }
    }

    fn difference_if_known_constant(&self, a: &IdentStr, b: &IdentStr) -> Option<BigUint> {
        let a = self.resolve(a)?;
        let b = self.resolve(b)?;
        (a.base == b.base).then(|| wrapped_sub(&a.offset, &b.offset))
    }

    fn resolve(&self, name: &IdentStr) -> Option<VariableOffset> {
        if let Some(cached) = self.offsets.borrow().get(name) {
            return cached.clone();
        }
        self.offsets.borrow_mut().insert(name.clone(), None);
        let resolved = match self.values.get(name) {
            // A variable whose definition cannot be folded is its own base.
            Some(expression) => self.resolve_expression(expression).or_else(|| {
                Some(VariableOffset {
                    base: Some(name.clone()),
                    offset: BigUint::zero(),
                })
            }),
            None => Some(VariableOffset {
                base: Some(name.clone()),
                offset: BigUint::zero(),
            }),
        };
        self.offsets
            .borrow_mut()
            .insert(name.clone(), resolved.clone());
        resolved
    }

    fn resolve_expression(&self, expression: &Expression) -> Option<VariableOffset> {
        match expression {
            Expression::Literal(literal) => Some(VariableOffset {
                base: None,
                offset: literal.value.clone(),
            }),
            Expression::Identifier(identifier) => self.resolve(&identifier.name),
            Expression::Call(call) => {
                let instruction = self.dialect.instruction(&call.function.name)?;
                let [a, b] = call.arguments.as_slice() else {
                    return None;
                };
                let a = self.resolve_expression(a)?;
                let b = self.resolve_expression(b)?;
                match instruction {
                    Instruction::Add => match (&a.base, &b.base) {
                        (None, _) => Some(VariableOffset {
                            base: b.base.clone(),
                            offset: wrapped_add(&a.offset, &b.offset),
                        }),
                        (_, None) => Some(VariableOffset {
                            base: a.base.clone(),
                            offset: wrapped_add(&a.offset, &b.offset),
                        }),
                        _ => None,
                    },
                    Instruction::Sub => {
                        if a.base == b.base {
                            Some(VariableOffset {
                                base: None,
                                offset: wrapped_sub(&a.offset, &b.offset),
                            })
                        } else if b.base.is_none() {
                            Some(VariableOffset {
                                base: a.base.clone(),
                                offset: wrapped_sub(&a.offset, &b.offset),
                            })
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::opt::ssa_values::ssa_values;

    use super::*;

    fn with_knowledge(source: &str, check: impl FnOnce(&KnowledgeBase)) {
        let dialect = Dialect::evm();
        let ast = crate::parse_source("<test>", source, &dialect).expect("parse error");
        let values = ssa_values(&ast);
        let knowledge = KnowledgeBase::new(&dialect, &values);
        check(&knowledge);
    }

    fn name(s: &str) -> IdentStr {
        s.into()
    }

    #[test]
    fn constants_fold_through_add_and_sub() {
        let source = "{ let a := 10 let b := add(a, 32) let c := sub(b, 32) }";
        with_knowledge(source, |knowledge| {
            assert_eq!(
                knowledge.value_if_known_constant(&name("b")),
                Some(BigUint::from(42u32))
            );
            assert!(knowledge.known_to_be_equal(&name("a"), &name("c")));
            assert!(knowledge.known_to_be_different(&name("a"), &name("b")));
            assert!(knowledge.known_to_be_different_by_at_least_32(&name("a"), &name("b")));
        });
    }

    #[test]
    fn symbolic_bases_with_constant_offsets() {
        let source = "{ let p := calldataload(0) let q := add(p, 32) let r := add(q, 31) }";
        with_knowledge(source, |knowledge| {
            assert_eq!(knowledge.value_if_known_constant(&name("p")), None);
            assert!(knowledge.known_to_be_different(&name("p"), &name("q")));
            assert!(knowledge.known_to_be_different_by_at_least_32(&name("p"), &name("q")));
            // 63 bytes apart in total, but only 31 from q.
            assert!(!knowledge.known_to_be_different_by_at_least_32(&name("q"), &name("r")));
            assert!(knowledge.known_to_be_different(&name("q"), &name("r")));
        });
    }

    #[test]
    fn unrelated_bases_are_unknown() {
        let source = "{ let p := calldataload(0) let q := calldataload(32) }";
        with_knowledge(source, |knowledge| {
            assert!(!knowledge.known_to_be_different(&name("p"), &name("q")));
            assert!(!knowledge.known_to_be_equal(&name("p"), &name("q")));
            assert!(!knowledge.known_to_be_zero(&name("p")));
        });
    }

    #[test]
    fn difference_wraps_around_the_word() {
        let source = "{ let p := calldataload(0) let q := sub(p, 16) }";
        with_knowledge(source, |knowledge| {
            // q = p - 16, so p and q differ by 16 < 32 in wrapped distance.
            assert!(knowledge.known_to_be_different(&name("p"), &name("q")));
            assert!(!knowledge.known_to_be_different_by_at_least_32(&name("p"), &name("q")));
        });
    }

    #[test]
    fn same_symbol_is_equal() {
        with_knowledge("{ let p := calldataload(0) }", |knowledge| {
            assert!(knowledge.known_to_be_equal(&name("p"), &name("p")));
            assert!(!knowledge.known_to_be_different(&name("p"), &name("p")));
        });
    }
}
