//! One-round algebraic simplification.
//!
//! A single bottom-up rewrite that performs:
//!
//! # Constant Folding
//! - Sums and products of constants: 2.5 + 3.5 → 6, -4.5 * 2 → -9
//! - Negated and inverted constants: -(3) → -3, 1/4 → 0.25
//! - Zero product: x * 0 → 0
//!
//! # Identity Rules
//! - Additive identity: x + 0 → x
//! - Multiplicative identity: x * 1 → x
//! - Double negation: -(-x) → x
//! - Double reciprocal: 1/(1/x) → x
//! - Single operand sums and products: (x) → x
//!
//! # Term Rebuilding
//! - One level of flattening: x + (y + z) → x + y + z
//! - Like terms: x + x - y → 2 * x + -y
//!
//! One round does not reach a canonical form in general. Use
//! [`simplify_to_fixpoint`] to repeat rounds until nothing changes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::PassError;
use crate::expr::{Expr, ExprKind, Variable};
use crate::kinds::{KindSet, NodeKind};
use crate::visitor::{accept, evaluate, Visitor};

/// Parameters of the simplifier pass. The pass has no options; the type exists
/// so the pass fits the dispatch protocol like every other pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifyParams;

/// Stateless simplification pass over all node kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplifier;

impl Simplifier {
    pub fn new() -> Self {
        Simplifier
    }

    /// Simplifies each operand and splices the operands of same-kind children
    /// into one list.
    fn simplified_operands(
        &self,
        kind: NodeKind,
        operands: &[Expr],
        params: &SimplifyParams,
        state: &mut (),
    ) -> Result<Vec<Expr>, PassError> {
        let mut spliced = Vec::with_capacity(operands.len());
        for operand in operands {
            let simplified = accept(self, operand, params, state)?;
            if simplified.node_kind() == kind {
                spliced.extend_from_slice(simplified.operands());
            } else {
                spliced.push(simplified);
            }
        }
        Ok(spliced)
    }
}

impl Visitor for Simplifier {
    type Params = SimplifyParams;
    type State = ();
    type Output = Expr;

    const NAME: &'static str = "Simplifier";

    fn supported_kinds(&self) -> KindSet {
        KindSet::all()
    }

    fn evaluate_root(
        &self,
        root: &Expr,
        params: Option<&SimplifyParams>,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        accept(self, root, params.unwrap_or(&SimplifyParams), state)
    }

    fn visit_constant(
        &self,
        node: &Expr,
        _value: f64,
        _params: &SimplifyParams,
        _state: &mut (),
    ) -> Result<Expr, PassError> {
        Ok(node.clone())
    }

    fn visit_variable(
        &self,
        node: &Expr,
        _variable: &Variable,
        _params: &SimplifyParams,
        _state: &mut (),
    ) -> Result<Expr, PassError> {
        Ok(node.clone())
    }

    fn visit_addition(
        &self,
        _node: &Expr,
        terms: &[Expr],
        params: &SimplifyParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        if let [term] = terms {
            return accept(self, term, params, state);
        }
        let terms = self.simplified_operands(NodeKind::Addition, terms, params, state)?;

        let mut constant = 0.0;
        let mut coefficients: BTreeMap<Expr, i64> = BTreeMap::new();
        for term in terms {
            let (sign, term) = match term.kind() {
                ExprKind::Negation(inner) => (-1, inner.clone()),
                _ => (1, term),
            };
            match term.as_constant() {
                Some(value) => constant += sign as f64 * value,
                None => *coefficients.entry(term).or_insert(0) += sign,
            }
        }

        let mut rebuilt = Vec::with_capacity(coefficients.len() + 1);
        if constant != 0.0 || coefficients.is_empty() {
            rebuilt.push(Expr::constant(constant));
        }
        for (term, coefficient) in coefficients {
            match coefficient {
                0 => {}
                1 => rebuilt.push(term),
                -1 => rebuilt.push(Expr::negation(term)),
                _ => rebuilt.push(Expr::multiplication(vec![
                    Expr::constant(coefficient as f64),
                    term,
                ])?),
            }
        }

        match rebuilt.len() {
            0 => Ok(Expr::zero()),
            1 => Ok(rebuilt.remove(0)),
            _ => Ok(Expr::addition(rebuilt)?),
        }
    }

    fn visit_multiplication(
        &self,
        _node: &Expr,
        factors: &[Expr],
        params: &SimplifyParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        if let [factor] = factors {
            return accept(self, factor, params, state);
        }
        let factors = self.simplified_operands(NodeKind::Multiplication, factors, params, state)?;

        let mut product = 1.0;
        let mut rebuilt = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor.as_constant() {
                Some(value) => {
                    product *= value;
                    if product == 0.0 {
                        return Ok(Expr::zero());
                    }
                }
                None => rebuilt.push(factor),
            }
        }
        if product != 1.0 || rebuilt.is_empty() {
            rebuilt.push(Expr::constant(product));
        }

        match rebuilt.len() {
            1 => Ok(rebuilt.remove(0)),
            _ => Ok(Expr::multiplication(rebuilt)?),
        }
    }

    fn visit_negation(
        &self,
        _node: &Expr,
        operand: &Expr,
        params: &SimplifyParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        let simplified = accept(self, operand, params, state)?;
        match simplified.kind() {
            ExprKind::Negation(inner) => Ok(inner.clone()),
            ExprKind::Constant(value) => Ok(Expr::constant(-value)),
            _ => Ok(Expr::negation(simplified)),
        }
    }

    fn visit_reciprocal(
        &self,
        _node: &Expr,
        operand: &Expr,
        params: &SimplifyParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        let simplified = accept(self, operand, params, state)?;
        match simplified.kind() {
            ExprKind::Reciprocal(inner) => Ok(inner.clone()),
            ExprKind::Constant(value) if *value == 0.0 => Err(PassError::UndefinedOperation {
                operation: "reciprocal of zero".to_string(),
            }),
            ExprKind::Constant(value) => Ok(Expr::constant(1.0 / value)),
            _ => Ok(Expr::reciprocal(simplified)),
        }
    }
}

/// Runs one simplification round over `root`.
///
/// # Errors
/// Fails with [`PassError::UndefinedOperation`] if the tree contains the
/// reciprocal of an expression that folds to zero.
pub fn simplify(root: &Expr) -> Result<Expr, PassError> {
    evaluate(&Simplifier, root, None, &mut ())
}

/// Repeats simplification rounds until a round leaves the expression unchanged.
///
/// Stops after `max_rounds` rounds and returns the latest result if no fixpoint
/// was reached by then.
pub fn simplify_to_fixpoint(root: &Expr, max_rounds: usize) -> Result<Expr, PassError> {
    let mut current = root.clone();
    for round in 1..=max_rounds {
        let next = simplify(&current)?;
        if next == current {
            debug!(round, "simplifier reached a fixpoint");
            return Ok(next);
        }
        current = next;
    }
    debug!(max_rounds, "simplifier stopped before reaching a fixpoint");
    Ok(current)
}
