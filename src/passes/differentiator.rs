//! Symbolic partial differentiation.
//!
//! Recursively applies the rules of differentiation, building a new tree:
//! - d/dx(c) = 0 for constants
//! - d/dx(x) = 1 for the variable we're differentiating with respect to
//! - d/dx(y) = 0 for other variables
//! - Sum rule: d/dx(f + g + ...) = df/dx + dg/dx + ...
//! - Product rule: d/dx(f * g * ...) = df/dx * g * ... + f * dg/dx * ... + ...
//! - Negation: d/dx(-f) = -(df/dx)
//! - Reciprocal rule: d/dx(1/f) = -(1/(f * f)) * df/dx
//!
//! Terms whose derivative is the pooled zero are dropped and a derivative equal
//! to the pooled one is not multiplied in, so results stay small without a
//! separate simplification round.

use crate::errors::PassError;
use crate::expr::{Expr, Variable};
use crate::kinds::KindSet;
use crate::visitor::{accept, evaluate, require_params, Visitor};

/// Parameters of the differentiator pass.
#[derive(Debug, Clone)]
pub struct DiffParams {
    /// The variable to differentiate with respect to
    pub dx: Variable,
}

impl DiffParams {
    pub fn new(dx: &Variable) -> Self {
        DiffParams { dx: dx.clone() }
    }
}

/// Stateless partial differentiation pass over all node kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Differentiator;

impl Differentiator {
    pub fn new() -> Self {
        Differentiator
    }
}

impl Visitor for Differentiator {
    type Params = DiffParams;
    type State = ();
    type Output = Expr;

    const NAME: &'static str = "Differentiator";

    fn supported_kinds(&self) -> KindSet {
        KindSet::all()
    }

    fn evaluate_root(
        &self,
        root: &Expr,
        params: Option<&DiffParams>,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        let params = require_params(Self::NAME, "differentiation variable (dx)", params)?;

        // Nothing in the tree depends on dx
        if !root.depends_on(&params.dx) {
            return Ok(Expr::zero());
        }
        accept(self, root, params, state)
    }

    fn visit_constant(
        &self,
        _node: &Expr,
        _value: f64,
        _params: &DiffParams,
        _state: &mut (),
    ) -> Result<Expr, PassError> {
        Ok(Expr::zero())
    }

    fn visit_variable(
        &self,
        _node: &Expr,
        variable: &Variable,
        params: &DiffParams,
        _state: &mut (),
    ) -> Result<Expr, PassError> {
        if *variable == params.dx {
            Ok(Expr::one())
        } else {
            Ok(Expr::zero())
        }
    }

    fn visit_addition(
        &self,
        _node: &Expr,
        terms: &[Expr],
        params: &DiffParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        // d/dx(f + g) = df/dx + dg/dx
        let mut derivatives = Vec::with_capacity(terms.len());
        for term in terms {
            let derivative = accept(self, term, params, state)?;
            if !derivative.is_zero() {
                derivatives.push(derivative);
            }
        }
        sum_of(derivatives)
    }

    fn visit_multiplication(
        &self,
        _node: &Expr,
        factors: &[Expr],
        params: &DiffParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        // d/dx(f * g) = df/dx * g + f * dg/dx
        let n = factors.len();
        let mut summands = Vec::with_capacity(n);
        for (i, factor) in factors.iter().enumerate() {
            let derivative = accept(self, factor, params, state)?;
            if derivative.is_zero() {
                continue;
            }

            let mut product = Vec::with_capacity(n);
            product.extend_from_slice(&factors[..i]);
            // A factor of one is redundant unless it would leave the product empty
            if !derivative.is_one() || n == 1 {
                product.push(derivative);
            }
            product.extend_from_slice(&factors[i + 1..]);

            let summand = match product.len() {
                1 => product.remove(0),
                _ => Expr::multiplication(product)?,
            };
            summands.push(summand);
        }
        sum_of(summands)
    }

    fn visit_negation(
        &self,
        _node: &Expr,
        operand: &Expr,
        params: &DiffParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        // d/dx(-f) = -(df/dx)
        let derivative = accept(self, operand, params, state)?;
        if derivative.is_zero() {
            return Ok(Expr::zero());
        }
        Ok(Expr::negation(derivative))
    }

    fn visit_reciprocal(
        &self,
        _node: &Expr,
        operand: &Expr,
        params: &DiffParams,
        state: &mut (),
    ) -> Result<Expr, PassError> {
        // d/dx(1/f) = -(1/(f * f)) * df/dx
        let derivative = accept(self, operand, params, state)?;
        if derivative.is_zero() {
            return Ok(Expr::zero());
        }
        let inverse_square =
            Expr::reciprocal(Expr::multiplication(vec![operand.clone(), operand.clone()])?);
        if derivative.is_one() {
            return Ok(Expr::negation(inverse_square));
        }
        Ok(Expr::negation(Expr::multiplication(vec![
            inverse_square,
            derivative,
        ])?))
    }
}

/// Returns the partial derivative of `root` with respect to `dx`.
///
/// The result is not simplified; run [`simplify`](crate::simplify) over it to
/// fold constants and collect like terms.
pub fn differentiate(root: &Expr, dx: &Variable) -> Result<Expr, PassError> {
    evaluate(&Differentiator, root, Some(&DiffParams::new(dx)), &mut ())
}

fn sum_of(mut terms: Vec<Expr>) -> Result<Expr, PassError> {
    match terms.len() {
        0 => Ok(Expr::zero()),
        1 => Ok(terms.remove(0)),
        _ => Ok(Expr::addition(terms)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(value: f64) -> Expr {
        Expr::constant(value)
    }

    fn add(terms: Vec<Expr>) -> Expr {
        Expr::addition(terms).unwrap()
    }

    fn mul(factors: Vec<Expr>) -> Expr {
        Expr::multiplication(factors).unwrap()
    }

    fn d(e: &Expr, dx: &Variable) -> Expr {
        evaluate(&Differentiator, e, Some(&DiffParams::new(dx)), &mut ()).unwrap()
    }

    #[test]
    fn test_leaves() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        assert!(d(&c(5.0), &x).is_zero());
        assert!(d(&Expr::from(&x), &x).is_one());
        assert!(d(&Expr::from(&y), &x).is_zero());
    }

    #[test]
    fn test_missing_parameter() {
        let x = Variable::new("x");
        let err = evaluate(&Differentiator, &Expr::from(&x), None, &mut ()).unwrap_err();
        assert!(matches!(
            err,
            PassError::MissingParameter {
                pass: "Differentiator",
                ..
            }
        ));
    }

    #[test]
    fn test_independent_root_short_circuits() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let e = Expr::reciprocal(add(vec![Expr::from(&y), c(3.0)]));
        assert!(d(&e, &x).is_zero());
    }

    #[test]
    fn test_sum_rule_drops_zero_terms() {
        let x = Variable::new("x");
        let y = Variable::new("y");

        // d/dx(x + 2) = 1
        let e = add(vec![Expr::from(&x), c(2.0)]);
        assert!(d(&e, &x).is_one());

        // d/dx(x + y + x) = 1 + 1
        let e = add(vec![Expr::from(&x), Expr::from(&y), Expr::from(&x)]);
        assert_eq!(d(&e, &x), add(vec![c(1.0), c(1.0)]));
    }

    #[test]
    fn test_product_rule() {
        let x = Variable::new("x");
        let y = Variable::new("y");

        // d/dx(4 * x) = 4
        let e = mul(vec![c(4.0), Expr::from(&x)]);
        assert_eq!(d(&e, &x), c(4.0));

        // d/dx(x * y) = y
        let e = mul(vec![Expr::from(&x), Expr::from(&y)]);
        assert_eq!(d(&e, &x), Expr::from(&y));

        // d/dx(x * x) = x + x
        let e = mul(vec![Expr::from(&x), Expr::from(&x)]);
        assert_eq!(d(&e, &x), add(vec![Expr::from(&x), Expr::from(&x)]));

        // d/dx(x * y * (-x)) = y * -x + x * y * -1
        let e = mul(vec![
            Expr::from(&x),
            Expr::from(&y),
            Expr::negation(Expr::from(&x)),
        ]);
        assert_eq!(
            d(&e, &x),
            add(vec![
                mul(vec![Expr::from(&y), Expr::negation(Expr::from(&x))]),
                mul(vec![
                    Expr::from(&x),
                    Expr::from(&y),
                    Expr::negation(c(1.0)),
                ]),
            ])
        );
    }

    #[test]
    fn test_single_factor_product_keeps_one() {
        let x = Variable::new("x");
        let e = mul(vec![Expr::from(&x)]);
        assert!(d(&e, &x).is_one());

        let e = mul(vec![Expr::negation(Expr::from(&x))]);
        assert_eq!(d(&e, &x), Expr::negation(c(1.0)));
    }

    #[test]
    fn test_negation() {
        let x = Variable::new("x");
        let e = Expr::negation(Expr::from(&x));
        assert_eq!(d(&e, &x), Expr::negation(c(1.0)));
    }

    #[test]
    fn test_reciprocal_rule() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let xe = Expr::from(&x);

        // d/dx(1/x) = -(1/(x * x))
        let e = Expr::reciprocal(xe.clone());
        assert_eq!(
            d(&e, &x),
            Expr::negation(Expr::reciprocal(mul(vec![xe.clone(), xe.clone()])))
        );

        // d/dx(1/(x * y)) = -((1/((x*y) * (x*y))) * y)
        let xy = mul(vec![xe.clone(), Expr::from(&y)]);
        let e = Expr::reciprocal(xy.clone());
        assert_eq!(
            d(&e, &x),
            Expr::negation(mul(vec![
                Expr::reciprocal(mul(vec![xy.clone(), xy])),
                Expr::from(&y),
            ]))
        );

        // constant with respect to x
        let e = add(vec![xe, Expr::reciprocal(Expr::from(&y))]);
        assert!(d(&e, &x).is_one());
    }

    #[test]
    fn test_pass_is_reusable_across_parameters() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let e = mul(vec![Expr::from(&x), Expr::from(&y)]);
        let pass = Differentiator::new();

        let dx = evaluate(&pass, &e, Some(&DiffParams::new(&x)), &mut ()).unwrap();
        let dy = evaluate(&pass, &e, Some(&DiffParams::new(&y)), &mut ()).unwrap();
        assert_eq!(dx, Expr::from(&y));
        assert_eq!(dy, Expr::from(&x));
    }
}
