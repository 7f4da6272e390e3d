//! Dispatch protocol binding passes to node kinds.
//!
//! A pass implements [`Visitor`]: it names itself, declares the node kinds it
//! supports and provides one handler per kind. [`evaluate`] is the entry point:
//! it rejects roots containing unsupported kinds, then hands over to the pass's
//! root hook, which recurses through [`accept`].
//!
//! Passes hold no per-evaluation fields. The root, the parameter object and the
//! traversal state are passed to every call, so one pass value can be evaluated
//! any number of times with different roots and parameters.

use tracing::debug;

use crate::errors::PassError;
use crate::expr::{Expr, ExprKind, Variable};
use crate::kinds::KindSet;

/// A traversal over an expression tree, dispatched per node kind.
///
/// Handlers that a pass does not override fail with
/// [`PassError::UnsupportedExpressionKind`], so a pass supporting fewer kinds
/// than the full set only implements what it declares in
/// [`supported_kinds`](Visitor::supported_kinds).
pub trait Visitor {
    /// Pass configuration, e.g. the differentiation variable
    type Params;
    /// Traversal state threaded through recursive calls
    type State: ?Sized;
    /// Value produced per node
    type Output;

    /// Name used in logs and diagnostics
    const NAME: &'static str;

    fn supported_kinds(&self) -> KindSet;

    /// Starts the traversal at `root` once the capability check has passed.
    ///
    /// Implementations validate `params` here and may short-circuit without
    /// visiting any node.
    fn evaluate_root(
        &self,
        root: &Expr,
        params: Option<&Self::Params>,
        state: &mut Self::State,
    ) -> Result<Self::Output, PassError>;

    fn visit_constant(
        &self,
        node: &Expr,
        _value: f64,
        _params: &Self::Params,
        _state: &mut Self::State,
    ) -> Result<Self::Output, PassError> {
        Err(unsupported_node(self, node))
    }

    fn visit_variable(
        &self,
        node: &Expr,
        _variable: &Variable,
        _params: &Self::Params,
        _state: &mut Self::State,
    ) -> Result<Self::Output, PassError> {
        Err(unsupported_node(self, node))
    }

    fn visit_addition(
        &self,
        node: &Expr,
        _terms: &[Expr],
        _params: &Self::Params,
        _state: &mut Self::State,
    ) -> Result<Self::Output, PassError> {
        Err(unsupported_node(self, node))
    }

    fn visit_multiplication(
        &self,
        node: &Expr,
        _factors: &[Expr],
        _params: &Self::Params,
        _state: &mut Self::State,
    ) -> Result<Self::Output, PassError> {
        Err(unsupported_node(self, node))
    }

    fn visit_negation(
        &self,
        node: &Expr,
        _operand: &Expr,
        _params: &Self::Params,
        _state: &mut Self::State,
    ) -> Result<Self::Output, PassError> {
        Err(unsupported_node(self, node))
    }

    fn visit_reciprocal(
        &self,
        node: &Expr,
        _operand: &Expr,
        _params: &Self::Params,
        _state: &mut Self::State,
    ) -> Result<Self::Output, PassError> {
        Err(unsupported_node(self, node))
    }
}

/// Runs `visitor` over `root`.
///
/// # Errors
/// Fails with [`PassError::UnsupportedExpressionKind`] if `root` uses node kinds
/// outside the visitor's supported set, and otherwise with whatever the pass
/// reports.
pub fn evaluate<V: Visitor + ?Sized>(
    visitor: &V,
    root: &Expr,
    params: Option<&V::Params>,
    state: &mut V::State,
) -> Result<V::Output, PassError> {
    let used = root.used_kinds();
    let supported = visitor.supported_kinds();
    debug!(pass = V::NAME, used = %used, "evaluating pass");

    let unsupported = used.difference(supported);
    if !unsupported.is_empty() {
        return Err(PassError::UnsupportedExpressionKind {
            pass: V::NAME,
            used,
            supported,
            unsupported,
        });
    }
    visitor.evaluate_root(root, params, state)
}

/// Routes `node` to the handler for its kind.
pub fn accept<V: Visitor + ?Sized>(
    visitor: &V,
    node: &Expr,
    params: &V::Params,
    state: &mut V::State,
) -> Result<V::Output, PassError> {
    match node.kind() {
        ExprKind::Constant(value) => visitor.visit_constant(node, *value, params, state),
        ExprKind::Variable(variable) => visitor.visit_variable(node, variable, params, state),
        ExprKind::Addition(terms) => visitor.visit_addition(node, terms, params, state),
        ExprKind::Multiplication(factors) => {
            visitor.visit_multiplication(node, factors, params, state)
        }
        ExprKind::Negation(operand) => visitor.visit_negation(node, operand, params, state),
        ExprKind::Reciprocal(operand) => visitor.visit_reciprocal(node, operand, params, state),
    }
}

/// Unwraps a required parameter object or reports it as missing.
pub fn require_params<'a, P>(
    pass: &'static str,
    parameter: &str,
    params: Option<&'a P>,
) -> Result<&'a P, PassError> {
    params.ok_or_else(|| PassError::MissingParameter {
        pass,
        parameter: parameter.to_string(),
    })
}

fn unsupported_node<V: Visitor + ?Sized>(visitor: &V, node: &Expr) -> PassError {
    PassError::UnsupportedExpressionKind {
        pass: V::NAME,
        used: node.used_kinds(),
        supported: visitor.supported_kinds(),
        unsupported: KindSet::single(node.node_kind()),
    }
}
