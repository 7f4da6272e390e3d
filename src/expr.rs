//! Expression module for representing real-valued symbolic formulas.
//!
//! This module defines the core expression types. The main types are:
//!
//! - `Expr`: A cheap-to-clone handle to an immutable expression node
//! - `ExprKind`: The closed set of node variants an expression can be
//! - `Variable`: An identity-compared symbolic variable
//!
//! # Expression Tree Structure
//! The expression tree is built bottom-up from already constructed operands:
//! - Leaf nodes: Constants and Variables
//! - n-ary operations: Addition, Multiplication (one or more operands)
//! - Unary operations: Negation, Reciprocal
//!
//! Nodes are never mutated after construction. Each node caches the set of
//! variables it depends on, the set of node kinds used in its subtree and a
//! structural hash, all computed once when the node is built.
//!
//! # Canonical Form
//! Constants are hash-consed through the [`ConstantPool`](crate::pool::ConstantPool),
//! so equal values share one instance. The operands of Addition and
//! Multiplication are sorted into a canonical order at construction, which makes
//! `x + y` and `y + x` the same expression.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::errors::{ExprError, PassError};
use crate::kinds::{KindSet, NodeKind};
use crate::pool::ConstantPool;
use crate::types::VariableSet;

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// A symbolic real variable.
///
/// Variables compare, order and hash by identity: every call to
/// [`Variable::new`] or [`Variable::anonymous`] yields a variable distinct from
/// all others, even when the display names are equal. Clones share the identity.
#[derive(Clone)]
pub struct Variable {
    id: u64,
    name: Option<Arc<str>>,
}

impl Variable {
    /// Creates a fresh variable with a display name.
    pub fn new(name: &str) -> Self {
        Variable {
            id: NEXT_VARIABLE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: Some(Arc::from(name)),
        }
    }

    /// Creates a fresh variable without a display name.
    pub fn anonymous() -> Self {
        Variable {
            id: NEXT_VARIABLE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The display name, or `v<id>` for anonymous variables.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => format!("v{}", self.id),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "ReVar{{'{name}'@{:08x}}}", self.id),
            None => write!(f, "ReVar{{@{:08x}}}", self.id),
        }
    }
}

/// The variants an expression node can take.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A pooled constant floating point value
    Constant(f64),
    /// A reference to a variable
    Variable(Variable),
    /// Sum of one or more operands, in canonical order
    Addition(Box<[Expr]>),
    /// Product of one or more operands, in canonical order
    Multiplication(Box<[Expr]>),
    /// Negation of an expression
    Negation(Expr),
    /// Multiplicative inverse of an expression
    Reciprocal(Expr),
}

impl ExprKind {
    pub fn node_kind(&self) -> NodeKind {
        match self {
            ExprKind::Constant(_) => NodeKind::Constant,
            ExprKind::Variable(_) => NodeKind::Variable,
            ExprKind::Addition(_) => NodeKind::Addition,
            ExprKind::Multiplication(_) => NodeKind::Multiplication,
            ExprKind::Negation(_) => NodeKind::Negation,
            ExprKind::Reciprocal(_) => NodeKind::Reciprocal,
        }
    }
}

struct Node {
    kind: ExprKind,
    variables: VariableSet,
    used_kinds: KindSet,
    hash: u64,
}

/// An immutable expression tree node.
///
/// Cloning an `Expr` is cheap and shares the underlying node. Equality is
/// structural (with a cached-hash fast reject), except for variables which
/// compare by identity.
#[derive(Clone)]
pub struct Expr(Arc<Node>);

impl Expr {
    /// Builds a node and computes its cached variable set, used kinds and hash.
    pub(crate) fn new_node(kind: ExprKind) -> Expr {
        let node_kind = kind.node_kind();
        let (variables, used_kinds) = match &kind {
            ExprKind::Constant(_) => (VariableSet::new(), KindSet::single(node_kind)),
            ExprKind::Variable(var) => (
                VariableSet::from([var.clone()]),
                KindSet::single(node_kind),
            ),
            ExprKind::Addition(operands) | ExprKind::Multiplication(operands) => {
                operands.iter().fold(
                    (VariableSet::new(), KindSet::single(node_kind)),
                    |(mut variables, used), operand| {
                        variables.extend(operand.variables().iter().cloned());
                        (variables, used.union(operand.used_kinds()))
                    },
                )
            }
            ExprKind::Negation(operand) | ExprKind::Reciprocal(operand) => (
                operand.variables().clone(),
                KindSet::single(node_kind).union(operand.used_kinds()),
            ),
        };
        let hash = structural_hash_of(&kind);
        Expr(Arc::new(Node {
            kind,
            variables,
            used_kinds,
            hash,
        }))
    }

    /// Returns the canonical pooled constant for `value`.
    pub fn constant(value: f64) -> Expr {
        ConstantPool::global().intern(value)
    }

    /// The pooled constant `0.0`.
    pub fn zero() -> Expr {
        ConstantPool::global().zero().clone()
    }

    /// The pooled constant `1.0`.
    pub fn one() -> Expr {
        ConstantPool::global().one().clone()
    }

    /// Wraps a variable as an expression node.
    pub fn variable(variable: &Variable) -> Expr {
        Expr::new_node(ExprKind::Variable(variable.clone()))
    }

    /// Builds a sum of one or more terms.
    ///
    /// # Errors
    /// Returns `ExprError::InvalidArgument` if `terms` is empty.
    pub fn addition(terms: Vec<Expr>) -> Result<Expr, ExprError> {
        let terms = canonical_operands(NodeKind::Addition, terms)?;
        Ok(Expr::new_node(ExprKind::Addition(terms)))
    }

    /// Builds a product of one or more factors.
    ///
    /// # Errors
    /// Returns `ExprError::InvalidArgument` if `factors` is empty.
    pub fn multiplication(factors: Vec<Expr>) -> Result<Expr, ExprError> {
        let factors = canonical_operands(NodeKind::Multiplication, factors)?;
        Ok(Expr::new_node(ExprKind::Multiplication(factors)))
    }

    pub fn negation(operand: Expr) -> Expr {
        Expr::new_node(ExprKind::Negation(operand))
    }

    pub fn reciprocal(operand: Expr) -> Expr {
        Expr::new_node(ExprKind::Reciprocal(operand))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn node_kind(&self) -> NodeKind {
        self.0.kind.node_kind()
    }

    /// The variables this expression depends on.
    pub fn variables(&self) -> &VariableSet {
        &self.0.variables
    }

    /// The node kinds occurring anywhere in this subtree.
    pub fn used_kinds(&self) -> KindSet {
        self.0.used_kinds
    }

    pub fn structural_hash(&self) -> u64 {
        self.0.hash
    }

    pub fn depends_on(&self, variable: &Variable) -> bool {
        self.0.variables.contains(variable)
    }

    /// Returns `true` if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity test against the pooled zero constant.
    pub fn is_zero(&self) -> bool {
        self.ptr_eq(ConstantPool::global().zero())
    }

    /// Identity test against the pooled one constant.
    pub fn is_one(&self) -> bool {
        self.ptr_eq(ConstantPool::global().one())
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self.kind() {
            ExprKind::Constant(value) => Some(*value),
            _ => None,
        }
    }

    /// The direct operands of this node; empty for leaves.
    pub fn operands(&self) -> &[Expr] {
        match self.kind() {
            ExprKind::Constant(_) | ExprKind::Variable(_) => &[],
            ExprKind::Addition(operands) | ExprKind::Multiplication(operands) => &operands[..],
            ExprKind::Negation(operand) | ExprKind::Reciprocal(operand) => {
                std::slice::from_ref(operand)
            }
        }
    }

    /// Computes the partial derivative with respect to `dx`.
    ///
    /// See [`differentiate`](crate::differentiate).
    pub fn derivative(&self, dx: &Variable) -> Result<Expr, PassError> {
        crate::differentiate(self, dx)
    }

    /// Runs one simplification round.
    ///
    /// See [`simplify`](crate::simplify).
    pub fn simplify(&self) -> Result<Expr, PassError> {
        crate::simplify(self)
    }
}

fn canonical_operands(kind: NodeKind, mut operands: Vec<Expr>) -> Result<Box<[Expr]>, ExprError> {
    if operands.is_empty() {
        return Err(ExprError::InvalidArgument {
            kind,
            reason: "operand list may not be empty".to_string(),
        });
    }
    operands.sort();
    Ok(operands.into_boxed_slice())
}

fn structural_hash_of(kind: &ExprKind) -> u64 {
    let mut hasher = DefaultHasher::new();
    kind.node_kind().hash(&mut hasher);
    match kind {
        ExprKind::Constant(value) => OrderedFloat(*value).hash(&mut hasher),
        ExprKind::Variable(var) => var.hash(&mut hasher),
        ExprKind::Addition(operands) | ExprKind::Multiplication(operands) => {
            operands.len().hash(&mut hasher);
            for operand in operands.iter() {
                hasher.write_u64(operand.structural_hash());
            }
        }
        ExprKind::Negation(operand) | ExprKind::Reciprocal(operand) => {
            hasher.write_u64(operand.structural_hash())
        }
    }
    hasher.finish()
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        // Fast reject on the cached hash
        if self.0.hash != other.0.hash {
            return false;
        }
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical total order: by node kind, then by content.
impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        self.node_kind()
            .cmp(&other.node_kind())
            .then_with(|| match (self.kind(), other.kind()) {
                (ExprKind::Constant(a), ExprKind::Constant(b)) => {
                    OrderedFloat(*a).cmp(&OrderedFloat(*b))
                }
                (ExprKind::Variable(a), ExprKind::Variable(b)) => a.cmp(b),
                (ExprKind::Addition(a), ExprKind::Addition(b))
                | (ExprKind::Multiplication(a), ExprKind::Multiplication(b)) => a.iter().cmp(b.iter()),
                (ExprKind::Negation(a), ExprKind::Negation(b))
                | (ExprKind::Reciprocal(a), ExprKind::Reciprocal(b)) => a.cmp(b),
                // node kinds already differ
                _ => Ordering::Equal,
            })
    }
}

impl From<&Variable> for Expr {
    fn from(variable: &Variable) -> Self {
        Expr::variable(variable)
    }
}

impl From<Variable> for Expr {
    fn from(variable: Variable) -> Self {
        Expr::new_node(ExprKind::Variable(variable))
    }
}

/// Debug output mirrors the node structure, e.g. `Addition{ReCons{1.000000},ReVar{'x'@00000001}}`.
impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Constant(value) => write!(f, "ReCons{{{value:.6}}}"),
            ExprKind::Variable(var) => write!(f, "{var:?}"),
            ExprKind::Addition(operands) | ExprKind::Multiplication(operands) => write!(
                f,
                "{}{{{}}}",
                self.node_kind(),
                operands.iter().map(|operand| format!("{operand:?}")).join(",")
            ),
            ExprKind::Negation(operand) | ExprKind::Reciprocal(operand) => {
                write!(f, "{}{{{operand:?}}}", self.node_kind())
            }
        }
    }
}

/// Infix rendering using each variable's own display name.
///
/// Uses the same notation as the printer pass, which should be preferred when
/// output names are controlled by the caller.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Constant(value) => write!(f, "{value:?}"),
            ExprKind::Variable(var) => f.write_str(&var.display_name()),
            ExprKind::Addition(terms) => write!(f, "({})", terms.iter().join(" + ")),
            ExprKind::Multiplication(factors) => write!(f, "({})", factors.iter().join(" * ")),
            ExprKind::Negation(operand) => write!(f, "-{operand}"),
            ExprKind::Reciprocal(operand) => write!(f, "(1/{operand})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(value: f64) -> Expr {
        Expr::constant(value)
    }

    #[test]
    fn test_constants_are_hash_consed() {
        assert!(c(1.0).ptr_eq(&c(1.0)));
        assert!(c(1e6 + 3.0).ptr_eq(&c(1e6 + 3.0)));
        assert!(c(0.0).is_zero());
        assert!(c(-0.0).is_zero());
        assert!(c(1.0).is_one());
        assert!(!c(2.0).is_one());
        assert!(c(f64::NAN).ptr_eq(&c(f64::NAN)));
        assert_eq!(c(2.5), c(2.5));
        assert_ne!(c(2.5), c(3.5));
        assert!(c(4.0).variables().is_empty());
    }

    #[test]
    fn test_variables_compare_by_identity() {
        let a = Variable::new("vari");
        let b = Variable::new("vari");
        let anon_a = Variable::anonymous();
        let anon_b = Variable::anonymous();

        assert_ne!(a, b);
        assert_ne!(anon_a, anon_b);
        assert_eq!(a, a.clone());
        assert_ne!(Expr::from(&a), Expr::from(&b));
        assert_eq!(Expr::from(&a), Expr::from(&a));
        assert_ne!(format!("{a:?}"), format!("{b:?}"));

        let x = Expr::from(&a);
        assert_eq!(x.variables().len(), 1);
        assert!(x.depends_on(&a));
        assert!(!x.depends_on(&b));
    }

    #[test]
    fn test_variable_set_is_union_of_children() {
        let x = Variable::new("x");
        let e = Expr::addition(vec![
            Expr::from(&x),
            Expr::multiplication(vec![c(4.0), Expr::from(&x)]).unwrap(),
        ])
        .unwrap();
        assert_eq!(e.variables(), &VariableSet::from([x.clone()]));

        let y = Variable::new("y");
        let f = Expr::negation(Expr::reciprocal(Expr::addition(vec![e, Expr::from(&y)]).unwrap()));
        assert_eq!(f.variables(), &VariableSet::from([x, y]));
    }

    #[test]
    fn test_used_kinds() {
        let x = Variable::new("x");
        let e = Expr::addition(vec![Expr::negation(Expr::from(&x)), c(2.0)]).unwrap();
        assert_eq!(
            e.used_kinds(),
            KindSet::from_kinds(&[
                NodeKind::Addition,
                NodeKind::Negation,
                NodeKind::Variable,
                NodeKind::Constant,
            ])
        );
        assert_eq!(c(1.0).used_kinds(), KindSet::single(NodeKind::Constant));
    }

    #[test]
    fn test_empty_operand_list_is_rejected() {
        assert!(matches!(
            Expr::addition(vec![]),
            Err(ExprError::InvalidArgument {
                kind: NodeKind::Addition,
                ..
            })
        ));
        assert!(matches!(
            Expr::multiplication(Vec::new()),
            Err(ExprError::InvalidArgument {
                kind: NodeKind::Multiplication,
                ..
            })
        ));
    }

    #[test]
    fn test_operands_are_canonically_ordered() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let xy = Expr::addition(vec![Expr::from(&x), Expr::from(&y)]).unwrap();
        let yx = Expr::addition(vec![Expr::from(&y), Expr::from(&x)]).unwrap();
        assert_eq!(xy, yx);
        assert_eq!(xy.structural_hash(), yx.structural_hash());

        let e = Expr::addition(vec![Expr::from(&x), c(1.0)]).unwrap();
        assert_eq!(e.operands()[0], c(1.0));

        // Addition and multiplication of the same operands differ
        let prod = Expr::multiplication(vec![Expr::from(&x), Expr::from(&y)]).unwrap();
        assert_ne!(xy, prod);
    }

    #[test]
    fn test_structural_equality_of_composites() {
        let x = Variable::new("x");
        let build = || Expr::negation(Expr::reciprocal(Expr::from(&x)));
        assert_eq!(build(), build());
        assert!(!build().ptr_eq(&build()));
        assert_ne!(build(), Expr::reciprocal(Expr::negation(Expr::from(&x))));
    }

    #[test]
    fn test_display() {
        let x = Variable::new("x");
        let e = Expr::addition(vec![
            c(1.0),
            Expr::negation(Expr::from(&x)),
            Expr::reciprocal(Expr::from(&x)),
        ])
        .unwrap();
        assert_eq!(format!("{e}"), "(1.0 + -x + (1/x))");
        assert_eq!(format!("{:?}", c(1.5)), "ReCons{1.500000}");
    }
}
