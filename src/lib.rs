//! Symbolic real-valued expressions with differentiation, simplification and printing.
//!
//! This crate provides immutable expression trees over real numbers together with
//! a small set of passes that traverse them:
//!
//! - Partial differentiation with respect to a variable
//! - Algebraic simplification (constant folding, term collection, double negation)
//! - Fully parenthesized infix printing
//!
//! Trees are built from six node kinds: constants, variables, n-ary sums, n-ary
//! products, negation and reciprocal. Subtraction and division are expressed
//! through negation and reciprocal. Nodes are shared through reference counting,
//! so subtrees can be reused freely and trees can be sent across threads.
//!
//! # Example
//!
//! ```rust
//! use realexpr::prelude::*;
//!
//! let x = Variable::new("x");
//! // x * x + 3
//! let e = Expr::addition(vec![
//!     Expr::multiplication(vec![Expr::from(&x), Expr::from(&x)]).unwrap(),
//!     Expr::constant(3.0),
//! ])
//! .unwrap();
//!
//! let d = simplify(&differentiate(&e, &x).unwrap()).unwrap();
//! let names = name_map_from(&[x.clone()]);
//! assert_eq!(print_to_string(&d, Some(&names)).unwrap(), "(2.0 * x)");
//! ```

pub use errors::{ExprError, PassError};
pub use expr::{Expr, ExprKind, Variable};
pub use passes::differentiator::differentiate;
pub use passes::printer::{print, print_to_stdout, print_to_string};
pub use passes::simplifier::{simplify, simplify_to_fixpoint};

pub mod prelude {
    pub use crate::errors::{ExprError, PassError};
    pub use crate::expr::{Expr, ExprKind, Variable};
    pub use crate::passes::differentiator::differentiate;
    pub use crate::passes::printer::{print, print_to_stdout, print_to_string};
    pub use crate::passes::simplifier::{simplify, simplify_to_fixpoint};
    pub use crate::types::{name_map_from, NameMap};
}

/// Error types for the various failure modes
pub mod errors;
/// Expression tree representation
pub mod expr;
/// Node kinds and kind sets used for capability checks
pub mod kinds;
/// Interning of constant nodes
pub mod pool;
/// Shared collection aliases
pub mod types;
/// Pass dispatch protocol
pub mod visitor;
/// Passes over expression trees
pub mod passes {
    pub mod differentiator;
    pub mod printer;
    pub mod simplifier;
}
