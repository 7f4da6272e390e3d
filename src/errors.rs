//! Error types for the realexpr crate.
//!
//! This module defines the failure modes of expression construction and of
//! running a pass over an expression tree. The main error types are:
//!
//! - `ExprError`: Errors while building an expression node
//! - `PassError`: Errors while evaluating a differentiator, simplifier or printer pass
//!
//! Each error type implements the standard Error trait and provides detailed error messages.

use thiserror::Error;

use crate::kinds::{KindSet, NodeKind};

/// Errors that can occur while constructing an expression node.
///
/// Construction is the only place where operand lists are validated; once a node
/// exists it is immutable and always well formed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Error when an n-ary node is built from an unusable operand list
    #[error("Invalid argument for {kind} node: {reason}")]
    InvalidArgument { kind: NodeKind, reason: String },
}

/// Errors that can occur while running a pass over an expression tree.
///
/// All pass failures are synchronous: a failing pass produces no partial result.
#[derive(Error, Debug)]
pub enum PassError {
    /// Error when a pass is evaluated without a configuration value it needs
    #[error("{pass} requires a parameter that was not supplied: {parameter}")]
    MissingParameter {
        pass: &'static str,
        parameter: String,
    },
    /// Error when the root expression contains node kinds the pass cannot handle
    #[error(
        "{pass} does not support all expression kinds in the root expression \
         (used: {used}; supported: {supported}; unsupported: {unsupported})"
    )]
    UnsupportedExpressionKind {
        pass: &'static str,
        used: KindSet,
        supported: KindSet,
        unsupported: KindSet,
    },
    /// Error when an operation has no defined real result, e.g. the reciprocal of zero
    #[error("Undefined operation: {operation}")]
    UndefinedOperation { operation: String },
    /// Error when a pass tries to build an invalid node
    #[error("Failed to build expression")]
    InvalidExpression(#[from] ExprError),
    /// Error when the printer sink rejects a write
    #[error("Failed to write rendered expression")]
    Io(#[from] std::io::Error),
}
