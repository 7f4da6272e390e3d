//! Fully parenthesized infix rendering.
//!
//! Output format:
//! - Constants use Rust's `{:?}` formatting for `f64`, which always carries a
//!   fractional part (`1.0`, `-4.25`, `1e20`)
//! - Variables are written under the name the caller maps them to
//! - Sums render as `(a + b + c)` and products as `(a * b * c)`
//! - Negation renders as `-a` and reciprocal as `(1/a)`
//!
//! No precedence-based elision is performed. The whole expression is rendered
//! before anything reaches the sink, so a failing evaluation writes nothing.

use std::io::{self, Write};

use crate::errors::PassError;
use crate::expr::{Expr, Variable};
use crate::kinds::KindSet;
use crate::types::NameMap;
use crate::visitor::{accept, evaluate, Visitor};

/// Infix printing pass. The traversal state is the text rendered so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Printer
    }

    fn write_joined(
        &self,
        operands: &[Expr],
        separator: &str,
        names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        out.push('(');
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            accept(self, operand, names, out)?;
        }
        out.push(')');
        Ok(())
    }
}

impl Visitor for Printer {
    type Params = NameMap;
    type State = String;
    type Output = ();

    const NAME: &'static str = "Printer";

    fn supported_kinds(&self) -> KindSet {
        KindSet::all()
    }

    fn evaluate_root(
        &self,
        root: &Expr,
        params: Option<&NameMap>,
        out: &mut String,
    ) -> Result<(), PassError> {
        match params {
            Some(names) => accept(self, root, names, out),
            None if root.variables().is_empty() => accept(self, root, &NameMap::new(), out),
            None => Err(PassError::MissingParameter {
                pass: Self::NAME,
                parameter: "variable name map".to_string(),
            }),
        }
    }

    fn visit_constant(
        &self,
        _node: &Expr,
        value: f64,
        _names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        out.push_str(&format!("{value:?}"));
        Ok(())
    }

    fn visit_variable(
        &self,
        _node: &Expr,
        variable: &Variable,
        names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        let name = names
            .get(variable)
            .ok_or_else(|| PassError::MissingParameter {
                pass: Self::NAME,
                parameter: format!("name for variable {variable:?}"),
            })?;
        out.push_str(name);
        Ok(())
    }

    fn visit_addition(
        &self,
        _node: &Expr,
        terms: &[Expr],
        names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        self.write_joined(terms, " + ", names, out)
    }

    fn visit_multiplication(
        &self,
        _node: &Expr,
        factors: &[Expr],
        names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        self.write_joined(factors, " * ", names, out)
    }

    fn visit_negation(
        &self,
        _node: &Expr,
        operand: &Expr,
        names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        out.push('-');
        accept(self, operand, names, out)
    }

    fn visit_reciprocal(
        &self,
        _node: &Expr,
        operand: &Expr,
        names: &NameMap,
        out: &mut String,
    ) -> Result<(), PassError> {
        out.push_str("(1/");
        accept(self, operand, names, out)?;
        out.push(')');
        Ok(())
    }
}

/// Writes the infix rendering of `root` to `sink`.
///
/// # Errors
/// Fails with [`PassError::MissingParameter`] if `root` contains variables and
/// `names` is `None`, or if a variable has no entry in `names`.
pub fn print(root: &Expr, names: Option<&NameMap>, sink: &mut dyn Write) -> Result<(), PassError> {
    let rendered = print_to_string(root, names)?;
    sink.write_all(rendered.as_bytes())?;
    Ok(())
}

/// Writes the infix rendering of `root` to standard output.
pub fn print_to_stdout(root: &Expr, names: Option<&NameMap>) -> Result<(), PassError> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    print(root, names, &mut lock)?;
    lock.flush()?;
    Ok(())
}

/// Renders `root` into a `String`.
pub fn print_to_string(root: &Expr, names: Option<&NameMap>) -> Result<String, PassError> {
    let mut rendered = String::new();
    evaluate(&Printer, root, names, &mut rendered)?;
    Ok(rendered)
}
