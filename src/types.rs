use std::collections::{BTreeSet, HashMap};

use crate::expr::Variable;

/// Type alias for the set of variables an expression depends on.
///
/// Ordered by variable identity, so iteration order is deterministic within a process.
pub type VariableSet = BTreeSet<Variable>;

/// Type alias for the variable to display name mapping used by the printer pass.
pub type NameMap = HashMap<Variable, String>;

/// Builds a [`NameMap`] that prints each variable under its own display name.
///
/// Anonymous variables are named `v<id>`.
pub fn name_map_from(variables: &[Variable]) -> NameMap {
    variables
        .iter()
        .map(|variable| (variable.clone(), variable.display_name()))
        .collect()
}
