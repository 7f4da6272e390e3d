//! Hash-consing table for constant expressions.
//!
//! Every constant built through [`Expr::constant`] is looked up in the
//! process-wide [`ConstantPool`] and shared, so two constants of equal value are
//! always the same node. Entries are never evicted.
//!
//! Keys are [`OrderedFloat`]s: `-0.0` and `0.0` share the pooled zero, and all
//! NaN payloads share a single NaN constant.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::expr::{Expr, ExprKind};

static GLOBAL_POOL: OnceLock<ConstantPool> = OnceLock::new();

/// A grow-only interning table mapping numeric values to canonical constant nodes.
///
/// The table is guarded by a `RwLock`, so lookups from several threads agree on
/// the canonical instance. Identity tests such as [`Expr::is_zero`] refer to the
/// global pool returned by [`ConstantPool::global`].
#[derive(Debug)]
pub struct ConstantPool {
    constants: RwLock<HashMap<OrderedFloat<f64>, Expr>>,
    zero: Expr,
    one: Expr,
}

impl ConstantPool {
    /// Creates a pool seeded with the zero and one constants.
    pub fn new() -> Self {
        let zero = Expr::new_node(ExprKind::Constant(0.0));
        let one = Expr::new_node(ExprKind::Constant(1.0));
        let constants = HashMap::from([
            (OrderedFloat(0.0), zero.clone()),
            (OrderedFloat(1.0), one.clone()),
        ]);
        ConstantPool {
            constants: RwLock::new(constants),
            zero,
            one,
        }
    }

    /// The process-wide pool used by [`Expr::constant`], created lazily on first use.
    pub fn global() -> &'static ConstantPool {
        GLOBAL_POOL.get_or_init(ConstantPool::new)
    }

    pub fn zero(&self) -> &Expr {
        &self.zero
    }

    pub fn one(&self) -> &Expr {
        &self.one
    }

    /// Returns the canonical constant for `value`, inserting it on first request.
    pub fn intern(&self, value: f64) -> Expr {
        let key = OrderedFloat(value);
        if let Some(existing) = self.read().get(&key) {
            return existing.clone();
        }
        // Another thread may have inserted between the two locks; `entry` keeps
        // whichever node got there first.
        self.write()
            .entry(key)
            .or_insert_with(|| {
                trace!(value, "interning constant");
                Expr::new_node(ExprKind::Constant(value))
            })
            .clone()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.read().contains_key(&OrderedFloat(value))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<OrderedFloat<f64>, Expr>> {
        self.constants.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OrderedFloat<f64>, Expr>> {
        self.constants.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_intern_returns_shared_instance() {
        let pool = ConstantPool::new();
        assert_eq!(pool.len(), 2);

        let a = pool.intern(2.5);
        let b = pool.intern(2.5);
        assert!(a.ptr_eq(&b));
        assert!(pool.contains(2.5));
        assert_eq!(pool.len(), 3);

        assert!(pool.intern(0.0).ptr_eq(pool.zero()));
        assert!(pool.intern(-0.0).ptr_eq(pool.zero()));
        assert!(pool.intern(1.0).ptr_eq(pool.one()));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_pool_only_grows() {
        let pool = ConstantPool::new();
        for i in 0..100 {
            pool.intern(i as f64 * 0.5);
        }
        let len = pool.len();
        for i in 0..100 {
            pool.intern(i as f64 * 0.5);
        }
        assert_eq!(pool.len(), len);
        assert!(!pool.is_empty());
    }

    #[test]
    fn test_global_pool_is_shared_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| ConstantPool::global().intern(12345.678)))
            .collect();
        let constants: Vec<Expr> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for constant in &constants {
            assert!(constant.ptr_eq(&Expr::constant(12345.678)));
        }
    }
}
