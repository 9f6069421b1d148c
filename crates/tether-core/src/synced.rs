//! Latest-value cells.
//!
//! A surface re-creates its closures on every pass. Anything that outlives a
//! pass (a cleanup, a subscription callback, an async factory) should read
//! through a `SyncedRef` instead of capturing a value from the pass that
//! created it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::remember_with_seed;

pub struct SyncedRef<T>(RefCell<T>);

impl<T> SyncedRef<T> {
    pub fn new(initial: T) -> Self {
        Self(RefCell::new(initial))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    /// Value at the moment of the call.
    pub fn current(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }
}

impl<T> SyncedRef<Option<T>> {
    pub fn take(&self) -> Option<T> {
        self.0.borrow_mut().take()
    }

    pub fn is_some(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SyncedRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SyncedRef").field(&*self.0.borrow()).finish()
    }
}

/// Remembers a cell holding `value`, overwritten with the caller's value on
/// every pass.
pub fn remember_synced<T: 'static>(value: T) -> Rc<SyncedRef<T>> {
    let (cell, unused) = remember_with_seed(value, SyncedRef::new);
    if let Some(value) = unused {
        cell.set(value);
    }
    cell
}
