use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{Dispose, SyncedRef, disposable_effect, remember_with_seed};

use crate::{ChangeRecord, Element, MutationCallback, Observation, ObserveError, ObserveOptions};

struct Active {
    target: Element,
    options: ObserveOptions,
    observation: Observation,
}

/// Keeps at most one observation alive and forwards its records to the
/// latest callback.
pub struct MutationWatcher {
    callback: Rc<SyncedRef<MutationCallback>>,
    active: RefCell<Option<Active>>,
}

impl MutationWatcher {
    pub fn new(callback: impl Fn(&[ChangeRecord]) + 'static) -> Self {
        Self {
            callback: Rc::new(SyncedRef::new(Rc::new(callback))),
            active: RefCell::new(None),
        }
    }

    /// Replaces the callback without touching the subscription.
    pub fn set_callback(&self, callback: impl Fn(&[ChangeRecord]) + 'static) {
        self.callback.set(Rc::new(callback));
    }

    /// Drops the current subscription and, for `Some(target)`, attaches a new
    /// one. `None` leaves the watcher idle.
    pub fn watch(&self, target: Option<&Element>, options: &ObserveOptions) -> Result<(), ObserveError> {
        self.release();
        let Some(target) = target else {
            return Ok(());
        };

        let latest = self.callback.clone();
        let observation = target.observe(options.clone(), move |records| {
            let callback = latest.current();
            callback(records)
        })?;

        *self.active.borrow_mut() = Some(Active {
            target: target.clone(),
            options: options.clone(),
            observation,
        });
        Ok(())
    }

    pub fn release(&self) {
        let active = self.active.borrow_mut().take();
        if let Some(active) = active {
            active.observation.disconnect();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .borrow()
            .as_ref()
            .is_some_and(|a| a.observation.is_connected())
    }

    pub fn target(&self) -> Option<Element> {
        self.active.borrow().as_ref().map(|a| a.target.clone())
    }

    pub fn options(&self) -> Option<ObserveOptions> {
        self.active.borrow().as_ref().map(|a| a.options.clone())
    }
}

impl Drop for MutationWatcher {
    fn drop(&mut self) {
        self.release();
    }
}

/// Observes `target` for the lifetime of the owning surface.
///
/// Re-subscribes when `target` or `options` change; `callback` changes only
/// swap the function records are forwarded to. A `None` target observes
/// nothing.
pub fn mutation_watcher(
    target: Option<&Element>,
    options: ObserveOptions,
    callback: impl Fn(&[ChangeRecord]) + 'static,
) -> Rc<MutationWatcher> {
    let (watcher, unused) = remember_with_seed(callback, |cb| MutationWatcher::new(cb));
    if let Some(callback) = unused {
        watcher.set_callback(callback);
    }

    let target = target.cloned();
    let key = (target.clone(), options.clone());
    disposable_effect(key, {
        let watcher = watcher.clone();
        move || {
            if let Err(err) = watcher.watch(target.as_ref(), &options) {
                log::warn!("mutation_watcher: not observing: {err}");
            }
            Dispose::new(move || watcher.release())
        }
    });

    watcher
}
