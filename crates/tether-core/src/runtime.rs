use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::scope::Scope;
use crate::{Spawner, SurfaceError, with_spawner};

thread_local! {
    pub static COMPOSER: RefCell<Composer> = RefCell::new(Composer::default());
}

/// Slot table of one surface. Installed into `COMPOSER` while that surface composes.
#[derive(Default)]
pub struct Composer {
    pub slots: Vec<Box<dyn Any>>,
    pub cursor: usize,
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

impl Composer {
    pub fn len(&self) -> usize {
        self.slots.len() + self.keyed_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Lookup<T> {
    Hit(Rc<T>),
    Vacant(usize),
    Mismatch(usize),
}

fn lookup_positional<T: 'static>() -> Lookup<T> {
    COMPOSER.with(|c| {
        let mut c = c.borrow_mut();
        let cursor = c.cursor;
        c.cursor += 1;

        match c.slots.get(cursor) {
            None => Lookup::Vacant(cursor),
            Some(slot) => match slot.downcast_ref::<Rc<T>>() {
                Some(rc) => Lookup::Hit(rc.clone()),
                None => Lookup::Mismatch(cursor),
            },
        }
    })
}

fn store_positional<T: 'static>(cursor: usize, rc: Rc<T>) {
    COMPOSER.with(|c| {
        let mut c = c.borrow_mut();
        if cursor < c.slots.len() {
            c.slots[cursor] = Box::new(rc);
        } else {
            // keep the table dense
            while c.slots.len() < cursor {
                c.slots.push(Box::new(()));
            }
            c.slots.push(Box::new(rc));
        }
    })
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    remember_with_seed((), |()| init()).0
}

/// Positional remember that only consumes `seed` when the slot is created.
///
/// Returns the slot value and, when the slot already existed, the unused seed.
pub fn remember_with_seed<S, T: 'static>(seed: S, init: impl FnOnce(S) -> T) -> (Rc<T>, Option<S>) {
    let cursor = match lookup_positional::<T>() {
        Lookup::Hit(rc) => return (rc, Some(seed)),
        Lookup::Vacant(cursor) => cursor,
        Lookup::Mismatch(cursor) => {
            // replace (else panics)
            log::warn!(
                "remember: slot {} type changed; replacing. \
                 If this is due to conditional composition, prefer remember_with_key.",
                cursor
            );
            cursor
        }
    };

    // `init` runs without the slot table borrowed.
    let rc = Rc::new(init(seed));
    store_positional(cursor, rc.clone());
    (rc, None)
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let existing = COMPOSER.with(|c| {
        let c = c.borrow();
        c.keyed_slots.get(&key).map(|existing| {
            existing.downcast_ref::<Rc<T>>().cloned().ok_or(())
        })
    });

    match existing {
        Some(Ok(rc)) => return rc,
        Some(Err(())) => log::warn!(
            "remember_with_key: key '{}' reused with a different type; replacing.",
            key
        ),
        None => {}
    }

    let rc: Rc<T> = Rc::new(init());
    COMPOSER.with(|c| c.borrow_mut().keyed_slots.insert(key, Box::new(rc.clone())));
    rc
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}

/// The owning UI unit: activated by its first `compose`, re-evaluated by every
/// later one, torn down once by `dispose` (or drop).
///
/// ```rust
/// use tether_core::*;
///
/// let surface = Surface::new("profile");
/// let render = || {
///     let renders = remember(|| std::cell::Cell::new(0));
///     renders.set(renders.get() + 1);
///     renders.get()
/// };
/// assert_eq!(surface.compose(render).unwrap(), 1);
/// assert_eq!(surface.compose(render).unwrap(), 2);
/// surface.dispose();
/// assert!(surface.compose(render).is_err());
/// ```
pub struct Surface {
    label: String,
    composer: RefCell<Composer>,
    scope: Scope,
    spawner: Option<Spawner>,
    passes: Cell<u64>,
    composing: Cell<bool>,
}

struct ComposeGuard<'a> {
    surface: &'a Surface,
    prev: Option<Composer>,
}

impl<'a> ComposeGuard<'a> {
    fn begin(surface: &'a Surface) -> Self {
        let mut own = std::mem::take(&mut *surface.composer.borrow_mut());
        own.cursor = 0;
        let prev = COMPOSER.with(|c| std::mem::replace(&mut *c.borrow_mut(), own));
        surface.composing.set(true);
        ComposeGuard {
            surface,
            prev: Some(prev),
        }
    }
}

impl Drop for ComposeGuard<'_> {
    fn drop(&mut self) {
        let prev = self.prev.take().unwrap_or_default();
        let own = COMPOSER.with(|c| std::mem::replace(&mut *c.borrow_mut(), prev));
        *self.surface.composer.borrow_mut() = own;
        self.surface.composing.set(false);
    }
}

impl Surface {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            composer: RefCell::new(Composer::default()),
            scope: Scope::new(),
            spawner: None,
            passes: Cell::new(0),
            composing: Cell::new(false),
        }
    }

    /// Executor that async hooks composed in this surface spawn onto.
    pub fn with_spawner(mut self, spawn: impl futures::task::LocalSpawn + 'static) -> Self {
        self.spawner = Some(Spawner::new(spawn));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of completed or running composition passes.
    pub fn passes(&self) -> u64 {
        self.passes.get()
    }

    pub fn is_active(&self) -> bool {
        !self.scope.is_disposed()
    }

    /// Runs one composition pass of `f` against this surface's slots.
    pub fn compose<R>(&self, f: impl FnOnce() -> R) -> Result<R, SurfaceError> {
        if self.scope.is_disposed() {
            return Err(SurfaceError::Disposed(self.label.clone()));
        }
        if self.composing.get() {
            return Err(SurfaceError::Reentrant(self.label.clone()));
        }

        let pass = self.passes.get() + 1;
        self.passes.set(pass);
        if pass == 1 {
            log::debug!("surface '{}' activated", self.label);
        }

        let _guard = ComposeGuard::begin(self);
        let result = match &self.spawner {
            Some(spawner) => with_spawner(spawner.clone(), || self.scope.run(f)),
            None => self.scope.run(f),
        };
        Ok(result)
    }

    /// Tears the surface down: runs every registered cleanup once, then drops
    /// all slots. Later calls are no-ops.
    pub fn dispose(&self) {
        if self.scope.is_disposed() {
            return;
        }
        log::debug!(
            "surface '{}' disposed after {} pass(es)",
            self.label,
            self.passes.get()
        );
        self.scope.dispose();
        let slots = std::mem::take(&mut *self.composer.borrow_mut());
        drop(slots);
    }

    /// Number of slots (positional and keyed) currently held.
    pub fn slot_count(&self) -> usize {
        self.composer.borrow().len()
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("label", &self.label)
            .field("passes", &self.passes.get())
            .field("active", &self.is_active())
            .finish()
    }
}
