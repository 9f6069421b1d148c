//! # Composition locals
//!
//! Thread‑local values visible to everything composed inside a frame, looked
//! up by type. A surface uses them to hand its executor to async hooks:
//!
//! ```rust
//! use tether_core::*;
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Locale(&'static str);
//!
//! provide_local(Locale("en-GB"), || {
//!     assert_eq!(local::<Locale>(), Some(Locale("en-GB")));
//! });
//! assert_eq!(local::<Locale>(), None);
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::task::LocalSpawn;

thread_local! {
    static LOCALS_STACK: RefCell<Vec<HashMap<TypeId, Box<dyn Any>>>> = const { RefCell::new(Vec::new()) };
}

fn with_locals_frame<R>(f: impl FnOnce() -> R) -> R {
    // Non-panicking frame guard (ensures pop on unwind)
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            LOCALS_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    LOCALS_STACK.with(|st| st.borrow_mut().push(HashMap::new()));
    let _guard = Guard;
    f()
}

fn set_local_boxed(t: TypeId, v: Box<dyn Any>) {
    LOCALS_STACK.with(|st| {
        if let Some(top) = st.borrow_mut().last_mut() {
            top.insert(t, v);
        }
    });
}

/// Makes `value` visible to `local::<T>()` for the duration of `f`.
pub fn provide_local<T: Any, R>(value: T, f: impl FnOnce() -> R) -> R {
    with_locals_frame(|| {
        set_local_boxed(TypeId::of::<T>(), Box::new(value));
        f()
    })
}

/// Innermost provided value of type `T`, if any.
pub fn local<T: Any + Clone>() -> Option<T> {
    LOCALS_STACK.with(|st| {
        for frame in st.borrow().iter().rev() {
            if let Some(v) = frame.get(&TypeId::of::<T>())
                && let Some(v) = v.downcast_ref::<T>()
            {
                return Some(v.clone());
            }
        }
        None
    })
}

/// Executor handle that async hooks spawn onto.
#[derive(Clone)]
pub struct Spawner(Rc<dyn LocalSpawn>);

impl Spawner {
    pub fn new(spawn: impl LocalSpawn + 'static) -> Self {
        Self(Rc::new(spawn))
    }

    pub fn as_local_spawn(&self) -> &dyn LocalSpawn {
        &*self.0
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Spawner(..)")
    }
}

pub fn with_spawner<R>(spawner: Spawner, f: impl FnOnce() -> R) -> R {
    provide_local(spawner, f)
}

pub fn current_spawner() -> Option<Spawner> {
    local::<Spawner>()
}
