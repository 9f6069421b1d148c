//! # Surfaces, slots, and effects
//!
//! Tether keeps view state for UI *surfaces*: a surface is activated by its
//! first composition pass, re-evaluated by any number of later passes, and
//! torn down exactly once. Hook-like functions called during a pass keep their
//! state in the surface's slots:
//!
//! - `remember*` — positional (or keyed) storage bound to the surface.
//! - `remember_synced` — a cell that always holds the latest pass's value.
//! - `mount_effect` / `unmount_effect` — run once at activation / teardown.
//! - `produce_async` / `async_state` — generation-guarded async results.
//! - `remember_modal_registry` — one open overlay at a time.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tether_core::*;
//!
//! let released = Rc::new(Cell::new(0));
//! let surface = Surface::new("settings");
//!
//! for pass in 0..3 {
//!     let released = released.clone();
//!     surface
//!         .compose(|| {
//!             let modals = remember_modal_registry();
//!             if pass == 1 {
//!                 modals.open("confirm-delete");
//!             }
//!             unmount_effect(move || released.set(pass));
//!         })
//!         .unwrap();
//! }
//!
//! surface.dispose();
//! // the callback from the last pass is the one that ran
//! assert_eq!(released.get(), 2);
//! ```
//!
//! ## Effects and cleanup
//!
//! - `effect` runs once when called and returns a `Dispose` guard that also
//!   runs when the current scope is torn down.
//! - `scoped_effect` is wired to the current `Scope`.
//! - `disposable_effect` re-runs when its key changes, cleaning up the
//!   previous run first.
//!
//! Everything registered on a surface's scope runs on `Surface::dispose` or
//! when the surface is dropped, whichever happens first.

pub mod async_task;
pub mod effects;
pub mod effects_ext;
pub mod error;
pub mod lifecycle;
pub mod locals;
pub mod modal;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod synced;

pub use async_task::*;
pub use effects::*;
pub use effects_ext::*;
pub use error::*;
pub use lifecycle::*;
pub use locals::*;
pub use modal::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
pub use synced::*;
