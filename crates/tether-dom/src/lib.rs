//! # Observation targets
//!
//! `tether-dom` gives Tether surfaces something to watch: an in-memory element
//! tree (`Document`, `Element`) whose mutations are reported as
//! `ChangeRecord`s, and `mutation_watcher`, a hook that keeps exactly one
//! observation per callsite alive for the lifetime of its surface.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tether_core::Surface;
//! use tether_dom::*;
//!
//! let doc = Document::new();
//! let list = doc.create_element("ul");
//! let changes = Rc::new(Cell::new(0));
//!
//! let surface = Surface::new("list");
//! let c = changes.clone();
//! surface
//!     .compose(|| {
//!         mutation_watcher(Some(&list), ObserveOptions::new().child_list(), move |records| {
//!             c.set(c.get() + records.len())
//!         })
//!     })
//!     .unwrap();
//!
//! list.append_child(&doc.create_element("li")).unwrap();
//! doc.flush();
//! assert_eq!(changes.get(), 1);
//!
//! surface.dispose();
//! assert_eq!(doc.active_observations(), 0);
//! ```

pub mod document;
pub mod error;
pub mod options;
pub mod tests;
pub mod watcher;

pub use document::*;
pub use error::*;
pub use options::*;
pub use watcher::*;
