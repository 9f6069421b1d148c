use std::rc::Rc;

use crate::{Signal, SubId, remember};

/// Which overlay, if any, is open. At most one by construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModalState {
    #[default]
    Closed,
    Open(String),
}

impl ModalState {
    pub fn open_id(&self) -> Option<&str> {
        match self {
            ModalState::Closed => None,
            ModalState::Open(id) => Some(id),
        }
    }
}

/// Mutually exclusive set of named overlays. Clones share state.
#[derive(Clone)]
pub struct ModalRegistry {
    state: Signal<ModalState>,
}

impl Default for ModalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalRegistry {
    pub fn new() -> Self {
        Self {
            state: Signal::new(ModalState::Closed),
        }
    }

    /// Opens `id`, replacing whatever was open.
    pub fn open(&self, id: impl Into<String>) {
        let id = id.into();
        log::trace!("modal '{id}' opened");
        self.state.set(ModalState::Open(id));
    }

    pub fn close(&self) {
        if self.state.with(|s| *s != ModalState::Closed) {
            self.state.set(ModalState::Closed);
        }
    }

    /// Closes only if `id` is the open overlay; returns whether it was.
    pub fn close_if(&self, id: &str) -> bool {
        let open = self.is_open(id);
        if open {
            self.close();
        }
        open
    }

    pub fn toggle(&self, id: impl Into<String>) {
        let id = id.into();
        if self.is_open(&id) {
            self.close();
        } else {
            self.open(id);
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.state.with(|s| s.open_id() == Some(id))
    }

    pub fn open_id(&self) -> Option<String> {
        self.state.with(|s| s.open_id().map(str::to_owned))
    }

    pub fn state(&self) -> ModalState {
        self.state.get()
    }

    pub fn subscribe(&self, f: impl Fn(&ModalState) + 'static) -> SubId {
        self.state.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.state.unsubscribe(id)
    }
}

impl std::fmt::Debug for ModalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalRegistry")
            .field("state", &self.state())
            .finish()
    }
}

pub fn remember_modal_registry() -> Rc<ModalRegistry> {
    remember(ModalRegistry::new)
}
