//! # Element tree
//!
//! A minimal in-memory element tree. Every mutation is turned into a
//! `ChangeRecord` and queued for each observation interested in it; queued
//! records are handed to their callbacks in batches by `Document::flush`,
//! which the host calls at the end of each event-loop turn.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tether_dom::*;
//!
//! let doc = Document::new();
//! let panel = doc.create_element("section");
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = seen.clone();
//! let observation = panel
//!     .observe(ObserveOptions::new().attributes(), move |records| {
//!         sink.borrow_mut().extend(records.iter().cloned())
//!     })
//!     .unwrap();
//!
//! panel.set_attribute("aria-busy", "true");
//! assert!(seen.borrow().is_empty());
//! doc.flush();
//! assert_eq!(seen.borrow().len(), 1);
//!
//! observation.disconnect();
//! assert_eq!(doc.active_observations(), 0);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::{DomError, ObserveError, ObserveFlags, ObserveOptions};

new_key_type! {
    pub struct NodeId;
    pub struct ObservationId;
}

pub type MutationCallback = Rc<dyn Fn(&[ChangeRecord])>;

/// Nodes added or removed by one child-list change.
pub type NodeList = SmallVec<[Element; 1]>;

#[derive(Clone, Debug, PartialEq)]
pub enum ChangeKind {
    ChildList { added: NodeList, removed: NodeList },
    Attributes { name: String, old_value: Option<String> },
    CharacterData { old_value: Option<String> },
}

/// One observed change. `old_value` fields are only filled in when the
/// observation asked for them.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeRecord {
    pub target: Element,
    pub kind: ChangeKind,
}

// Queued form of a `ChangeRecord`. Holds node ids rather than `Element`s so
// undelivered records don't keep their document alive.
#[derive(Clone)]
enum PendingKind {
    ChildList {
        added: SmallVec<[NodeId; 1]>,
        removed: SmallVec<[NodeId; 1]>,
    },
    Attributes { name: String, old_value: Option<String> },
    CharacterData { old_value: Option<String> },
}

#[derive(Clone)]
struct Pending {
    target: NodeId,
    kind: PendingKind,
}

impl Pending {
    fn for_observer(&self, options: &ObserveOptions) -> Pending {
        let mut record = self.clone();
        match &mut record.kind {
            PendingKind::Attributes { old_value, .. }
                if !options.flags.contains(ObserveFlags::ATTRIBUTE_OLD_VALUE) =>
            {
                *old_value = None
            }
            PendingKind::CharacterData { old_value }
                if !options.flags.contains(ObserveFlags::CHARACTER_DATA_OLD_VALUE) =>
            {
                *old_value = None
            }
            _ => {}
        }
        record
    }

    fn resolve(self, doc: &Document) -> ChangeRecord {
        let handle = |id: NodeId| Element {
            doc: doc.clone(),
            id,
        };
        let kind = match self.kind {
            PendingKind::ChildList { added, removed } => ChangeKind::ChildList {
                added: added.into_iter().map(handle).collect(),
                removed: removed.into_iter().map(handle).collect(),
            },
            PendingKind::Attributes { name, old_value } => ChangeKind::Attributes { name, old_value },
            PendingKind::CharacterData { old_value } => ChangeKind::CharacterData { old_value },
        };
        ChangeRecord {
            target: handle(self.target),
            kind,
        }
    }
}

struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

struct Registration {
    target: NodeId,
    options: ObserveOptions,
    callback: MutationCallback,
    queue: Vec<Pending>,
    seq: u64,
}

#[derive(Default)]
struct DocumentInner {
    nodes: SlotMap<NodeId, Node>,
    observers: SlotMap<ObservationId, Registration>,
    next_seq: u64,
}

fn is_inclusive_ancestor(nodes: &SlotMap<NodeId, Node>, ancestor: NodeId, node: NodeId) -> bool {
    let mut node = Some(node);
    while let Some(n) = node {
        if n == ancestor {
            return true;
        }
        node = nodes.get(n).and_then(|n| n.parent);
    }
    false
}

impl DocumentInner {
    fn queue(&mut self, target: NodeId, kind: PendingKind) {
        let record = Pending { target, kind };
        let nodes = &self.nodes;
        for reg in self.observers.values_mut() {
            let reaches = reg.target == target
                || (reg.options.flags.contains(ObserveFlags::SUBTREE)
                    && is_inclusive_ancestor(nodes, reg.target, target));
            if !reaches {
                continue;
            }
            let wanted = match &record.kind {
                PendingKind::ChildList { .. } => reg.options.flags.contains(ObserveFlags::CHILD_LIST),
                PendingKind::Attributes { name, .. } => reg.options.accepts_attribute(name),
                PendingKind::CharacterData { .. } => {
                    reg.options.flags.contains(ObserveFlags::CHARACTER_DATA)
                }
            };
            if wanted {
                reg.queue.push(record.for_observer(&reg.options));
            }
        }
    }
}

/// Owner of an element tree and of the observations on it. Clones share state.
#[derive(Clone, Default)]
pub struct Document(Rc<RefCell<DocumentInner>>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&self, tag: impl Into<String>) -> Element {
        let id = self.0.borrow_mut().nodes.insert(Node {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        });
        Element {
            doc: self.clone(),
            id,
        }
    }

    /// Delivers queued records to their callbacks, in observation creation
    /// order. Records produced by the callbacks themselves are delivered in the
    /// same flush; an observation disconnected by an earlier callback gets
    /// nothing. Returns the number of records delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let mut batches: Vec<(u64, ObservationId, MutationCallback, Vec<Pending>)> = {
                let mut inner = self.0.borrow_mut();
                inner
                    .observers
                    .iter_mut()
                    .filter(|(_, reg)| !reg.queue.is_empty())
                    .map(|(id, reg)| (reg.seq, id, reg.callback.clone(), std::mem::take(&mut reg.queue)))
                    .collect()
            };
            if batches.is_empty() {
                break;
            }
            batches.sort_by_key(|(seq, ..)| *seq);

            for (_, id, callback, pending) in batches {
                if !self.0.borrow().observers.contains_key(id) {
                    log::trace!("skipping {} record(s) for disconnected {id:?}", pending.len());
                    continue;
                }
                let records: Vec<ChangeRecord> = pending.into_iter().map(|p| p.resolve(self)).collect();
                log::trace!("delivering {} mutation record(s)", records.len());
                delivered += records.len();
                callback(&records);
            }
        }
        delivered
    }

    pub fn active_observations(&self) -> usize {
        self.0.borrow().observers.len()
    }

    fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Handle to one element. Equality is node identity.
#[derive(Clone)]
pub struct Element {
    doc: Document,
    id: NodeId,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc.ptr_eq(&other.doc)
    }
}

impl Eq for Element {}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = self
            .doc
            .0
            .try_borrow()
            .ok()
            .and_then(|inner| inner.nodes.get(self.id).map(|n| n.tag.clone()));
        f.debug_struct("Element")
            .field("tag", &tag.as_deref().unwrap_or("?"))
            .field("id", &self.id)
            .finish()
    }
}

impl Element {
    fn handle(&self, id: NodeId) -> Element {
        Element {
            doc: self.doc.clone(),
            id,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        let inner = self.doc.0.borrow();
        f(&inner.nodes[self.id])
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn tag(&self) -> String {
        self.read(|n| n.tag.clone())
    }

    pub fn parent(&self) -> Option<Element> {
        self.read(|n| n.parent).map(|id| self.handle(id))
    }

    pub fn children(&self) -> Vec<Element> {
        self.read(|n| n.children.clone())
            .into_iter()
            .map(|id| self.handle(id))
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.read(|n| n.attributes.get(name).cloned())
    }

    pub fn text(&self) -> String {
        self.read(|n| n.text.clone())
    }

    /// Appends `child`, first detaching it from its current parent.
    pub fn append_child(&self, child: &Element) -> Result<(), DomError> {
        if !self.doc.ptr_eq(&child.doc) {
            return Err(DomError::ForeignNode);
        }
        if is_inclusive_ancestor(&self.doc.0.borrow().nodes, child.id, self.id) {
            return Err(DomError::HierarchyCycle);
        }
        if let Some(old_parent) = child.parent() {
            old_parent.remove_child(child)?;
        }

        let mut inner = self.doc.0.borrow_mut();
        inner.nodes[self.id].children.push(child.id);
        inner.nodes[child.id].parent = Some(self.id);
        inner.queue(
            self.id,
            PendingKind::ChildList {
                added: smallvec::smallvec![child.id],
                removed: SmallVec::new(),
            },
        );
        Ok(())
    }

    pub fn remove_child(&self, child: &Element) -> Result<(), DomError> {
        if !self.doc.ptr_eq(&child.doc) {
            return Err(DomError::ForeignNode);
        }
        let mut inner = self.doc.0.borrow_mut();
        let Some(pos) = inner.nodes[self.id].children.iter().position(|c| *c == child.id) else {
            return Err(DomError::NotAChild);
        };
        // Queue while the child is still attached so subtree observers above
        // the parent see it.
        inner.queue(
            self.id,
            PendingKind::ChildList {
                added: SmallVec::new(),
                removed: smallvec::smallvec![child.id],
            },
        );
        inner.nodes[self.id].children.remove(pos);
        inner.nodes[child.id].parent = None;
        Ok(())
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let mut inner = self.doc.0.borrow_mut();
        let old_value = inner.nodes[self.id]
            .attributes
            .insert(name.clone(), value.into());
        inner.queue(self.id, PendingKind::Attributes { name, old_value });
    }

    /// Removes `name`, returning its value. Absent attributes produce no record.
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        let mut inner = self.doc.0.borrow_mut();
        let old_value = inner.nodes[self.id].attributes.remove(name)?;
        inner.queue(
            self.id,
            PendingKind::Attributes {
                name: name.to_string(),
                old_value: Some(old_value.clone()),
            },
        );
        Some(old_value)
    }

    /// Replaces the element's text content.
    pub fn set_text(&self, text: impl Into<String>) {
        let mut inner = self.doc.0.borrow_mut();
        let old = std::mem::replace(&mut inner.nodes[self.id].text, text.into());
        inner.queue(
            self.id,
            PendingKind::CharacterData {
                old_value: Some(old),
            },
        );
    }

    /// Starts reporting changes on this element (and its descendants with
    /// `SUBTREE`) to `callback`. The returned guard disconnects on drop.
    pub fn observe(
        &self,
        options: ObserveOptions,
        callback: impl Fn(&[ChangeRecord]) + 'static,
    ) -> Result<Observation, ObserveError> {
        let options = options.normalize()?;
        let mut inner = self.doc.0.borrow_mut();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let id = inner.observers.insert(Registration {
            target: self.id,
            options,
            callback: Rc::new(callback),
            queue: Vec::new(),
            seq,
        });
        log::trace!("observation {id:?} attached");
        Ok(Observation {
            doc: Rc::downgrade(&self.doc.0),
            id,
        })
    }
}

/// Live subscription created by `Element::observe`.
#[must_use = "dropping an Observation disconnects it"]
pub struct Observation {
    doc: Weak<RefCell<DocumentInner>>,
    id: ObservationId,
}

impl Observation {
    /// Stops delivery and discards queued records. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        let removed = doc.borrow_mut().observers.remove(self.id);
        if removed.is_some() {
            log::trace!("observation {:?} disconnected", self.id);
        }
        // The callback may own other observations; drop it with the document unborrowed.
        drop(removed);
    }

    pub fn is_connected(&self) -> bool {
        self.doc
            .upgrade()
            .is_some_and(|doc| doc.borrow().observers.contains_key(self.id))
    }

    /// Removes and returns records queued but not yet delivered.
    pub fn take_records(&self) -> Vec<ChangeRecord> {
        let Some(doc) = self.doc.upgrade().map(Document) else {
            return Vec::new();
        };
        let pending = doc
            .0
            .borrow_mut()
            .observers
            .get_mut(self.id)
            .map(|reg| std::mem::take(&mut reg.queue))
            .unwrap_or_default();
        pending.into_iter().map(|p| p.resolve(&doc)).collect()
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
