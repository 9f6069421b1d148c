use bitflags::bitflags;

use crate::ObserveError;

bitflags! {
    /// What kinds of change an observation reports.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ObserveFlags: u8 {
        const CHILD_LIST = 1;
        const ATTRIBUTES = 1 << 1;
        const CHARACTER_DATA = 1 << 2;
        /// Also report changes on every descendant of the target.
        const SUBTREE = 1 << 3;
        const ATTRIBUTE_OLD_VALUE = 1 << 4;
        const CHARACTER_DATA_OLD_VALUE = 1 << 5;
    }
}

/// Observation configuration.
///
/// ```rust
/// use tether_dom::*;
///
/// let opts = ObserveOptions::new()
///     .subtree()
///     .attribute_filter(["class", "hidden"])
///     .normalize()
///     .unwrap();
/// // a filter implies attribute observation
/// assert!(opts.flags.contains(ObserveFlags::ATTRIBUTES));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub flags: ObserveFlags,
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_list(mut self) -> Self {
        self.flags |= ObserveFlags::CHILD_LIST;
        self
    }

    pub fn attributes(mut self) -> Self {
        self.flags |= ObserveFlags::ATTRIBUTES;
        self
    }

    pub fn character_data(mut self) -> Self {
        self.flags |= ObserveFlags::CHARACTER_DATA;
        self
    }

    pub fn subtree(mut self) -> Self {
        self.flags |= ObserveFlags::SUBTREE;
        self
    }

    pub fn attribute_old_value(mut self) -> Self {
        self.flags |= ObserveFlags::ATTRIBUTE_OLD_VALUE;
        self
    }

    pub fn character_data_old_value(mut self) -> Self {
        self.flags |= ObserveFlags::CHARACTER_DATA_OLD_VALUE;
        self
    }

    pub fn attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Applies the implied flags and rejects options that observe nothing.
    pub fn normalize(mut self) -> Result<Self, ObserveError> {
        if self.flags.contains(ObserveFlags::ATTRIBUTE_OLD_VALUE) || self.attribute_filter.is_some()
        {
            self.flags |= ObserveFlags::ATTRIBUTES;
        }
        if self.flags.contains(ObserveFlags::CHARACTER_DATA_OLD_VALUE) {
            self.flags |= ObserveFlags::CHARACTER_DATA;
        }
        let kinds = ObserveFlags::CHILD_LIST | ObserveFlags::ATTRIBUTES | ObserveFlags::CHARACTER_DATA;
        if !self.flags.intersects(kinds) {
            return Err(ObserveError::NothingToObserve);
        }
        Ok(self)
    }

    pub(crate) fn accepts_attribute(&self, name: &str) -> bool {
        self.flags.contains(ObserveFlags::ATTRIBUTES)
            && self
                .attribute_filter
                .as_ref()
                .is_none_or(|names| names.iter().any(|n| n == name))
    }
}
