use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::Entry;
use crate::ConfigAddListenerAdaptor;
use crate::ConfigChangeListenerAdaptor;
use crate::ConfigChangeResult;
use crate::ConfigDeleteListenerAdaptor;
use crate::DelayedConfigAddListener;
use crate::UnacceptableReasons;

/// Raw listener notified when an entry is added below the DN it is registered at.
#[cfg_attr(test, automock)]
pub trait ConfigAddListener: Send + Sync {
    fn config_add_is_acceptable(
        &self,
        entry: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_add(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult;
}

/// Raw listener notified when an entry is deleted below the DN it is registered at.
#[cfg_attr(test, automock)]
pub trait ConfigDeleteListener: Send + Sync {
    fn config_delete_is_acceptable(
        &self,
        entry: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_delete(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult;
}

/// Raw listener notified when the entry it is registered at is modified.
#[cfg_attr(test, automock)]
pub trait ConfigChangeListener: Send + Sync {
    fn config_change_is_acceptable(
        &self,
        entry: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_change(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult;
}

/// An add listener as stored in a repository's listener table.
#[derive(Clone)]
pub enum AddListenerSlot {
    Adaptor(Arc<ConfigAddListenerAdaptor>),
    Delayed(Arc<DelayedConfigAddListener>),
    Raw(Arc<dyn ConfigAddListener>),
}

impl AddListenerSlot {
    pub fn listener(&self) -> &dyn ConfigAddListener {
        match self {
            AddListenerSlot::Adaptor(a) => a.as_ref(),
            AddListenerSlot::Delayed(d) => d.as_ref(),
            AddListenerSlot::Raw(r) => r.as_ref(),
        }
    }

    /// Identity comparison: the same listener instance in the same variant.
    pub fn same_as(
        &self,
        other: &AddListenerSlot,
    ) -> bool {
        match (self, other) {
            (AddListenerSlot::Adaptor(a), AddListenerSlot::Adaptor(b)) => Arc::ptr_eq(a, b),
            (AddListenerSlot::Delayed(a), AddListenerSlot::Delayed(b)) => Arc::ptr_eq(a, b),
            (AddListenerSlot::Raw(a), AddListenerSlot::Raw(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AddListenerSlot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            AddListenerSlot::Adaptor(a) => write!(f, "Adaptor({a:?})"),
            AddListenerSlot::Delayed(d) => write!(f, "Delayed({d:?})"),
            AddListenerSlot::Raw(_) => f.write_str("Raw"),
        }
    }
}

/// A delete listener as stored in a repository's listener table.
#[derive(Clone)]
pub enum DeleteListenerSlot {
    Adaptor(Arc<ConfigDeleteListenerAdaptor>),
    Raw(Arc<dyn ConfigDeleteListener>),
}

impl DeleteListenerSlot {
    pub fn listener(&self) -> &dyn ConfigDeleteListener {
        match self {
            DeleteListenerSlot::Adaptor(a) => a.as_ref(),
            DeleteListenerSlot::Raw(r) => r.as_ref(),
        }
    }

    pub fn same_as(
        &self,
        other: &DeleteListenerSlot,
    ) -> bool {
        match (self, other) {
            (DeleteListenerSlot::Adaptor(a), DeleteListenerSlot::Adaptor(b)) => Arc::ptr_eq(a, b),
            (DeleteListenerSlot::Raw(a), DeleteListenerSlot::Raw(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DeleteListenerSlot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DeleteListenerSlot::Adaptor(a) => write!(f, "Adaptor({a:?})"),
            DeleteListenerSlot::Raw(_) => f.write_str("Raw"),
        }
    }
}

/// A change listener as stored in a repository's listener table.
#[derive(Clone)]
pub enum ChangeListenerSlot {
    Adaptor(Arc<ConfigChangeListenerAdaptor>),
    Raw(Arc<dyn ConfigChangeListener>),
}

impl ChangeListenerSlot {
    pub fn listener(&self) -> &dyn ConfigChangeListener {
        match self {
            ChangeListenerSlot::Adaptor(a) => a.as_ref(),
            ChangeListenerSlot::Raw(r) => r.as_ref(),
        }
    }

    pub fn same_as(
        &self,
        other: &ChangeListenerSlot,
    ) -> bool {
        match (self, other) {
            (ChangeListenerSlot::Adaptor(a), ChangeListenerSlot::Adaptor(b)) => Arc::ptr_eq(a, b),
            (ChangeListenerSlot::Raw(a), ChangeListenerSlot::Raw(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ChangeListenerSlot {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ChangeListenerSlot::Adaptor(a) => write!(f, "Adaptor({a:?})"),
            ChangeListenerSlot::Raw(_) => f.write_str("Raw"),
        }
    }
}
