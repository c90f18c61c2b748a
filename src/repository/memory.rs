use std::collections::BTreeMap;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use super::AddListenerSlot;
use super::ChangeListenerSlot;
use super::ConfigurationRepository;
use super::DeleteListenerSlot;
use super::Entry;
use crate::constants::APPLY_REASON_SEPARATOR;
use crate::ConfigChangeResult;
use crate::Dn;
use crate::RepositoryConfig;
use crate::RepositoryError;
use crate::Result;
use crate::UnacceptableReasons;

#[derive(Default)]
struct EntryListeners {
    add: Vec<AddListenerSlot>,
    delete: Vec<DeleteListenerSlot>,
    change: Vec<ChangeListenerSlot>,
}

impl EntryListeners {
    fn is_empty(&self) -> bool {
        self.add.is_empty() && self.delete.is_empty() && self.change.is_empty()
    }
}

/// In-memory configuration tree with listener tables.
///
/// Entries live in a sorted map where a subtree is contiguous. Listener tables
/// are keyed by DN; dispatch iterates a snapshot so listeners can freely
/// register and deregister while being notified.
pub struct InMemoryConfigRepository {
    entries: RwLock<BTreeMap<Dn, Entry>>,
    listeners: DashMap<Dn, EntryListeners>,
    allow_delete_with_children: bool,
}

impl Default for InMemoryConfigRepository {
    fn default() -> Self {
        Self::new(&RepositoryConfig::default())
    }
}

impl std::fmt::Debug for InMemoryConfigRepository {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("InMemoryConfigRepository")
            .field("entries", &self.entries.read().len())
            .field("listened_dns", &self.listeners.len())
            .finish()
    }
}

impl InMemoryConfigRepository {
    pub fn new(config: &RepositoryConfig) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            listeners: DashMap::new(),
            allow_delete_with_children: config.allow_delete_with_children,
        }
    }

    /// Loads entries as-is. No listener is notified and no parent check is made.
    pub fn bootstrap<I>(
        &self,
        entries: I,
    ) where
        I: IntoIterator<Item = Entry>,
    {
        let mut guard = self.entries.write();
        for entry in entries {
            guard.insert(entry.dn().clone(), entry);
        }
        debug!(entries = guard.len(), "configuration repository bootstrapped");
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Adds `entry` once every add listener of its parent accepts it.
    ///
    /// The returned result aggregates every listener's apply outcome.
    pub fn add_entry(
        &self,
        entry: Entry,
    ) -> Result<ConfigChangeResult> {
        let dn = entry.dn().clone();
        let parent = dn.parent().ok_or_else(|| RepositoryError::NoParent(dn.clone()))?;
        {
            let entries = self.entries.read();
            if entries.contains_key(&dn) {
                return Err(RepositoryError::EntryAlreadyExists(dn).into());
            }
            if !parent.is_root() && !entries.contains_key(&parent) {
                return Err(RepositoryError::NoParent(dn).into());
            }
        }

        let listeners = self.get_add_listeners(&parent);
        debug!(%dn, listeners = listeners.len(), "dispatching configuration add");
        for slot in &listeners {
            let mut reasons = UnacceptableReasons::new();
            if !slot.listener().config_add_is_acceptable(&entry, &mut reasons) {
                trace!(%dn, ?slot, %reasons, "add rejected");
                return Err(RepositoryError::Rejected {
                    dn,
                    operation: "added",
                    reasons: reasons.to_string(),
                }
                .into());
            }
        }

        {
            let mut entries = self.entries.write();
            if entries.contains_key(&dn) {
                return Err(RepositoryError::EntryAlreadyExists(dn).into());
            }
            entries.insert(dn.clone(), entry.clone());
        }

        let mut result = ConfigChangeResult::new();
        for slot in &listeners {
            result.aggregate(&slot.listener().apply_configuration_add(&entry));
        }
        Self::check_applied(dn, result)
    }

    /// Deletes the entry at `dn` once every delete listener of its parent accepts it.
    ///
    /// Listeners registered at `dn` itself are dropped with the entry.
    pub fn delete_entry(
        &self,
        dn: &Dn,
    ) -> Result<ConfigChangeResult> {
        let entry = self
            .get_entry(dn)?
            .ok_or_else(|| RepositoryError::NoSuchEntry(dn.clone()))?;
        if !self.allow_delete_with_children && !self.get_children(dn)?.is_empty() {
            return Err(RepositoryError::HasChildren(dn.clone()).into());
        }
        let parent = dn.parent().ok_or_else(|| RepositoryError::NoParent(dn.clone()))?;

        let listeners = self.get_delete_listeners(&parent);
        debug!(%dn, listeners = listeners.len(), "dispatching configuration delete");
        for slot in &listeners {
            let mut reasons = UnacceptableReasons::new();
            if !slot.listener().config_delete_is_acceptable(&entry, &mut reasons) {
                trace!(%dn, ?slot, %reasons, "delete rejected");
                return Err(RepositoryError::Rejected {
                    dn: dn.clone(),
                    operation: "deleted",
                    reasons: reasons.to_string(),
                }
                .into());
            }
        }

        {
            let mut entries = self.entries.write();
            entries.remove(dn);
            if self.allow_delete_with_children {
                entries.retain(|k, _| !k.is_descendant_of(dn));
                self.listeners.retain(|k, _| !k.is_descendant_of(dn));
            }
        }
        self.listeners.remove(dn);

        let mut result = ConfigChangeResult::new();
        for slot in &listeners {
            result.aggregate(&slot.listener().apply_configuration_delete(&entry));
        }
        Self::check_applied(dn.clone(), result)
    }

    /// Replaces the entry at the same DN once every change listener registered there accepts it.
    pub fn replace_entry(
        &self,
        entry: Entry,
    ) -> Result<ConfigChangeResult> {
        let dn = entry.dn().clone();
        if !self.has_entry(&dn)? {
            return Err(RepositoryError::NoSuchEntry(dn).into());
        }

        let listeners = self.get_change_listeners(&dn);
        debug!(%dn, listeners = listeners.len(), "dispatching configuration change");
        for slot in &listeners {
            let mut reasons = UnacceptableReasons::new();
            if !slot.listener().config_change_is_acceptable(&entry, &mut reasons) {
                trace!(%dn, ?slot, %reasons, "change rejected");
                return Err(RepositoryError::Rejected {
                    dn,
                    operation: "modified",
                    reasons: reasons.to_string(),
                }
                .into());
            }
        }

        self.entries.write().insert(dn.clone(), entry.clone());

        let mut result = ConfigChangeResult::new();
        for slot in &listeners {
            // An earlier listener may have deregistered this one.
            let still_registered = self
                .listeners
                .get(&dn)
                .map(|l| l.change.iter().any(|s| s.same_as(slot)))
                .unwrap_or(false);
            if !still_registered {
                trace!(%dn, ?slot, "skipping change listener deregistered during apply");
                continue;
            }
            result.aggregate(&slot.listener().apply_configuration_change(&entry));
        }
        Self::check_applied(dn, result)
    }

    fn check_applied(
        dn: Dn,
        result: ConfigChangeResult,
    ) -> Result<ConfigChangeResult> {
        if result.is_success() {
            return Ok(result);
        }
        Err(RepositoryError::ApplyFailed {
            dn,
            code: result.result_code(),
            reasons: result.messages().join(APPLY_REASON_SEPARATOR),
        }
        .into())
    }

    fn deregister<T, F>(
        &self,
        dn: &Dn,
        select: F,
        matches: impl Fn(&T) -> bool,
    ) -> bool
    where
        F: Fn(&mut EntryListeners) -> &mut Vec<T>,
    {
        let mut removed = false;
        self.listeners.remove_if_mut(dn, |_dn, listeners| {
            let slots = select(listeners);
            let before = slots.len();
            slots.retain(|s| !matches(s));
            removed = slots.len() != before;
            listeners.is_empty()
        });
        removed
    }
}

impl ConfigurationRepository for InMemoryConfigRepository {
    fn has_entry(
        &self,
        dn: &Dn,
    ) -> Result<bool> {
        Ok(self.entries.read().contains_key(dn))
    }

    fn get_entry(
        &self,
        dn: &Dn,
    ) -> Result<Option<Entry>> {
        Ok(self.entries.read().get(dn).cloned())
    }

    fn get_children(
        &self,
        dn: &Dn,
    ) -> Result<Vec<Dn>> {
        let entries = self.entries.read();
        let children = entries
            .range(dn.clone()..)
            .map(|(k, _)| k)
            .skip_while(|k| *k == dn)
            .take_while(|k| k.is_descendant_of(dn))
            .filter(|k| k.depth() == dn.depth() + 1)
            .cloned()
            .collect();
        Ok(children)
    }

    fn register_add_listener(
        &self,
        dn: &Dn,
        listener: AddListenerSlot,
    ) -> Result<()> {
        trace!(%dn, ?listener, "add listener registered");
        self.listeners.entry(dn.clone()).or_default().add.push(listener);
        Ok(())
    }

    fn deregister_add_listener(
        &self,
        dn: &Dn,
        listener: &AddListenerSlot,
    ) -> Result<bool> {
        let removed = self.deregister(dn, |l| &mut l.add, |s: &AddListenerSlot| s.same_as(listener));
        trace!(%dn, ?listener, removed, "add listener deregistered");
        Ok(removed)
    }

    fn get_add_listeners(
        &self,
        dn: &Dn,
    ) -> Vec<AddListenerSlot> {
        self.listeners.get(dn).map(|l| l.add.clone()).unwrap_or_default()
    }

    fn register_delete_listener(
        &self,
        dn: &Dn,
        listener: DeleteListenerSlot,
    ) -> Result<()> {
        trace!(%dn, ?listener, "delete listener registered");
        self.listeners.entry(dn.clone()).or_default().delete.push(listener);
        Ok(())
    }

    fn deregister_delete_listener(
        &self,
        dn: &Dn,
        listener: &DeleteListenerSlot,
    ) -> Result<bool> {
        let removed = self.deregister(dn, |l| &mut l.delete, |s: &DeleteListenerSlot| s.same_as(listener));
        trace!(%dn, ?listener, removed, "delete listener deregistered");
        Ok(removed)
    }

    fn get_delete_listeners(
        &self,
        dn: &Dn,
    ) -> Vec<DeleteListenerSlot> {
        self.listeners.get(dn).map(|l| l.delete.clone()).unwrap_or_default()
    }

    fn register_change_listener(
        &self,
        dn: &Dn,
        listener: ChangeListenerSlot,
    ) -> Result<()> {
        trace!(%dn, ?listener, "change listener registered");
        self.listeners.entry(dn.clone()).or_default().change.push(listener);
        Ok(())
    }

    fn deregister_change_listener(
        &self,
        dn: &Dn,
        listener: &ChangeListenerSlot,
    ) -> Result<bool> {
        let removed = self.deregister(dn, |l| &mut l.change, |s: &ChangeListenerSlot| s.same_as(listener));
        trace!(%dn, ?listener, removed, "change listener deregistered");
        Ok(removed)
    }

    fn get_change_listeners(
        &self,
        dn: &Dn,
    ) -> Vec<ChangeListenerSlot> {
        self.listeners.get(dn).map(|l| l.change.clone()).unwrap_or_default()
    }
}
