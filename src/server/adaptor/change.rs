use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::unaccepted_apply_message;
use crate::constraint;
use crate::server::listener::ListenerKey;
use crate::ChangeListenerSlot;
use crate::ConfigChangeListener;
use crate::ConfigChangeResult;
use crate::ConfigDeleteListener;
use crate::ConfigurationRepository;
use crate::DefaultBehavior;
use crate::DeleteListenerSlot;
use crate::Dn;
use crate::Entry;
use crate::ManagedObjectPath;
use crate::Result;
use crate::ResultCode;
use crate::ServerManagedObject;
use crate::ServerManagedObjectChangeListener;
use crate::ServerManagementContext;
use crate::UnacceptableReasons;

/// Raw change listener forwarding to an object-level change listener.
///
/// Properties whose default is inherited from another entry make that entry a
/// dependency: a proposed change there is re-checked against this object, and
/// applying it re-applies this object. The dependency listeners are removed
/// when the object's entry is deleted or the listener is deregistered.
pub struct ConfigChangeListenerAdaptor {
    context: ServerManagementContext,
    path: ManagedObjectPath,
    dn: Dn,
    listener: Arc<dyn ServerManagedObjectChangeListener>,
    key: ListenerKey,
    cached: Mutex<Option<Arc<ServerManagedObject>>>,
    dependencies: Vec<Dn>,
    dependency_slot: ChangeListenerSlot,
    cleaner_slot: DeleteListenerSlot,
    finalized: AtomicBool,
}

impl ConfigChangeListenerAdaptor {
    pub(crate) fn new(
        context: ServerManagementContext,
        path: ManagedObjectPath,
        listener: Arc<dyn ServerManagedObjectChangeListener>,
        key: ListenerKey,
    ) -> Result<Arc<Self>> {
        let repository = context.repository()?;
        let dn = context.dn_builder().create(&path);
        let dependencies = inherited_dependencies(&context, &path, &dn);

        let adaptor = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            context: context.clone(),
            path,
            dn: dn.clone(),
            listener,
            key,
            cached: Mutex::new(None),
            dependencies,
            dependency_slot: ChangeListenerSlot::Raw(Arc::new(DependencyChangeListener { adaptor: weak.clone() })),
            cleaner_slot: DeleteListenerSlot::Raw(Arc::new(CleanerDeleteListener {
                adaptor: weak.clone(),
                dn: dn.clone(),
            })),
            finalized: AtomicBool::new(false),
        });

        if let Err(e) = adaptor.register_helpers(repository.as_ref()) {
            adaptor.finalize_change_handler();
            return Err(e);
        }
        Ok(adaptor)
    }

    fn register_helpers(
        &self,
        repository: &dyn ConfigurationRepository,
    ) -> Result<()> {
        for dependency in &self.dependencies {
            if repository.has_entry(dependency)? {
                repository.register_change_listener(dependency, self.dependency_slot.clone())?;
                debug!(dn = %self.dn, %dependency, "dependency change listener registered");
            }
        }
        if !self.dependencies.is_empty() {
            if let Some(parent) = self.dn.parent() {
                repository.register_delete_listener(&parent, self.cleaner_slot.clone())?;
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &ManagedObjectPath {
        &self.path
    }

    pub fn server_managed_object_change_listener(&self) -> &Arc<dyn ServerManagedObjectChangeListener> {
        &self.listener
    }

    /// Entries whose changes can change this object's effective values.
    pub fn dependencies(&self) -> &[Dn] {
        &self.dependencies
    }

    pub(crate) fn key(&self) -> ListenerKey {
        self.key
    }

    /// Removes the dependency and cleaner listeners. Runs at most once.
    pub fn finalize_change_handler(&self) {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return;
        }
        let repository = match self.context.repository() {
            Ok(r) => r,
            Err(e) => {
                warn!(dn = %self.dn, "Unable to finalize change listener: {}", e);
                return;
            }
        };
        for dependency in &self.dependencies {
            if let Err(e) = repository.deregister_change_listener(dependency, &self.dependency_slot) {
                warn!(dn = %self.dn, %dependency, "Unable to deregister dependency listener: {}", e);
            }
        }
        if let Some(parent) = self.dn.parent() {
            if let Err(e) = repository.deregister_delete_listener(&parent, &self.cleaner_slot) {
                warn!(dn = %self.dn, "Unable to deregister cleaner listener: {}", e);
            }
        }
        debug!(dn = %self.dn, "change listener finalized");
    }

    /// Decodes `entry` as this object and checks it is usable.
    fn check(
        &self,
        entry: &Entry,
        extra: Option<&Entry>,
        reasons: &mut UnacceptableReasons,
    ) -> Option<Arc<ServerManagedObject>> {
        let managed_object = match self.context.decode(&self.path, entry, extra) {
            Ok(managed_object) => managed_object,
            Err(e) => {
                reasons.push(e.to_string());
                return None;
            }
        };
        if let Err(violation) = constraint::ensure_is_usable(&managed_object) {
            reasons.extend(violation.into_reasons());
            return None;
        }
        Some(managed_object)
    }

    fn current_entry(&self) -> Option<Entry> {
        self.context
            .repository()
            .and_then(|r| r.get_entry(&self.dn))
            .ok()
            .flatten()
    }

    fn dependency_change_is_acceptable(
        &self,
        dependency: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        let Some(entry) = self.current_entry() else {
            return true;
        };
        match self.check(&entry, Some(dependency), reasons) {
            Some(managed_object) => self.listener.is_configuration_change_acceptable(&managed_object, reasons),
            None => false,
        }
    }

    fn apply_dependency_change(
        &self,
        dependency: &Entry,
    ) -> ConfigChangeResult {
        let Some(entry) = self.current_entry() else {
            return ConfigChangeResult::new();
        };
        match self.context.decode(&self.path, &entry, Some(dependency)) {
            Ok(managed_object) => self.listener.apply_configuration_change(&managed_object),
            Err(e) => {
                error!(dn = %self.dn, dependency = %dependency.dn(), "Unable to re-apply after a dependency change: {}", e);
                ConfigChangeResult::failure(ResultCode::OperationsError, e.to_string())
            }
        }
    }
}

impl ConfigChangeListener for ConfigChangeListenerAdaptor {
    fn config_change_is_acceptable(
        &self,
        entry: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        let managed_object = match self.context.decode(&self.path, entry, None) {
            Ok(managed_object) => managed_object,
            Err(e) => {
                reasons.push(e.to_string());
                return false;
            }
        };

        *self.cached.lock() = Some(managed_object.clone());

        if let Err(violation) = constraint::ensure_is_usable(&managed_object) {
            reasons.extend(violation.into_reasons());
            return false;
        }

        self.listener.is_configuration_change_acceptable(&managed_object, reasons)
    }

    fn apply_configuration_change(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult {
        let Some(managed_object) = self.cached.lock().take() else {
            error!(dn = %entry.dn(), "change applied without a matching accept");
            return ConfigChangeResult::failure(ResultCode::OperationsError, unaccepted_apply_message("change", entry));
        };

        managed_object.set_config_dn(entry.dn().clone());
        self.listener.apply_configuration_change(&managed_object)
    }
}

impl fmt::Debug for ConfigChangeListenerAdaptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConfigChangeListenerAdaptor")
            .field("dn", &self.dn)
            .field("key", &self.key)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

fn inherited_dependencies(
    context: &ServerManagementContext,
    path: &ManagedObjectPath,
    dn: &Dn,
) -> Vec<Dn> {
    let definition = path.definition().unwrap_or(context.root_definition());
    let mut dependencies: Vec<Dn> = Vec::new();
    for property in definition.properties() {
        if let DefaultBehavior::Inherited { dn: source, .. } = property.default_behavior() {
            if source != dn && !dependencies.contains(source) {
                dependencies.push(source.clone());
            }
        }
    }
    dependencies
}

/// Watches one dependency on behalf of a change adaptor.
struct DependencyChangeListener {
    adaptor: Weak<ConfigChangeListenerAdaptor>,
}

impl ConfigChangeListener for DependencyChangeListener {
    fn config_change_is_acceptable(
        &self,
        entry: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        match self.adaptor.upgrade() {
            Some(adaptor) => adaptor.dependency_change_is_acceptable(entry, reasons),
            None => true,
        }
    }

    fn apply_configuration_change(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult {
        match self.adaptor.upgrade() {
            Some(adaptor) => adaptor.apply_dependency_change(entry),
            None => ConfigChangeResult::new(),
        }
    }
}

/// Finalizes a change adaptor once its entry is deleted.
struct CleanerDeleteListener {
    adaptor: Weak<ConfigChangeListenerAdaptor>,
    dn: Dn,
}

impl ConfigDeleteListener for CleanerDeleteListener {
    fn config_delete_is_acceptable(
        &self,
        _entry: &Entry,
        _reasons: &mut UnacceptableReasons,
    ) -> bool {
        true
    }

    fn apply_configuration_delete(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult {
        if entry.dn() == &self.dn {
            trace!(dn = %self.dn, "dependent entry deleted");
            if let Some(adaptor) = self.adaptor.upgrade() {
                adaptor.finalize_change_handler();
            }
        }
        ConfigChangeResult::new()
    }
}
