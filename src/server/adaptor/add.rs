use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;
use tracing::trace;

use super::child_path;
use super::unaccepted_apply_message;
use crate::constraint;
use crate::server::listener::ListenerKey;
use crate::ConfigAddListener;
use crate::ConfigChangeResult;
use crate::Dn;
use crate::Entry;
use crate::ManagedObjectPath;
use crate::RelationDefinition;
use crate::RelationKind;
use crate::Result;
use crate::ResultCode;
use crate::ServerManagedObject;
use crate::ServerManagedObjectAddListener;
use crate::ServerManagementContext;
use crate::UnacceptableReasons;

/// Raw add listener forwarding to an object-level add listener.
pub struct ConfigAddListenerAdaptor {
    context: ServerManagementContext,
    path: ManagedObjectPath,
    relation: Arc<RelationDefinition>,
    /// Only DN an optional relation's child can have
    optional_child_dn: Option<Dn>,
    listener: Arc<dyn ServerManagedObjectAddListener>,
    key: ListenerKey,
    cached: Mutex<Option<Arc<ServerManagedObject>>>,
}

impl ConfigAddListenerAdaptor {
    pub(crate) fn new(
        context: ServerManagementContext,
        path: ManagedObjectPath,
        relation: Arc<RelationDefinition>,
        listener: Arc<dyn ServerManagedObjectAddListener>,
        key: ListenerKey,
    ) -> Result<Self> {
        let optional_child_dn = match relation.kind() {
            RelationKind::Optional => Some(context.dn_builder().create(&path.child(&relation, None)?)),
            _ => None,
        };
        Ok(Self {
            context,
            path,
            relation,
            optional_child_dn,
            listener,
            key,
            cached: Mutex::new(None),
        })
    }

    /// Path of the managed object whose children are watched.
    pub fn path(&self) -> &ManagedObjectPath {
        &self.path
    }

    pub fn relation(&self) -> &Arc<RelationDefinition> {
        &self.relation
    }

    pub fn server_managed_object_add_listener(&self) -> &Arc<dyn ServerManagedObjectAddListener> {
        &self.listener
    }

    pub(crate) fn key(&self) -> ListenerKey {
        self.key
    }

    fn is_other_optional_child(
        &self,
        entry: &Entry,
    ) -> bool {
        self.optional_child_dn.as_ref().is_some_and(|dn| dn != entry.dn())
    }
}

impl ConfigAddListener for ConfigAddListenerAdaptor {
    fn config_add_is_acceptable(
        &self,
        entry: &Entry,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        if self.is_other_optional_child(entry) {
            trace!(dn = %entry.dn(), relation = self.relation.name(), "not the optional child, no opinion");
            return true;
        }

        let managed_object = match child_path(&self.path, &self.relation, entry)
            .and_then(|path| self.context.decode(&path, entry, None))
        {
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

        self.listener.is_configuration_add_acceptable(&managed_object, reasons)
    }

    fn apply_configuration_add(
        &self,
        entry: &Entry,
    ) -> ConfigChangeResult {
        if self.is_other_optional_child(entry) {
            return ConfigChangeResult::new();
        }

        let cached = self.cached.lock().take();
        let managed_object = match cached {
            Some(managed_object) if managed_object.dn().as_ref() == Some(entry.dn()) => managed_object,
            _ => {
                error!(dn = %entry.dn(), relation = self.relation.name(), "add applied without a matching accept");
                return ConfigChangeResult::failure(ResultCode::OperationsError, unaccepted_apply_message("addition", entry));
            }
        };

        let result = self.listener.apply_configuration_add(&managed_object);
        if result.is_success() {
            constraint::perform_post_add(&managed_object);
        }
        result
    }
}

impl fmt::Debug for ConfigAddListenerAdaptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConfigAddListenerAdaptor")
            .field("path", &self.path)
            .field("relation", &self.relation.name())
            .field("key", &self.key)
            .finish()
    }
}
