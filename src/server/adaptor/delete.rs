use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;
use tracing::trace;

use super::child_path;
use super::unaccepted_apply_message;
use crate::constraint;
use crate::server::listener::ListenerKey;
use crate::ConfigChangeResult;
use crate::ConfigDeleteListener;
use crate::Dn;
use crate::Entry;
use crate::ManagedObjectPath;
use crate::RelationDefinition;
use crate::RelationKind;
use crate::Result;
use crate::ResultCode;
use crate::ServerManagedObject;
use crate::ServerManagedObjectDeleteListener;
use crate::ServerManagementContext;
use crate::UnacceptableReasons;

/// Raw delete listener forwarding to an object-level delete listener.
pub struct ConfigDeleteListenerAdaptor {
    context: ServerManagementContext,
    path: ManagedObjectPath,
    relation: Arc<RelationDefinition>,
    optional_child_dn: Option<Dn>,
    listener: Arc<dyn ServerManagedObjectDeleteListener>,
    key: ListenerKey,
    cached: Mutex<Option<Arc<ServerManagedObject>>>,
}

impl ConfigDeleteListenerAdaptor {
    pub(crate) fn new(
        context: ServerManagementContext,
        path: ManagedObjectPath,
        relation: Arc<RelationDefinition>,
        listener: Arc<dyn ServerManagedObjectDeleteListener>,
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

    pub fn path(&self) -> &ManagedObjectPath {
        &self.path
    }

    pub fn relation(&self) -> &Arc<RelationDefinition> {
        &self.relation
    }

    pub fn server_managed_object_delete_listener(&self) -> &Arc<dyn ServerManagedObjectDeleteListener> {
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

impl ConfigDeleteListener for ConfigDeleteListenerAdaptor {
    fn config_delete_is_acceptable(
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

        if let Err(messages) = constraint::is_delete_allowed(&managed_object) {
            reasons.extend(messages);
            return false;
        }

        self.listener.is_configuration_delete_acceptable(&managed_object, reasons)
    }

    fn apply_configuration_delete(
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
                error!(dn = %entry.dn(), relation = self.relation.name(), "delete applied without a matching accept");
                return ConfigChangeResult::failure(ResultCode::OperationsError, unaccepted_apply_message("deletion", entry));
            }
        };

        let result = self.listener.apply_configuration_delete(&managed_object);
        if result.is_success() {
            constraint::perform_post_delete(&managed_object);
        }
        result
    }
}

impl fmt::Debug for ConfigDeleteListenerAdaptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConfigDeleteListenerAdaptor")
            .field("path", &self.path)
            .field("relation", &self.relation.name())
            .field("key", &self.key)
            .finish()
    }
}
