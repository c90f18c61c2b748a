use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::debug;
use tracing::warn;

use super::delayed;
use super::delayed::DelayedTarget;
use super::delayed::TerminalMatch;
use super::listener::ListenerKey;
use super::listener::ListenerLevel;
use super::ConfigAddListenerAdaptor;
use super::ConfigChangeListenerAdaptor;
use super::ConfigDeleteListenerAdaptor;
use super::Configuration;
use super::ConfigurationAddListener;
use super::ConfigurationAddListenerBridge;
use super::ConfigurationChangeListener;
use super::ConfigurationChangeListenerBridge;
use super::ConfigurationDeleteListener;
use super::ConfigurationDeleteListenerBridge;
use super::ServerManagedObjectAddListener;
use super::ServerManagedObjectChangeListener;
use super::ServerManagedObjectDeleteListener;
use super::ServerManagementContext;
use crate::constraint;
use crate::ChangeListenerSlot;
use crate::ConfigurationError;
use crate::ConstraintViolation;
use crate::Dn;
use crate::ManagedObjectDefinition;
use crate::ManagedObjectPath;
use crate::PropertyDefinition;
use crate::PropertyValue;
use crate::RelationDefinition;
use crate::RelationKind;
use crate::Result;

/// Decoded view of one configuration entry.
///
/// Holds one value set per declared property; an empty set means the
/// property's default behaviour applies. The DN is `None` for the root only.
pub struct ServerManagedObject {
    path: ManagedObjectPath,
    definition: Arc<ManagedObjectDefinition>,
    properties: BTreeMap<String, BTreeSet<PropertyValue>>,
    dn: ArcSwapOption<Dn>,
    context: ServerManagementContext,
}

impl ServerManagedObject {
    pub(crate) fn new(
        path: ManagedObjectPath,
        definition: Arc<ManagedObjectDefinition>,
        properties: BTreeMap<String, BTreeSet<PropertyValue>>,
        dn: Option<Dn>,
        context: ServerManagementContext,
    ) -> Self {
        Self {
            path,
            definition,
            properties,
            dn: ArcSwapOption::from(dn.map(Arc::new)),
            context,
        }
    }

    pub fn path(&self) -> &ManagedObjectPath {
        &self.path
    }

    pub fn definition(&self) -> &Arc<ManagedObjectDefinition> {
        &self.definition
    }

    pub fn context(&self) -> &ServerManagementContext {
        &self.context
    }

    /// DN of the backing entry; `None` for the root managed object.
    pub fn dn(&self) -> Option<Dn> {
        self.dn.load_full().map(|dn| (*dn).clone())
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Typed view of this managed object.
    pub fn configuration<C: Configuration>(self: &Arc<Self>) -> C {
        C::from_managed_object(self.clone())
    }

    /// First effective value of `property`, if any.
    pub fn get_property_value(
        &self,
        property: &PropertyDefinition,
    ) -> Result<Option<PropertyValue>> {
        Ok(self.values_of(property)?.iter().next().cloned())
    }

    pub fn get_property_values(
        &self,
        property: &PropertyDefinition,
    ) -> Result<BTreeSet<PropertyValue>> {
        Ok(self.values_of(property)?.clone())
    }

    fn values_of(
        &self,
        property: &PropertyDefinition,
    ) -> Result<&BTreeSet<PropertyValue>> {
        self.properties
            .get(property.name())
            .filter(|_| self.definition.property(property.name()).is_some())
            .ok_or_else(|| {
                ConfigurationError::UnknownProperty {
                    property: property.name().to_string(),
                    definition: self.definition.name().to_string(),
                }
                .into()
            })
    }

    /// Child of a singleton or optional relation.
    pub fn get_child(
        &self,
        relation: &Arc<RelationDefinition>,
    ) -> Result<Arc<ServerManagedObject>> {
        self.validate_relation(relation)?;
        require_kind(relation, &[RelationKind::Singleton, RelationKind::Optional])?;
        let path = self.path.child(relation, None)?;
        self.context.get_managed_object(&path)
    }

    /// Named child of an instantiable or set relation.
    pub fn get_named_child(
        &self,
        relation: &Arc<RelationDefinition>,
        name: &str,
    ) -> Result<Arc<ServerManagedObject>> {
        self.validate_relation(relation)?;
        require_kind(relation, &[RelationKind::Instantiable, RelationKind::Set])?;
        let path = self.path.child(relation, Some(name))?;
        self.context.get_managed_object(&path)
    }

    /// Names of the children of an instantiable or set relation.
    pub fn list_children(
        &self,
        relation: &Arc<RelationDefinition>,
    ) -> Result<Vec<String>> {
        self.validate_relation(relation)?;
        require_kind(relation, &[RelationKind::Instantiable, RelationKind::Set])?;
        self.context.list_managed_objects(&self.path, relation)
    }

    /// Whether the child of an optional relation exists.
    pub fn has_child(
        &self,
        relation: &Arc<RelationDefinition>,
    ) -> Result<bool> {
        self.validate_relation(relation)?;
        require_kind(relation, &[RelationKind::Optional])?;
        let path = self.path.child(relation, None)?;
        self.context.managed_object_exists(&path)
    }

    pub fn register_add_listener<C: Configuration>(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: Arc<dyn ConfigurationAddListener<C>>,
    ) -> Result<()> {
        let key = ListenerKey::of(&listener, ListenerLevel::Data);
        let bridge = Arc::new(ConfigurationAddListenerBridge::new(listener));
        self.register_add_adaptor(relation, bridge, key)
    }

    pub fn register_object_add_listener(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: Arc<dyn ServerManagedObjectAddListener>,
    ) -> Result<()> {
        let key = ListenerKey::of(&listener, ListenerLevel::Object);
        self.register_add_adaptor(relation, listener, key)
    }

    pub fn deregister_add_listener<C: Configuration>(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: &Arc<dyn ConfigurationAddListener<C>>,
    ) -> Result<()> {
        let key = ListenerKey::of(listener, ListenerLevel::Data);
        self.deregister_terminal(relation, TerminalMatch::Add(key))
    }

    pub fn deregister_object_add_listener(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: &Arc<dyn ServerManagedObjectAddListener>,
    ) -> Result<()> {
        let key = ListenerKey::of(listener, ListenerLevel::Object);
        self.deregister_terminal(relation, TerminalMatch::Add(key))
    }

    pub fn register_delete_listener<C: Configuration>(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: Arc<dyn ConfigurationDeleteListener<C>>,
    ) -> Result<()> {
        let key = ListenerKey::of(&listener, ListenerLevel::Data);
        let bridge = Arc::new(ConfigurationDeleteListenerBridge::new(listener));
        self.register_delete_adaptor(relation, bridge, key)
    }

    pub fn register_object_delete_listener(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: Arc<dyn ServerManagedObjectDeleteListener>,
    ) -> Result<()> {
        let key = ListenerKey::of(&listener, ListenerLevel::Object);
        self.register_delete_adaptor(relation, listener, key)
    }

    pub fn deregister_delete_listener<C: Configuration>(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: &Arc<dyn ConfigurationDeleteListener<C>>,
    ) -> Result<()> {
        let key = ListenerKey::of(listener, ListenerLevel::Data);
        self.deregister_terminal(relation, TerminalMatch::Delete(key))
    }

    pub fn deregister_object_delete_listener(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: &Arc<dyn ServerManagedObjectDeleteListener>,
    ) -> Result<()> {
        let key = ListenerKey::of(listener, ListenerLevel::Object);
        self.deregister_terminal(relation, TerminalMatch::Delete(key))
    }

    /// Registers for changes to this object's own entry.
    ///
    /// Registration marks the object as part of the server configuration, so
    /// the post-add hooks of its constraints run once it succeeds.
    pub fn register_change_listener<C: Configuration>(
        &self,
        listener: Arc<dyn ConfigurationChangeListener<C>>,
    ) -> Result<()> {
        let key = ListenerKey::of(&listener, ListenerLevel::Data);
        let bridge = Arc::new(ConfigurationChangeListenerBridge::new(listener));
        self.register_change_adaptor(bridge, key)
    }

    pub fn register_object_change_listener(
        &self,
        listener: Arc<dyn ServerManagedObjectChangeListener>,
    ) -> Result<()> {
        let key = ListenerKey::of(&listener, ListenerLevel::Object);
        self.register_change_adaptor(listener, key)
    }

    pub fn deregister_change_listener<C: Configuration>(
        &self,
        listener: &Arc<dyn ConfigurationChangeListener<C>>,
    ) -> Result<()> {
        self.deregister_change_adaptor(ListenerKey::of(listener, ListenerLevel::Data))
    }

    pub fn deregister_object_change_listener(
        &self,
        listener: &Arc<dyn ServerManagedObjectChangeListener>,
    ) -> Result<()> {
        self.deregister_change_adaptor(ListenerKey::of(listener, ListenerLevel::Object))
    }

    /// Fails with every reason a constraint handler gives for this object being unusable.
    pub fn ensure_is_usable(self: &Arc<Self>) -> std::result::Result<(), ConstraintViolation> {
        constraint::ensure_is_usable(self)
    }

    /// Records the DN the backing entry turned out to have.
    pub(crate) fn set_config_dn(
        &self,
        dn: Dn,
    ) {
        self.dn.store(Some(Arc::new(dn)));
    }

    /// DN of the backing entry, the configured root DN for the root object.
    pub(crate) fn entry_dn(&self) -> Dn {
        match self.dn.load_full() {
            Some(dn) => (*dn).clone(),
            None => self.context.dn_builder().create(&self.path),
        }
    }

    fn validate_relation(
        &self,
        relation: &Arc<RelationDefinition>,
    ) -> Result<()> {
        let declared = self
            .definition
            .relation(relation.name())
            .is_some_and(|r| Arc::ptr_eq(r, relation));
        if declared {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownRelation {
                relation: relation.name().to_string(),
                definition: self.definition.name().to_string(),
            }
            .into())
        }
    }

    /// Entry the add/delete listeners of `relation` watch.
    fn listener_base_dn(
        &self,
        relation: &Arc<RelationDefinition>,
    ) -> Result<Dn> {
        self.validate_relation(relation)?;
        require_kind(
            relation,
            &[RelationKind::Instantiable, RelationKind::Set, RelationKind::Optional],
        )?;
        Ok(self.context.dn_builder().relation_base_dn(&self.path, relation))
    }

    fn register_add_adaptor(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: Arc<dyn ServerManagedObjectAddListener>,
        key: ListenerKey,
    ) -> Result<()> {
        let base_dn = self.listener_base_dn(relation)?;
        let adaptor = Arc::new(ConfigAddListenerAdaptor::new(
            self.context.clone(),
            self.path.clone(),
            relation.clone(),
            listener,
            key,
        )?);
        let repository = self.context.repository()?;
        debug!(path = %self.path, relation = relation.name(), %base_dn, "registering add listener");
        delayed::register_with_delay(
            &repository,
            &base_dn,
            DelayedTarget::Add(adaptor),
            self.context.max_delayed_depth(),
        )
    }

    fn register_delete_adaptor(
        &self,
        relation: &Arc<RelationDefinition>,
        listener: Arc<dyn ServerManagedObjectDeleteListener>,
        key: ListenerKey,
    ) -> Result<()> {
        let base_dn = self.listener_base_dn(relation)?;
        let adaptor = Arc::new(ConfigDeleteListenerAdaptor::new(
            self.context.clone(),
            self.path.clone(),
            relation.clone(),
            listener,
            key,
        )?);
        let repository = self.context.repository()?;
        debug!(path = %self.path, relation = relation.name(), %base_dn, "registering delete listener");
        delayed::register_with_delay(
            &repository,
            &base_dn,
            DelayedTarget::Delete(adaptor),
            self.context.max_delayed_depth(),
        )
    }

    fn deregister_terminal(
        &self,
        relation: &Arc<RelationDefinition>,
        terminal: TerminalMatch,
    ) -> Result<()> {
        let base_dn = self.listener_base_dn(relation)?;
        delayed::deregister_with_delay(&self.context, &base_dn, terminal);
        Ok(())
    }

    fn register_change_adaptor(
        &self,
        listener: Arc<dyn ServerManagedObjectChangeListener>,
        key: ListenerKey,
    ) -> Result<()> {
        let dn = self.entry_dn();
        let adaptor = ConfigChangeListenerAdaptor::new(self.context.clone(), self.path.clone(), listener, key)?;
        let registered = self
            .context
            .repository()
            .and_then(|r| r.register_change_listener(&dn, ChangeListenerSlot::Adaptor(adaptor.clone())));
        if let Err(e) = registered {
            // The dependency and cleaner listeners are already in place.
            adaptor.finalize_change_handler();
            return Err(e);
        }
        debug!(path = %self.path, %dn, "change listener registered");

        constraint::perform_post_add(self);
        Ok(())
    }

    fn deregister_change_adaptor(
        &self,
        key: ListenerKey,
    ) -> Result<()> {
        let dn = self.entry_dn();
        let repository = match self.context.repository() {
            Ok(r) => r,
            Err(e) => {
                warn!(%dn, "Unable to deregister change listener: {}", e);
                return Ok(());
            }
        };
        for slot in repository.get_change_listeners(&dn) {
            if let ChangeListenerSlot::Adaptor(adaptor) = &slot {
                if adaptor.key() == key {
                    adaptor.finalize_change_handler();
                    if let Err(e) = repository.deregister_change_listener(&dn, &slot) {
                        warn!(%dn, "Unable to deregister change listener: {}", e);
                    }
                }
            }
        }
        Ok(())
    }
}

fn require_kind(
    relation: &RelationDefinition,
    allowed: &[RelationKind],
) -> Result<()> {
    if allowed.contains(&relation.kind()) {
        Ok(())
    } else {
        Err(ConfigurationError::UnsupportedRelation {
            relation: relation.name().to_string(),
            kind: relation.kind().name(),
        }
        .into())
    }
}

impl fmt::Display for ServerManagedObject {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{{ TYPE={}, PATH=\"{}\"", self.definition.name(), self.path)?;
        for (name, values) in &self.properties {
            let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
            write!(f, ", {}={:?}", name, rendered)?;
        }
        f.write_str(" }")
    }
}

impl fmt::Debug for ServerManagedObject {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ServerManagedObject")
            .field("path", &self.path)
            .field("definition", &self.definition.name())
            .field("dn", &self.dn())
            .field("properties", &self.properties)
            .finish()
    }
}
