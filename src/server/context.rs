use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use tracing::trace;

use super::ServerManagedObject;
use crate::constants::MAX_INHERITANCE_HOPS;
use crate::ConfigurationError;
use crate::ConfigurationRepository;
use crate::DecodingError;
use crate::DefaultBehavior;
use crate::Dn;
use crate::DnBuilder;
use crate::EngineConfig;
use crate::Entry;
use crate::ManagedObjectDefinition;
use crate::ManagedObjectPath;
use crate::PropertyDefinition;
use crate::PropertyError;
use crate::PropertyValue;
use crate::RelationDefinition;
use crate::Result;

/// Decoding and navigation services shared by every managed object.
///
/// Cloning is cheap. The repository is held weakly: it owns the listener
/// graph that points back at contexts.
#[derive(Clone)]
pub struct ServerManagementContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    repository: Weak<dyn ConfigurationRepository>,
    root_definition: Arc<ManagedObjectDefinition>,
    dn_builder: DnBuilder,
    max_delayed_depth: usize,
}

impl ServerManagementContext {
    pub fn new<R>(
        repository: &Arc<R>,
        root_definition: Arc<ManagedObjectDefinition>,
        config: &EngineConfig,
    ) -> Result<Self>
    where
        R: ConfigurationRepository + 'static,
    {
        let repository: Arc<dyn ConfigurationRepository> = repository.clone();
        let dn_builder = DnBuilder::new(config.naming.root_dn()?, config.naming.naming_attribute.clone());
        Ok(Self {
            inner: Arc::new(ContextInner {
                repository: Arc::downgrade(&repository),
                root_definition,
                dn_builder,
                max_delayed_depth: config.registration.max_delayed_depth,
            }),
        })
    }

    /// The repository, failing once it has been dropped.
    pub fn repository(&self) -> Result<Arc<dyn ConfigurationRepository>> {
        self.inner
            .repository
            .upgrade()
            .ok_or_else(|| ConfigurationError::RepositoryUnavailable.into())
    }

    pub fn dn_builder(&self) -> &DnBuilder {
        &self.inner.dn_builder
    }

    pub fn root_definition(&self) -> &Arc<ManagedObjectDefinition> {
        &self.inner.root_definition
    }

    pub fn max_delayed_depth(&self) -> usize {
        self.inner.max_delayed_depth
    }

    /// Root of the managed object tree.
    ///
    /// Properties come from the root entry when it exists, defaults otherwise.
    pub fn root_managed_object(&self) -> Result<Arc<ServerManagedObject>> {
        let root_dn = self.inner.dn_builder.root_dn();
        match self.repository()?.get_entry(root_dn)? {
            Some(entry) => self.decode(&ManagedObjectPath::empty(), &entry, None),
            None => {
                let definition = self.inner.root_definition.clone();
                let properties = definition
                    .properties()
                    .iter()
                    .map(|p| (p.name().to_string(), BTreeSet::new()))
                    .collect();
                Ok(Arc::new(ServerManagedObject::new(
                    ManagedObjectPath::empty(),
                    definition,
                    properties,
                    None,
                    self.clone(),
                )))
            }
        }
    }

    pub fn get_managed_object(
        &self,
        path: &ManagedObjectPath,
    ) -> Result<Arc<ServerManagedObject>> {
        if path.is_empty() {
            return self.root_managed_object();
        }
        let dn = self.inner.dn_builder.create(path);
        let entry = self
            .repository()?
            .get_entry(&dn)?
            .ok_or(ConfigurationError::EntryNotFound { dn })?;
        self.decode(path, &entry, None)
    }

    pub fn managed_object_exists(
        &self,
        path: &ManagedObjectPath,
    ) -> Result<bool> {
        if path.is_empty() {
            return Ok(true);
        }
        self.repository()?.has_entry(&self.inner.dn_builder.create(path))
    }

    /// Names of the children of `parent` reachable through `relation`.
    pub fn list_managed_objects(
        &self,
        parent: &ManagedObjectPath,
        relation: &RelationDefinition,
    ) -> Result<Vec<String>> {
        let repository = self.repository()?;
        let base_dn = self.inner.dn_builder.relation_base_dn(parent, relation);
        if !repository.has_entry(&base_dn)? {
            return Ok(Vec::new());
        }
        let attribute = relation
            .naming_attribute()
            .unwrap_or(self.inner.dn_builder.naming_attribute());
        let names = repository
            .get_children(&base_dn)?
            .into_iter()
            .filter_map(|dn| {
                dn.rdn()
                    .filter(|rdn| rdn.attribute().eq_ignore_ascii_case(attribute))
                    .map(|rdn| rdn.value().to_string())
            })
            .collect();
        Ok(names)
    }

    /// Turns `entry` into the managed object at `path`.
    ///
    /// The concrete definition is the most derived candidate whose object class
    /// the entry carries. `extra` stands in for the entry at its own DN when
    /// resolving inherited default values.
    pub fn decode(
        &self,
        path: &ManagedObjectPath,
        entry: &Entry,
        extra: Option<&Entry>,
    ) -> Result<Arc<ServerManagedObject>> {
        let definition = self.resolve_definition(path, entry)?;

        let mut properties = BTreeMap::new();
        let mut problems = Vec::new();
        for property in definition.properties() {
            match self.decode_property(property, entry, extra) {
                Ok(values) => {
                    properties.insert(property.name().to_string(), values);
                }
                Err(mut errors) => problems.append(&mut errors),
            }
        }
        if !problems.is_empty() {
            return Err(DecodingError::Property {
                dn: entry.dn().clone(),
                problems,
            }
            .into());
        }

        trace!(dn = %entry.dn(), %path, definition = definition.name(), "configuration entry decoded");
        let dn = if path.is_empty() { None } else { Some(entry.dn().clone()) };
        Ok(Arc::new(ServerManagedObject::new(
            path.with_definition(definition.clone()),
            definition,
            properties,
            dn,
            self.clone(),
        )))
    }

    fn resolve_definition(
        &self,
        path: &ManagedObjectPath,
        entry: &Entry,
    ) -> Result<Arc<ManagedObjectDefinition>> {
        let Some(last) = path.last() else {
            return Ok(self.inner.root_definition.clone());
        };
        let expected = last.definition();

        let definition = std::iter::once(expected)
            .chain(last.relation().subtypes().iter().filter(|d| d.is_child_of(expected)))
            .filter(|d| entry.has_object_class(d.name()))
            .max_by_key(|d| d.super_types().len())
            .cloned()
            .ok_or_else(|| DecodingError::WrongType {
                dn: entry.dn().clone(),
                expected: expected.name().to_string(),
            })?;

        if definition.is_abstract() {
            return Err(DecodingError::AbstractDefinition {
                dn: entry.dn().clone(),
                definition: definition.name().to_string(),
            }
            .into());
        }
        Ok(definition)
    }

    /// Effective values: explicit ones, else the default behaviour's.
    fn decode_property(
        &self,
        property: &PropertyDefinition,
        entry: &Entry,
        extra: Option<&Entry>,
    ) -> std::result::Result<BTreeSet<PropertyValue>, Vec<PropertyError>> {
        let explicit = entry.attribute_values(&property.attribute_name());
        let values = if !explicit.is_empty() {
            property.decode_values(explicit.iter().map(String::as_str))?
        } else {
            match property.default_behavior() {
                DefaultBehavior::Undefined => BTreeSet::new(),
                DefaultBehavior::Defined(defaults) => property.decode_values(defaults.iter().map(String::as_str))?,
                DefaultBehavior::Inherited { dn, property: source } => {
                    self.inherited_values(property, dn, source, extra, 0)?
                }
            }
        };

        if values.is_empty() && property.is_mandatory() {
            return Err(vec![PropertyError::MissingValue {
                property: property.name().to_string(),
            }]);
        }
        Ok(values)
    }

    fn inherited_values(
        &self,
        property: &PropertyDefinition,
        dn: &Dn,
        source: &str,
        extra: Option<&Entry>,
        hops: usize,
    ) -> std::result::Result<BTreeSet<PropertyValue>, Vec<PropertyError>> {
        let fetched;
        let entry = match extra.filter(|e| e.dn() == dn) {
            Some(e) => Some(e),
            None => {
                // An unreachable source entry leaves the default undefined.
                fetched = self
                    .repository()
                    .ok()
                    .and_then(|r| r.get_entry(dn).ok())
                    .flatten();
                fetched.as_ref()
            }
        };
        let Some(entry) = entry else {
            return Ok(BTreeSet::new());
        };

        let raw = entry.attribute_values(&source.to_ascii_lowercase());
        if !raw.is_empty() {
            return property.decode_values(raw.iter().map(String::as_str));
        }
        // The source leaves the attribute unset: its own default applies.
        match self.source_property(entry, source).map(|p| p.default_behavior().clone()) {
            Some(DefaultBehavior::Defined(defaults)) => property.decode_values(defaults.iter().map(String::as_str)),
            Some(DefaultBehavior::Inherited { dn: next, property: next_source }) if hops < MAX_INHERITANCE_HOPS => {
                self.inherited_values(property, &next, &next_source, extra, hops + 1)
            }
            _ => Ok(BTreeSet::new()),
        }
    }

    /// Declaration of `name` in the most derived model definition `entry` is an instance of.
    fn source_property(
        &self,
        entry: &Entry,
        name: &str,
    ) -> Option<Arc<PropertyDefinition>> {
        let mut pending = vec![self.inner.root_definition.clone()];
        let mut found: Option<Arc<ManagedObjectDefinition>> = None;
        while let Some(definition) = pending.pop() {
            let more_derived = found
                .as_ref()
                .map_or(true, |f| definition.super_types().len() > f.super_types().len());
            if more_derived && entry.has_object_class(definition.name()) && definition.property(name).is_some() {
                found = Some(definition.clone());
            }
            for relation in definition.relations() {
                pending.push(relation.child_definition().clone());
                pending.extend(relation.subtypes().iter().cloned());
            }
        }
        found.and_then(|d| d.property(name).cloned())
    }
}

impl fmt::Debug for ServerManagementContext {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ServerManagementContext")
            .field("root_dn", self.inner.dn_builder.root_dn())
            .field("root_definition", &self.inner.root_definition.name())
            .field("repository_alive", &(self.inner.repository.strong_count() > 0))
            .finish()
    }
}
