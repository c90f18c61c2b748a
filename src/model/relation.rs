use std::fmt;
use std::sync::Arc;

use super::ManagedObjectDefinition;
use super::Rdn;
use crate::constants::DEFAULT_NAMING_ATTRIBUTE;

/// How a parent addresses its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Exactly one child at a fixed location
    Singleton,
    /// Zero or one child at a fixed location
    Optional,
    /// Zero or more named children
    Instantiable,
    /// Zero or more children, each named after one of the declared sub-types
    Set,
}

impl RelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Singleton => "singleton",
            RelationKind::Optional => "optional",
            RelationKind::Instantiable => "instantiable",
            RelationKind::Set => "set",
        }
    }

    /// Whether children are told apart by name.
    pub fn is_named(&self) -> bool {
        matches!(self, RelationKind::Instantiable | RelationKind::Set)
    }
}

pub struct RelationDefinition {
    name: String,
    kind: RelationKind,
    child: Arc<ManagedObjectDefinition>,
    rdn: Option<Rdn>,
    naming_attribute: Option<String>,
    subtypes: Vec<Arc<ManagedObjectDefinition>>,
}

impl RelationDefinition {
    fn new(
        name: impl Into<String>,
        kind: RelationKind,
        child: Arc<ManagedObjectDefinition>,
    ) -> Self {
        let name = name.into();
        let rdn = match kind {
            RelationKind::Singleton | RelationKind::Optional => Some(Rdn::new(DEFAULT_NAMING_ATTRIBUTE, name.clone())),
            RelationKind::Instantiable | RelationKind::Set => None,
        };
        Self {
            name,
            kind,
            child,
            rdn,
            naming_attribute: None,
            subtypes: Vec::new(),
        }
    }

    /// The child lives at `cn=<name>` below its parent unless [`Self::with_rdn`] says otherwise.
    pub fn singleton(
        name: impl Into<String>,
        child: Arc<ManagedObjectDefinition>,
    ) -> Self {
        Self::new(name, RelationKind::Singleton, child)
    }

    pub fn optional(
        name: impl Into<String>,
        child: Arc<ManagedObjectDefinition>,
    ) -> Self {
        Self::new(name, RelationKind::Optional, child)
    }

    /// Children are named directly below the parent unless a container is declared.
    pub fn instantiable(
        name: impl Into<String>,
        child: Arc<ManagedObjectDefinition>,
    ) -> Self {
        Self::new(name, RelationKind::Instantiable, child)
    }

    pub fn set(
        name: impl Into<String>,
        child: Arc<ManagedObjectDefinition>,
        subtypes: Vec<Arc<ManagedObjectDefinition>>,
    ) -> Self {
        let mut relation = Self::new(name, RelationKind::Set, child);
        relation.subtypes = subtypes;
        relation
    }

    /// Fixed RDN of a singleton or optional child.
    pub fn with_rdn(
        mut self,
        rdn: Rdn,
    ) -> Self {
        if !self.kind.is_named() {
            self.rdn = Some(rdn);
        }
        self
    }

    /// Entry holding the children of an instantiable or set relation.
    pub fn with_container(
        mut self,
        rdn: Rdn,
    ) -> Self {
        if self.kind.is_named() {
            self.rdn = Some(rdn);
        }
        self
    }

    pub fn with_naming_attribute(
        mut self,
        attribute: impl Into<String>,
    ) -> Self {
        self.naming_attribute = Some(attribute.into());
        self
    }

    /// Concrete types an instantiable relation's children may decode to.
    pub fn with_subtypes(
        mut self,
        subtypes: Vec<Arc<ManagedObjectDefinition>>,
    ) -> Self {
        self.subtypes = subtypes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn child_definition(&self) -> &Arc<ManagedObjectDefinition> {
        &self.child
    }

    /// Child RDN for singleton/optional relations.
    pub fn rdn(&self) -> Option<&Rdn> {
        if self.kind.is_named() {
            None
        } else {
            self.rdn.as_ref()
        }
    }

    /// Container RDN for instantiable/set relations.
    pub fn container(&self) -> Option<&Rdn> {
        if self.kind.is_named() {
            self.rdn.as_ref()
        } else {
            None
        }
    }

    pub fn naming_attribute(&self) -> Option<&str> {
        self.naming_attribute.as_deref()
    }

    pub fn subtypes(&self) -> &[Arc<ManagedObjectDefinition>] {
        &self.subtypes
    }

    pub fn subtype(
        &self,
        name: &str,
    ) -> Option<&Arc<ManagedObjectDefinition>> {
        self.subtypes.iter().find(|d| d.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Debug for RelationDefinition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RelationDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("child", &self.child.name())
            .finish()
    }
}
