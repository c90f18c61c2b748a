use std::fmt;
use std::sync::Arc;

use super::PropertyDefinition;
use super::RelationDefinition;
use crate::Constraint;

/// Type descriptor of a managed object.
///
/// A sub-type created with [`DefinitionBuilder::extends`] carries its parent's
/// properties, relations and constraints in addition to its own.
pub struct ManagedObjectDefinition {
    name: String,
    lineage: Vec<String>,
    is_abstract: bool,
    properties: Vec<Arc<PropertyDefinition>>,
    relations: Vec<Arc<RelationDefinition>>,
    constraints: Vec<Arc<Constraint>>,
}

impl ManagedObjectDefinition {
    pub fn builder(name: impl Into<String>) -> DefinitionBuilder {
        DefinitionBuilder {
            name: name.into(),
            lineage: Vec::new(),
            is_abstract: false,
            properties: Vec::new(),
            relations: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the super-types, nearest first.
    pub fn super_types(&self) -> &[String] {
        &self.lineage
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether this definition is `other` or one of its descendants.
    pub fn is_child_of(
        &self,
        other: &ManagedObjectDefinition,
    ) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) || self.lineage.iter().any(|n| n.eq_ignore_ascii_case(&other.name))
    }

    pub fn properties(&self) -> &[Arc<PropertyDefinition>] {
        &self.properties
    }

    pub fn property(
        &self,
        name: &str,
    ) -> Option<&Arc<PropertyDefinition>> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn relations(&self) -> &[Arc<RelationDefinition>] {
        &self.relations
    }

    pub fn relation(
        &self,
        name: &str,
    ) -> Option<&Arc<RelationDefinition>> {
        self.relations.iter().find(|r| r.name() == name)
    }

    /// Constraints declared here and by every super-type.
    pub fn all_constraints(&self) -> &[Arc<Constraint>] {
        &self.constraints
    }
}

impl fmt::Debug for ManagedObjectDefinition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ManagedObjectDefinition")
            .field("name", &self.name)
            .field("abstract", &self.is_abstract)
            .field("properties", &self.properties.len())
            .field("relations", &self.relations.len())
            .finish()
    }
}

pub struct DefinitionBuilder {
    name: String,
    lineage: Vec<String>,
    is_abstract: bool,
    properties: Vec<Arc<PropertyDefinition>>,
    relations: Vec<Arc<RelationDefinition>>,
    constraints: Vec<Arc<Constraint>>,
}

impl DefinitionBuilder {
    pub fn extends(
        mut self,
        parent: &Arc<ManagedObjectDefinition>,
    ) -> Self {
        self.lineage.push(parent.name.clone());
        self.lineage.extend(parent.lineage.iter().cloned());
        self.properties.extend(parent.properties.iter().cloned());
        self.relations.extend(parent.relations.iter().cloned());
        self.constraints.extend(parent.constraints.iter().cloned());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Redeclaring an inherited property replaces it.
    pub fn property(
        mut self,
        property: PropertyDefinition,
    ) -> Self {
        self.properties.retain(|p| p.name() != property.name());
        self.properties.push(Arc::new(property));
        self
    }

    pub fn relation(
        mut self,
        relation: Arc<RelationDefinition>,
    ) -> Self {
        self.relations.retain(|r| r.name() != relation.name());
        self.relations.push(relation);
        self
    }

    pub fn constraint(
        mut self,
        constraint: Constraint,
    ) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    pub fn build(self) -> Arc<ManagedObjectDefinition> {
        Arc::new(ManagedObjectDefinition {
            name: self.name,
            lineage: self.lineage,
            is_abstract: self.is_abstract,
            properties: self.properties,
            relations: self.relations,
            constraints: self.constraints,
        })
    }
}
