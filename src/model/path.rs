use std::fmt;
use std::sync::Arc;

use super::Dn;
use super::ManagedObjectDefinition;
use super::Rdn;
use super::RelationDefinition;
use super::RelationKind;
use crate::ConfigurationError;
use crate::Result;

/// One step from a parent to a child.
#[derive(Clone)]
pub struct PathElement {
    relation: Arc<RelationDefinition>,
    name: Option<String>,
    definition: Arc<ManagedObjectDefinition>,
}

impl PathElement {
    pub fn relation(&self) -> &Arc<RelationDefinition> {
        &self.relation
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn definition(&self) -> &Arc<ManagedObjectDefinition> {
        &self.definition
    }
}

/// Location of a managed object as a chain of relation steps from the root.
#[derive(Clone, Default)]
pub struct ManagedObjectPath {
    elements: Vec<PathElement>,
}

impl ManagedObjectPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Definition reached by the path, `None` for the root.
    pub fn definition(&self) -> Option<&Arc<ManagedObjectDefinition>> {
        self.last().map(|e| &e.definition)
    }

    /// Name of the last step, if the relation names its children.
    pub fn name(&self) -> Option<&str> {
        self.last().and_then(|e| e.name())
    }

    pub fn parent(&self) -> Option<ManagedObjectPath> {
        if self.is_empty() {
            return None;
        }
        Some(ManagedObjectPath {
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// Extends the path by one step.
    ///
    /// Named relations require `name`, fixed-location relations reject it. For a
    /// set relation `name` selects the sub-type the child must be.
    pub fn child(
        &self,
        relation: &Arc<RelationDefinition>,
        name: Option<&str>,
    ) -> Result<ManagedObjectPath> {
        let definition = match (relation.kind(), name) {
            (RelationKind::Singleton | RelationKind::Optional, None) => relation.child_definition().clone(),
            (RelationKind::Singleton | RelationKind::Optional, Some(_)) => {
                return Err(ConfigurationError::UnexpectedChildName {
                    relation: relation.name().to_string(),
                }
                .into());
            }
            (RelationKind::Instantiable | RelationKind::Set, None) => {
                return Err(ConfigurationError::MissingChildName {
                    relation: relation.name().to_string(),
                }
                .into());
            }
            (RelationKind::Instantiable, Some(_)) => relation.child_definition().clone(),
            (RelationKind::Set, Some(name)) => relation
                .subtype(name)
                .filter(|d| d.is_child_of(relation.child_definition()))
                .cloned()
                .ok_or_else(|| ConfigurationError::UnknownSubtype {
                    relation: relation.name().to_string(),
                    name: name.to_string(),
                })?,
        };

        let mut elements = self.elements.clone();
        elements.push(PathElement {
            relation: relation.clone(),
            name: name.map(|n| n.trim().to_string()),
            definition,
        });
        Ok(ManagedObjectPath { elements })
    }

    /// Same location, narrowed to the concrete type found when decoding.
    pub fn with_definition(
        &self,
        definition: Arc<ManagedObjectDefinition>,
    ) -> ManagedObjectPath {
        let mut path = self.clone();
        if let Some(last) = path.elements.last_mut() {
            last.definition = definition;
        }
        path
    }
}

impl fmt::Display for ManagedObjectPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("/");
        }
        for element in &self.elements {
            match &element.name {
                Some(name) => write!(f, "/{}[{}]", element.relation.name(), name)?,
                None => write!(f, "/{}", element.relation.name())?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ManagedObjectPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ManagedObjectPath({self})")
    }
}

impl PartialEq for ManagedObjectPath {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.elements.len() == other.elements.len()
            && self.elements.iter().zip(&other.elements).all(|(a, b)| {
                Arc::ptr_eq(&a.relation, &b.relation)
                    && a.name.as_deref().map(str::to_lowercase) == b.name.as_deref().map(str::to_lowercase)
            })
    }
}

/// Maps managed object paths onto entry DNs below the configuration root.
#[derive(Debug, Clone)]
pub struct DnBuilder {
    root_dn: Dn,
    naming_attribute: String,
}

impl DnBuilder {
    pub fn new(
        root_dn: Dn,
        naming_attribute: impl Into<String>,
    ) -> Self {
        Self {
            root_dn,
            naming_attribute: naming_attribute.into(),
        }
    }

    pub fn root_dn(&self) -> &Dn {
        &self.root_dn
    }

    pub fn naming_attribute(&self) -> &str {
        &self.naming_attribute
    }

    pub fn create(
        &self,
        path: &ManagedObjectPath,
    ) -> Dn {
        let mut dn = self.root_dn.clone();
        for element in path.elements() {
            dn = self.step(&dn, &element.relation, element.name());
        }
        dn
    }

    /// DN below which the children of `relation` live.
    pub fn relation_base_dn(
        &self,
        path: &ManagedObjectPath,
        relation: &RelationDefinition,
    ) -> Dn {
        let parent = self.create(path);
        match relation.container() {
            Some(container) => parent.child(container.clone()),
            None => parent,
        }
    }

    fn step(
        &self,
        parent: &Dn,
        relation: &RelationDefinition,
        name: Option<&str>,
    ) -> Dn {
        match relation.kind() {
            RelationKind::Singleton | RelationKind::Optional => match relation.rdn() {
                Some(rdn) => parent.child(rdn.clone()),
                None => parent.child(Rdn::new(self.naming_attribute.as_str(), relation.name())),
            },
            RelationKind::Instantiable | RelationKind::Set => {
                let base = match relation.container() {
                    Some(container) => parent.child(container.clone()),
                    None => parent.clone(),
                };
                let attribute = relation.naming_attribute().unwrap_or(&self.naming_attribute);
                base.child(Rdn::new(attribute, name.unwrap_or_default()))
            }
        }
    }
}
