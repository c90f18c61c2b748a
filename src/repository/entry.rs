use std::collections::BTreeMap;

use crate::constants::OBJECT_CLASS_ATTRIBUTE;
use crate::Dn;

/// Raw configuration entry as held by a repository.
///
/// Attribute names are case-insensitive and stored lowercased. Object classes
/// are the values of the `objectclass` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_object_class(
        self,
        object_class: impl Into<String>,
    ) -> Self {
        self.with_attribute(OBJECT_CLASS_ATTRIBUTE, object_class)
    }

    /// Adds one value, keeping values already present.
    pub fn with_attribute(
        mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Replaces every value of `name`; an empty list removes the attribute.
    pub fn set_attribute<I, S>(
        &mut self,
        name: impl AsRef<str>,
        values: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = name.as_ref().to_ascii_lowercase();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.attributes.remove(&key);
        } else {
            self.attributes.insert(key, values);
        }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn object_classes(&self) -> &[String] {
        self.attribute_values(OBJECT_CLASS_ATTRIBUTE)
    }

    pub fn has_object_class(
        &self,
        object_class: &str,
    ) -> bool {
        self.object_classes().iter().any(|oc| oc.eq_ignore_ascii_case(object_class))
    }

    pub fn attribute_values(
        &self,
        name: &str,
    ) -> &[String] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
