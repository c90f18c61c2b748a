use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::Dn;
use crate::PropertyError;

/// Syntax of a property's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Boolean,
    Integer,
    String,
    Dn,
    /// Written as an integer number of milliseconds, optionally suffixed `ms` or `s`
    Duration,
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKind::Boolean => "boolean",
            PropertyKind::Integer => "integer",
            PropertyKind::String => "string",
            PropertyKind::Dn => "DN",
            PropertyKind::Duration => "duration",
        }
    }
}

/// A decoded property value.
///
/// Values of a property are kept in an ordered set, so the type is totally ordered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Dn(Dn),
    Duration(Duration),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dn(&self) -> Option<&Dn> {
        match self {
            PropertyValue::Dn(dn) => Some(dn),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            PropertyValue::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Dn(dn) => write!(f, "{dn}"),
            PropertyValue::Duration(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

/// What a property evaluates to when its entry carries no value for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultBehavior {
    /// No default, the component applies its own behaviour
    Undefined,
    /// Fixed default values in string form
    Defined(Vec<String>),
    /// Values of `property` in the entry at `dn`
    Inherited { dn: Dn, property: String },
}

#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    name: String,
    kind: PropertyKind,
    multi_valued: bool,
    mandatory: bool,
    read_only: bool,
    default_behavior: DefaultBehavior,
}

impl PropertyDefinition {
    pub fn new(
        name: impl Into<String>,
        kind: PropertyKind,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            multi_valued: false,
            mandatory: false,
            read_only: false,
            default_behavior: DefaultBehavior::Undefined,
        }
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_default<I, S>(
        mut self,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_behavior = DefaultBehavior::Defined(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn inherited_from(
        mut self,
        dn: Dn,
        property: impl Into<String>,
    ) -> Self {
        self.default_behavior = DefaultBehavior::Inherited {
            dn,
            property: property.into(),
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn default_behavior(&self) -> &DefaultBehavior {
        &self.default_behavior
    }

    /// Attribute holding this property in a configuration entry.
    pub fn attribute_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    pub fn decode_value(
        &self,
        raw: &str,
    ) -> std::result::Result<PropertyValue, PropertyError> {
        let raw = raw.trim();
        let illegal = || PropertyError::IllegalValue {
            property: self.name.clone(),
            value: raw.to_string(),
            expected: self.kind.name(),
        };
        match self.kind {
            PropertyKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(PropertyValue::Boolean(true)),
                "false" | "no" | "off" | "0" => Ok(PropertyValue::Boolean(false)),
                _ => Err(illegal()),
            },
            PropertyKind::Integer => raw.parse().map(PropertyValue::Integer).map_err(|_| illegal()),
            PropertyKind::String if raw.is_empty() => Err(illegal()),
            PropertyKind::String => Ok(PropertyValue::String(raw.to_string())),
            PropertyKind::Dn => Dn::parse(raw).map(PropertyValue::Dn).map_err(|_| illegal()),
            PropertyKind::Duration => parse_duration(raw).map(PropertyValue::Duration).ok_or_else(illegal),
        }
    }

    /// Decodes every raw value, reporting all problems rather than the first.
    pub fn decode_values<'a, I>(
        &self,
        raw: I,
    ) -> std::result::Result<BTreeSet<PropertyValue>, Vec<PropertyError>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = BTreeSet::new();
        let mut problems = Vec::new();
        for value in raw {
            match self.decode_value(value) {
                Ok(v) => {
                    values.insert(v);
                }
                Err(e) => problems.push(e),
            }
        }
        if !self.multi_valued && values.len() > 1 {
            problems.push(PropertyError::TooManyValues {
                property: self.name.clone(),
                count: values.len(),
            });
        }
        if problems.is_empty() {
            Ok(values)
        } else {
            Err(problems)
        }
    }
}

fn parse_duration(raw: &str) -> Option<Duration> {
    let lower = raw.to_ascii_lowercase();
    if let Some(ms) = lower.strip_suffix("ms") {
        return ms.trim().parse().ok().map(Duration::from_millis);
    }
    if let Some(s) = lower.strip_suffix('s') {
        return s.trim().parse().ok().map(Duration::from_secs);
    }
    lower.parse().ok().map(Duration::from_millis)
}
