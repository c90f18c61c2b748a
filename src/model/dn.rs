use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::str::FromStr;

use crate::ConfigurationError;
use crate::Result;

/// A single `attribute=value` naming component.
///
/// Attribute types compare case-insensitively, values compare
/// case-insensitively once trimmed. The original spelling is kept for display.
#[derive(Clone)]
pub struct Rdn {
    attribute: String,
    value: String,
    normalized: (String, String),
}

impl Rdn {
    pub fn new(
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let attribute = attribute.into().trim().to_string();
        let value = value.into().trim().to_string();
        let normalized = (attribute.to_ascii_lowercase(), value.to_lowercase());
        Self {
            attribute,
            value,
            normalized,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn parse(raw: &str) -> Result<Self> {
        let (attribute, value) = split_unescaped(raw, '=')
            .filter(|(a, _)| !a.trim().is_empty())
            .ok_or_else(|| invalid(raw, "an RDN must have the form attribute=value"))?;
        let value = unescape(value);
        if value.trim().is_empty() {
            return Err(invalid(raw, "an RDN value must not be empty"));
        }
        Ok(Rdn::new(attribute, value))
    }
}

impl PartialEq for Rdn {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Rdn {}

impl Hash for Rdn {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Rdn {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rdn {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for Rdn {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape(&self.value))
    }
}

impl fmt::Debug for Rdn {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Hierarchical name of a configuration entry.
///
/// RDNs are stored leaf first, the way the DN is written. The empty DN is the
/// root and is the only DN without a parent.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::root());
        }
        let rdns = split_all_unescaped(value, ',')
            .into_iter()
            .map(Rdn::parse)
            .collect::<Result<Vec<_>>>()
            .map_err(|_| invalid(value, "each RDN must have the form attribute=value"))?;
        Ok(Self { rdns })
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs between this DN and the root.
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    pub fn parent(&self) -> Option<Dn> {
        if self.is_root() {
            return None;
        }
        Some(Dn {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    pub fn child(
        &self,
        rdn: Rdn,
    ) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Appends `other` below this DN, `other` being relative to it.
    pub fn concat(
        &self,
        other: &Dn,
    ) -> Dn {
        let mut rdns = other.rdns.clone();
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    pub fn is_descendant_of(
        &self,
        ancestor: &Dn,
    ) -> bool {
        self.rdns.len() > ancestor.rdns.len() && self.rdns.ends_with(&ancestor.rdns)
    }

    /// Ancestors from the parent up to and including the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Dn> + '_ {
        (1..=self.rdns.len()).map(move |skip| Dn {
            rdns: self.rdns[skip..].to_vec(),
        })
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    // Root-first ordering keeps a subtree contiguous in sorted maps.
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.rdns.iter().rev().cmp(other.rdns.iter().rev())
    }
}

impl fmt::Display for Dn {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dn {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl FromStr for Dn {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Dn::parse(s)
    }
}

fn invalid(
    value: &str,
    reason: &'static str,
) -> crate::Error {
    ConfigurationError::InvalidDn {
        value: value.to_string(),
        reason,
    }
    .into()
}

fn split_unescaped(
    value: &str,
    separator: char,
) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            c if c == separator && !escaped => return Some((&value[..i], &value[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}

fn split_all_unescaped(
    value: &str,
    separator: char,
) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = value;
    while let Some((head, tail)) = split_unescaped(rest, separator) {
        parts.push(head);
        rest = tail;
    }
    parts.push(rest);
    parts
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | '+' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
