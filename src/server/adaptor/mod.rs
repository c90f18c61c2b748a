//! Bridges from object-level listeners to the repository's raw two-phase protocol.
//!
//! Each adaptor keeps the managed object it decoded during accept and hands
//! that same object to the apply phase. This relies on the accept-before-apply
//! ordering documented on [`crate::ConfigurationRepository`].

mod add;
mod change;
mod delete;

pub use add::*;
pub use change::*;
pub use delete::*;

#[cfg(test)]
mod delete_test;

use crate::ConfigurationError;
use crate::DecodingError;
use crate::Entry;
use crate::Error;
use crate::ManagedObjectPath;
use crate::RelationDefinition;
use crate::Result;
use std::sync::Arc;

/// Path of the child `entry` stands for below `parent`.
///
/// For named relations the child is named after the entry's leading RDN value.
/// A set relation child named after no declared sub-type is a decoding failure.
pub(crate) fn child_path(
    parent: &ManagedObjectPath,
    relation: &Arc<RelationDefinition>,
    entry: &Entry,
) -> Result<ManagedObjectPath> {
    if !relation.kind().is_named() {
        return parent.child(relation, None);
    }
    let name = entry.dn().rdn().map(|rdn| rdn.value()).ok_or_else(|| {
        Error::from(ConfigurationError::MissingChildName {
            relation: relation.name().to_string(),
        })
    })?;
    parent.child(relation, Some(name)).map_err(|e| match e {
        Error::Configuration(ConfigurationError::UnknownSubtype { relation, name }) => {
            DecodingError::WrongTypeInformation {
                dn: entry.dn().clone(),
                name,
                relation,
            }
            .into()
        }
        other => other,
    })
}

/// Message recorded when apply runs without a matching accept.
pub(crate) fn unaccepted_apply_message(
    operation: &str,
    entry: &Entry,
) -> String {
    format!(
        "Unable to apply the {} of configuration entry {} because it was not accepted first",
        operation,
        entry.dn()
    )
}
