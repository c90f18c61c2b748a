//! Configuration notification error hierarchy
//!
//! Errors are grouped by the layer that raises them: decoding of raw entries,
//! constraint enforcement, misuse of the relation model or registration API,
//! and the reference repository's two-phase dispatch.

use std::fmt;
use std::sync::Arc;

use config::ConfigError;

use crate::ResultCode;
use crate::constants::CONSTRAINT_REASON_SEPARATOR;
use crate::model::Dn;
use crate::server::ServerManagedObject;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A raw entry could not be turned into a managed object
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// One or more constraint handlers rejected a managed object
    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),

    /// Misuse of the relation model or an unresolvable registration target
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failures reported by the reference repository
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Engine settings could not be loaded or validated
    #[error(transparent)]
    Settings(#[from] ConfigError),

    /// Raised by a constraint handler while evaluating a managed object
    #[error("{0}")]
    Handler(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodingError {
    #[error("The configuration entry {dn} does not have an object class matching the {expected} definition")]
    WrongType { dn: Dn, expected: String },

    #[error("The configuration entry {dn} cannot be decoded because the {definition} definition is abstract")]
    AbstractDefinition { dn: Dn, definition: String },

    #[error("The configuration entry {dn} could not be decoded: {}", join_problems(.problems))]
    Property {
        dn: Dn,
        problems: Vec<PropertyError>,
    },

    /// The RDN of an entry below a set relation names no declared sub-type
    #[error("The name \"{name}\" of configuration entry {dn} does not identify a type allowed by the {relation} relation")]
    WrongTypeInformation {
        dn: Dn,
        name: String,
        relation: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("the value \"{value}\" is not a valid {expected} for the {property} property")]
    IllegalValue {
        property: String,
        value: String,
        expected: &'static str,
    },

    #[error("the {property} property is mandatory")]
    MissingValue { property: String },

    #[error("the {property} property is single-valued but {count} values were provided")]
    TooManyValues { property: String, count: usize },
}

fn join_problems(problems: &[PropertyError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(CONSTRAINT_REASON_SEPARATOR)
}

/// The managed object failed one or more constraint checks.
///
/// Always carries at least one reason.
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    managed_object: Arc<ServerManagedObject>,
    reasons: Vec<String>,
}

impl ConstraintViolation {
    pub(crate) fn new(
        managed_object: Arc<ServerManagedObject>,
        reasons: Vec<String>,
    ) -> Self {
        debug_assert!(!reasons.is_empty());
        Self {
            managed_object,
            reasons,
        }
    }

    pub fn managed_object(&self) -> &Arc<ServerManagedObject> {
        &self.managed_object
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn into_reasons(self) -> Vec<String> {
        self.reasons
    }

    /// All reasons in a single message slot.
    pub fn merged_message(&self) -> String {
        self.reasons.join(CONSTRAINT_REASON_SEPARATOR)
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.reasons.len() == 1 {
            write!(
                f,
                "The {} could not be used because of the following reason: {}",
                self.managed_object.definition().name(),
                self.merged_message()
            )
        } else {
            write!(
                f,
                "The {} could not be used because of the following reasons: {}",
                self.managed_object.definition().name(),
                self.merged_message()
            )
        }
    }
}

impl std::error::Error for ConstraintViolation {}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("The relation {relation} is not associated with a {definition}")]
    UnknownRelation { relation: String, definition: String },

    #[error("Unknown property {property} for a {definition}")]
    UnknownProperty { property: String, definition: String },

    #[error("The {kind} relation {relation} does not support this operation")]
    UnsupportedRelation { relation: String, kind: &'static str },

    #[error("The {relation} relation requires a child name")]
    MissingChildName { relation: String },

    #[error("The {relation} relation does not accept a child name")]
    UnexpectedChildName { relation: String },

    #[error("\"{name}\" is not a sub-type allowed by the {relation} relation")]
    UnknownSubtype { relation: String, name: String },

    /// No ancestor of the target exists, so a delayed listener has nowhere to wait
    #[error("Unable to register a listener for {dn} because no ancestor entry exists")]
    NoAnchor { dn: Dn },

    #[error("Unable to register a listener for {dn} because more than {max} ancestor entries are missing")]
    DelayedChainTooDeep { dn: Dn, max: usize },

    #[error("The configuration entry {dn} does not exist")]
    EntryNotFound { dn: Dn },

    #[error("Invalid DN \"{value}\": {reason}")]
    InvalidDn { value: String, reason: &'static str },

    #[error("The configuration repository is no longer available")]
    RepositoryUnavailable,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("The configuration entry {0} already exists")]
    EntryAlreadyExists(Dn),

    #[error("The configuration entry {0} does not exist")]
    NoSuchEntry(Dn),

    #[error("The parent of configuration entry {0} does not exist")]
    NoParent(Dn),

    #[error("The configuration entry {0} cannot be deleted because it has subordinate entries")]
    HasChildren(Dn),

    #[error("The configuration entry {dn} cannot be {operation} because it was rejected by a configuration listener: {reasons}")]
    Rejected {
        dn: Dn,
        operation: &'static str,
        reasons: String,
    },

    #[error("One or more configuration listeners failed to apply the change to {dn}: {reasons}")]
    ApplyFailed {
        dn: Dn,
        code: ResultCode,
        reasons: String,
    },
}

impl RepositoryError {
    /// Result code an operation failing with this error reports to its requester.
    pub fn result_code(&self) -> ResultCode {
        match self {
            RepositoryError::EntryAlreadyExists(_) => ResultCode::EntryAlreadyExists,
            RepositoryError::NoSuchEntry(_) | RepositoryError::NoParent(_) => ResultCode::NoSuchObject,
            RepositoryError::HasChildren(_) => ResultCode::NotAllowedOnNonLeaf,
            RepositoryError::Rejected { .. } => ResultCode::UnwillingToPerform,
            RepositoryError::ApplyFailed { code, .. } => *code,
        }
    }
}

