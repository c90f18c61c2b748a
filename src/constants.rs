/// DN of the root configuration entry when no override is configured.
pub const DEFAULT_ROOT_DN: &str = "cn=config";

/// Attribute used to name children of instantiable and set relations.
pub const DEFAULT_NAMING_ATTRIBUTE: &str = "cn";

/// Attribute holding an entry's object classes.
pub const OBJECT_CLASS_ATTRIBUTE: &str = "objectclass";

/// Upper bound on the number of missing ancestors a delayed registration may bridge.
pub const DEFAULT_MAX_DELAYED_DEPTH: usize = 64;

/// Separator between independent accept-phase reasons.
pub const REASON_SEPARATOR: &str = "  ";

/// Separator between apply-phase failure messages reported by the repository.
pub const APPLY_REASON_SEPARATOR: &str = ".  ";

/// Separator used when a constraint violation must fit in a single message.
pub const CONSTRAINT_REASON_SEPARATOR: &str = "; ";

/// Length of the identifiers attached to delayed registration chains.
pub(crate) const CHAIN_ID_LEN: usize = 10;

/// Number of inherited defaults followed before a default is left undefined.
pub(crate) const MAX_INHERITANCE_HOPS: usize = 8;
