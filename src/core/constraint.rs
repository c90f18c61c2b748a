use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::trace;
use tracing::warn;

use crate::ConstraintViolation;
use crate::Error;
use crate::Result;
use crate::ServerManagedObject;

/// Server-side half of a constraint.
///
/// Every method has a permissive default so a handler only implements the
/// checks it cares about. Returning an error counts as a failed check.
#[cfg_attr(test, automock)]
pub trait ServerConstraintHandler: Send + Sync {
    /// Whether the managed object may be used, appending reasons when not.
    fn is_usable(
        &self,
        _managed_object: &ServerManagedObject,
        _reasons: &mut Vec<String>,
    ) -> Result<bool> {
        Ok(true)
    }

    /// Whether the managed object may be deleted, appending reasons when not.
    fn is_delete_allowed(
        &self,
        _managed_object: &ServerManagedObject,
        _reasons: &mut Vec<String>,
    ) -> Result<bool> {
        Ok(true)
    }

    fn perform_post_add(
        &self,
        _managed_object: &ServerManagedObject,
    ) -> Result<()> {
        Ok(())
    }

    fn perform_post_delete(
        &self,
        _managed_object: &ServerManagedObject,
    ) -> Result<()> {
        Ok(())
    }
}

/// A named rule set contributed by a definition.
pub struct Constraint {
    name: String,
    handlers: Vec<Arc<dyn ServerConstraintHandler>>,
}

impl Constraint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    pub fn with_handler(
        mut self,
        handler: Arc<dyn ServerConstraintHandler>,
    ) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_constraint_handlers(&self) -> &[Arc<dyn ServerConstraintHandler>] {
        &self.handlers
    }
}

impl fmt::Debug for Constraint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Reason recorded when a handler fails instead of answering.
pub fn constraint_exception_message(error: &Error) -> String {
    format!("An error occurred while enforcing one or more constraints: {error}")
}

fn handlers(managed_object: &ServerManagedObject) -> impl Iterator<Item = &Arc<dyn ServerConstraintHandler>> {
    managed_object
        .definition()
        .all_constraints()
        .iter()
        .flat_map(|c| c.server_constraint_handlers().iter())
}

/// Asks every handler, collecting every reason before deciding.
fn check_all<F>(
    managed_object: &ServerManagedObject,
    check: F,
) -> std::result::Result<(), Vec<String>>
where
    F: Fn(&dyn ServerConstraintHandler, &mut Vec<String>) -> Result<bool>,
{
    let mut passed = true;
    let mut reasons = Vec::new();
    for handler in handlers(managed_object) {
        match check(handler.as_ref(), &mut reasons) {
            Ok(true) => {}
            Ok(false) => passed = false,
            Err(e) => {
                reasons.push(constraint_exception_message(&e));
                passed = false;
            }
        }
    }

    if passed {
        Ok(())
    } else {
        if reasons.is_empty() {
            // A handler said no without saying why.
            reasons.push(format!("The {} violates a configuration constraint", managed_object.definition().name()));
        }
        Err(reasons)
    }
}

/// Fails with every collected reason if any handler finds the object unusable.
pub fn ensure_is_usable(managed_object: &Arc<ServerManagedObject>) -> std::result::Result<(), ConstraintViolation> {
    check_all(managed_object, |handler, reasons| handler.is_usable(managed_object, reasons))
        .map_err(|reasons| ConstraintViolation::new(managed_object.clone(), reasons))
}

pub fn is_delete_allowed(managed_object: &ServerManagedObject) -> std::result::Result<(), Vec<String>> {
    check_all(managed_object, |handler, reasons| handler.is_delete_allowed(managed_object, reasons))
}

/// Runs post-add hooks; failures are logged and skipped.
pub fn perform_post_add(managed_object: &ServerManagedObject) {
    for handler in handlers(managed_object) {
        if let Err(e) = handler.perform_post_add(managed_object) {
            warn!(path = %managed_object.path(), "Unable to perform post add: {}", e);
        }
    }
    trace!(path = %managed_object.path(), "post add constraint hooks done");
}

/// Runs post-delete hooks; failures are logged and skipped.
pub fn perform_post_delete(managed_object: &ServerManagedObject) {
    for handler in handlers(managed_object) {
        if let Err(e) = handler.perform_post_delete(managed_object) {
            warn!(path = %managed_object.path(), "Unable to perform post delete: {}", e);
        }
    }
    trace!(path = %managed_object.path(), "post delete constraint hooks done");
}
