//! Configuration repository seam.
//!
//! The engine never stores entries itself. It asks a [`ConfigurationRepository`]
//! whether entries exist and keeps its listeners in the repository's per-DN
//! listener tables. [`InMemoryConfigRepository`] is a complete implementation
//! that drives the two-phase protocol over an in-memory tree.

mod entry;
mod listener;
mod memory;

pub use entry::*;
pub use listener::*;
pub use memory::*;
#[cfg(test)]
use mockall::automock;

use crate::Dn;
use crate::Result;


/// Entry lookup and listener tables of a configuration store.
///
/// # Dispatch contract
///
/// Implementations drive every mutation in two phases:
/// 1. accept: each listener registered for the mutation is asked whether it is acceptable.
///    A single refusal rejects the mutation and nothing is stored.
/// 2. apply: once stored, every listener asked during accept is told about the change.
///
/// For one listener and one mutation, the accept call always happens before the
/// apply call, and no other mutation of the same entry is dispatched in between.
/// Listener adaptors keep the object decoded during accept for the following
/// apply and rely on this ordering.
///
/// Listeners must be invoked without holding any lock on the listener tables, as
/// listeners register and deregister other listeners while running.
#[cfg_attr(test, automock)]
pub trait ConfigurationRepository: Send + Sync {
    fn has_entry(
        &self,
        dn: &Dn,
    ) -> Result<bool>;

    fn get_entry(
        &self,
        dn: &Dn,
    ) -> Result<Option<Entry>>;

    /// DNs of the immediate children of `dn`.
    fn get_children(
        &self,
        dn: &Dn,
    ) -> Result<Vec<Dn>>;

    fn register_add_listener(
        &self,
        dn: &Dn,
        listener: AddListenerSlot,
    ) -> Result<()>;

    /// Returns whether a registered listener was removed.
    fn deregister_add_listener(
        &self,
        dn: &Dn,
        listener: &AddListenerSlot,
    ) -> Result<bool>;

    fn get_add_listeners(
        &self,
        dn: &Dn,
    ) -> Vec<AddListenerSlot>;

    fn register_delete_listener(
        &self,
        dn: &Dn,
        listener: DeleteListenerSlot,
    ) -> Result<()>;

    fn deregister_delete_listener(
        &self,
        dn: &Dn,
        listener: &DeleteListenerSlot,
    ) -> Result<bool>;

    fn get_delete_listeners(
        &self,
        dn: &Dn,
    ) -> Vec<DeleteListenerSlot>;

    fn register_change_listener(
        &self,
        dn: &Dn,
        listener: ChangeListenerSlot,
    ) -> Result<()>;

    fn deregister_change_listener(
        &self,
        dn: &Dn,
        listener: &ChangeListenerSlot,
    ) -> Result<bool>;

    fn get_change_listeners(
        &self,
        dn: &Dn,
    ) -> Vec<ChangeListenerSlot>;
}
