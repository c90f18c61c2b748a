//! Configuration-change notification for a DN-addressed configuration tree.
//!
//! Server components register listeners on [`ServerManagedObject`]s to observe
//! and veto additions, deletions and changes of configuration entries. The
//! repository drives every mutation in two phases (accept, then apply);
//! adaptors decode raw entries into managed objects, enforce the constraints
//! their definitions declare and forward to the registered listener.
//! Registrations for entries that do not exist yet wait at the nearest
//! existing ancestor and move down as the missing entries are added.
//!
//! ```ignore
//! let repository = Arc::new(InMemoryConfigRepository::default());
//! let context = ServerManagementContext::new(&repository, root_definition, &EngineConfig::default())?;
//! let root = context.root_managed_object()?;
//! root.register_object_add_listener(&workers, listener)?;
//! ```

mod config;
mod constants;
mod core;
mod errors;
mod model;
mod repository;
mod server;

pub use config::*;
pub use constants::*;
pub use core::*;
pub use errors::*;
pub use model::*;
pub use repository::*;
pub use server::*;

#[cfg(test)]
pub mod test_utils;
