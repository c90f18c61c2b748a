//! Relation model of the configuration tree.
//!
//! Definitions describe what a node may contain; paths and DNs say where it lives.
//! A parent reaches its children through a [`RelationDefinition`]:
//!
//! - singleton and optional relations put their only child at a fixed RDN
//! - instantiable and set relations name each child with the naming attribute,
//!   optionally below a container entry
//!
//! [`DnBuilder`] turns a [`ManagedObjectPath`] into the [`Dn`] of its entry.

mod definition;
mod dn;
mod path;
mod property;
mod relation;

pub use definition::*;
pub use dn::*;
pub use path::*;
pub use property::*;
pub use relation::*;

#[cfg(test)]
mod dn_test;
