//! Fixtures shared by the unit tests: a small configuration model, a bootstrapped
//! repository and listeners that record what they were told.
mod fixture;
mod listeners;
mod model;

pub use fixture::*;
pub use listeners::*;
pub use model::*;
