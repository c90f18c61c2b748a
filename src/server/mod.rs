//! Server-side managed objects and the listeners registered through them.

mod adaptor;
mod context;
mod delayed;
mod listener;
mod managed_object;

pub use adaptor::*;
pub use context::*;
pub use delayed::DelayedConfigAddListener;
pub use delayed::DelayedTarget;
pub use delayed::LinkState;
pub use listener::*;
pub use managed_object::*;
