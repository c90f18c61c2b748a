mod change_result;
pub mod constraint;

pub use change_result::*;
pub use constraint::constraint_exception_message;
pub use constraint::Constraint;
pub use constraint::ServerConstraintHandler;
