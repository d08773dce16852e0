//! Module: db
//! Responsibility: entity-id set composition, local evaluation and remote
//! compilation, plus the session that routes between them.

pub mod direction;
pub mod executor;
pub mod iterable;
pub mod query;
mod session;

pub use direction::Direction;
pub use session::DbSession;
