//! Lazy composition of entity-id sets: sorted-merge and hash-probe iteration
//! over primitive leaves, and compilation of the same trees to one nested
//! remote query.

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod id;
pub mod obs;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, builders or stream internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            DbSession,
            executor::{EntityIdIterator, IdSlot},
            iterable::{IterableNode, PrimitiveIterable},
            query::{Condition, Order, Select},
        },
        id::EntityId,
        value::Value,
    };
}
