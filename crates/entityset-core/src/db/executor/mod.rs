//! Module: executor
//! Responsibility: local id-stream evaluation and remote cursor adaptation.
//! Does not own: node construction or query compilation.

mod context;
pub(crate) mod remote;
pub(crate) mod stream;

pub use context::EvalContext;
pub use remote::{QueryBackend, RowCursor};
pub use stream::{
    BoxedIdIterator, EmptyIdIterator, EntityIdIterator, IdSlot, VecIdIterator, collect_ids,
};
