//! Module: query
//! Responsibility: select AST, set-operation rewriting, and query text compilation.
//! Does not own: executing compiled text; see `executor::remote`.

pub mod algebra;
mod builder;
mod compile;
mod condition;
mod order;
mod select;


pub use builder::CompiledQuery;
pub use compile::{compile, compile_count};
pub use condition::Condition;
pub use order::{Order, OrderField};
pub use select::{
    BinaryOperationSelect, ClassSelect, DistinctSelect, LinkDirection, LinkSelect,
    RecordIdSelect, Select, SelectBounds, SetOperation, SubSelect,
};
