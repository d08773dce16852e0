//! Module: iterable
//! Responsibility: entity-id iterables, from storage leaves up through the
//! combinator tree clients compose.
//! Boundary: the same tree evaluates locally (`IterableNode::iterator`) or
//! compiles remotely (`IterableNode::to_select`).

mod explain;
mod leaf;
mod node;


pub use explain::ExplainNode;
pub use leaf::{PrimitiveIterable, VecIterable};
pub use node::{IterableNode, Operator, ProbeSide, Strategy};
