use crate::db::iterable::node::{Operator, Strategy};
use std::fmt;

///
/// ExplainNode
///
/// Snapshot of one node's operator, chosen local strategy and sortedness,
/// with its children in declaration order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainNode {
    pub operator: Operator,
    pub strategy: Strategy,
    pub sorted_by_id: bool,
    pub detail: Option<String>,
    pub children: Vec<Self>,
}

impl ExplainNode {
    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(
            f,
            "{:indent$}{} [{}",
            "",
            self.operator.label(),
            self.strategy.label(),
            indent = depth * 2
        )?;
        if self.sorted_by_id {
            write!(f, ", sorted")?;
        }
        write!(f, "]")?;
        if let Some(detail) = &self.detail {
            write!(f, " {detail}")?;
        }
        writeln!(f)?;

        for child in &self.children {
            child.render(f, depth + 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}
