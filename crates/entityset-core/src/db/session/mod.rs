use crate::{
    config::EngineConfig,
    db::{
        executor::{
            BoxedIdIterator, EvalContext, IdSlot, QueryBackend, collect_ids,
            remote::row_cursor_iterator,
        },
        iterable::IterableNode,
        query::{self, CompiledQuery},
    },
    error::InternalError,
    obs::sink::{MetricsSink, with_metrics_sink},
};

///
/// DbSession
///
/// Session-scoped handle with policy (debug, metrics, union semantics) and
/// routing between local iteration and remote compilation.
///
/// Lazy iterators returned by `iterator` and `execute_remote` record their
/// pull-time events against whichever sink is active when they are pulled;
/// `collect` and `size` drain inside the session's sink scope.
///

#[derive(Default)]
pub struct DbSession {
    config: EngineConfig,
    metrics: Option<&'static dyn MetricsSink>,
}

impl DbSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn ctx(&self) -> EvalContext {
        EvalContext::from_config(&self.config)
    }

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }

    // ---------------------------------------------------------------------
    // Local evaluation
    // ---------------------------------------------------------------------

    pub fn iterator(&self, node: &IterableNode) -> Result<BoxedIdIterator, InternalError> {
        self.with_metrics(|| node.iterator(self.ctx()))
    }

    pub fn reverse_iterator(&self, node: &IterableNode) -> Result<BoxedIdIterator, InternalError> {
        self.with_metrics(|| node.reverse_iterator(self.ctx()))
    }

    /// Drain the node's forward iterator into a vector.
    pub fn collect(&self, node: &IterableNode) -> Result<Vec<IdSlot>, InternalError> {
        self.with_metrics(|| {
            let mut iter = node.iterator(self.ctx())?;
            collect_ids(iter.as_mut())
        })
    }

    pub fn size(&self, node: &IterableNode) -> Result<usize, InternalError> {
        self.with_metrics(|| node.size(self.ctx()))
    }

    // ---------------------------------------------------------------------
    // Remote evaluation
    // ---------------------------------------------------------------------

    /// Compile the node tree to one query with its own parameter namespace.
    pub fn compile(&self, node: &IterableNode) -> Result<CompiledQuery, InternalError> {
        self.with_metrics(|| {
            let ctx = self.ctx();
            let compiled = query::compile(&node.to_select(ctx)?)?;
            ctx.debug_log(format!("compiled: {}", compiled.sql));

            Ok(compiled)
        })
    }

    /// Compile a `COUNT(*)` over the node tree.
    pub fn compile_count(&self, node: &IterableNode) -> Result<CompiledQuery, InternalError> {
        self.with_metrics(|| {
            let ctx = self.ctx();
            let compiled = query::compile_count(&node.to_select(ctx)?)?;
            ctx.debug_log(format!("compiled count: {}", compiled.sql));

            Ok(compiled)
        })
    }

    /// Compile the node tree, execute it on `backend` and stream the returned rows.
    pub fn execute_remote(
        &self,
        node: &IterableNode,
        backend: &dyn QueryBackend,
    ) -> Result<BoxedIdIterator, InternalError> {
        let compiled = self.compile(node)?;
        let cursor = self.with_metrics(|| backend.execute(&compiled))?;

        Ok(row_cursor_iterator(cursor))
    }
}

#[cfg(test)]
mod tests;
