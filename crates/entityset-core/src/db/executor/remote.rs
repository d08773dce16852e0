//! Module: executor::remote
//! Responsibility: capability seams for executing compiled text on a remote
//! backend, and the adapter that exposes a row cursor as an id iterator.
//! Does not own: network transport, retries or timeouts.

use crate::{
    db::{
        executor::stream::{EntityIdIterator, IdSlot, IdStream, Pulled},
        query::CompiledQuery,
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
};

///
/// RowCursor
///
/// Forward-only result cursor returned by a backend. Each row is one entity
/// id, or `None` when the row projects a null id.
///

pub trait RowCursor {
    fn next_row(&mut self) -> Result<Option<IdSlot>, InternalError>;
}

///
/// QueryBackend
///
/// Executes one compiled query and returns its cursor.
///

pub trait QueryBackend {
    fn execute(&self, query: &CompiledQuery) -> Result<Box<dyn RowCursor>, InternalError>;
}

///
/// RowCursorStream
///
/// Adapts a backend cursor to the id pull protocol and records one
/// `RemoteExecuted` event with the row count once the cursor is drained.
///

pub(crate) struct RowCursorStream {
    cursor: Option<Box<dyn RowCursor>>,
    rows: u64,
}

impl RowCursorStream {
    pub(crate) fn new(cursor: Box<dyn RowCursor>) -> Self {
        Self {
            cursor: Some(cursor),
            rows: 0,
        }
    }
}

impl IdStream for RowCursorStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };

        match cursor.next_row()? {
            Some(slot) => {
                self.rows = self.rows.saturating_add(1);
                Ok(Some(slot))
            }
            None => {
                self.cursor = None;
                record(MetricsEvent::RemoteExecuted { rows: self.rows });
                Ok(None)
            }
        }
    }
}

/// Wrap a backend cursor as a boxed id iterator.
pub(crate) fn row_cursor_iterator(cursor: Box<dyn RowCursor>) -> Box<dyn EntityIdIterator> {
    Pulled::boxed(RowCursorStream::new(cursor))
}
