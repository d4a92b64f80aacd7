//! Prepared queries and lazy cursors.

use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use entiscope_backend::{Backend, EntityCursor};
use entiscope_model::{Entity, QueryDescriptor};
use std::fmt;
use std::sync::Arc;

/// A query whose pre-query hooks have run.
///
/// Nothing is executed until a cursor obtained from
/// [`into_cursor`](Self::into_cursor) is advanced. A cursor is forward-only;
/// to run the query again, prepare it again.
pub struct PreparedQuery {
    backend: Arc<dyn Backend>,
    transaction: Option<Transaction>,
    query: QueryDescriptor,
}

impl PreparedQuery {
    pub(crate) fn new(
        backend: Arc<dyn Backend>,
        transaction: Option<Transaction>,
        query: QueryDescriptor,
    ) -> Self {
        Self {
            backend,
            transaction,
            query,
        }
    }

    /// Returns the query as rewritten by the pre-query hooks.
    #[must_use]
    pub fn query(&self) -> &QueryDescriptor {
        &self.query
    }

    /// Returns the transaction the query runs in.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Consumes the prepared query into a lazy cursor.
    #[must_use]
    pub fn into_cursor(self) -> QueryCursor {
        QueryCursor {
            backend: self.backend,
            transaction: self.transaction,
            query: self.query,
            inner: None,
            finished: false,
        }
    }

    /// Collects up to `limit` results.
    pub fn as_list(self, limit: Option<usize>) -> CoreResult<Vec<Entity>> {
        let cursor = self.into_cursor();
        match limit {
            Some(limit) => cursor.take(limit).collect(),
            None => cursor.collect(),
        }
    }

    /// Returns the only result, or `None` if there is none.
    ///
    /// Fails with `TooManyResults` when the query yields more than one entity.
    pub fn as_single_entity(self) -> CoreResult<Option<Entity>> {
        let mut cursor = self.into_cursor();
        let Some(first) = cursor.next().transpose()? else {
            return Ok(None);
        };
        if cursor.next().transpose()?.is_some() {
            return Err(CoreError::TooManyResults);
        }
        Ok(Some(first))
    }
}

impl fmt::Debug for PreparedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedQuery")
            .field("transaction", &self.transaction)
            .field("query", &self.query)
            .finish()
    }
}

/// Lazy, forward-only cursor over query results.
///
/// The backend query is opened on the first call to `next`.
pub struct QueryCursor {
    backend: Arc<dyn Backend>,
    transaction: Option<Transaction>,
    query: QueryDescriptor,
    inner: Option<EntityCursor>,
    finished: bool,
}

impl QueryCursor {
    /// Returns true once the backend query has been opened.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.is_some() || self.finished
    }

    fn open(&self) -> CoreResult<EntityCursor> {
        if let Some(tx) = &self.transaction {
            tx.ensure_active()?;
        }
        let txid = self.transaction.as_ref().map(Transaction::id);
        Ok(self.backend.prepare(txid, &self.query)?)
    }
}

impl Iterator for QueryCursor {
    type Item = CoreResult<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.inner.is_none() {
            match self.open() {
                Ok(cursor) => self.inner = Some(cursor),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        match self.inner.as_mut()?.next() {
            Some(result) => Some(result.map_err(CoreError::from)),
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl fmt::Debug for QueryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCursor")
            .field("query", &self.query)
            .field("started", &self.is_started())
            .field("finished", &self.finished)
            .finish()
    }
}
