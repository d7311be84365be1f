//! Rows and forward-only row sequences.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::ExtractError;

/// One result row: column names in query order plus their textual values.
///
/// Column names are shared between all rows of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// `values[i]` belongs to `columns[i]`.
    pub fn new(columns: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs, mostly useful for fixtures.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn shared_columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the first column called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

pub type RowStream<'a> = BoxStream<'a, Result<Row, ExtractError>>;

/// Ordered, single-pass sequence of rows backed by a live query.
///
/// Rows are pulled one at a time; nothing is materialized beyond the row
/// being handed out and at most one peeked row. [`RowSequence::has_rows`]
/// peeks the first row and keeps it so that the next
/// [`RowSequence::next_row`] returns it again.
pub struct RowSequence<'a> {
    peeked: Option<Row>,
    inner: RowStream<'a>,
    cancel: Option<CancellationToken>,
    rows_read: u64,
}

impl<'a> RowSequence<'a> {
    pub fn new(inner: RowStream<'a>) -> Self {
        Self {
            peeked: None,
            inner,
            cancel: None,
            rows_read: 0,
        }
    }

    /// A sequence whose first row has already been fetched by the source.
    pub fn primed(first: Row, rest: RowStream<'a>) -> Self {
        Self {
            peeked: Some(first),
            ..Self::new(rest)
        }
    }

    pub fn empty() -> Self {
        Self::new(stream::empty().boxed())
    }

    /// A sequence over rows already in memory.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    /// Observe `cancel` at every fetch from the underlying stream.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether at least one row remains, without consuming it.
    pub async fn has_rows(&mut self) -> Result<bool, ExtractError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        match self.fetch().await {
            Some(Ok(row)) => {
                self.peeked = Some(row);
                Ok(true)
            }
            Some(Err(e)) => Err(e),
            None => Ok(false),
        }
    }

    pub async fn next_row(&mut self) -> Option<Result<Row, ExtractError>> {
        let next = match self.peeked.take() {
            Some(row) => Some(Ok(row)),
            None => self.fetch().await,
        };
        if let Some(Ok(_)) = next {
            self.rows_read += 1;
        }
        next
    }

    /// Rows handed out by `next_row` so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    async fn fetch(&mut self) -> Option<Result<Row, ExtractError>> {
        match &self.cancel {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Some(Err(ExtractError::Cancelled)),
                    item = self.inner.next() => item,
                }
            }
            None => self.inner.next().await,
        }
    }
}

impl std::fmt::Debug for RowSequence<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSequence")
            .field("peeked", &self.peeked.is_some())
            .field("rows_read", &self.rows_read)
            .finish()
    }
}
