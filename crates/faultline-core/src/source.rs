//! Row sources - the data side of an extraction.

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::row::RowSequence;
use crate::window::TimeWindow;

/// A parameterized export statement.
///
/// The statement receives three bound parameters: `$1` the integer source
/// id, `$2` the window start and `$3` the window end. Which rows count as
/// "in the window" is up to the statement; the expected filter is
/// `from <= ts AND ts < to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Short identifier used in logs.
    pub name: String,
    pub statement: String,
    pub source_id: i32,
}

impl QuerySpec {
    pub fn new(name: impl Into<String>, statement: impl Into<String>, source_id: i32) -> Self {
        Self {
            name: name.into(),
            statement: statement.into(),
            source_id,
        }
    }
}

/// Opens a row sequence for one window.
///
/// Implementations must map failures as follows: source unreachable →
/// [`ExtractError::Connection`]; statement rejected before any row is
/// produced → [`ExtractError::Query`]; failure while iterating →
/// [`ExtractError::Read`] yielded from the sequence.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn open<'a>(
        &'a self,
        query: &'a QuerySpec,
        window: &TimeWindow,
    ) -> Result<RowSequence<'a>, ExtractError>;
}
