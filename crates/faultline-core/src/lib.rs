//! Faultline Core - windowed extract, encode and upload pipeline
//!
//! This crate holds the parts of a scheduled export that do not touch a
//! database driver or a cloud SDK:
//! - time windows aligned to a fixed granularity
//! - forward-only row sequences with a cheap emptiness check
//! - the delimited text encoder
//! - destination naming
//! - the `ExtractionJob` state machine driving a `RowSource` and an `ObjectSink`

pub mod encoder;
pub mod error;
pub mod job;
pub mod namer;
pub mod row;
pub mod sink;
pub mod source;
pub mod value;
pub mod window;

pub use encoder::{DelimitedEncoder, EncodedPayload, LineTerminator};
pub use error::ExtractError;
pub use job::{ExtractionJob, JobOutcome, JobSpec, JobStage, SkipReason};
pub use namer::DestinationName;
pub use row::{Row, RowSequence, RowStream};
pub use sink::ObjectSink;
pub use source::{QuerySpec, RowSource};
pub use value::ColumnValue;
pub use window::{Granularity, TimeWindow};

// Re-export for downstream consumers
pub use tokio_util::sync::CancellationToken;
