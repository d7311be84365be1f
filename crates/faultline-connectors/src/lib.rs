//! Faultline Connectors - Data source and storage adapters
//!
//! This crate provides the concrete collaborators of an extraction job:
//! - PostgreSQL row source (streaming, parameterized export statement)
//! - Object storage sink (S3, Azure Blob, local filesystem, in-memory)

pub mod error;
pub mod postgres;
pub mod s3;
pub mod store;

pub use error::ConnectorError;
pub use postgres::PostgresRowSource;
pub use s3::{S3Credentials, S3Destination};
pub use store::{build_store, ObjectStoreSink, WriteMode};
