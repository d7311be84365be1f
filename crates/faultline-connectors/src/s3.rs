//! S3 export destinations.
//!
//! A destination URL `s3://bucket/prefix` is split into an [`S3Destination`];
//! the upload credentials come separately from the `AWS_*` environment as
//! [`S3Credentials`], so the URL can be logged as-is.

use anyhow::{Context, Result};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use url::Url;

/// Credentials and endpoint used to upload export objects.
#[derive(Clone)]
pub struct S3Credentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// MinIO / LocalStack endpoint when not uploading to AWS itself.
    pub endpoint_url: Option<String>,
    pub allow_http: bool,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("region", &self.region)
            .field("access_key_id", &"***")
            .field("secret_access_key", &"***")
            .field("endpoint_url", &self.endpoint_url)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

impl S3Credentials {
    /// Reads `AWS_REGION` (default `us-east-1`), `AWS_ACCESS_KEY_ID`,
    /// `AWS_SECRET_ACCESS_KEY`, `AWS_ENDPOINT_URL` and `AWS_ALLOW_HTTP`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID")
                .context("AWS_ACCESS_KEY_ID not set for the s3:// destination")?,
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY")
                .context("AWS_SECRET_ACCESS_KEY not set for the s3:// destination")?,
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            allow_http: std::env::var("AWS_ALLOW_HTTP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// Bucket and key prefix that export objects are written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Destination {
    pub bucket: String,
    /// Empty when objects land at the bucket root.
    pub prefix: String,
}

impl S3Destination {
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).context("invalid S3 destination URL")?;
        anyhow::ensure!(url.scheme() == "s3", "destination scheme must be s3://");
        let bucket = url
            .host_str()
            .filter(|h| !h.is_empty())
            .context("missing bucket in S3 destination URL")?
            .to_string();
        let prefix = url.path().trim_matches('/').to_string();
        Ok(Self { bucket, prefix })
    }

    /// Connects to the bucket; object names are later joined onto the
    /// returned prefix.
    pub fn open(&self, credentials: &S3Credentials) -> Result<(AmazonS3, ObjectPath)> {
        let mut builder = AmazonS3Builder::new()
            .with_region(&credentials.region)
            .with_bucket_name(&self.bucket)
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key);
        if let Some(ref endpoint) = credentials.endpoint_url {
            builder = builder.with_endpoint(endpoint);
        }
        if credentials.allow_http {
            builder = builder.with_allow_http(true);
        }
        let store = builder
            .build()
            .with_context(|| format!("cannot open export bucket {}", self.bucket))?;
        Ok((store, ObjectPath::from(self.prefix.as_str())))
    }
}
