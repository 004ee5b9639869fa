use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::error::DeployError;

/// Canned ACL applied to an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    Private,
    PublicRead,
}

/// Destination for published files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// PUT one object.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        acl: Acl,
    ) -> Result<(), DeployError>;

    /// Human-readable destination for logs, e.g. `s3://bucket`.
    fn describe(&self) -> String;
}

/// S3-backed implementation of ObjectStore.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        acl: Acl,
    ) -> Result<(), DeployError> {
        let acl = match acl {
            Acl::Private => ObjectCannedAcl::Private,
            Acl::PublicRead => ObjectCannedAcl::PublicRead,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .acl(acl)
            .send()
            .await
            .map_err(|e| DeployError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// Where published files go: the bucket plus how to reach it.
#[derive(Debug, Clone)]
pub struct S3Target {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for an S3-compatible host; forces path-style keys
    pub endpoint: Option<String>,
}

impl S3Target {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self
    }

    /// Custom endpoints use path-style addressing.
    pub fn path_style(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn describe(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("s3://{} via {}", self.bucket, endpoint),
            None => format!("s3://{} ({})", self.bucket, self.region),
        }
    }
}

impl S3ObjectStore {
    /// Resolve AWS credentials from the environment and bind to `target`.
    pub async fn connect(target: &S3Target) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(target.region.clone()));
        if let Some(ref endpoint) = target.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(target.path_style())
            .build();

        Self::new(Client::from_conf(s3_config), target.bucket.clone())
    }
}
