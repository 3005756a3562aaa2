//! Read access to source files kept in S3-compatible object storage.

use anyhow::{anyhow, Context, Result};
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::S3Settings;

/// Bucket and key of an `s3://bucket/key` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| anyhow!("object uri must start with s3://: {uri}"))?;
        let (bucket, key) = rest
            .split_once('/')
            .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
            .ok_or_else(|| anyhow!("object uri must name a bucket and a key: {uri}"))?;
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
}

impl ObjectStore {
    pub async fn new(settings: &S3Settings) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if settings.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    pub async fn get_object(&self, location: &ObjectLocation) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .with_context(|| format!("failed to fetch s3://{}/{}", location.bucket, location.key))?;

        let data = output
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read s3://{}/{}", location.bucket, location.key))?;
        Ok(data.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_nested_key() {
        let location = ObjectLocation::parse("s3://data-handling-public/exports/products.csv").unwrap();
        assert_eq!(location.bucket, "data-handling-public");
        assert_eq!(location.key, "exports/products.csv");
    }

    #[test]
    fn rejects_incomplete_uris() {
        assert!(ObjectLocation::parse("https://example.com/products.csv").is_err());
        assert!(ObjectLocation::parse("s3://bucket-only").is_err());
        assert!(ObjectLocation::parse("s3:///products.csv").is_err());
    }
}
