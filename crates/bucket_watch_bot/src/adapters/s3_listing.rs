use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::bucket_listing::{BucketLister, ListingError};
use crate::runtime::contract::BucketObject;

/// Lists a bucket through the S3 API, following continuation tokens.
#[derive(Debug, Clone)]
pub struct S3BucketLister {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl S3BucketLister {
    pub fn new(bucket: impl Into<String>, s3_client: aws_sdk_s3::Client) -> Self {
        Self {
            bucket: bucket.into(),
            s3_client,
        }
    }

    /// Client for an S3-compatible endpoint. Credentials come from the default provider chain.
    pub async fn connect(bucket: impl Into<String>, endpoint: &str, region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        Self::new(bucket, aws_sdk_s3::Client::from_conf(s3_config))
    }

    /// Fails when the bucket is missing or the credentials are rejected.
    pub async fn verify_access(&self) -> Result<(), ListingError> {
        self.s3_client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| self.listing_error(format!("bucket is not accessible: {error}")))
    }

    fn listing_error(&self, message: String) -> ListingError {
        ListingError {
            bucket: self.bucket.clone(),
            message,
        }
    }
}

#[async_trait]
impl BucketLister for S3BucketLister {
    async fn list_objects(&self) -> Result<Vec<BucketObject>, ListingError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .s3_client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|error| self.listing_error(format!("list_objects_v2 failed: {error}")))?;

            for object in response.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let last_modified = object
                    .last_modified()
                    .and_then(|instant| {
                        DateTime::<Utc>::from_timestamp(instant.secs(), instant.subsec_nanos())
                    })
                    .ok_or_else(|| {
                        self.listing_error(format!("object '{key}' has no usable last-modified time"))
                    })?;

                objects.push(BucketObject {
                    key: key.to_string(),
                    size_bytes: object
                        .size()
                        .and_then(|size| u64::try_from(size).ok())
                        .unwrap_or(0),
                    last_modified,
                });
            }

            match (response.is_truncated(), response.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(objects)
    }
}
