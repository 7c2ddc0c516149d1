use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadUrlError {
    #[error("invalid download endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
    #[error("bucket name cannot be empty")]
    EmptyBucket,
}

/// Builds `{endpoint}/{segment?}/{bucket}/{key}` links for announced objects.
///
/// Key path segments are percent-encoded; `/` inside a key is kept as a separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrlBuilder {
    base: Url,
    prefix_segments: Vec<String>,
}

impl DownloadUrlBuilder {
    pub fn new(
        endpoint: &str,
        access_segment: Option<&str>,
        bucket: &str,
    ) -> Result<Self, DownloadUrlError> {
        let trimmed_endpoint = endpoint.trim();
        let base = Url::parse(trimmed_endpoint).map_err(|error| {
            DownloadUrlError::InvalidEndpoint {
                endpoint: trimmed_endpoint.to_string(),
                message: error.to_string(),
            }
        })?;
        if base.cannot_be_a_base() {
            return Err(DownloadUrlError::InvalidEndpoint {
                endpoint: trimmed_endpoint.to_string(),
                message: "endpoint must be a hierarchical URL such as https://host".to_string(),
            });
        }

        let bucket = bucket.trim().trim_matches('/');
        if bucket.is_empty() {
            return Err(DownloadUrlError::EmptyBucket);
        }

        let mut prefix_segments = access_segment
            .map(|segment| {
                segment
                    .split('/')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        prefix_segments.push(bucket.to_string());

        Ok(Self {
            base,
            prefix_segments,
        })
    }

    pub fn object_url(&self, key: &str) -> String {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(self.prefix_segments.iter().map(String::as_str));
            segments.extend(key.split('/'));
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_endpoint_bucket_and_key() {
        let builder = DownloadUrlBuilder::new("https://s3.example.com", None, "drops")
            .expect("builder should accept endpoint");
        assert_eq!(
            builder.object_url("a.zip"),
            "https://s3.example.com/drops/a.zip"
        );
    }

    #[test]
    fn includes_access_segment_and_tolerates_slashes() {
        let builder =
            DownloadUrlBuilder::new("https://link.example.com/", Some("/raw/ACCESS123/"), "/drops/")
                .expect("builder should accept endpoint");
        assert_eq!(
            builder.object_url("builds/a.zip"),
            "https://link.example.com/raw/ACCESS123/drops/builds/a.zip"
        );
    }

    #[test]
    fn keeps_endpoint_base_path() {
        let builder = DownloadUrlBuilder::new("http://localhost:9000/storage/", None, "drops")
            .expect("builder should accept endpoint");
        assert_eq!(
            builder.object_url("a.zip"),
            "http://localhost:9000/storage/drops/a.zip"
        );
    }

    #[test]
    fn percent_encodes_key_segments() {
        let builder = DownloadUrlBuilder::new("https://s3.example.com", None, "drops")
            .expect("builder should accept endpoint");
        assert_eq!(
            builder.object_url("season 1/ep#2.mkv"),
            "https://s3.example.com/drops/season%201/ep%232.mkv"
        );
    }

    #[test]
    fn rejects_invalid_endpoint_and_empty_bucket() {
        assert!(matches!(
            DownloadUrlBuilder::new("not a url", None, "drops"),
            Err(DownloadUrlError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            DownloadUrlBuilder::new("mailto:ops@example.com", None, "drops"),
            Err(DownloadUrlError::InvalidEndpoint { .. })
        ));
        assert_eq!(
            DownloadUrlBuilder::new("https://s3.example.com", None, " / "),
            Err(DownloadUrlError::EmptyBucket)
        );
    }
}
