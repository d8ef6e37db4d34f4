//! Storage addressing for pointer and manifest resources
//!
//! Every live stream instance of a node is published under a timestamped
//! prefix, and `latest.txt` holds the timestamp of the newest one:
//!
//! ```text
//! <endpoint>/<bucket>/<nodeName>/latest.txt
//! <endpoint>/<bucket>/<nodeName>/hls/<pointer>/live.m3u8
//! ```
//!
//! All builders are pure string formatting: equal inputs give byte-identical
//! output, which is what lets the poller skip unchanged pointers.

use crate::feed::Feed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default S3 endpoint serving the streaming bucket
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://s3-us-west-2.amazonaws.com";

/// Default streaming bucket
pub const DEFAULT_BUCKET: &str = "streaming-orcasound-net";

/// Base of the S3 console browser
pub const CONSOLE_BASE_URL: &str = "https://s3.console.aws.amazon.com/s3/buckets";

/// Name of the pointer resource inside a node prefix
pub const POINTER_FILE: &str = "latest.txt";

/// Name of the live manifest inside a stream instance prefix
pub const MANIFEST_FILE: &str = "live.m3u8";

/// Opaque token naming the newest stream instance of a feed
///
/// Only compared for equality; in practice a unix timestamp string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerValue(String);

impl PointerValue {
    /// Build a pointer from a raw response body, trimming surrounding whitespace
    pub fn from_body(body: &str) -> Option<Self> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointerValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Address of a live HLS manifest, handed to the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestUrl(String);

impl ManifestUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManifestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds storage addresses for feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResolver {
    endpoint: String,
    bucket: String,
}

impl Default for ManifestResolver {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_ENDPOINT, DEFAULT_BUCKET)
    }
}

impl ManifestResolver {
    /// Create a resolver for an endpoint and a bucket
    ///
    /// A trailing slash on the endpoint is ignored.
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            endpoint,
            bucket: bucket.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `<endpoint>/<bucket>` for this resolver's bucket
    pub fn storage_root(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }

    /// Address of the `latest.txt` pointer resource of a feed
    pub fn pointer_url(&self, feed: &Feed) -> String {
        format!("{}/{}/{}", self.storage_root(), feed.node_name, POINTER_FILE)
    }

    /// Address of the live manifest for a pointer value in a given bucket
    pub fn manifest_url(&self, pointer: &PointerValue, feed: &Feed, bucket: &str) -> ManifestUrl {
        ManifestUrl(format!(
            "{}/{}/{}/hls/{}/{}",
            self.endpoint, bucket, feed.node_name, pointer, MANIFEST_FILE
        ))
    }

    /// Storage console page listing the segments of a stream instance
    pub fn console_url(&self, pointer: &PointerValue, feed: &Feed, bucket: &str) -> String {
        format!(
            "{}/{}/{}/hls/{}/",
            CONSOLE_BASE_URL, bucket, feed.node_name, pointer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_url_for_reference_feed() {
        let resolver = ManifestResolver::default();
        let feed = Feed::new("Orcasound Lab", "orcasound-lab");
        let pointer = PointerValue::from("1690000000");

        assert_eq!(
            resolver.manifest_url(&pointer, &feed, DEFAULT_BUCKET).as_str(),
            "https://s3-us-west-2.amazonaws.com/streaming-orcasound-net/orcasound-lab/hls/1690000000/live.m3u8"
        );
    }

    #[test]
    fn test_pointer_url() {
        let resolver = ManifestResolver::default();
        let feed = Feed::new("Orcasound Lab", "orcasound-lab");

        assert_eq!(
            resolver.pointer_url(&feed),
            "https://s3-us-west-2.amazonaws.com/streaming-orcasound-net/orcasound-lab/latest.txt"
        );
    }

    #[test]
    fn test_builders_are_deterministic() {
        let resolver = ManifestResolver::new("http://localhost:9000/", "bucket");
        let feed = Feed::new("Lab", "lab");
        let pointer = PointerValue::from("42");

        assert_eq!(resolver.pointer_url(&feed), resolver.pointer_url(&feed));
        assert_eq!(
            resolver.manifest_url(&pointer, &feed, "bucket"),
            resolver.manifest_url(&pointer.clone(), &feed.clone(), "bucket")
        );
        assert_eq!(resolver.pointer_url(&feed), "http://localhost:9000/bucket/lab/latest.txt");
    }

    #[test]
    fn test_console_url() {
        let resolver = ManifestResolver::default();
        let feed = Feed::new("Lab", "orcasound-lab");
        let pointer = PointerValue::from("1690000000");

        assert_eq!(
            resolver.console_url(&pointer, &feed, DEFAULT_BUCKET),
            "https://s3.console.aws.amazon.com/s3/buckets/streaming-orcasound-net/orcasound-lab/hls/1690000000/"
        );
    }

    #[test]
    fn test_pointer_from_body() {
        assert_eq!(
            PointerValue::from_body("  1690000000\n"),
            Some(PointerValue::from("1690000000"))
        );
        assert_eq!(PointerValue::from_body(" \n"), None);
    }
}
