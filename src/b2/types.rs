//! B2 API request and response types
//!
//! Request bodies are typed structs serialized as camelCase JSON; optional
//! fields are omitted entirely so the wire payload carries only what the
//! caller set.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Deserialize a number that might be encoded as a string or null.
/// B2 API sometimes returns numeric fields as strings (e.g. "1536964279000")
/// and may return null for folder/hide entries.
fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// Like `deserialize_flexible_u64`, but keeps an absent field distinguishable
fn deserialize_flexible_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_flexible_u64(deserializer).map(Some)
}

/// Bucket visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketType {
    AllPublic,
    AllPrivate,
    Snapshot,
    /// Any type this client does not know about
    #[serde(other)]
    Other,
}

impl BucketType {
    pub fn from_public(is_public: bool) -> Self {
        if is_public {
            BucketType::AllPublic
        } else {
            BucketType::AllPrivate
        }
    }

    pub fn is_public(self) -> bool {
        self == BucketType::AllPublic
    }
}

/// Response from b2_authorize_account (v1 flat layout)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizeAccountResponse {
    pub account_id: String,
    pub authorization_token: String,
    pub api_url: String,
    pub download_url: String,
}

/// Bucket as returned by the bucket endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    #[serde(default)]
    pub account_id: Option<String>,
    pub bucket_id: String,
    pub bucket_name: String,
    pub bucket_type: BucketType,
    #[serde(default)]
    pub bucket_info: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub revision: Option<u64>,
}

/// Response from b2_list_buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBucketsResponse {
    pub buckets: Vec<Bucket>,
}

/// B2 file version information from API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawFileInfo")]
pub struct FileInfo {
    /// Null for folder entries
    pub file_id: Option<String>,
    /// Full file path within the bucket
    pub file_name: String,
    /// "upload", "folder", "hide" or "start"
    pub action: Option<String>,
    pub content_length: u64,
    pub content_type: Option<String>,
    pub content_sha1: Option<String>,
    /// Milliseconds since epoch
    pub upload_timestamp: u64,
    /// Custom metadata set at upload time (the X-Bz-Info-* headers)
    pub file_info: HashMap<String, String>,
    pub bucket_id: Option<String>,
    pub account_id: Option<String>,
}

/// Wire form of `FileInfo`. v1 listings report the length as `size`, other
/// endpoints as `contentLength`, and some entries carry both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileInfo {
    #[serde(default)]
    file_id: Option<String>,
    file_name: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_opt_u64")]
    content_length: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_flexible_opt_u64")]
    size: Option<u64>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    content_sha1: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    upload_timestamp: u64,
    #[serde(default)]
    file_info: HashMap<String, String>,
    #[serde(default)]
    bucket_id: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
}

impl From<RawFileInfo> for FileInfo {
    fn from(raw: RawFileInfo) -> Self {
        FileInfo {
            file_id: raw.file_id,
            file_name: raw.file_name,
            action: raw.action,
            content_length: raw.content_length.or(raw.size).unwrap_or(0),
            content_type: raw.content_type,
            content_sha1: raw.content_sha1,
            upload_timestamp: raw.upload_timestamp,
            file_info: raw.file_info,
            bucket_id: raw.bucket_id,
            account_id: raw.account_id,
        }
    }
}

impl FileInfo {
    pub fn is_folder(&self) -> bool {
        self.action.as_deref() == Some("folder")
    }

    /// Hide markers shadow earlier versions of the same name
    pub fn is_hidden(&self) -> bool {
        self.action.as_deref() == Some("hide")
    }
}

/// Response from b2_list_file_names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileNamesResponse {
    pub files: Vec<FileInfo>,
    /// Cursor for the next page (None if no more files)
    #[serde(default)]
    pub next_file_name: Option<String>,
}

/// Response from b2_list_file_versions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileVersionsResponse {
    pub files: Vec<FileInfo>,
    #[serde(default)]
    pub next_file_name: Option<String>,
    #[serde(default)]
    pub next_file_id: Option<String>,
}

/// Response from b2_delete_file_version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFileVersion {
    pub file_id: String,
    pub file_name: String,
}

/// Single-use upload target from b2_get_upload_url
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    #[serde(default)]
    pub bucket_id: Option<String>,
    pub upload_url: String,
    pub authorization_token: String,
}

/// Caller-defined file metadata, sent as `X-Bz-Info-<key>` headers in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMeta(Vec<(String, String)>);

impl FileMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FileMeta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FileMeta(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---- request bodies ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBucketRequest<'a> {
    pub account_id: &'a str,
    pub bucket_name: &'a str,
    pub bucket_type: BucketType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteBucketRequest<'a> {
    pub account_id: &'a str,
    pub bucket_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateBucketRequest<'a> {
    pub account_id: &'a str,
    pub bucket_id: &'a str,
    pub bucket_type: BucketType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListBucketsRequest<'a> {
    pub account_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<&'a str>,
}

/// Request body for b2_list_file_names
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileNamesRequest {
    pub bucket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl ListFileNamesRequest {
    pub fn new(bucket_id: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            ..Self::default()
        }
    }
}

/// Request body for b2_list_file_versions
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileVersionsRequest {
    pub bucket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl ListFileVersionsRequest {
    pub fn new(bucket_id: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileIdRequest<'a> {
    pub file_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BucketIdRequest<'a> {
    pub bucket_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HideFileRequest<'a> {
    pub bucket_id: &'a str,
    pub file_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteFileVersionRequest<'a> {
    pub file_id: &'a str,
    pub file_name: &'a str,
}
