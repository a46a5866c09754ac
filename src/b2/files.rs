//! File endpoints: listing, info, hide/delete, upload and download

use std::path::Path;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use super::client::B2Client;
use super::errors::{B2Error, Result};
use super::types::{
    BucketIdRequest, DeleteFileVersionRequest, DeletedFileVersion, FileIdRequest, FileInfo,
    FileMeta, HideFileRequest, ListFileNamesRequest, ListFileNamesResponse,
    ListFileVersionsRequest, ListFileVersionsResponse, UploadUrl,
};

const LIST_FILE_NAMES: &str = "/b2api/v1/b2_list_file_names";
const LIST_FILE_VERSIONS: &str = "/b2api/v1/b2_list_file_versions";
const GET_FILE_INFO: &str = "/b2api/v1/b2_get_file_info";
const HIDE_FILE: &str = "/b2api/v1/b2_hide_file";
const DELETE_FILE_VERSION: &str = "/b2api/v1/b2_delete_file_version";
const GET_UPLOAD_URL: &str = "/b2api/v1/b2_get_upload_url";
const DOWNLOAD_FILE_BY_ID: &str = "/b2api/v1/b2_download_file_by_id";

/// Prefix for custom file info headers
const FILE_INFO_HEADER_PREFIX: &str = "X-Bz-Info-";

impl B2Client {
    /// List the first page of file names in a bucket
    pub fn list_file_names(&self, bucket_id: &str) -> Result<ListFileNamesResponse> {
        self.list_file_names_with(&ListFileNamesRequest::new(bucket_id))
    }

    /// List file names with paging cursor, prefix and delimiter options
    ///
    /// Pass `next_file_name` from the previous response as `start_file_name`
    /// to continue; this call never follows cursors on its own.
    pub fn list_file_names_with(&self, request: &ListFileNamesRequest) -> Result<ListFileNamesResponse> {
        debug!(
            bucket_id = %request.bucket_id,
            prefix = ?request.prefix,
            start = ?request.start_file_name,
            "Listing file names from B2"
        );
        let response: ListFileNamesResponse = self.post(LIST_FILE_NAMES, request)?;
        debug!(count = response.files.len(), "Listed file names from B2");
        Ok(response)
    }

    /// List the first page of file versions in a bucket
    pub fn list_file_versions(&self, bucket_id: &str) -> Result<ListFileVersionsResponse> {
        self.list_file_versions_with(&ListFileVersionsRequest::new(bucket_id))
    }

    pub fn list_file_versions_with(
        &self,
        request: &ListFileVersionsRequest,
    ) -> Result<ListFileVersionsResponse> {
        debug!(
            bucket_id = %request.bucket_id,
            prefix = ?request.prefix,
            start_name = ?request.start_file_name,
            start_id = ?request.start_file_id,
            "Listing file versions from B2"
        );
        let response: ListFileVersionsResponse = self.post(LIST_FILE_VERSIONS, request)?;
        debug!(count = response.files.len(), "Listed file versions from B2");
        Ok(response)
    }

    pub fn get_file_info(&self, file_id: &str) -> Result<FileInfo> {
        self.post(GET_FILE_INFO, &FileIdRequest { file_id })
    }

    /// Hide a file (soft delete, creates a hide marker)
    pub fn hide_file(&self, bucket_id: &str, file_name: &str) -> Result<FileInfo> {
        info!(file = file_name, bucket_id = bucket_id, "Hiding file in B2");
        self.post(HIDE_FILE, &HideFileRequest { bucket_id, file_name })
    }

    /// Delete one version of a file (permanent)
    pub fn delete_file_version(&self, file_id: &str, file_name: &str) -> Result<DeletedFileVersion> {
        info!(file = file_name, file_id = file_id, "Deleting file version from B2");
        self.post(DELETE_FILE_VERSION, &DeleteFileVersionRequest { file_id, file_name })
    }

    /// Get a fresh upload URL and token for one upload into the bucket
    pub fn get_upload_url(&self, bucket_id: &str) -> Result<UploadUrl> {
        let upload_url: UploadUrl = self.post(GET_UPLOAD_URL, &BucketIdRequest { bucket_id })?;
        debug!(url = %upload_url.upload_url, "Got B2 upload URL");
        Ok(upload_url)
    }

    /// Download a file's content by file id
    pub fn download_file_by_id(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}{}?fileId={}",
            self.download_base()?,
            DOWNLOAD_FILE_BY_ID,
            urlencoding::encode(file_id)
        );

        let bytes = self.get(&url)?;
        info!(file_id = file_id, size = bytes.len(), "Downloaded file from B2");
        Ok(bytes)
    }

    /// Download the latest version of a file by bucket and file name
    pub fn download_file_by_name(&self, bucket_name: &str, file_name: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/file/{}/{}",
            self.download_base()?,
            encode_path(bucket_name),
            encode_path(file_name)
        );

        let bytes = self.get(&url)?;
        info!(file = file_name, size = bytes.len(), "Downloaded file from B2");
        Ok(bytes)
    }

    /// Upload a local file
    ///
    /// The file is read once, before any request; size and SHA-1 both come
    /// from that buffer. Every call fetches its own upload URL, so retrying a
    /// failed upload means calling this again.
    ///
    /// # Arguments
    /// * `file_name` - Full file path within the bucket
    /// * `local_path` - File to read
    /// * `bucket_id` - Destination bucket
    /// * `content_type` - MIME type (or "b2/x-auto")
    /// * `meta` - Custom file info, sent as `X-Bz-Info-*` headers
    pub fn upload_file(
        &self,
        file_name: &str,
        local_path: impl AsRef<Path>,
        bucket_id: &str,
        content_type: &str,
        meta: &FileMeta,
    ) -> Result<FileInfo> {
        let local_path = local_path.as_ref();
        let data = std::fs::read(local_path).map_err(|source| B2Error::Io {
            path: local_path.to_path_buf(),
            source,
        })?;

        self.upload_bytes(file_name, data, bucket_id, content_type, meta)
    }

    /// Upload an in-memory buffer
    pub fn upload_bytes(
        &self,
        file_name: &str,
        data: Vec<u8>,
        bucket_id: &str,
        content_type: &str,
        meta: &FileMeta,
    ) -> Result<FileInfo> {
        let mut hasher = Sha1::new();
        hasher.update(&data);
        let hash = format!("{:x}", hasher.finalize());

        // Built before fetching the upload URL so bad input costs no round trip
        let mut headers = upload_headers(file_name, content_type, &hash, meta)?;

        let target = self.get_upload_url(bucket_id)?;
        headers.insert(AUTHORIZATION, header_value(&target.authorization_token)?);

        info!(
            file = file_name,
            size = data.len(),
            content_type = content_type,
            "Uploading file to B2"
        );

        let file_info: FileInfo = self.upload_binary(&target.upload_url, headers, data)?;

        info!(file = file_name, file_id = ?file_info.file_id, "File uploaded to B2");
        Ok(file_info)
    }
}

/// Headers for b2_upload_file, minus the upload token
fn upload_headers(
    file_name: &str,
    content_type: &str,
    sha1: &str,
    meta: &FileMeta,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in meta.iter() {
        let name = format!("{}{}", FILE_INFO_HEADER_PREFIX, key);
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            B2Error::InvalidInput(format!("file info key {:?} is not a valid header name", key))
        })?;
        headers.insert(name, header_value(&urlencoding::encode(value))?);
    }

    // Fixed headers win over file info with the same name
    headers.insert(
        HeaderName::from_static("x-bz-file-name"),
        header_value(&encode_path(file_name))?,
    );
    headers.insert(CONTENT_TYPE, header_value(content_type)?);
    headers.insert(HeaderName::from_static("x-bz-content-sha1"), header_value(sha1)?);

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| B2Error::InvalidInput(format!("{:?} is not a valid header value", value)))
}

/// Percent-encode each path segment, keeping the `/` separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
