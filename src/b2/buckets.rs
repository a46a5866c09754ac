//! Bucket endpoints
//!
//! Each call assembles a typed request body and sends it through
//! [`B2Client::post`]; the account id comes from the session.

use tracing::{debug, info};

use super::client::B2Client;
use super::errors::Result;
use super::types::{
    Bucket, BucketType, CreateBucketRequest, DeleteBucketRequest, ListBucketsRequest,
    ListBucketsResponse, UpdateBucketRequest,
};

const CREATE_BUCKET: &str = "/b2api/v1/b2_create_bucket";
const DELETE_BUCKET: &str = "/b2api/v1/b2_delete_bucket";
const UPDATE_BUCKET: &str = "/b2api/v1/b2_update_bucket";
const LIST_BUCKETS: &str = "/b2api/v1/b2_list_buckets";

impl B2Client {
    /// Create a new bucket owned by this account
    ///
    /// # Arguments
    /// * `bucket_name` - Globally unique bucket name
    /// * `is_public` - `allPublic` when true, `allPrivate` otherwise
    pub fn create_bucket(&self, bucket_name: &str, is_public: bool) -> Result<Bucket> {
        info!(bucket = bucket_name, public = is_public, "Creating B2 bucket");

        let request = CreateBucketRequest {
            account_id: self.account_id(),
            bucket_name,
            bucket_type: BucketType::from_public(is_public),
        };
        self.post(CREATE_BUCKET, &request)
    }

    /// Delete an (empty) bucket
    pub fn delete_bucket(&self, bucket_id: &str) -> Result<Bucket> {
        info!(bucket_id = bucket_id, "Deleting B2 bucket");

        let request = DeleteBucketRequest {
            account_id: self.account_id(),
            bucket_id,
        };
        self.post(DELETE_BUCKET, &request)
    }

    /// Change a bucket's visibility
    pub fn update_bucket(&self, bucket_id: &str, is_public: bool) -> Result<Bucket> {
        info!(bucket_id = bucket_id, public = is_public, "Updating B2 bucket");

        let request = UpdateBucketRequest {
            account_id: self.account_id(),
            bucket_id,
            bucket_type: BucketType::from_public(is_public),
        };
        self.post(UPDATE_BUCKET, &request)
    }

    /// List all buckets for the account
    pub fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let request = ListBucketsRequest {
            account_id: self.account_id(),
            bucket_name: None,
        };
        let response: ListBucketsResponse = self.post(LIST_BUCKETS, &request)?;

        debug!(count = response.buckets.len(), "Listed buckets from B2");
        Ok(response.buckets)
    }

    /// Look up a bucket by name
    ///
    /// Returns `Ok(None)` when the account has no bucket with that name.
    pub fn find_bucket(&self, bucket_name: &str) -> Result<Option<Bucket>> {
        let request = ListBucketsRequest {
            account_id: self.account_id(),
            bucket_name: Some(bucket_name),
        };
        let response: ListBucketsResponse = self.post(LIST_BUCKETS, &request)?;

        Ok(response
            .buckets
            .into_iter()
            .find(|b| b.bucket_name == bucket_name))
    }
}
