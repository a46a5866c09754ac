//! Blocking client for the Backblaze B2 cloud storage API (`b2api/v1`).
//!
//! ```no_run
//! use b2_client::{B2Client, ClientConfig, Credentials, FileMeta};
//!
//! # fn main() -> b2_client::Result<()> {
//! let credentials = Credentials::new("accountId", "applicationKey");
//! let client = B2Client::authorize_account(ClientConfig::default(), &credentials)?;
//!
//! let bucket = client.create_bucket("my-bucket", false)?;
//! let mut meta = FileMeta::new();
//! meta.insert("owner", "alice");
//! client.upload_file("notes.txt", "./notes.txt", &bucket.bucket_id, "text/plain", &meta)?;
//!
//! let bytes = client.download_file_by_name("my-bucket", "notes.txt")?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod b2;
pub mod config;

pub use b2::{B2Client, B2Error, Bucket, BucketType, FileInfo, FileMeta, Result, UploadUrl};
pub use config::{ClientConfig, Credentials};
