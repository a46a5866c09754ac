//! Backblaze B2 API Client
//!
//! Session and request dispatch. Holds the authorization state returned by
//! b2_authorize_account and sends every request through one of three
//! primitives: [`B2Client::post`] (JSON API calls), [`B2Client::get`]
//! (downloads) and [`B2Client::upload_binary`] (raw upload bodies).
//! Bucket and file endpoints are built on top of these in `buckets.rs` and
//! `files.rs`.

use std::fmt;

use base64::Engine;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::errors::{B2Error, Result};
use super::types::AuthorizeAccountResponse;
use crate::config::{ClientConfig, Credentials};

/// Auth state set by a successful authorize; read-only afterwards
struct Session {
    api_url: String,
    download_url: String,
    auth_token: String,
}

/// B2 API client for making authenticated requests
pub struct B2Client {
    /// HTTP client for making requests
    http_client: Client,
    config: ClientConfig,
    /// B2 account ID (replaced by the one the server reports on authorize)
    account_id: String,
    /// None until authorized
    session: Option<Session>,
}

impl fmt::Debug for B2Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("B2Client")
            .field("account_id", &self.account_id)
            .field("api_url", &self.api_url())
            .field("download_url", &self.download_url())
            .field("authorized", &self.is_authorized())
            .finish()
    }
}

impl B2Client {
    /// Create an unauthorized client; call [`B2Client::authorize`] before anything else
    pub fn new(config: ClientConfig, account_id: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(B2Error::transport)?;

        Ok(Self::with_http_client(http_client, config, account_id))
    }

    /// Create an unauthorized client around an existing HTTP client
    pub fn with_http_client(http_client: Client, config: ClientConfig, account_id: &str) -> Self {
        Self {
            http_client,
            config,
            account_id: account_id.to_string(),
            session: None,
        }
    }

    /// Construct and authorize in one step
    ///
    /// # Arguments
    /// * `config` - Endpoint and timeout settings
    /// * `credentials` - Account id and application key
    ///
    /// # Returns
    /// A B2Client ready for API calls
    pub fn authorize_account(config: ClientConfig, credentials: &Credentials) -> Result<Self> {
        let mut client = Self::new(config, &credentials.account_id)?;
        client.authorize(&credentials.account_id, &credentials.application_key)?;
        Ok(client)
    }

    /// Authorize with B2 and store the session
    ///
    /// A rejected credential (4xx) or an incomplete authorization response
    /// fails with [`B2Error::Auth`] and drops any previous session, so no
    /// later call can succeed until a fresh authorize.
    pub fn authorize(&mut self, account_id: &str, application_key: &str) -> Result<()> {
        info!(account_id = account_id, "Authorizing with B2 API...");

        let credentials = format!("{}:{}", account_id, application_key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let auth_header = format!("Basic {}", encoded);

        let response = self
            .http_client
            .get(&self.config.auth_url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, auth_header)
            .send()
            .map_err(|e| {
                warn!(error = %e, "Failed to connect to B2 authorization endpoint");
                B2Error::transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = B2Error::from_auth_status(status.as_u16(), &body);
            if err.is_auth() {
                self.session = None;
            }
            warn!(status = status.as_u16(), error = %err, "B2 authorization failed");
            return Err(err);
        }

        let auth_response: AuthorizeAccountResponse = read_json(response)?;
        if auth_response.authorization_token.is_empty()
            || auth_response.api_url.is_empty()
            || auth_response.download_url.is_empty()
        {
            self.session = None;
            warn!("B2 authorization response is missing the token or service URLs");
            return Err(B2Error::Auth(
                "authorization response is missing the token or service URLs".to_string(),
            ));
        }

        debug!(
            api_url = %auth_response.api_url,
            download_url = %auth_response.download_url,
            "B2 authorization successful"
        );

        self.account_id = auth_response.account_id;
        self.session = Some(Session {
            api_url: auth_response.api_url,
            download_url: auth_response.download_url,
            auth_token: auth_response.authorization_token,
        });

        info!(account_id = %self.account_id, "B2 client ready");
        Ok(())
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn is_authorized(&self) -> bool {
        self.session.is_some()
    }

    /// Base URL for API calls, once authorized
    pub fn api_url(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.api_url.as_str())
    }

    /// Base URL for downloads, once authorized
    pub fn download_url(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.download_url.as_str())
    }

    pub fn authorization_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.auth_token.as_str())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or_else(B2Error::not_authorized)
    }

    /// Download base URL, failing if the client is not authorized
    pub(crate) fn download_base(&self) -> Result<&str> {
        self.session().map(|s| s.download_url.as_str())
    }

    /// POST a JSON body to `api_url + path` and parse the JSON response
    ///
    /// Use `serde_json::Value` as `T` to get the raw parsed document.
    pub fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let session = self.session()?;
        let url = format!("{}{}", session.api_url, path);

        debug!(url = %url, "POST B2 API");

        let request = self
            .http_client
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, &session.auth_token)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        let response = self.send(request, &url)?;
        read_json(response)
    }

    /// GET an absolute URL and return the raw body
    pub fn get(&self, url: &str) -> Result<Vec<u8>> {
        let session = self.session()?;

        debug!(url = %url, "GET B2 download");

        let request = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, &session.auth_token);

        let response = self.send(request, url)?;
        let bytes = response.bytes().map_err(B2Error::transport)?;
        Ok(bytes.to_vec())
    }

    /// POST raw bytes to an absolute upload URL with the given headers
    ///
    /// `headers` must carry the upload authorization token, not the session token.
    pub fn upload_binary<T>(&self, upload_url: &str, headers: HeaderMap, data: Vec<u8>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.session()?;

        debug!(url = %upload_url, size = data.len(), "POST B2 upload");

        let request = self.http_client.post(upload_url).headers(headers).body(data);

        let response = self.send(request, upload_url)?;
        read_json(response)
    }

    /// Send a request and turn non-2xx responses into errors
    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request.send().map_err(|e| {
            warn!(url = %url, error = %e, "B2 request failed to send");
            B2Error::transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let err = B2Error::from_status(status.as_u16(), &body);
        warn!(url = %url, status = status.as_u16(), error = %err, "B2 request failed");
        Err(err)
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let bytes = response.bytes().map_err(B2Error::transport)?;
    serde_json::from_slice(&bytes).map_err(|e| B2Error::invalid_body(status, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::b2::test_support::{
        authorized_client, config_for, mock_authorize, ACCOUNT_ID, AUTH_PATH, AUTH_TOKEN,
    };
    use httpmock::prelude::*;
    use reqwest::header::HeaderValue;
    use serde_json::{json, Value};

    #[test]
    fn test_authorize_stores_session() {
        let server = MockServer::start();
        let auth_mock = server.mock(|when, then| {
            when.method(GET)
                .path(AUTH_PATH)
                // base64("id:key")
                .header("authorization", "Basic aWQ6a2V5")
                .header("accept", "application/json");
            then.status(200).json_body(json!({
                "accountId": ACCOUNT_ID,
                "authorizationToken": AUTH_TOKEN,
                "apiUrl": server.base_url(),
                "downloadUrl": server.url("/dl"),
                "recommendedPartSize": 100000000
            }));
        });

        let mut client = B2Client::new(config_for(&server), "id").unwrap();
        assert!(!client.is_authorized());
        client.authorize("id", "key").unwrap();

        auth_mock.assert();
        assert!(client.is_authorized());
        assert_eq!(client.account_id(), ACCOUNT_ID);
        assert_eq!(client.api_url(), Some(server.base_url().as_str()));
        assert_eq!(client.download_url(), Some(server.url("/dl").as_str()));
        assert_eq!(client.authorization_token(), Some(AUTH_TOKEN));
    }

    #[test]
    fn test_authorize_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(AUTH_PATH);
            then.status(401).json_body(json!({
                "status": 401,
                "code": "unauthorized",
                "message": "invalid application key"
            }));
        });

        let mut client = B2Client::new(config_for(&server), "id").unwrap();
        let err = client.authorize("id", "wrong").unwrap_err();

        assert!(matches!(err, B2Error::Auth(ref m) if m == "invalid application key"));
        assert!(!client.is_authorized());
        assert_eq!(client.api_url(), None);
        assert_eq!(client.download_url(), None);
        assert_eq!(client.authorization_token(), None);
    }

    #[test]
    fn test_rejected_reauthorize_drops_session() {
        let server = MockServer::start();
        let mut accepting = mock_authorize(&server);
        let mut client =
            B2Client::authorize_account(config_for(&server), &Credentials::new(ACCOUNT_ID, "secret"))
                .unwrap();
        assert!(client.is_authorized());

        // Identity endpoint now rejects the key
        accepting.delete();
        server.mock(|when, then| {
            when.method(GET).path(AUTH_PATH);
            then.status(401).json_body(json!({"message": "key revoked"}));
        });

        let err = client.authorize(ACCOUNT_ID, "secret").unwrap_err();
        assert_eq!(err.to_string(), "key revoked");
        assert!(!client.is_authorized());
    }

    #[test]
    fn test_incomplete_reauthorize_drops_session() {
        let server = MockServer::start();
        let mut accepting = mock_authorize(&server);
        let mut client =
            B2Client::authorize_account(config_for(&server), &Credentials::new(ACCOUNT_ID, "secret"))
                .unwrap();
        assert!(client.is_authorized());

        accepting.delete();
        server.mock(|when, then| {
            when.method(GET).path(AUTH_PATH);
            then.status(200).json_body(json!({
                "accountId": ACCOUNT_ID,
                "authorizationToken": "",
                "apiUrl": server.base_url(),
                "downloadUrl": server.base_url()
            }));
        });

        let err = client.authorize(ACCOUNT_ID, "secret").unwrap_err();
        assert!(err.is_auth());
        assert!(!client.is_authorized());
        assert_eq!(client.authorization_token(), None);
    }

    #[test]
    fn test_authorize_account_one_step() {
        let server = MockServer::start();
        let auth_mock = mock_authorize(&server);

        let client =
            B2Client::authorize_account(config_for(&server), &Credentials::new(ACCOUNT_ID, "secret"))
                .unwrap();
        auth_mock.assert();
        assert!(client.is_authorized());
    }

    #[test]
    fn test_calls_before_authorize_fail_without_network() {
        let server = MockServer::start();
        let catch_all = server.mock(|when, then| {
            when.path_contains("/");
            then.status(200).json_body(json!({}));
        });

        let client = B2Client::new(config_for(&server), ACCOUNT_ID).unwrap();

        let err = client
            .post::<_, Value>("/b2api/v1/b2_list_buckets", &json!({"accountId": ACCOUNT_ID}))
            .unwrap_err();
        assert!(err.is_auth());
        assert!(client.get(&server.url("/file/b/f")).unwrap_err().is_auth());
        assert!(client
            .upload_binary::<Value>(&server.url("/upload"), HeaderMap::new(), vec![1, 2, 3])
            .unwrap_err()
            .is_auth());

        assert_eq!(catch_all.hits(), 0);
    }

    #[test]
    fn test_post_sends_token_and_parses_json() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/b2api/v1/b2_list_buckets")
                .header("authorization", AUTH_TOKEN)
                .header("accept", "application/json")
                .header("content-type", "application/json")
                .json_body(json!({"accountId": ACCOUNT_ID}));
            then.status(200).json_body(json!({"buckets": []}));
        });

        let value: Value = client
            .post("/b2api/v1/b2_list_buckets", &json!({"accountId": ACCOUNT_ID}))
            .unwrap();

        api_mock.assert();
        assert_eq!(value, json!({"buckets": []}));
    }

    #[test]
    fn test_client_error_surfaces_server_message() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        server.mock(|when, then| {
            when.method(POST).path("/b2api/v1/b2_get_file_info");
            then.status(403).json_body(json!({"message": "bad auth token"}));
        });

        let err = client
            .post::<_, Value>("/b2api/v1/b2_get_file_info", &json!({"fileId": "4_x"}))
            .unwrap_err();

        match &err {
            B2Error::Api { status, message, .. } => {
                assert_eq!(*status, Some(403));
                assert_eq!(message, "bad auth token");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert_eq!(err.to_string(), "bad auth token");
    }

    #[test]
    fn test_server_error_is_api_error() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        server.mock(|when, then| {
            when.method(GET).path("/file/bucket1/big.bin");
            then.status(503).json_body(json!({
                "status": 503,
                "code": "service_unavailable",
                "message": "c001 is too busy"
            }));
        });

        let err = client.get(&server.url("/file/bucket1/big.bin")).unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().starts_with("server error (503)"));
        assert!(err.to_string().contains("c001 is too busy"));
    }

    #[test]
    fn test_post_server_error_is_api_error() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        server.mock(|when, then| {
            when.method(POST).path("/b2api/v1/b2_list_buckets");
            then.status(500).json_body(json!({
                "status": 500,
                "code": "internal_error",
                "message": "incident id 87cdfa"
            }));
        });

        let err = client
            .post::<_, Value>("/b2api/v1/b2_list_buckets", &json!({"accountId": ACCOUNT_ID}))
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.code(), Some("internal_error"));
        assert_eq!(err.to_string(), "server error (500): incident id 87cdfa");
    }

    #[test]
    fn test_transport_failure_is_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(AUTH_PATH);
            then.status(200).json_body(json!({
                "accountId": ACCOUNT_ID,
                "authorizationToken": AUTH_TOKEN,
                // Nothing listens on port 1
                "apiUrl": "http://127.0.0.1:1",
                "downloadUrl": "http://127.0.0.1:1"
            }));
        });
        let client =
            B2Client::authorize_account(config_for(&server), &Credentials::new(ACCOUNT_ID, "secret"))
                .unwrap();

        let err = client
            .post::<_, Value>("/b2api/v1/b2_list_buckets", &json!({"accountId": ACCOUNT_ID}))
            .unwrap_err();

        assert!(matches!(err, B2Error::Api { status: None, .. }));
        assert!(err.is_server_error());
        assert!(err.to_string().starts_with("transport failure"));
    }

    #[test]
    fn test_upload_transport_failure_is_api_error() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("upload_tok"));
        let err = client
            // Nothing listens on port 1
            .upload_binary::<Value>("http://127.0.0.1:1/upload", headers, vec![1, 2, 3])
            .unwrap_err();

        assert!(matches!(err, B2Error::Api { status: None, .. }));
        assert!(err.is_server_error());
        assert!(err.to_string().starts_with("transport failure"));
    }

    #[test]
    fn test_invalid_success_body() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        server.mock(|when, then| {
            when.method(POST).path("/b2api/v1/b2_list_buckets");
            then.status(200).body("not json");
        });

        let err = client
            .post::<_, Value>("/b2api/v1/b2_list_buckets", &json!({"accountId": ACCOUNT_ID}))
            .unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert!(err.to_string().starts_with("invalid response body"));
    }

    #[test]
    fn test_get_returns_raw_bytes() {
        let server = MockServer::start();
        let client = authorized_client(&server);

        let payload: Vec<u8> = vec![0x00, 0xff, 0x10, 0x80];
        server.mock(|when, then| {
            when.method(GET)
                .path("/file/bucket1/blob.bin")
                .header("authorization", AUTH_TOKEN);
            then.status(200)
                .header("content-type", "application/octet-stream")
                .body(payload.clone());
        });

        let bytes = client.get(&server.url("/file/bucket1/blob.bin")).unwrap();
        assert_eq!(bytes, payload);
    }
}
