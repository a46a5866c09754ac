//! Mock-server fixtures shared by the client tests

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;

use super::B2Client;
use crate::config::{ClientConfig, Credentials};

pub const ACCOUNT_ID: &str = "acct123";
pub const AUTH_TOKEN: &str = "4_0022623512fc8f80000000001_0186e431_d18d02_acct_tok";
pub const AUTH_PATH: &str = "/b2api/v1/b2_authorize_account";

/// Point the client's identity endpoint at the mock server
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        auth_url: server.url(AUTH_PATH),
        ..ClientConfig::default()
    }
}

/// Identity endpoint that hands out the mock server as both API and download host
pub fn mock_authorize(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path(AUTH_PATH);
        then.status(200).json_body(json!({
            "accountId": ACCOUNT_ID,
            "authorizationToken": AUTH_TOKEN,
            "apiUrl": server.base_url(),
            "downloadUrl": server.base_url(),
            "recommendedPartSize": 100000000,
            "absoluteMinimumPartSize": 5000000
        }));
    })
}

pub fn authorized_client(server: &MockServer) -> B2Client {
    mock_authorize(server);
    B2Client::authorize_account(config_for(server), &Credentials::new(ACCOUNT_ID, "secret"))
        .expect("mock authorization")
}
