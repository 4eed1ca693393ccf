//! Account API mock endpoint creation utilities.
//!
//! Every method registers a mock on the setup's server and returns it; the mock verifies it
//! was called exactly `expected_requests` times when asserted.

use mockito::{Matcher, Mock};
use serde_json::Value;

use crate::fixtures::account::AccountFixtures;

impl<'a> AccountFixtures<'a> {
    /// Create a mock `GET /account` answering `account` for `key`.
    pub fn create_account_endpoint(
        &mut self,
        key: &str,
        account: Value,
        expected_requests: usize,
    ) -> Mock {
        self.json_endpoint("/account", key_matcher(key), 200, account.to_string())
            .expect(expected_requests)
            .create()
    }

    /// Create a mock `GET /tokeninfo` answering `token` for `key`.
    pub fn create_token_info_endpoint(
        &mut self,
        key: &str,
        token: Value,
        expected_requests: usize,
    ) -> Mock {
        self.json_endpoint("/tokeninfo", key_matcher(key), 200, token.to_string())
            .expect(expected_requests)
            .create()
    }

    /// Create a mock `GET /worlds?ids=all`.
    pub fn create_worlds_endpoint(&mut self, worlds: Value, expected_requests: usize) -> Mock {
        self.json_endpoint("/worlds", all_ids(), 200, worlds.to_string())
            .expect(expected_requests)
            .create()
    }

    /// Create a mock `GET /wvw/matches/overview?ids=all` answering `matches`.
    pub fn create_matches_endpoint(
        &mut self,
        matches: Vec<Value>,
        expected_requests: usize,
    ) -> Mock {
        self.json_endpoint(
            "/wvw/matches/overview",
            all_ids(),
            200,
            Value::Array(matches).to_string(),
        )
        .expect(expected_requests)
        .create()
    }

    /// Create a mock rejecting `key` on `path` the way the account API does.
    pub fn create_invalid_key_endpoint(
        &mut self,
        path: &str,
        key: &str,
        expected_requests: usize,
    ) -> Mock {
        self.json_endpoint(
            path,
            key_matcher(key),
            401,
            r#"{"text":"Invalid access token"}"#.to_string(),
        )
        .expect(expected_requests)
        .create()
    }

    /// Create a mock answering `status` with an upstream error body on `path`.
    pub fn create_error_endpoint(
        &mut self,
        path: &str,
        status: usize,
        expected_requests: usize,
    ) -> Mock {
        self.json_endpoint(
            path,
            Matcher::Any,
            status,
            r#"{"text":"ErrBadData"}"#.to_string(),
        )
        .expect(expected_requests)
        .create()
    }

    /// Create a mock answering 429 on `path`.
    pub fn create_rate_limited_endpoint(&mut self, path: &str, expected_requests: usize) -> Mock {
        self.json_endpoint(
            path,
            Matcher::Any,
            429,
            r#"{"text":"too many requests"}"#.to_string(),
        )
        .expect(expected_requests)
        .create()
    }

    /// Create a mock answering 200 with a body that is not JSON on `path`.
    pub fn create_malformed_endpoint(&mut self, path: &str, expected_requests: usize) -> Mock {
        self.setup
            .server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>maintenance</html>")
            .expect(expected_requests)
            .create()
    }

    fn json_endpoint(
        &mut self,
        path: &str,
        query: Matcher,
        status: usize,
        body: String,
    ) -> Mock {
        self.setup
            .server
            .mock("GET", path)
            .match_query(query)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
    }
}

fn key_matcher(key: &str) -> Matcher {
    Matcher::UrlEncoded("access_token".to_string(), key.to_string())
}

fn all_ids() -> Matcher {
    Matcher::UrlEncoded("ids".to_string(), "all".to_string())
}
