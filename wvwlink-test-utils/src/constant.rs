//! Placeholder values shared by tests. None of these are real credentials.

/// User agent sent by test clients.
pub static TEST_USER_AGENT: &str = "wvwlink-tests/1.0 (+https://example.com/wvwlink)";

/// API key accepted by the mocked account API.
pub static TEST_API_KEY: &str = "AAAAAAAA-1111-2222-3333-444444444444";

/// Second API key, usually for a second account.
pub static TEST_OTHER_API_KEY: &str = "BBBBBBBB-5555-6666-7777-888888888888";

/// Token name that passes key registration.
pub static TEST_TOKEN_NAME: &str = "WvW Bot";
