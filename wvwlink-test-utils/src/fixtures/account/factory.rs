//! JSON payloads shaped like account API responses.

use serde_json::{json, Value};

/// Create an `/account` response.
///
/// # Arguments
/// - `id` - Stable account id, used by the uniqueness index
/// - `name` - Display name such as `"Tester.1234"`
/// - `world` - Realm id the account belongs to
/// - `wvw_rank` - WvW rank
pub fn mock_account(id: &str, name: &str, world: i64, wvw_rank: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "world": world,
        "wvw_rank": wvw_rank,
        "created": "2015-01-01T00:00:00Z",
        "access": ["GuildWars2"],
    })
}

/// Create a `/tokeninfo` response.
pub fn mock_token_info(name: &str, permissions: &[&str]) -> Value {
    json!({
        "id": "TOKEN-ID",
        "name": name,
        "permissions": permissions,
    })
}

/// Create a `/worlds?ids=all` response.
pub fn mock_worlds(worlds: &[(i64, &str)]) -> Value {
    Value::Array(
        worlds
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name, "population": "High" }))
            .collect(),
    )
}

/// Create one entry of a `/wvw/matches/overview?ids=all` response.
pub fn mock_match(id: &str, red: &[i64], blue: &[i64], green: &[i64]) -> Value {
    json!({
        "id": id,
        "worlds": {
            "red": red.first().copied().unwrap_or_default(),
            "blue": blue.first().copied().unwrap_or_default(),
            "green": green.first().copied().unwrap_or_default(),
        },
        "all_worlds": { "red": red, "blue": blue, "green": green },
        "start_time": "2024-01-12T18:00:00Z",
        "end_time": "2024-01-19T18:00:00Z",
    })
}
