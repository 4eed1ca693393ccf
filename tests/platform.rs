//! HTTP group platform against a mocked REST API.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use wvwlink::server::platform::{http::HttpPlatform, GroupPlatform, PERMISSION_ADMINISTRATOR};

const TOKEN: &str = "test-bot-token";

fn platform(server: &ServerGuard) -> HttpPlatform {
    HttpPlatform::new(reqwest::Client::new(), server.url(), TOKEN)
}

/// Expect roles to be listed with their permission bitsets
#[tokio::test]
async fn lists_roles() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/guilds/g1/roles")
        .match_header("authorization", format!("Bot {}", TOKEN).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "id": "r1", "name": "WvW-Verified", "permissions": "0" },
                { "id": "r2", "name": "Admins", "permissions": PERMISSION_ADMINISTRATOR.to_string() },
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let roles = platform(&server).list_roles("g1").await.unwrap();

    assert_eq!(roles.len(), 2);
    assert!(roles[0].is_adoptable());
    assert!(!roles[1].is_adoptable());
    mock.assert_async().await;
}

/// Expect a role with an unreadable permission bitset to never be adoptable
#[tokio::test]
async fn unreadable_permissions_are_not_adoptable() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/guilds/g1/roles")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "id": "r1", "name": "Anvil Rock", "permissions": "not-a-number" },
                { "id": "r2", "name": "Borlis Pass" },
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let roles = platform(&server).list_roles("g1").await.unwrap();

    assert_eq!(roles.len(), 2);
    assert!(roles.iter().all(|role| !role.is_adoptable()));
    mock.assert_async().await;
}

/// Expect a created role to carry no permissions
#[tokio::test]
async fn creates_role_without_permissions() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/guilds/g1/roles")
        .match_body(Matcher::PartialJson(
            json!({ "name": "Anvil Rock", "permissions": "0" }),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "r9", "name": "Anvil Rock", "permissions": "0" }).to_string())
        .create_async()
        .await;

    let role = platform(&server).create_role("g1", "Anvil Rock").await.unwrap();

    assert_eq!(role.id, "r9");
    assert_eq!(role.permissions, 0);
    mock.assert_async().await;
}

/// Expect an unknown member to be reported as absent rather than as an error
#[tokio::test]
async fn unknown_member_is_none() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/guilds/g1/members/u1")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 10007, "message": "Unknown Member" }).to_string())
        .create_async()
        .await;

    let member = platform(&server).get_member("g1", "u1").await.unwrap();

    assert!(member.is_none());
    mock.assert_async().await;
}

/// Expect other 404s to stay errors
#[tokio::test]
async fn unknown_group_is_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/guilds/g1/members/u1")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 10004, "message": "Unknown Guild" }).to_string())
        .create_async()
        .await;

    let result = platform(&server).get_member("g1", "u1").await;

    assert!(result.is_err());
    mock.assert_async().await;
}

/// Expect a 429 to be waited out and the request repeated
#[tokio::test]
async fn waits_out_rate_limit() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("GET", "/guilds/g1/members/u1")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(json!({ "message": "You are being rate limited.", "retry_after": 0.05 }).to_string())
        .expect(1)
        .create_async()
        .await;
    let member = server
        .mock("GET", "/guilds/g1/members/u1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "user": { "id": "u1" }, "nick": "Tester.1234", "roles": ["r1"] }).to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let fetched = platform(&server)
        .get_member("g1", "u1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fetched.user_id, "u1");
    assert_eq!(fetched.nickname.as_deref(), Some("Tester.1234"));
    assert_eq!(fetched.role_ids, vec!["r1".to_string()]);
    limited.assert_async().await;
    member.assert_async().await;
}

/// Expect role assignment and nickname changes to hit the member routes
#[tokio::test]
async fn mutates_member() {
    let mut server = Server::new_async().await;
    let add = server
        .mock("PUT", "/guilds/g1/members/u1/roles/r1")
        .with_status(204)
        .create_async()
        .await;
    let remove = server
        .mock("DELETE", "/guilds/g1/members/u1/roles/r2")
        .with_status(204)
        .create_async()
        .await;
    let rename = server
        .mock("PATCH", "/guilds/g1/members/u1")
        .match_body(Matcher::Json(json!({ "nick": "Tester.1234" })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let platform = platform(&server);
    platform.add_role("g1", "u1", "r1").await.unwrap();
    platform.remove_role("g1", "u1", "r2").await.unwrap();
    platform.set_nickname("g1", "u1", "Tester.1234").await.unwrap();

    add.assert_async().await;
    remove.assert_async().await;
    rename.assert_async().await;
}

/// Expect a refused mutation to surface as an error
#[tokio::test]
async fn refused_mutation_is_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/guilds/g1/members/u1/roles/r1")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(json!({ "code": 50013, "message": "Missing Permissions" }).to_string())
        .create_async()
        .await;

    let result = platform(&server).add_role("g1", "u1", "r1").await;

    assert!(result.is_err());
    mock.assert_async().await;
}

/// Expect a short page to end member listing
#[tokio::test]
async fn lists_members() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/guilds/g1/members")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".to_string(), "1000".to_string()),
            Matcher::UrlEncoded("after".to_string(), "0".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "user": { "id": "u1" }, "roles": [] },
                { "user": { "id": "u2" }, "nick": null, "roles": ["r1"] },
            ])
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let members = platform(&server).list_members("g1").await.unwrap();

    assert_eq!(members.len(), 2);
    assert_eq!(members[1].role_ids, vec!["r1".to_string()]);
    mock.assert_async().await;
}
