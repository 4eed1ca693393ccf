use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::server::{
    error::platform::PlatformError,
    platform::{GroupPlatform, Member, PlatformRole},
};

/// Members fetched per page when listing a group.
const MEMBER_PAGE_SIZE: usize = 1000;

/// Waits on 429 are capped so a bogus header cannot park a worker for long.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Error code the platform answers with for unknown members.
const UNKNOWN_MEMBER_CODE: u64 = 10007;

#[derive(Deserialize)]
struct RoleDto {
    id: String,
    name: String,
    #[serde(default)]
    permissions: String,
}

impl From<RoleDto> for PlatformRole {
    fn from(dto: RoleDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            // Permission bitsets are transported as decimal strings. An unreadable one is
            // treated as all permissions so the role is never adopted.
            permissions: dto.permissions.parse().unwrap_or(u64::MAX),
        }
    }
}

#[derive(Deserialize)]
struct UserDto {
    id: String,
}

#[derive(Deserialize)]
struct MemberDto {
    user: UserDto,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl From<MemberDto> for Member {
    fn from(dto: MemberDto) -> Self {
        Self {
            user_id: dto.user.id,
            role_ids: dto.roles,
            nickname: dto.nick,
        }
    }
}

#[derive(Deserialize)]
struct ErrorDto {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    retry_after: Option<f64>,
}

/// Platform backed by a Discord-compatible REST API with a bot token.
#[derive(Clone)]
pub struct HttpPlatform {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpPlatform {
    pub fn new(http: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Sends a request, waiting out 429 answers as instructed by the platform.
    async fn send_raw<F>(
        &self,
        operation: &'static str,
        build: F,
    ) -> Result<Response, PlatformError>
    where
        F: Fn() -> RequestBuilder,
    {
        loop {
            let response = build().send().await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let header_wait = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok());
            let body_wait = response
                .json::<ErrorDto>()
                .await
                .ok()
                .and_then(|e| e.retry_after);
            let wait = body_wait
                .or(header_wait)
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(Duration::from_secs(1))
                .min(MAX_RATE_LIMIT_WAIT);

            warn!(
                operation = operation,
                wait_ms = wait.as_millis() as u64,
                "Platform rate limited (429), waiting before retry"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Like [`Self::send_raw`] but turns every non-success status into an error.
    async fn send<F>(&self, operation: &'static str, build: F) -> Result<Response, PlatformError>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = self.send_raw(operation, build).await?;

        if response.status().is_success() {
            return Ok(response);
        }

        Err(Self::refusal(operation, response).await)
    }

    async fn refusal(operation: &'static str, response: Response) -> PlatformError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ErrorDto>(&body)
            .map(|e| format!("{} ({}): {}", status, e.code, e.message))
            .unwrap_or_else(|_| format!("{}: {}", status, body));

        PlatformError::Request { operation, reason }
    }

    async fn parse<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, PlatformError> {
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|source| PlatformError::Parse { operation, source })
    }
}

#[async_trait]
impl GroupPlatform for HttpPlatform {
    async fn list_roles(&self, group_id: &str) -> Result<Vec<PlatformRole>, PlatformError> {
        let path = format!("/guilds/{}/roles", group_id);
        let response = self
            .send("list_roles", || self.request(Method::GET, &path))
            .await?;
        let roles: Vec<RoleDto> = Self::parse("list_roles", response).await?;

        Ok(roles.into_iter().map(PlatformRole::from).collect())
    }

    async fn create_role(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<PlatformRole, PlatformError> {
        let path = format!("/guilds/{}/roles", group_id);
        let body = json!({ "name": name, "permissions": "0", "mentionable": true });
        let response = self
            .send("create_role", || {
                self.request(Method::POST, &path).json(&body)
            })
            .await?;
        let role: RoleDto = Self::parse("create_role", response).await?;

        debug!("Created role {} ({}) in group {}", role.name, role.id, group_id);

        Ok(role.into())
    }

    async fn add_role(
        &self,
        group_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/guilds/{}/members/{}/roles/{}", group_id, user_id, role_id);
        self.send("add_role", || self.request(Method::PUT, &path))
            .await?;

        Ok(())
    }

    async fn remove_role(
        &self,
        group_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/guilds/{}/members/{}/roles/{}", group_id, user_id, role_id);
        self.send("remove_role", || self.request(Method::DELETE, &path))
            .await?;

        Ok(())
    }

    async fn get_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, PlatformError> {
        let path = format!("/guilds/{}/members/{}", group_id, user_id);
        let response = self
            .send_raw("get_member", || self.request(Method::GET, &path))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorDto>(&body)
                .map(|e| e.code)
                .unwrap_or_default();
            if code == UNKNOWN_MEMBER_CODE {
                return Ok(None);
            }
            return Err(PlatformError::Request {
                operation: "get_member",
                reason: format!("404: {}", body),
            });
        }

        if !response.status().is_success() {
            return Err(Self::refusal("get_member", response).await);
        }

        let member: MemberDto = Self::parse("get_member", response).await?;

        Ok(Some(member.into()))
    }

    async fn set_nickname(
        &self,
        group_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/guilds/{}/members/{}", group_id, user_id);
        let body = json!({ "nick": nickname });
        self.send("set_nickname", || {
            self.request(Method::PATCH, &path).json(&body)
        })
        .await?;

        Ok(())
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<Member>, PlatformError> {
        let path = format!("/guilds/{}/members", group_id);
        let mut members: Vec<Member> = Vec::new();
        let mut after = String::from("0");

        loop {
            let query = [
                ("limit", MEMBER_PAGE_SIZE.to_string()),
                ("after", after.clone()),
            ];
            let response = self
                .send("list_members", || {
                    self.request(Method::GET, &path).query(&query)
                })
                .await?;
            let page: Vec<MemberDto> = Self::parse("list_members", response).await?;
            let page_len = page.len();

            if let Some(last) = page.last() {
                after = last.user.id.clone();
            }
            members.extend(page.into_iter().map(Member::from));

            if page_len < MEMBER_PAGE_SIZE {
                return Ok(members);
            }
        }
    }
}
