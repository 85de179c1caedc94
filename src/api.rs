//! CivicConnect REST collaborator.
//!
//! Blocking HTTP client for the issues/organizations/comments/resolutions
//! endpoints plus auth and admin. Read-path GETs keep a last-good response
//! cache under `~/.cache/civic/responses/` and fall back to it when the
//! server is unreachable or failing, so browsing keeps working offline.

use crate::domain::models::{
    AdminSession, AdminStats, Comment, ImageAttachment, Issue, IssueDraft, IssueFilters,
    IssuePage, IssueStatus, MemberSpec, NewOrganization, OrgPage, Organization, Resolution,
    ResolutionStatus, Session, UserProfile,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Prefer the structured server message over the bare status line.
fn extract_server_message(status: u16, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(m) = v.get(field).and_then(|x| x.as_str()) {
                if !m.is_empty() {
                    return m.to_string();
                }
            }
        }
    }
    format!("server returned HTTP {}", status)
}

fn fallback_eligible(e: &ApiError) -> bool {
    match e {
        ApiError::Http(_) => true,
        ApiError::Server { status, .. } => *status >= 500,
        ApiError::Decode(_) => false,
    }
}

fn cache_path(key: &str) -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let id = hex::encode(hasher.finalize());
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join("civic")
            .join("responses")
            .join(format!("{}.json", id)),
    )
}

/// Serialize a wire enum to its query-string form (`public_safety` etc).
fn query_value<T: Serialize>(v: &T) -> Result<String, ApiError> {
    match serde_json::to_value(v)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

pub struct ApiClient {
    base: String,
    token: Option<String>,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base: &str, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    /// Swap the bearer token (admin commands use the admin session token).
    pub fn with_token(&self, token: Option<String>) -> anyhow::Result<Self> {
        Self::new(&self.base, token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authed(&self, req: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    fn read_body(resp: reqwest::blocking::Response) -> Result<String, ApiError> {
        let status = resp.status();
        let body = resp.text()?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::Server {
                status: status.as_u16(),
                message: extract_server_message(status.as_u16(), &body),
            })
        }
    }

    fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, ApiError> {
        let resp = self
            .authed(self.http.get(self.url(path)).query(query))
            .send()?;
        Self::read_body(resp)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.get_text(path, query)?)?)
    }

    /// GET with last-good caching for read paths.
    fn get_json_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut key = self.url(path);
        for (k, v) in query {
            key.push_str(&format!("&{}={}", k, v));
        }
        match self.get_text(path, query) {
            Ok(body) => {
                if let Some(cache) = cache_path(&key) {
                    if let Some(parent) = cache.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    let _ = std::fs::write(&cache, &body);
                }
                Ok(serde_json::from_str(&body)?)
            }
            Err(e) if fallback_eligible(&e) => {
                if let Some(cache) = cache_path(&key) {
                    if let Ok(raw) = std::fs::read_to_string(&cache) {
                        debug!(error = %e, "serving last-good cached response");
                        return Ok(serde_json::from_str(&raw)?);
                    }
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self
            .authed(self.http.post(self.url(path)))
            .json(body)
            .send()?;
        Ok(serde_json::from_str(&Self::read_body(resp)?)?)
    }

    fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.authed(self.http.post(self.url(path))).send()?;
        Ok(serde_json::from_str(&Self::read_body(resp)?)?)
    }

    fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self
            .authed(self.http.put(self.url(path)))
            .json(body)
            .send()?;
        Ok(serde_json::from_str(&Self::read_body(resp)?)?)
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        let resp = self.authed(self.http.delete(self.url(path))).send()?;
        Self::read_body(resp)?;
        Ok(())
    }

    // --- issues ---

    pub fn get_issues(
        &self,
        page: u64,
        limit: u64,
        filters: &IssueFilters,
    ) -> Result<IssuePage, ApiError> {
        let mut query: Vec<(&str, String)> =
            vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(c) = &filters.category {
            query.push(("category", query_value(c)?));
        }
        if let Some(s) = &filters.status {
            query.push(("status", query_value(s)?));
        }
        if let Some(p) = &filters.priority {
            query.push(("priority", query_value(p)?));
        }
        if let Some(s) = &filters.search {
            query.push(("search", s.clone()));
        }
        self.get_json_cached("/issues", &query)
    }

    pub fn get_issue(&self, id: &str) -> Result<Issue, ApiError> {
        self.get_json_cached(&format!("/issues/{}", id), &[])
    }

    pub fn my_issues(&self) -> Result<Vec<Issue>, ApiError> {
        self.get_json("/issues/mine", &[])
    }

    pub fn upvote_issue(&self, id: &str) -> Result<Issue, ApiError> {
        self.post_empty(&format!("/issues/{}/upvote", id))
    }

    pub fn downvote_issue(&self, id: &str) -> Result<Issue, ApiError> {
        self.post_empty(&format!("/issues/{}/downvote", id))
    }

    /// Submit a report as a multipart form: scalar fields plus one
    /// `images` part per staged attachment.
    pub fn create_issue(
        &self,
        draft: &IssueDraft,
        images: &[ImageAttachment],
    ) -> Result<Issue, ApiError> {
        let mut form = reqwest::blocking::multipart::Form::new()
            .text("title", draft.title.clone())
            .text("description", draft.description.clone())
            .text("priority", query_value(&draft.priority)?)
            .text("urgency", query_value(&draft.urgency)?)
            .text("address", draft.location.address.clone())
            .text("isAnonymous", draft.contact.is_anonymous.to_string())
            .text("safetyConcern", draft.additional.safety_concern.to_string())
            .text(
                "environmentalImpact",
                draft.additional.environmental_impact.to_string(),
            );
        if let Some(category) = &draft.category {
            form = form.text("category", query_value(category)?);
        }
        if let Some(coords) = &draft.location.coordinates {
            form = form
                .text("latitude", coords.latitude.to_string())
                .text("longitude", coords.longitude.to_string());
        }
        if !draft.contact.is_anonymous {
            form = form
                .text("contactName", draft.contact.name.clone())
                .text("contactEmail", draft.contact.email.clone());
            if !draft.contact.phone.trim().is_empty() {
                form = form.text("contactPhone", draft.contact.phone.clone());
            }
        }
        if let Some(cost) = draft.additional.estimated_cost {
            form = form.text("estimatedCost", cost.to_string());
        }
        if let Some(people) = draft.additional.affected_people {
            form = form.text("affectedPeople", people.to_string());
        }
        for img in images {
            let part = reqwest::blocking::multipart::Part::bytes(img.bytes.clone())
                .file_name(img.file_name.clone())
                .mime_str(&img.mime)?;
            form = form.part("images", part);
        }
        let resp = self
            .authed(self.http.post(self.url("/issues")))
            .multipart(form)
            .send()?;
        Ok(serde_json::from_str(&Self::read_body(resp)?)?)
    }

    // --- organizations ---

    pub fn get_organizations(
        &self,
        page: u64,
        limit: u64,
        search: Option<&str>,
        category: Option<&str>,
    ) -> Result<OrgPage, ApiError> {
        let mut query: Vec<(&str, String)> =
            vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(s) = search {
            query.push(("search", s.to_string()));
        }
        if let Some(c) = category {
            query.push(("category", c.to_string()));
        }
        self.get_json_cached("/organizations", &query)
    }

    pub fn get_organization(&self, id: &str) -> Result<Organization, ApiError> {
        self.get_json_cached(&format!("/organizations/{}", id), &[])
    }

    pub fn create_organization(&self, org: &NewOrganization) -> Result<Organization, ApiError> {
        self.post_json("/organizations", org)
    }

    pub fn add_member(&self, org_id: &str, member: &MemberSpec) -> Result<Organization, ApiError> {
        self.post_json(&format!("/organizations/{}/members", org_id), member)
    }

    pub fn remove_member(&self, org_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/organizations/{}/members/{}", org_id, user_id))
    }

    // --- comments ---

    pub fn get_comments(&self, issue_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.get_json(&format!("/issues/{}/comments", issue_id), &[])
    }

    pub fn add_comment(&self, issue_id: &str, text: &str) -> Result<Comment, ApiError> {
        self.post_json(
            &format!("/issues/{}/comments", issue_id),
            &serde_json::json!({ "text": text }),
        )
    }

    pub fn update_comment(&self, id: &str, text: &str) -> Result<Comment, ApiError> {
        self.put_json(
            &format!("/comments/{}", id),
            &serde_json::json!({ "text": text }),
        )
    }

    pub fn delete_comment(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/comments/{}", id))
    }

    pub fn like_comment(&self, id: &str) -> Result<Comment, ApiError> {
        self.post_empty(&format!("/comments/{}/like", id))
    }

    // --- resolutions ---

    pub fn get_resolutions(&self, issue_id: &str) -> Result<Vec<Resolution>, ApiError> {
        self.get_json(&format!("/issues/{}/resolutions", issue_id), &[])
    }

    pub fn add_resolution(&self, issue_id: &str, description: &str) -> Result<Resolution, ApiError> {
        self.post_json(
            &format!("/issues/{}/resolutions", issue_id),
            &serde_json::json!({ "description": description }),
        )
    }

    pub fn like_resolution(&self, id: &str) -> Result<Resolution, ApiError> {
        self.post_empty(&format!("/resolutions/{}/like", id))
    }

    pub fn set_resolution_status(
        &self,
        id: &str,
        status: ResolutionStatus,
    ) -> Result<Resolution, ApiError> {
        self.put_json(
            &format!("/resolutions/{}/status", id),
            &serde_json::json!({ "status": query_value(&status)? }),
        )
    }

    // --- auth ---

    pub fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        self.post_json(
            "/auth/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<Session, ApiError> {
        self.post_json(
            "/auth/register",
            &serde_json::json!({ "name": name, "email": email, "password": password }),
        )
    }

    pub fn me(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/auth/me", &[])
    }

    // --- admin (credential verification lives on the server) ---

    pub fn admin_login(&self, email: &str, password: &str) -> Result<AdminSession, ApiError> {
        self.post_json(
            "/admin/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
    }

    pub fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        self.get_json("/admin/stats", &[])
    }

    pub fn set_issue_status(&self, id: &str, status: IssueStatus) -> Result<Issue, ApiError> {
        self.put_json(
            &format!("/admin/issues/{}/status", id),
            &serde_json::json!({ "status": query_value(&status)? }),
        )
    }

    pub fn delete_issue(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/admin/issues/{}", id))
    }

    pub fn delete_organization(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/admin/organizations/{}", id))
    }

    // --- geocoding ---

    pub fn reverse_geocode_address(&self, latitude: f64, longitude: f64) -> Result<String, ApiError> {
        #[derive(serde::Deserialize)]
        struct GeoAddress {
            address: String,
        }
        let out: GeoAddress = self.get_json(
            "/geo/reverse",
            &[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ],
        )?;
        Ok(out.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Category;

    #[test]
    fn server_message_prefers_structured_field() {
        let m = extract_server_message(400, r#"{"message":"Title is required"}"#);
        assert_eq!(m, "Title is required");
        let m = extract_server_message(403, r#"{"error":"forbidden"}"#);
        assert_eq!(m, "forbidden");
    }

    #[test]
    fn server_message_falls_back_to_status() {
        assert_eq!(
            extract_server_message(502, "<html>bad gateway</html>"),
            "server returned HTTP 502"
        );
        assert_eq!(
            extract_server_message(500, r#"{"message":""}"#),
            "server returned HTTP 500"
        );
    }

    #[test]
    fn wire_enums_serialize_snake_case() {
        assert_eq!(query_value(&Category::PublicSafety).unwrap(), "public_safety");
        assert_eq!(query_value(&Category::Roads).unwrap(), "roads");
    }

    #[test]
    fn only_unreachable_or_failing_servers_fall_back_to_cache() {
        assert!(fallback_eligible(&ApiError::Server {
            status: 503,
            message: "down".into()
        }));
        assert!(!fallback_eligible(&ApiError::Server {
            status: 404,
            message: "missing".into()
        }));
    }
}
