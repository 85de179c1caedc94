//! Citizen and admin session persistence.
//!
//! Both sessions hold server-issued bearer tokens. Admin permissions come
//! exclusively from the server's login response; the client never embeds
//! credentials or fabricates a permission list.

use crate::domain::models::{AdminSession, Session};
use crate::services::storage::{admin_session_path, session_path};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("not logged in; run `civic account login` first")]
    NotLoggedIn,
    #[error("admin session required; run `civic admin login` first")]
    AdminRequired,
    #[error("admin session lacks permission: {0}")]
    MissingPermission(String),
}

fn load_json<T: serde::de::DeserializeOwned>(path: PathBuf) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn save_json<T: serde::Serialize>(path: PathBuf, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn load_session() -> anyhow::Result<Option<Session>> {
    load_json(session_path()?)
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    save_json(session_path()?, session)
}

/// Returns whether a session file was actually removed.
pub fn clear_session() -> anyhow::Result<bool> {
    let p = session_path()?;
    if p.exists() {
        std::fs::remove_file(p)?;
        return Ok(true);
    }
    Ok(false)
}

pub fn require_session() -> anyhow::Result<Session> {
    load_session()?.ok_or_else(|| anyhow::Error::new(SessionError::NotLoggedIn))
}

pub fn load_admin_session() -> anyhow::Result<Option<AdminSession>> {
    load_json(admin_session_path()?)
}

pub fn save_admin_session(session: &AdminSession) -> anyhow::Result<()> {
    save_json(admin_session_path()?, session)
}

pub fn clear_admin_session() -> anyhow::Result<bool> {
    let p = admin_session_path()?;
    if p.exists() {
        std::fs::remove_file(p)?;
        return Ok(true);
    }
    Ok(false)
}

pub fn require_admin() -> anyhow::Result<AdminSession> {
    load_admin_session()?.ok_or_else(|| anyhow::Error::new(SessionError::AdminRequired))
}

pub fn require_permission(admin: &AdminSession, permission: &str) -> anyhow::Result<()> {
    if admin.permissions.iter().any(|p| p == permission) {
        Ok(())
    } else {
        Err(anyhow::Error::new(SessionError::MissingPermission(
            permission.to_string(),
        )))
    }
}
