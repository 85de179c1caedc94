use crate::domain::models::ClientConfig;
use std::path::PathBuf;

pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".config/civic"))
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn session_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("session.json"))
}

pub fn admin_session_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("admin.json"))
}

pub fn load_config() -> anyhow::Result<ClientConfig> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(ClientConfig::default());
    }
    let raw = std::fs::read_to_string(p)?;
    Ok(toml::from_str(&raw)?)
}

pub fn save_config(config: &ClientConfig) -> anyhow::Result<()> {
    let p = config_path()?;
    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(p, toml::to_string_pretty(config)?)?;
    Ok(())
}

/// Append-only action log. Best-effort: auditing never fails a command.
pub fn audit(action: &str, data: serde_json::Value) {
    let Ok(dir) = config_dir() else {
        return;
    };
    let path = dir.join("audit.jsonl");
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let event = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "action": action,
        "data": data
    });
    let line = format!("{}\n", event);
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
}
