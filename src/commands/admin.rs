use crate::api::ApiClient;
use crate::cli::{AccountCommands, AdminCommands, Cli, Commands};
use crate::i18n::LanguageStore;
use crate::services::notify::Notifier;
use crate::services::output::{print_one, wire_name};
use crate::services::session::{
    clear_admin_session, clear_session, load_admin_session, require_admin, require_permission,
    save_admin_session, save_session,
};
use crate::services::storage::audit;
use tracing::debug;

/// Destructive admin actions refuse to fire without an explicit `--yes`.
#[derive(thiserror::Error, Debug)]
#[error("destructive action requires --yes")]
pub struct ConfirmRequired;

pub fn handle_account_commands(
    cli: &Cli,
    api: &ApiClient,
    store: &LanguageStore,
    notifier: &mut Notifier,
) -> anyhow::Result<bool> {
    let Commands::Account { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        AccountCommands::Login { email, password } => {
            let session = api.login(email, password)?;
            save_session(&session)?;
            audit("account_login", serde_json::json!({ "email": email }));
            let name = session
                .user
                .as_ref()
                .map(|u| u.name.clone())
                .unwrap_or_else(|| email.clone());
            notifier.success(store.resolve_with("account.logged_in", &[("name", &name)]));
            print_one(cli.json, &session.user, |_| format!("logged in as {}", name))?;
        }
        AccountCommands::Register {
            name,
            email,
            password,
        } => {
            let session = api.register(name, email, password)?;
            save_session(&session)?;
            audit("account_register", serde_json::json!({ "email": email }));
            notifier.success(store.resolve_with("account.registered", &[("name", name)]));
            print_one(cli.json, &session.user, |_| {
                format!("account created for {}", name)
            })?;
        }
        AccountCommands::Logout => {
            let removed = clear_session()?;
            audit("account_logout", serde_json::json!({ "removed": removed }));
            notifier.success(store.resolve("account.logged_out"));
            print_one(cli.json, removed, |_| "logged out".to_string())?;
        }
        AccountCommands::Whoami => {
            let session = crate::services::session::require_session()?;
            let profile = match api.me() {
                Ok(p) => Some(p),
                Err(e) => {
                    debug!(error = %e, "profile fetch failed, using stored snapshot");
                    session.user.clone()
                }
            };
            let profile =
                profile.ok_or_else(|| anyhow::anyhow!("no profile available; log in again"))?;
            print_one(cli.json, &profile, |p| format!("{}\t{}", p.name, p.email))?;
        }
    }

    Ok(true)
}

pub fn handle_admin_commands(
    cli: &Cli,
    api: &ApiClient,
    store: &LanguageStore,
    notifier: &mut Notifier,
) -> anyhow::Result<bool> {
    let Commands::Admin { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        AdminCommands::Login { email, password } => {
            let session = api.admin_login(email, password)?;
            save_admin_session(&session)?;
            audit("admin_login", serde_json::json!({ "email": email }));
            notifier.success(store.resolve("admin.logged_in"));
            print_one(
                cli.json,
                serde_json::json!({ "permissions": session.permissions }),
                |_| "admin session opened".to_string(),
            )?;
        }
        AdminCommands::Logout => {
            let removed = clear_admin_session()?;
            audit("admin_logout", serde_json::json!({ "removed": removed }));
            print_one(cli.json, removed, |_| "admin session closed".to_string())?;
        }
        AdminCommands::Status => {
            let admin = load_admin_session()?;
            let data = match &admin {
                Some(a) => serde_json::json!({
                    "loggedIn": true,
                    "email": a.email,
                    "permissions": a.permissions,
                }),
                None => serde_json::json!({ "loggedIn": false }),
            };
            print_one(cli.json, data, |d| format!("logged_in: {}", d["loggedIn"]))?;
        }
        AdminCommands::Stats => {
            let admin = require_admin()?;
            let api = api.with_token(Some(admin.token.clone()))?;
            let stats = api.admin_stats()?;
            print_one(cli.json, &stats, |s| {
                format!(
                    "issues: {} open / {} resolved / {} total\torgs: {}\tusers: {}",
                    s.open_issues, s.resolved_issues, s.total_issues, s.total_organizations,
                    s.total_users
                )
            })?;
        }
        AdminCommands::SetStatus { id, status } => {
            let admin = require_admin()?;
            require_permission(&admin, "issues.triage")?;
            let api = api.with_token(Some(admin.token.clone()))?;
            let issue = api.set_issue_status(id, *status)?;
            audit(
                "admin_set_status",
                serde_json::json!({ "issue": id, "status": wire_name(status) }),
            );
            notifier.success(store.resolve_with(
                "admin.status_set",
                &[("id", id.as_str()), ("status", &wire_name(status))],
            ));
            print_one(cli.json, &issue, |i| {
                format!("{}\t{}", i.id, wire_name(&i.status))
            })?;
        }
        AdminCommands::DeleteIssue { id, yes } => {
            let admin = require_admin()?;
            require_permission(&admin, "issues.delete")?;
            if !*yes {
                return Err(anyhow::Error::new(ConfirmRequired));
            }
            let api = api.with_token(Some(admin.token.clone()))?;
            api.delete_issue(id)?;
            audit("admin_delete_issue", serde_json::json!({ "issue": id }));
            notifier.success(store.resolve_with("admin.issue_deleted", &[("id", id.as_str())]));
            print_one(cli.json, id, |_| format!("deleted issue {}", id))?;
        }
        AdminCommands::DeleteOrg { id, yes } => {
            let admin = require_admin()?;
            require_permission(&admin, "organizations.delete")?;
            if !*yes {
                return Err(anyhow::Error::new(ConfirmRequired));
            }
            let api = api.with_token(Some(admin.token.clone()))?;
            api.delete_organization(id)?;
            audit("admin_delete_org", serde_json::json!({ "org": id }));
            notifier.success(store.resolve_with("admin.org_deleted", &[("id", id.as_str())]));
            print_one(cli.json, id, |_| format!("deleted organization {}", id))?;
        }
    }

    Ok(true)
}
