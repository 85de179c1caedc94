use clap::Parser;

mod api;
mod cli;
mod commands;
mod domain;
mod i18n;
mod services;

use api::ApiError;
use cli::Cli;
use commands::admin::ConfirmRequired;
use domain::models::DEFAULT_SERVER_URL;
use i18n::LanguageStore;
use services::issues::SubmitFailed;
use services::notify::Notifier;
use services::session::SessionError;
use services::wizard::WizardError;

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut notifier = Notifier::new(cli.json);
    let result = run(&cli, &mut notifier);
    notifier.flush();

    if let Err(e) = result {
        if cli.json {
            let envelope = serde_json::json!({
                "ok": false,
                "error": { "code": error_code(&e), "message": e.to_string() }
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string())
            );
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli, notifier: &mut Notifier) -> anyhow::Result<()> {
    let config = services::storage::load_config()?;
    let server = cli
        .server
        .clone()
        .or_else(|| config.server.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let lang_code = cli.lang.clone().or_else(|| config.language.clone());
    let mut store = LanguageStore::new(lang_code.as_deref());

    let parity = i18n::verify_key_parity();
    if !parity.is_empty() {
        tracing::warn!(problems = parity.len(), "translation bundles out of parity");
    }

    let session = services::session::load_session()?;
    let api = api::ApiClient::new(&server, session.as_ref().map(|s| s.token.clone()))?;

    if commands::handle_account_commands(cli, &api, &store, notifier)? {
        return Ok(());
    }
    if commands::handle_admin_commands(cli, &api, &store, notifier)? {
        return Ok(());
    }
    commands::handle_runtime_commands(cli, &mut store, &api, session.as_ref(), notifier)
}

/// Stable error codes for the `--json` failure envelope.
fn error_code(e: &anyhow::Error) -> &'static str {
    if let Some(w) = e.downcast_ref::<WizardError>() {
        return match w {
            WizardError::Validation(_) => "VALIDATION",
            WizardError::GuestConfirmRequired => "GUEST_CONFIRM_REQUIRED",
        };
    }
    if e.downcast_ref::<SubmitFailed>().is_some() {
        return "SUBMIT_FAILED";
    }
    if let Some(s) = e.downcast_ref::<SessionError>() {
        return match s {
            SessionError::NotLoggedIn => "AUTH_REQUIRED",
            SessionError::AdminRequired => "ADMIN_REQUIRED",
            SessionError::MissingPermission(_) => "FORBIDDEN",
        };
    }
    if e.downcast_ref::<ConfirmRequired>().is_some() {
        return "CONFIRM_REQUIRED";
    }
    if let Some(a) = e.downcast_ref::<ApiError>() {
        return match a {
            ApiError::Http(_) => "HTTP",
            ApiError::Server { .. } => "SERVER",
            ApiError::Decode(_) => "DECODE",
        };
    }
    "UNKNOWN"
}
