//! Report submission orchestration.
//!
//! Drives the final wizard transition through the request wrapper: gate,
//! invoke the create-issue operation exactly once, then either hand back
//! the created issue or reset the wizard to its first step with the
//! server's complaint surfaced.

use crate::api::ApiError;
use crate::domain::models::{ImageAttachment, Issue, IssueDraft};
use crate::i18n::LanguageStore;
use crate::services::notify::Notifier;
use crate::services::request::{RequestCell, RequestOptions};
use crate::services::wizard::{ReportWizard, SubmitGate, WizardError};

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct SubmitFailed(pub String);

pub fn submit_report<F>(
    wizard: &mut ReportWizard,
    authenticated: bool,
    guest_confirmed: bool,
    tr: &LanguageStore,
    notifier: &mut Notifier,
    op: F,
) -> anyhow::Result<Issue>
where
    F: FnOnce(&IssueDraft, &[ImageAttachment]) -> Result<Issue, ApiError>,
{
    match wizard.submit_gate(authenticated, guest_confirmed, tr)? {
        SubmitGate::NeedsGuestConfirmation => {
            return Err(anyhow::Error::new(WizardError::GuestConfirmRequired)
                .context(tr.resolve("report.guest_prompt")));
        }
        SubmitGate::Ready => {}
    }

    let mut cell: RequestCell<Issue> = RequestCell::new();
    let opts = RequestOptions {
        success_message: None,
        notify_error: true,
    };
    if !cell.execute(|| op(&wizard.draft, wizard.images()), notifier, &opts) {
        let message = cell.error().unwrap_or("request failed").to_string();
        wizard.reset_to_start();
        let surfaced = tr.resolve_with("report.submit_failed", &[("message", &message)]);
        return Err(anyhow::Error::new(SubmitFailed(surfaced)));
    }

    let issue = cell
        .take_data()
        .ok_or_else(|| anyhow::anyhow!("submission completed without a response body"))?;
    notifier.success(tr.resolve_with("report.submitted", &[("id", &issue.id)]));
    Ok(issue)
}
