//! Multi-step report wizard.
//!
//! A linear, back-navigable stepper over an [`IssueDraft`]:
//! `IssueDetails -> Location -> MediaContact -> ReviewSubmit`. Each forward
//! transition is gated by the current step's validation; the review step
//! re-validates everything as a final gate. Unauthenticated submissions are
//! stopped before any network call until guest submission is confirmed.

use crate::domain::models::{Coordinates, ImageAttachment, ImagePreview, IssueDraft};
use crate::i18n::LanguageStore;
use crate::services::geo::ReverseGeocode;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

pub const MAX_IMAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    IssueDetails,
    Location,
    MediaContact,
    ReviewSubmit,
}

impl WizardStep {
    pub fn index(self) -> usize {
        match self {
            WizardStep::IssueDetails => 0,
            WizardStep::Location => 1,
            WizardStep::MediaContact => 2,
            WizardStep::ReviewSubmit => 3,
        }
    }

    fn from_index(index: usize) -> WizardStep {
        match index {
            0 => WizardStep::IssueDetails,
            1 => WizardStep::Location,
            2 => WizardStep::MediaContact,
            _ => WizardStep::ReviewSubmit,
        }
    }

    pub fn title_key(self) -> &'static str {
        match self {
            WizardStep::IssueDetails => "report.steps.details",
            WizardStep::Location => "report.steps.location",
            WizardStep::MediaContact => "report.steps.media_contact",
            WizardStep::ReviewSubmit => "report.steps.review",
        }
    }
}

fn join_field_errors(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(thiserror::Error, Debug)]
pub enum WizardError {
    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(BTreeMap<String, String>),
    #[error("guest confirmation required before submitting")]
    GuestConfirmRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitGate {
    Ready,
    NeedsGuestConfirmation,
}

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

fn is_valid_email(s: &str) -> bool {
    match email_regex() {
        Some(re) => re.is_match(s.trim()),
        None => s.contains('@'),
    }
}

fn mime_for(file_name: &str) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}

pub struct ReportWizard {
    step: WizardStep,
    pub draft: IssueDraft,
    errors: BTreeMap<String, String>,
    location_error: Option<String>,
    images: Vec<ImageAttachment>,
    previews: Vec<ImagePreview>,
}

impl Default for ReportWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::IssueDetails,
            draft: IssueDraft::default(),
            errors: BTreeMap::new(),
            location_error: None,
            images: Vec::new(),
            previews: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn location_error(&self) -> Option<&str> {
        self.location_error.as_deref()
    }

    pub fn images(&self) -> &[ImageAttachment] {
        &self.images
    }

    pub fn previews(&self) -> &[ImagePreview] {
        &self.previews
    }

    fn validate_step(&self, step: WizardStep, tr: &LanguageStore) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        match step {
            WizardStep::IssueDetails => {
                if self.draft.title.trim().is_empty() {
                    errors.insert(
                        "title".to_string(),
                        tr.resolve("report.validation.title_required"),
                    );
                }
                if self.draft.description.trim().is_empty() {
                    errors.insert(
                        "description".to_string(),
                        tr.resolve("report.validation.description_required"),
                    );
                }
                if self.draft.category.is_none() {
                    errors.insert(
                        "category".to_string(),
                        tr.resolve("report.validation.category_required"),
                    );
                }
            }
            WizardStep::Location => {
                if self.draft.location.address.trim().is_empty() {
                    errors.insert(
                        "location.address".to_string(),
                        tr.resolve("report.validation.address_required"),
                    );
                }
            }
            WizardStep::MediaContact => {
                if !self.draft.contact.is_anonymous {
                    if self.draft.contact.name.trim().is_empty() {
                        errors.insert(
                            "contact.name".to_string(),
                            tr.resolve("report.validation.name_required"),
                        );
                    }
                    if !is_valid_email(&self.draft.contact.email) {
                        errors.insert(
                            "contact.email".to_string(),
                            tr.resolve("report.validation.email_invalid"),
                        );
                    }
                }
            }
            WizardStep::ReviewSubmit => {
                for prior in [
                    WizardStep::IssueDetails,
                    WizardStep::Location,
                    WizardStep::MediaContact,
                ] {
                    errors.extend(self.validate_step(prior, tr));
                }
            }
        }
        errors
    }

    /// Validate the current step; advance on success, populate the step's
    /// field errors and stay on failure.
    pub fn next(&mut self, tr: &LanguageStore) -> bool {
        let errors = self.validate_step(self.step, tr);
        if !errors.is_empty() {
            self.errors = errors;
            return false;
        }
        self.errors.clear();
        if self.step != WizardStep::ReviewSubmit {
            self.step = WizardStep::from_index(self.step.index() + 1);
            debug!(step = %tr.resolve(self.step.title_key()), "wizard advanced");
        }
        true
    }

    /// Step back unconditionally; clears any transient location error.
    pub fn back(&mut self) {
        if self.step.index() > 0 {
            self.step = WizardStep::from_index(self.step.index() - 1);
        }
        self.location_error = None;
    }

    /// Stage an image from disk. Previews are appended in selection order
    /// and stay in lockstep with the attachment list.
    pub fn attach_image(&mut self, path: &Path, tr: &LanguageStore) -> anyhow::Result<()> {
        if self.images.len() >= MAX_IMAGES {
            let mut errors = BTreeMap::new();
            errors.insert(
                "images".to_string(),
                tr.resolve_with(
                    "report.validation.too_many_images",
                    &[("max", &MAX_IMAGES.to_string())],
                ),
            );
            return Err(anyhow::Error::new(WizardError::Validation(errors)));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        let mime = mime_for(&file_name);
        self.previews.push(ImagePreview {
            file_name: file_name.clone(),
            mime: mime.clone(),
            byte_len: bytes.len(),
        });
        self.images.push(ImageAttachment {
            file_name,
            mime,
            bytes,
        });
        debug_assert_eq!(self.images.len(), self.previews.len());
        Ok(())
    }

    /// Remove the image at `index`, splicing attachments and previews in
    /// lockstep. Returns false for an out-of-range index.
    pub fn remove_image(&mut self, index: usize) -> bool {
        if index >= self.images.len() {
            return false;
        }
        self.images.remove(index);
        self.previews.remove(index);
        debug_assert_eq!(self.images.len(), self.previews.len());
        true
    }

    /// Best-effort geolocation: store the raw coordinates, then try to fill
    /// a human-readable address. Failure records `location_error` and leaves
    /// manual entry open; it never blocks progress.
    pub fn locate(
        &mut self,
        latitude: f64,
        longitude: f64,
        geocoder: &dyn ReverseGeocode,
        tr: &LanguageStore,
    ) {
        self.draft.location.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        match geocoder.reverse_geocode(latitude, longitude) {
            Ok(address) => {
                self.location_error = None;
                self.draft.location.address = address;
            }
            Err(e) => {
                debug!(error = %e, "reverse geocoding failed");
                self.location_error = Some(
                    tr.resolve_with("report.location_error", &[("message", &e.to_string())]),
                );
            }
        }
    }

    pub fn validate_all(&self, tr: &LanguageStore) -> BTreeMap<String, String> {
        self.validate_step(WizardStep::ReviewSubmit, tr)
    }

    /// Final submission gate, reachable only from the review step. Re-runs
    /// full validation, then stops unauthenticated callers until guest
    /// submission is confirmed — before any network call is made.
    pub fn submit_gate(
        &mut self,
        authenticated: bool,
        guest_confirmed: bool,
        tr: &LanguageStore,
    ) -> anyhow::Result<SubmitGate> {
        if self.step != WizardStep::ReviewSubmit {
            anyhow::bail!("submit is only available from the review step");
        }
        let errors = self.validate_all(tr);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(anyhow::Error::new(WizardError::Validation(errors)));
        }
        if !authenticated && !guest_confirmed {
            return Ok(SubmitGate::NeedsGuestConfirmation);
        }
        Ok(SubmitGate::Ready)
    }

    /// After a failed submission the wizard returns to the first step so
    /// the whole draft can be reviewed against the server's complaint.
    pub fn reset_to_start(&mut self) {
        self.step = WizardStep::IssueDetails;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::domain::models::Category;

    struct FailingGeocoder;
    impl ReverseGeocode for FailingGeocoder {
        fn reverse_geocode(&self, _: f64, _: f64) -> Result<String, ApiError> {
            Err(ApiError::Server {
                status: 503,
                message: "geocoder unavailable".into(),
            })
        }
    }

    struct FixedGeocoder(&'static str);
    impl ReverseGeocode for FixedGeocoder {
        fn reverse_geocode(&self, _: f64, _: f64) -> Result<String, ApiError> {
            Ok(self.0.to_string())
        }
    }

    fn store() -> LanguageStore {
        LanguageStore::new(Some("en"))
    }

    fn valid_details(wizard: &mut ReportWizard) {
        wizard.draft.title = "Pothole on Main St".into();
        wizard.draft.description = "Large pothole".into();
        wizard.draft.category = Some(Category::Roads);
    }

    fn temp_image(dir: &tempfile::TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, vec![0u8; len]).expect("write fixture image");
        p
    }

    #[test]
    fn next_with_empty_title_stays_and_reports_field() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        wizard.draft.description = "something".into();
        wizard.draft.category = Some(Category::Water);
        assert!(!wizard.next(&tr));
        assert_eq!(wizard.step(), WizardStep::IssueDetails);
        assert_eq!(
            wizard.errors().get("title").map(String::as_str),
            Some("Title is required")
        );
        assert!(!wizard.errors().contains_key("description"));
    }

    #[test]
    fn valid_details_advance_to_location() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        valid_details(&mut wizard);
        assert!(wizard.next(&tr));
        assert_eq!(wizard.step(), WizardStep::Location);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn back_is_unconditional_and_clears_location_error() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        valid_details(&mut wizard);
        wizard.next(&tr);
        wizard.locate(12.97, 77.59, &FailingGeocoder, &tr);
        assert!(wizard.location_error().is_some());
        wizard.back();
        assert_eq!(wizard.step(), WizardStep::IssueDetails);
        assert!(wizard.location_error().is_none());
    }

    #[test]
    fn locate_failure_keeps_coordinates_and_manual_entry_open() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        wizard.locate(12.97, 77.59, &FailingGeocoder, &tr);
        assert!(wizard.draft.location.coordinates.is_some());
        assert!(wizard.draft.location.address.is_empty());
        let err = wizard.location_error().expect("location error recorded");
        assert!(err.contains("geocoder unavailable"));

        wizard.draft.location.address = "Main St".into();
        valid_details(&mut wizard);
        assert!(wizard.next(&tr));
        assert!(wizard.next(&tr));
        assert_eq!(wizard.step(), WizardStep::MediaContact);
    }

    #[test]
    fn locate_success_fills_address() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        wizard.locate(12.97, 77.59, &FixedGeocoder("MG Road, Bengaluru"), &tr);
        assert_eq!(wizard.draft.location.address, "MG Road, Bengaluru");
        assert!(wizard.location_error().is_none());
    }

    #[test]
    fn anonymous_contact_passes_and_named_contact_is_checked() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        wizard.draft.contact.is_anonymous = true;
        assert!(wizard.validate_step(WizardStep::MediaContact, &tr).is_empty());

        wizard.draft.contact.is_anonymous = false;
        let errors = wizard.validate_step(WizardStep::MediaContact, &tr);
        assert!(errors.contains_key("contact.name"));
        assert!(errors.contains_key("contact.email"));

        wizard.draft.contact.name = "Asha".into();
        wizard.draft.contact.email = "asha@example.com".into();
        assert!(wizard.validate_step(WizardStep::MediaContact, &tr).is_empty());
    }

    #[test]
    fn email_regex_rejects_obvious_garbage() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two words@example.com"));
    }

    #[test]
    fn images_stay_in_lockstep_and_preserve_order() {
        let tr = store();
        let dir = tempfile::TempDir::new().expect("temp dir");
        let mut wizard = ReportWizard::new();
        for (i, name) in ["a.png", "b.jpg", "c.webp"].iter().enumerate() {
            wizard
                .attach_image(&temp_image(&dir, name, 10 + i), &tr)
                .expect("attach");
        }
        assert_eq!(wizard.images().len(), wizard.previews().len());

        assert!(wizard.remove_image(1));
        assert_eq!(wizard.images().len(), 2);
        assert_eq!(wizard.previews().len(), 2);
        assert_eq!(wizard.images()[0].file_name, "a.png");
        assert_eq!(wizard.images()[1].file_name, "c.webp");
        assert_eq!(wizard.previews()[0].file_name, "a.png");
        assert_eq!(wizard.previews()[1].file_name, "c.webp");

        assert!(!wizard.remove_image(5));
    }

    #[test]
    fn sixth_image_is_rejected() {
        let tr = store();
        let dir = tempfile::TempDir::new().expect("temp dir");
        let mut wizard = ReportWizard::new();
        for i in 0..MAX_IMAGES {
            wizard
                .attach_image(&temp_image(&dir, &format!("img{}.png", i), 8), &tr)
                .expect("attach");
        }
        let err = wizard
            .attach_image(&temp_image(&dir, "extra.png", 8), &tr)
            .expect_err("cap enforced");
        assert!(err.to_string().contains("5"));
        assert_eq!(wizard.images().len(), MAX_IMAGES);
    }

    #[test]
    fn preview_mime_follows_extension() {
        assert_eq!(mime_for("photo.JPG"), "image/jpeg");
        assert_eq!(mime_for("shot.png"), "image/png");
        assert_eq!(mime_for("mystery"), "application/octet-stream");
    }

    #[test]
    fn submit_gate_blocks_guests_until_confirmed() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        valid_details(&mut wizard);
        wizard.draft.location.address = "Main St".into();
        wizard.draft.contact.is_anonymous = true;
        assert!(wizard.next(&tr));
        assert!(wizard.next(&tr));
        assert!(wizard.next(&tr));
        assert_eq!(wizard.step(), WizardStep::ReviewSubmit);

        let gate = wizard.submit_gate(false, false, &tr).expect("gate");
        assert_eq!(gate, SubmitGate::NeedsGuestConfirmation);
        let gate = wizard.submit_gate(false, true, &tr).expect("gate");
        assert_eq!(gate, SubmitGate::Ready);
        let gate = wizard.submit_gate(true, false, &tr).expect("gate");
        assert_eq!(gate, SubmitGate::Ready);
    }

    #[test]
    fn review_gate_recatches_fields_invalidated_after_passing() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        valid_details(&mut wizard);
        wizard.draft.location.address = "Main St".into();
        wizard.draft.contact.is_anonymous = true;
        wizard.next(&tr);
        wizard.next(&tr);
        wizard.next(&tr);

        // Flip anonymity after the contact step already passed.
        wizard.draft.contact.is_anonymous = false;
        let err = wizard
            .submit_gate(true, false, &tr)
            .expect_err("final gate re-validates");
        let wiz_err = err.downcast_ref::<WizardError>().expect("typed error");
        match wiz_err {
            WizardError::Validation(fields) => {
                assert!(fields.contains_key("contact.name"));
                assert!(fields.contains_key("contact.email"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn reset_returns_to_first_step() {
        let tr = store();
        let mut wizard = ReportWizard::new();
        valid_details(&mut wizard);
        wizard.draft.location.address = "Main St".into();
        wizard.draft.contact.is_anonymous = true;
        wizard.next(&tr);
        wizard.next(&tr);
        wizard.next(&tr);
        wizard.reset_to_start();
        assert_eq!(wizard.step(), WizardStep::IssueDetails);
    }
}
