//! Four-step credit application wizard.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use ts_rs::TS;

use crate::{
    api::{
        CreditApi,
        types::{
            CreditHistoryRequest, DocumentUpload, SubmitApplicationRequest,
            SubmitApplicationResponse, VoiceExtraction,
        },
    },
    error::FetchError,
    fetch::{FallbackPolicy, Fetched, fetch_with},
    model::{ApplicantProfile, ProfilePatch},
    sliders::{PROFILE_RATIO, SliderView, YEARS_IN_BUSINESS},
    speech::{BrowserRecognizer, CaptureView, Language, TranscriptCapture},
};

const HISTORY_CALL_SITE: &str = "applications.add_to_credit_history";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum WizardStep {
    #[default]
    BasicInfo,
    Documents,
    Review,
    Result,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::BasicInfo => 1,
            WizardStep::Documents => 2,
            WizardStep::Review => 3,
            WizardStep::Result => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Step 1: Basic Information",
            WizardStep::Documents => "Step 2: Upload Documents",
            WizardStep::Review => "Step 3: Review & Submit",
            WizardStep::Result => "Application Result",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EntryMode {
    #[default]
    Manual,
    Voice,
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("cannot go {direction} from {from:?}")]
    InvalidTransition {
        from: WizardStep,
        direction: &'static str,
    },

    #[error("enter your name to continue")]
    MissingName,

    #[error("expected step {expected:?}, wizard is at {actual:?}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },

    #[error("a submission is already in progress")]
    Busy,

    #[error("document upload failed: {0}")]
    Upload(#[source] FetchError),

    #[error("application submission failed: {0}")]
    Submit(#[source] FetchError),

    #[error("submission was interrupted: {0}")]
    Interrupted(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ApplicationOutcome {
    /// The backend stored a T0 point for the applicant.
    PointCreated { client_id: String, snapshot: Value },
    Received {
        client_id: String,
        approved: bool,
        message: String,
        next_steps: Vec<String>,
    },
}

impl ApplicationOutcome {
    pub fn headline(&self) -> &'static str {
        match self {
            ApplicationOutcome::PointCreated { .. } => "Application Submitted",
            ApplicationOutcome::Received { approved: true, .. } => "Application Approved!",
            ApplicationOutcome::Received { .. } => "Application Received",
        }
    }

    pub fn client_id(&self) -> &str {
        match self {
            ApplicationOutcome::PointCreated { client_id, .. }
            | ApplicationOutcome::Received { client_id, .. } => client_id,
        }
    }
}

impl From<SubmitApplicationResponse> for ApplicationOutcome {
    fn from(resp: SubmitApplicationResponse) -> Self {
        let created = resp.created_point.filter(|point| match point {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        });
        match created {
            Some(snapshot) => ApplicationOutcome::PointCreated {
                client_id: resp.client_id,
                snapshot,
            },
            None => ApplicationOutcome::Received {
                approved: resp.status == "approved",
                client_id: resp.client_id,
                message: resp.message.unwrap_or_default(),
                next_steps: resp.next_steps.unwrap_or_default(),
            },
        }
    }
}

/// Everything a submission needs, detached from the wizard so no lock is held while it runs.
#[derive(Debug, Clone)]
pub struct SubmissionPlan {
    applicant: ApplicantProfile,
    documents: Vec<DocumentUpload>,
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub response: SubmitApplicationResponse,
    pub history_recorded: bool,
}

impl SubmissionPlan {
    /// Upload (when files are attached), submit, then record credit history best-effort.
    pub async fn execute(self, api: &dyn CreditApi) -> Result<SubmissionReceipt, WizardError> {
        let documents = if self.documents.is_empty() {
            Vec::new()
        } else {
            let uploaded = api
                .upload_documents(&self.documents)
                .await
                .map_err(WizardError::Upload)?;
            if uploaded.files.is_empty() {
                self.documents.iter().map(|d| d.file_name.clone()).collect()
            } else {
                uploaded.files.into_iter().map(|f| f.path).collect()
            }
        };

        let response = api
            .submit_application(&SubmitApplicationRequest {
                applicant: self.applicant.clone(),
                documents,
            })
            .await
            .map_err(WizardError::Submit)?;
        info!(client_id = %response.client_id, status = %response.status, "application submitted");

        let history = CreditHistoryRequest::new(&self.applicant, &response.client_id);
        let recorded = fetch_with(
            HISTORY_CALL_SITE,
            api.add_to_credit_history(&history),
            FallbackPolicy::LogAndIgnore,
        )
        .await
        .ok()
        .and_then(Fetched::into_inner)
        .is_some();

        Ok(SubmissionReceipt {
            response,
            history_recorded: recorded,
        })
    }
}

/// Submits a shared wizard without holding its lock across backend calls.
///
/// The backend work runs on its own task, so a caller that goes away mid-request
/// (a dropped connection) still lets the wizard leave the submitting state.
pub async fn submit_shared(
    session: Arc<Mutex<ApplicationWizard>>,
    api: Arc<dyn CreditApi>,
) -> Result<WizardView, WizardError> {
    let plan = session.lock().await.begin_submit()?;

    let task_session = session.clone();
    let task = tokio::spawn(async move {
        let result = plan.execute(api.as_ref()).await;
        if let Ok(receipt) = &result {
            if !receipt.history_recorded {
                warn!(
                    client_id = %receipt.response.client_id,
                    "application submitted without a credit history entry"
                );
            }
        }
        let mut wizard = task_session.lock().await;
        wizard.finish_submit(result)?;
        Ok::<_, WizardError>(wizard.view())
    });

    match task.await {
        Ok(outcome) => outcome,
        Err(join_err) => {
            error!(error = %join_err, "submission task failed");
            let err = WizardError::Interrupted(join_err.to_string());
            session.lock().await.abandon_submit(&err.to_string());
            Err(err)
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct FormSliders {
    pub years_active: SliderView,
    pub debt_ratio: SliderView,
    pub income_stability: SliderView,
    pub payment_regularity: SliderView,
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: WizardStep,
    pub step_number: u8,
    pub title: String,
    pub entry_mode: EntryMode,
    pub form: ApplicantProfile,
    pub sliders: FormSliders,
    pub documents: Vec<String>,
    pub can_continue: bool,
    pub submitting: bool,
    pub error: Option<String>,
    pub voice: CaptureView,
    pub extraction: Option<Fetched<VoiceExtraction>>,
    pub outcome: Option<ApplicationOutcome>,
    pub headline: Option<String>,
}

pub struct ApplicationWizard {
    step: WizardStep,
    mode: EntryMode,
    form: ApplicantProfile,
    documents: Vec<DocumentUpload>,
    submitting: bool,
    error: Option<String>,
    voice: TranscriptCapture<BrowserRecognizer>,
    extraction: Option<Fetched<VoiceExtraction>>,
    outcome: Option<ApplicationOutcome>,
}

impl Default for ApplicationWizard {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ApplicationWizard {
    pub fn new(speech_supported: bool) -> Self {
        Self {
            step: WizardStep::BasicInfo,
            mode: EntryMode::Manual,
            form: ApplicantProfile::default(),
            documents: Vec::new(),
            submitting: false,
            error: None,
            voice: TranscriptCapture::new(
                BrowserRecognizer::new(speech_supported),
                Language::default(),
            ),
            extraction: None,
            outcome: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &ApplicantProfile {
        &self.form
    }

    pub fn outcome(&self) -> Option<&ApplicationOutcome> {
        self.outcome.as_ref()
    }

    pub fn documents(&self) -> &[DocumentUpload] {
        &self.documents
    }

    pub fn entry_mode(&self) -> EntryMode {
        self.mode
    }

    pub fn voice_mut(&mut self) -> &mut TranscriptCapture<BrowserRecognizer> {
        &mut self.voice
    }

    pub fn update_form(&mut self, patch: ProfilePatch) -> Result<(), WizardError> {
        self.expect_step(WizardStep::BasicInfo)?;
        self.form.apply(patch);
        Ok(())
    }

    pub fn set_entry_mode(&mut self, mode: EntryMode) {
        if mode == EntryMode::Manual {
            self.voice.stop();
        }
        self.mode = mode;
    }

    pub fn can_continue(&self) -> bool {
        match self.step {
            WizardStep::BasicInfo => !self.form.name.trim().is_empty(),
            WizardStep::Documents => true,
            WizardStep::Review | WizardStep::Result => false,
        }
    }

    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        self.step = match self.step {
            WizardStep::BasicInfo if self.form.name.trim().is_empty() => {
                return Err(WizardError::MissingName);
            }
            WizardStep::BasicInfo => WizardStep::Documents,
            WizardStep::Documents => WizardStep::Review,
            from => {
                return Err(WizardError::InvalidTransition {
                    from,
                    direction: "forward",
                });
            }
        };
        self.error = None;
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        if self.submitting {
            return Err(WizardError::Busy);
        }
        self.step = match self.step {
            WizardStep::Documents => WizardStep::BasicInfo,
            WizardStep::Review => WizardStep::Documents,
            from => {
                return Err(WizardError::InvalidTransition {
                    from,
                    direction: "back",
                });
            }
        };
        self.error = None;
        Ok(self.step)
    }

    /// Replaces the current selection, like picking files again in a file input.
    pub fn select_documents(&mut self, files: Vec<DocumentUpload>) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Documents)?;
        self.documents = files;
        Ok(())
    }

    pub fn set_extraction(&mut self, extraction: Fetched<VoiceExtraction>) {
        self.extraction = Some(extraction);
    }

    /// Merge the extracted fields into the form and move on to documents.
    pub fn apply_voice_extraction(&mut self, extraction: &VoiceExtraction) -> Result<(), WizardError> {
        self.expect_step(WizardStep::BasicInfo)?;
        self.form.archetype = extraction.archetype;
        self.form.years_active = YEARS_IN_BUSINESS.clamp(extraction.years_active);
        self.form.monthly_income = extraction.monthly_income;
        if let Some(name) = extraction.name.as_deref().filter(|n| !n.trim().is_empty()) {
            self.form.name = name.to_string();
        }
        self.voice.stop();
        self.step = WizardStep::Documents;
        Ok(())
    }

    /// Apply whatever extraction is pending from the voice panel.
    pub fn apply_pending_extraction(&mut self) -> Result<bool, WizardError> {
        let Some(extraction) = self.extraction.as_ref().and_then(Fetched::as_ref).cloned() else {
            return Ok(false);
        };
        self.apply_voice_extraction(&extraction)?;
        self.extraction = None;
        Ok(true)
    }

    pub fn begin_submit(&mut self) -> Result<SubmissionPlan, WizardError> {
        self.expect_step(WizardStep::Review)?;
        if self.submitting {
            return Err(WizardError::Busy);
        }
        self.submitting = true;
        self.error = None;
        Ok(SubmissionPlan {
            applicant: self.form.clone(),
            documents: self.documents.clone(),
        })
    }

    /// Failures leave the wizard on Review with the error shown.
    pub fn finish_submit(
        &mut self,
        result: Result<SubmissionReceipt, WizardError>,
    ) -> Result<&ApplicationOutcome, WizardError> {
        self.submitting = false;
        match result {
            Ok(receipt) => {
                self.step = WizardStep::Result;
                Ok(&*self.outcome.insert(ApplicationOutcome::from(receipt.response)))
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Clears an in-flight submission that will never report back.
    pub fn abandon_submit(&mut self, reason: &str) {
        self.submitting = false;
        self.error = Some(reason.to_string());
    }

    pub async fn submit(&mut self, api: &dyn CreditApi) -> Result<&ApplicationOutcome, WizardError> {
        let plan = self.begin_submit()?;
        let result = plan.execute(api).await;
        self.finish_submit(result)
    }

    fn expect_step(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.step,
            step_number: self.step.number(),
            title: self.step.title().to_string(),
            entry_mode: self.mode,
            form: self.form.clone(),
            sliders: FormSliders {
                years_active: YEARS_IN_BUSINESS.view(self.form.years_active),
                debt_ratio: PROFILE_RATIO.view(self.form.debt_ratio),
                income_stability: PROFILE_RATIO.view(self.form.income_stability),
                payment_regularity: PROFILE_RATIO.view(self.form.payment_regularity),
            },
            documents: self.documents.iter().map(|d| d.file_name.clone()).collect(),
            can_continue: self.can_continue(),
            submitting: self.submitting,
            error: self.error.clone(),
            voice: self.voice.view(),
            extraction: self.extraction.clone(),
            headline: self.outcome.as_ref().map(|o| o.headline().to_string()),
            outcome: self.outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Archetype;

    fn named() -> ApplicationWizard {
        let mut wizard = ApplicationWizard::default();
        wizard
            .update_form(ProfilePatch {
                name: Some("Sana".into()),
                ..ProfilePatch::default()
            })
            .unwrap();
        wizard
    }

    #[test]
    fn name_is_required_to_leave_basic_info() {
        let mut wizard = ApplicationWizard::default();
        assert!(!wizard.can_continue());
        assert!(matches!(wizard.next(), Err(WizardError::MissingName)));
        assert!(matches!(
            wizard.back(),
            Err(WizardError::InvalidTransition { .. })
        ));
        assert_eq!(wizard.step(), WizardStep::BasicInfo);
    }

    #[test]
    fn steps_move_one_at_a_time() {
        let mut wizard = named();
        assert_eq!(wizard.next().unwrap(), WizardStep::Documents);
        assert_eq!(wizard.back().unwrap(), WizardStep::BasicInfo);
        wizard.next().unwrap();
        assert_eq!(wizard.next().unwrap(), WizardStep::Review);
        assert!(matches!(
            wizard.next(),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn documents_only_selectable_on_documents_step() {
        let mut wizard = named();
        let file = DocumentUpload {
            file_name: "id.png".into(),
            content_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        };
        assert!(matches!(
            wizard.select_documents(vec![file.clone()]),
            Err(WizardError::WrongStep { .. })
        ));
        wizard.next().unwrap();
        wizard.select_documents(vec![file]).unwrap();
        assert_eq!(wizard.view().documents, vec!["id.png".to_string()]);
    }

    #[test]
    fn voice_extraction_fills_form_and_advances() {
        let mut wizard = ApplicationWizard::default();
        wizard.set_entry_mode(EntryMode::Voice);
        wizard.set_extraction(Fetched::Synthetic(VoiceExtraction {
            archetype: Archetype::GigWorker,
            years_active: 42.0,
            monthly_income: 1200.0,
            confidence: 0.6,
            raw_transcript: "taxi 42 1200".into(),
            name: None,
        }));
        assert!(wizard.apply_pending_extraction().unwrap());
        assert_eq!(wizard.step(), WizardStep::Documents);
        assert_eq!(wizard.form().archetype, Archetype::GigWorker);
        assert_eq!(wizard.form().years_active, 30.0);
        assert_eq!(wizard.form().monthly_income, 1200.0);
        assert!(!wizard.apply_pending_extraction().unwrap());
    }

    #[test]
    fn submit_requires_review_step() {
        let mut wizard = named();
        assert!(matches!(
            wizard.begin_submit(),
            Err(WizardError::WrongStep { .. })
        ));
    }

    #[test]
    fn second_submit_is_busy_until_abandoned() {
        let mut wizard = named();
        wizard.next().unwrap();
        wizard.next().unwrap();
        drop(wizard.begin_submit().unwrap());

        assert!(matches!(wizard.begin_submit(), Err(WizardError::Busy)));
        assert!(matches!(wizard.back(), Err(WizardError::Busy)));

        wizard.abandon_submit("connection lost");
        assert!(!wizard.view().submitting);
        assert_eq!(wizard.view().error.as_deref(), Some("connection lost"));
        assert_eq!(wizard.back().unwrap(), WizardStep::Documents);
        wizard.next().unwrap();
        assert!(wizard.begin_submit().is_ok());
    }

    #[test]
    fn outcome_depends_on_created_point() {
        let created: SubmitApplicationResponse = serde_json::from_value(json!({
            "client_id": "CLIENT_1", "status": "submitted",
            "created_point": {"timestamp": "T0_application"}
        }))
        .unwrap();
        let outcome = ApplicationOutcome::from(created);
        assert_eq!(outcome.headline(), "Application Submitted");

        let empty_point: SubmitApplicationResponse = serde_json::from_value(json!({
            "client_id": "CLIENT_2", "status": "approved", "created_point": {},
            "next_steps": ["Visit branch"]
        }))
        .unwrap();
        let outcome = ApplicationOutcome::from(empty_point);
        assert_eq!(outcome.headline(), "Application Approved!");
        assert_eq!(outcome.client_id(), "CLIENT_2");

        let pending: SubmitApplicationResponse = serde_json::from_value(json!({
            "client_id": "CLIENT_3", "status": "pending"
        }))
        .unwrap();
        assert_eq!(ApplicationOutcome::from(pending).headline(), "Application Received");
    }
}
