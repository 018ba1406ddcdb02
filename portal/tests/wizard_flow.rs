mod common;

use std::{sync::Arc, time::Duration};

use common::ScriptedApi;
use portal::{
    api::types::DocumentUpload,
    model::{Archetype, ProfilePatch},
    speech::{Language, RecognitionEvent, Segment, VoiceAssistant},
    wizard::{self, ApplicationOutcome, ApplicationWizard, EntryMode, WizardError, WizardStep},
};
use tokio::{
    sync::Mutex,
    time::{sleep, timeout},
};

fn named(name: &str) -> ProfilePatch {
    ProfilePatch {
        name: Some(name.into()),
        ..ProfilePatch::default()
    }
}

fn document(name: &str) -> DocumentUpload {
    DocumentUpload {
        file_name: name.into(),
        content_type: Some("image/png".into()),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    }
}

fn at_review(files: Vec<DocumentUpload>) -> ApplicationWizard {
    let mut wizard = ApplicationWizard::default();
    wizard.update_form(named("Leila")).unwrap();
    wizard.next().unwrap();
    wizard.select_documents(files).unwrap();
    wizard.next().unwrap();
    assert_eq!(wizard.step(), WizardStep::Review);
    wizard
}

#[tokio::test]
async fn history_failure_does_not_block_the_result() {
    let api = ScriptedApi::new().failing("history");
    let mut wizard = at_review(vec![document("id.png"), document("permit.png")]);

    let outcome = wizard.submit(&api).await.unwrap().clone();

    assert_eq!(api.calls(), vec!["upload", "submit", "history"]);
    assert_eq!(wizard.step(), WizardStep::Result);
    match outcome {
        ApplicationOutcome::PointCreated { client_id, snapshot } => {
            assert_eq!(client_id, "CLIENT_NEW");
            assert_eq!(snapshot["documents"][0], "uploads/id.png");
        }
        other => panic!("expected a created point, got {other:?}"),
    }
}

#[tokio::test]
async fn no_documents_skips_the_upload() {
    let api = ScriptedApi::new();
    let mut wizard = at_review(Vec::new());
    wizard.submit(&api).await.unwrap();
    assert_eq!(api.calls(), vec!["submit", "history"]);
}

#[tokio::test]
async fn failed_submission_stays_on_review_with_error() {
    let api = ScriptedApi::new().failing("submit");
    let mut wizard = at_review(Vec::new());

    let err = wizard.submit(&api).await.unwrap_err();

    assert!(matches!(err, WizardError::Submit(_)));
    assert_eq!(wizard.step(), WizardStep::Review);
    assert!(wizard.view().error.unwrap().contains("500"));
    assert!(!wizard.view().submitting);
    assert_eq!(api.calls(), vec!["submit"]);
}

#[tokio::test]
async fn upload_failure_stops_before_submit() {
    let api = ScriptedApi::new().failing("upload");
    let mut wizard = at_review(vec![document("id.png")]);
    assert!(matches!(wizard.submit(&api).await, Err(WizardError::Upload(_))));
    assert_eq!(api.calls(), vec!["upload"]);
}

#[tokio::test]
async fn voice_entry_fills_the_form_and_advances() {
    let api = ScriptedApi::new();
    let mut wizard = ApplicationWizard::default();
    wizard.set_entry_mode(EntryMode::Voice);

    let voice = wizard.voice_mut();
    voice.set_language(Language::French);
    voice.toggle();
    voice.handle(RecognitionEvent::Results {
        segments: vec![Segment {
            text: "je suis artisan depuis 7 ans".into(),
            is_final: true,
        }],
    });
    let transcript = voice.complete();
    assert_eq!(transcript, "je suis artisan depuis 7 ans");

    let extraction = VoiceAssistant::new(false)
        .extract(&api, &transcript, Language::French)
        .await
        .unwrap();
    assert!(!extraction.is_synthetic());
    wizard.set_extraction(extraction);

    assert!(wizard.apply_pending_extraction().unwrap());
    assert_eq!(wizard.step(), WizardStep::Documents);
    assert_eq!(wizard.form().archetype, Archetype::Craftsman);
    assert_eq!(wizard.form().years_active, 7.0);
    assert_eq!(wizard.form().name, "Amira");
}

#[tokio::test]
async fn voice_extraction_falls_back_locally_when_allowed() {
    let api = ScriptedApi::new().failing("voice");
    let fetched = VoiceAssistant::new(true)
        .extract(&api, "taxi driver for 4 years", Language::English)
        .await
        .unwrap();
    assert!(fetched.is_synthetic());
    assert!(fetched.as_ref().is_some());

    let surfaced = VoiceAssistant::new(false)
        .extract(&api, "taxi driver for 4 years", Language::English)
        .await;
    assert!(surfaced.is_err());
}

#[tokio::test(start_paused = true)]
async fn abandoned_submit_request_still_settles() {
    let api = Arc::new(
        ScriptedApi::new()
            .failing("submit")
            .delayed("submit", Duration::from_millis(200)),
    );
    let session = Arc::new(Mutex::new(at_review(Vec::new())));

    let cut_short = timeout(
        Duration::from_millis(50),
        wizard::submit_shared(session.clone(), api.clone()),
    )
    .await;
    assert!(cut_short.is_err());
    assert!(session.lock().await.view().submitting);

    sleep(Duration::from_secs(1)).await;
    let view = session.lock().await.view();
    assert!(!view.submitting);
    assert_eq!(view.step, WizardStep::Review);
    assert!(view.error.unwrap().contains("submission failed"));

    api.recover("submit");
    let view = wizard::submit_shared(session.clone(), api.clone()).await.unwrap();
    assert_eq!(view.step, WizardStep::Result);
    assert!(!view.submitting);
    assert_eq!(api.count("submit"), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_submit_is_busy() {
    let api = Arc::new(ScriptedApi::new().delayed("submit", Duration::from_millis(100)));
    let session = Arc::new(Mutex::new(at_review(Vec::new())));

    let (first, second) = tokio::join!(
        wizard::submit_shared(session.clone(), api.clone()),
        async {
            sleep(Duration::from_millis(10)).await;
            wizard::submit_shared(session.clone(), api.clone()).await
        }
    );

    assert_eq!(first.unwrap().step, WizardStep::Result);
    assert!(matches!(second, Err(WizardError::Busy)));
    assert_eq!(api.count("submit"), 1);
}
