//! Voice entry: live transcript capture and transcript-to-form extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use ts_rs::TS;

use crate::{
    api::{
        CreditApi,
        types::{VoiceExtractRequest, VoiceExtraction},
    },
    error::FetchResult,
    fetch::{FallbackPolicy, Fetched, fetch_with},
    model::Archetype,
};

pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition not supported in this browser";

const EXTRACT_CALL_SITE: &str = "voice.extract";

// ASCII digits only; `\d` would also match Arabic-Indic runs that never parse.
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Language {
    #[default]
    #[serde(rename = "ar-TN")]
    ArabicTunisia,
    #[serde(rename = "fr-FR")]
    French,
    #[serde(rename = "en-US")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::ArabicTunisia => "ar-TN",
            Language::French => "fr-FR",
            Language::English => "en-US",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::ArabicTunisia => "العربية",
            Language::French => "Français",
            Language::English => "English",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SpeechError {
    #[error("{UNSUPPORTED_MESSAGE}")]
    Unsupported,
    #[error("recognizer error: {0}")]
    Recognizer(String),
}

/// Adapter over the platform speech-to-text facility.
pub trait SpeechRecognizer: Send {
    fn is_supported(&self) -> bool;
    fn start(&mut self, language: Language) -> Result<(), SpeechError>;
    fn stop(&mut self);
}

/// Platform without a speech facility.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self, _language: Language) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }

    fn stop(&mut self) {}
}

/// Recognition runs in the visitor's browser; this side only records the requested state.
#[derive(Debug, Default, Clone)]
pub struct BrowserRecognizer {
    supported: bool,
    running: bool,
}

impl BrowserRecognizer {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl SpeechRecognizer for BrowserRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&mut self, _language: Language) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct Segment {
    pub text: String,
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum RecognitionEvent {
    Started,
    Results { segments: Vec<Segment> },
    Error { message: String },
    Ended,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct CaptureView {
    pub supported: bool,
    pub listening: bool,
    pub language: Language,
    pub transcript: String,
    pub interim: String,
    pub error: Option<String>,
}

pub struct TranscriptCapture<R: SpeechRecognizer> {
    recognizer: R,
    language: Language,
    listening: bool,
    transcript: String,
    interim: String,
    error: Option<String>,
}

impl<R: SpeechRecognizer> TranscriptCapture<R> {
    pub fn new(recognizer: R, language: Language) -> Self {
        let error = (!recognizer.is_supported()).then(|| UNSUPPORTED_MESSAGE.to_string());
        Self {
            recognizer,
            language,
            listening: false,
            transcript: String::new(),
            interim: String::new(),
            error,
        }
    }

    pub fn start(&mut self) {
        if self.listening {
            return;
        }
        match self.recognizer.start(self.language) {
            Ok(()) => {
                self.listening = true;
                self.error = None;
            }
            Err(err) => {
                error!(error = %err, "speech recognition failed to start");
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn stop(&mut self) {
        if self.listening {
            self.recognizer.stop();
            self.listening = false;
        }
    }

    pub fn toggle(&mut self) {
        if self.listening {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Switching language restarts recognition; text captured so far is kept.
    pub fn set_language(&mut self, language: Language) {
        if self.language == language {
            return;
        }
        self.stop();
        self.language = language;
    }

    pub fn handle(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                self.listening = true;
                self.error = None;
            }
            RecognitionEvent::Results { segments } => {
                let mut interim = String::new();
                for segment in segments {
                    if segment.is_final {
                        self.transcript.push_str(&segment.text);
                        self.transcript.push(' ');
                    } else {
                        interim.push_str(&segment.text);
                    }
                }
                self.interim = interim;
            }
            RecognitionEvent::Error { message } => {
                self.error = Some(message);
                self.listening = false;
                self.recognizer.stop();
            }
            RecognitionEvent::Ended => {
                self.listening = false;
                self.recognizer.stop();
            }
        }
    }

    /// Stop listening and hand back every finalized segment. Interim text is not included.
    pub fn complete(&mut self) -> String {
        self.stop();
        self.transcript.trim_end().to_string()
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
        self.interim.clear();
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn view(&self) -> CaptureView {
        CaptureView {
            supported: self.recognizer.is_supported(),
            listening: self.listening,
            language: self.language,
            transcript: self.transcript.clone(),
            interim: self.interim.clone(),
            error: self.error.clone(),
        }
    }
}

/// Keyword matching used when the backend extractor is unreachable. Later rules win.
pub fn extract_locally(text: &str) -> VoiceExtraction {
    let lower = text.to_lowercase();
    let mut archetype = Archetype::MarketVendor;
    if lower.contains("artisan") || lower.contains("craftsman") {
        archetype = Archetype::Craftsman;
    }
    if lower.contains("taxi") || lower.contains("driver") {
        archetype = Archetype::GigWorker;
    }
    if lower.contains("shop") || lower.contains("store") {
        archetype = Archetype::ShopOwner;
    }

    let mut numbers = NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok());
    let years = numbers.next().unwrap_or(5.0);
    let income = numbers.next().unwrap_or(1500.0);

    VoiceExtraction {
        archetype,
        years_active: years.min(30.0),
        monthly_income: income,
        confidence: 0.6,
        raw_transcript: text.to_string(),
        name: None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VoiceAssistant {
    allow_synthetic: bool,
}

impl VoiceAssistant {
    pub fn new(allow_synthetic: bool) -> Self {
        Self { allow_synthetic }
    }

    /// Backend extraction, falling back to [`extract_locally`] when allowed.
    pub async fn extract(
        &self,
        api: &dyn CreditApi,
        transcript: &str,
        language: Language,
    ) -> FetchResult<Fetched<VoiceExtraction>> {
        let request = VoiceExtractRequest {
            transcript: transcript.to_string(),
            language: language.code().to_string(),
        };
        let policy = if self.allow_synthetic {
            let text = transcript.to_string();
            FallbackPolicy::synthesize(move || extract_locally(&text))
        } else {
            FallbackPolicy::Surface
        };
        let fetched = fetch_with(EXTRACT_CALL_SITE, api.extract_voice(&request), policy).await?;
        if let Some(extraction) = fetched.as_ref() {
            info!(
                archetype = %extraction.archetype,
                confidence = extraction.confidence,
                synthetic = fetched.is_synthetic(),
                "voice transcript extracted"
            );
        }
        Ok(fetched)
    }
}
