//! User actions and backend results consumed by the form controller.

use std::path::PathBuf;

use shared::{
    domain::{CaptchaGeneration, ImageSlot, SubmissionTicket},
    protocol::ProcessResponse,
};

/// Something the user did to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    BlendLevelInput(String),
    RefreshCaptchaClicked,
    FileSelected {
        slot: ImageSlot,
        path: Option<PathBuf>,
    },
    CaptchaAnswerEdited(String),
    Submit,
}

/// Result reported back by the backend worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    CaptchaLoaded {
        generation: CaptchaGeneration,
        captcha_image: String,
    },
    CaptchaFailed {
        generation: CaptchaGeneration,
        reason: String,
    },
    PreviewLoaded {
        slot: ImageSlot,
        data_url: String,
    },
    PreviewFailed {
        slot: ImageSlot,
        reason: String,
    },
    ProcessCompleted {
        ticket: SubmissionTicket,
        outcome: ProcessOutcome,
    },
    BackendFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The server answered with a parseable body, successful or not.
    Response(ProcessResponse),
    /// The request never produced a usable body.
    Transport(String),
}
