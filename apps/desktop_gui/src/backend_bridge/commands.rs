//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use shared::domain::{CaptchaGeneration, ImageSlot, SubmissionTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    FetchCaptcha {
        generation: CaptchaGeneration,
    },
    ReadPreview {
        slot: ImageSlot,
        path: PathBuf,
    },
    Process {
        ticket: SubmissionTicket,
        request: ProcessRequest,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::FetchCaptcha { .. } => "fetch_captcha",
            BackendCommand::ReadPreview { .. } => "read_preview",
            BackendCommand::Process { .. } => "process",
        }
    }
}

/// Form fields collected at submit time. Images are still paths; the worker
/// reads them when it builds the multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessRequest {
    pub image1: Option<PathBuf>,
    pub image2: Option<PathBuf>,
    pub blend_level: String,
    pub captcha: String,
    pub extra_fields: Vec<(String, String)>,
}
