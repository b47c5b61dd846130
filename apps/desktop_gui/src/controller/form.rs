//! Form interaction controller.
//!
//! Applies user actions and backend results to the injected `FormView`, and
//! queues backend work through the injected `CommandSink`.

use std::path::PathBuf;

use client_core::data_url::png_data_url;
use shared::{
    domain::{CaptchaGeneration, ImageSlot, SubmissionTicket},
    protocol::ProcessSuccess,
};
use tracing::{debug, info, warn};

use super::{
    events::{ProcessOutcome, UiAction, UiEvent},
    orchestration::CommandSink,
    reducer::{transition, Effect, SubmissionInput, SubmissionState},
};
use crate::{
    backend_bridge::commands::{BackendCommand, ProcessRequest},
    ui::view_model::{ElementId, FormView},
};

pub struct FormController<V, S> {
    view: V,
    commands: S,
    submission: SubmissionState,
    last_ticket: SubmissionTicket,
    captcha_generation: CaptchaGeneration,
    selected_files: [Option<PathBuf>; 2],
    extra_fields: Vec<(String, String)>,
}

impl<V: FormView, S: CommandSink> FormController<V, S> {
    pub fn new(view: V, commands: S) -> Self {
        Self {
            view,
            commands,
            submission: SubmissionState::Idle,
            last_ticket: SubmissionTicket::default(),
            captcha_generation: CaptchaGeneration::default(),
            selected_files: [None, None],
            extra_fields: Vec::new(),
        }
    }

    /// Additional form fields submitted with every request.
    pub fn with_extra_fields(mut self, extra_fields: Vec<(String, String)>) -> Self {
        self.extra_fields = extra_fields;
        self
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn handle_action(&mut self, action: UiAction) {
        match action {
            UiAction::BlendLevelInput(value) => {
                self.view.set_value(ElementId::BlendLevel, &value);
                self.view.set_text(ElementId::BlendValue, &value);
            }
            UiAction::RefreshCaptchaClicked => self.refresh_captcha(),
            UiAction::FileSelected { slot, path } => self.select_file(slot, path),
            UiAction::CaptchaAnswerEdited(answer) => {
                self.view.set_value(ElementId::CaptchaInput, &answer);
            }
            UiAction::Submit => {
                let ticket = self.last_ticket.next();
                let result = transition(&self.submission, SubmissionInput::Submit { ticket });
                if result.is_noop() {
                    debug!(
                        ticket = ticket.0,
                        "ignoring submit while a blend request is in flight"
                    );
                    return;
                }
                self.last_ticket = ticket;
                self.submission = result.next;
                self.apply_effects(result.effects);
            }
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::CaptchaLoaded {
                generation,
                captcha_image,
            } => {
                if generation != self.captcha_generation {
                    debug!(generation = generation.0, "dropping stale captcha");
                    return;
                }
                self.view
                    .set_image_source(ElementId::CaptchaImage, &png_data_url(&captcha_image));
                self.view.set_value(ElementId::CaptchaInput, "");
                self.view.set_hidden(ElementId::CaptchaStatus, true);
            }
            UiEvent::CaptchaFailed { generation, reason } => {
                if generation != self.captcha_generation {
                    debug!(generation = generation.0, "dropping stale captcha failure");
                    return;
                }
                warn!(reason = %reason, "captcha refresh failed");
                self.view.set_text(
                    ElementId::CaptchaStatus,
                    &format!("Could not load a new CAPTCHA: {reason}"),
                );
                self.view.set_hidden(ElementId::CaptchaStatus, false);
            }
            UiEvent::PreviewLoaded { slot, data_url } => {
                let preview = ElementId::preview(slot);
                self.view.set_image_source(preview, &data_url);
                self.view.set_hidden(preview, false);
            }
            UiEvent::PreviewFailed { slot, reason } => {
                warn!(slot = slot.field_name(), reason = %reason, "image preview failed");
            }
            UiEvent::ProcessCompleted { ticket, outcome } => {
                let result = transition(
                    &self.submission,
                    SubmissionInput::Completed { ticket, outcome },
                );
                if result.is_noop() {
                    debug!(ticket = ticket.0, "dropping stale blend completion");
                    return;
                }
                if let SubmissionState::Failed { kind, .. } = &result.next {
                    warn!(ticket = ticket.0, kind = ?kind, "blend submission failed");
                }
                self.submission = result.next;
                self.apply_effects(result.effects);
            }
            UiEvent::BackendFailure(message) => {
                warn!(error = %message, "backend worker reported failure");
                self.view.set_text(ElementId::Error, &message);
                self.view.set_hidden(ElementId::Error, false);
            }
        }
    }

    fn refresh_captcha(&mut self) {
        self.captcha_generation = self.captcha_generation.next();
        let generation = self.captcha_generation;
        if let Err(err) = self
            .commands
            .dispatch(BackendCommand::FetchCaptcha { generation })
        {
            self.handle_event(UiEvent::CaptchaFailed {
                generation,
                reason: err.to_string(),
            });
        }
    }

    fn select_file(&mut self, slot: ImageSlot, path: Option<PathBuf>) {
        let file_name = path
            .as_deref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.view.set_value(ElementId::file_input(slot), &file_name);
        self.selected_files[slot.index()] = path.clone();
        let Some(path) = path else {
            return;
        };
        if let Err(err) = self
            .commands
            .dispatch(BackendCommand::ReadPreview { slot, path })
        {
            self.handle_event(UiEvent::PreviewFailed {
                slot,
                reason: err.to_string(),
            });
        }
    }

    fn collect_request(&self) -> ProcessRequest {
        ProcessRequest {
            image1: self.selected_files[ImageSlot::First.index()].clone(),
            image2: self.selected_files[ImageSlot::Second.index()].clone(),
            blend_level: self.view.value(ElementId::BlendLevel),
            captcha: self.view.value(ElementId::CaptchaInput),
            extra_fields: self.extra_fields.clone(),
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::HideResults => self.view.set_hidden(ElementId::Results, true),
                Effect::HideError => self.view.set_hidden(ElementId::Error, true),
                Effect::ShowLoading => self.view.set_hidden(ElementId::Loading, false),
                Effect::HideLoading => self.view.set_hidden(ElementId::Loading, true),
                Effect::SetSubmitEnabled(enabled) => {
                    self.view.set_enabled(ElementId::BlendForm, enabled)
                }
                Effect::SendProcess { ticket } => {
                    let request = self.collect_request();
                    info!(
                        ticket = ticket.0,
                        blend_level = %request.blend_level,
                        "submitting blend form"
                    );
                    if let Err(err) = self
                        .commands
                        .dispatch(BackendCommand::Process { ticket, request })
                    {
                        self.handle_event(UiEvent::ProcessCompleted {
                            ticket,
                            outcome: ProcessOutcome::Transport(err.to_string()),
                        });
                    }
                }
                Effect::ShowResults(success) => self.show_results(&success),
                Effect::ShowError(message) => {
                    self.view.set_text(ElementId::Error, &message);
                    self.view.set_hidden(ElementId::Error, false);
                }
                Effect::RefreshCaptcha => self.refresh_captcha(),
            }
        }
    }

    fn show_results(&mut self, success: &ProcessSuccess) {
        self.view.set_image_source(
            ElementId::BlendedResult,
            &png_data_url(&success.blended_image),
        );
        for slot in ImageSlot::ALL {
            let source = self
                .view
                .image_source(ElementId::preview(slot))
                .unwrap_or_default();
            self.view.set_image_source(ElementId::result(slot), &source);
        }
        self.view
            .set_image_source(ElementId::Histogram1, &png_data_url(&success.histogram1));
        self.view
            .set_image_source(ElementId::Histogram2, &png_data_url(&success.histogram2));
        self.view.set_image_source(
            ElementId::HistogramBlended,
            &png_data_url(&success.histogram_blended),
        );
        self.view.set_hidden(ElementId::Results, false);
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
