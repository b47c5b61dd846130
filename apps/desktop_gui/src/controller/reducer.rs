//! Submission state machine: idle -> loading -> {succeeded, failed}.
//!
//! All submission behavior goes through `transition`, which returns the next
//! state and the view/backend effects to apply, in order.

use shared::{
    domain::SubmissionTicket,
    protocol::{ProcessResponse, ProcessSuccess},
};

use super::events::ProcessOutcome;

pub const NETWORK_ERROR_PREFIX: &str = "Network error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Server answered `success: false`.
    Application,
    /// Request failed before a usable body arrived.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Loading {
        ticket: SubmissionTicket,
    },
    Succeeded {
        ticket: SubmissionTicket,
    },
    Failed {
        ticket: SubmissionTicket,
        kind: FailureKind,
    },
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SubmissionState::Loading { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionInput {
    Submit {
        ticket: SubmissionTicket,
    },
    Completed {
        ticket: SubmissionTicket,
        outcome: ProcessOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    HideResults,
    HideError,
    ShowLoading,
    HideLoading,
    SetSubmitEnabled(bool),
    SendProcess { ticket: SubmissionTicket },
    ShowResults(ProcessSuccess),
    ShowError(String),
    RefreshCaptcha,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SubmissionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &SubmissionState) -> Self {
        Self {
            next: state.clone(),
            effects: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

pub fn transition(state: &SubmissionState, input: SubmissionInput) -> Transition {
    match (state, input) {
        // submit stays disabled while a request is in flight
        (SubmissionState::Loading { .. }, SubmissionInput::Submit { .. }) => {
            Transition::unchanged(state)
        }
        (_, SubmissionInput::Submit { ticket }) => Transition {
            next: SubmissionState::Loading { ticket },
            effects: vec![
                Effect::ShowLoading,
                Effect::HideResults,
                Effect::HideError,
                Effect::SetSubmitEnabled(false),
                Effect::SendProcess { ticket },
            ],
        },
        (SubmissionState::Loading { ticket: current }, SubmissionInput::Completed { ticket, outcome })
            if *current == ticket =>
        {
            complete(ticket, outcome)
        }
        // stale or unexpected completion
        (_, SubmissionInput::Completed { .. }) => Transition::unchanged(state),
    }
}

fn complete(ticket: SubmissionTicket, outcome: ProcessOutcome) -> Transition {
    match outcome {
        ProcessOutcome::Response(ProcessResponse::Success(success)) => Transition {
            next: SubmissionState::Succeeded { ticket },
            effects: vec![
                Effect::HideLoading,
                Effect::ShowResults(success),
                Effect::SetSubmitEnabled(true),
            ],
        },
        ProcessOutcome::Response(ProcessResponse::Failure { error }) => Transition {
            next: SubmissionState::Failed {
                ticket,
                kind: FailureKind::Application,
            },
            effects: vec![
                Effect::HideLoading,
                Effect::ShowError(error),
                Effect::SetSubmitEnabled(true),
                Effect::RefreshCaptcha,
            ],
        },
        // the challenge may still be valid, so it is not renewed here
        ProcessOutcome::Transport(message) => Transition {
            next: SubmissionState::Failed {
                ticket,
                kind: FailureKind::Transport,
            },
            effects: vec![
                Effect::HideLoading,
                Effect::ShowError(format!("{NETWORK_ERROR_PREFIX}{message}")),
                Effect::SetSubmitEnabled(true),
            ],
        },
    }
}
