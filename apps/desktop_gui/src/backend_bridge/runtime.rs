//! Runtime bridge between UI command queue and backend event intake.

use std::{path::Path, sync::Arc, thread};

use client_core::{read_as_data_url, BlendBackend, ClientError, ImageUpload, ProcessForm};
use crossbeam_channel::{Receiver, Sender};

use crate::{
    backend_bridge::commands::{BackendCommand, ProcessRequest},
    controller::events::{ProcessOutcome, UiEvent},
};

/// Starts the backend worker thread. Each command runs as its own task, so a
/// slow `/process` call never holds up a CAPTCHA refresh or a preview read.
pub fn launch(
    backend: Arc<dyn BlendBackend>,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendFailure(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            tracing::info!("backend worker started");
            while let Ok(cmd) = cmd_rx.recv() {
                let backend = Arc::clone(&backend);
                let ui_tx = ui_tx.clone();
                tokio::spawn(async move {
                    let event = execute(backend.as_ref(), cmd).await;
                    if ui_tx.send(event).is_err() {
                        tracing::debug!("ui event receiver dropped; discarding backend result");
                    }
                });
            }
            tracing::info!("ui command channel closed; backend worker stopping");
        });
    });
}

pub async fn execute(backend: &dyn BlendBackend, cmd: BackendCommand) -> UiEvent {
    match cmd {
        BackendCommand::FetchCaptcha { generation } => match backend.new_captcha().await {
            Ok(captcha) => UiEvent::CaptchaLoaded {
                generation,
                captcha_image: captcha.captcha_image,
            },
            Err(err) => UiEvent::CaptchaFailed {
                generation,
                reason: err.to_string(),
            },
        },
        BackendCommand::ReadPreview { slot, path } => match read_as_data_url(path).await {
            Ok(data_url) => UiEvent::PreviewLoaded { slot, data_url },
            Err(err) => UiEvent::PreviewFailed {
                slot,
                reason: err.to_string(),
            },
        },
        BackendCommand::Process { ticket, request } => {
            let outcome = match build_form(request).await {
                Ok(form) => match backend.process(form).await {
                    Ok(response) => ProcessOutcome::Response(response),
                    Err(err) => {
                        tracing::warn!(ticket = ticket.0, error = %err, "blend request failed");
                        ProcessOutcome::Transport(err.to_string())
                    }
                },
                Err(err) => {
                    tracing::warn!(ticket = ticket.0, error = %err, "could not read selected image");
                    ProcessOutcome::Transport(err.to_string())
                }
            };
            UiEvent::ProcessCompleted { ticket, outcome }
        }
    }
}

async fn read_optional(path: Option<&Path>) -> Result<Option<ImageUpload>, ClientError> {
    match path {
        Some(path) => Ok(Some(ImageUpload::from_path(path).await?)),
        None => Ok(None),
    }
}

async fn build_form(request: ProcessRequest) -> Result<ProcessForm, ClientError> {
    Ok(ProcessForm {
        image1: read_optional(request.image1.as_deref()).await?,
        image2: read_optional(request.image2.as_deref()).await?,
        blend_level: request.blend_level,
        captcha: request.captcha,
        extra_fields: request.extra_fields,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::Mutex,
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use async_trait::async_trait;
    use client_core::SimpleBlendForm;
    use crossbeam_channel::bounded;
    use shared::{
        domain::{CaptchaGeneration, ImageSlot, SubmissionTicket},
        protocol::{BlendResponse, CaptchaResponse, ProcessResponse},
    };

    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        fail_captcha: bool,
        forms: Mutex<Vec<ProcessForm>>,
    }

    #[async_trait]
    impl BlendBackend for FakeBackend {
        async fn new_captcha(&self) -> Result<CaptchaResponse, ClientError> {
            if self.fail_captcha {
                return Err(ClientError::InvalidServerUrl("offline".into()));
            }
            Ok(CaptchaResponse {
                captcha_image: "Q0FQ".into(),
            })
        }

        async fn process(&self, form: ProcessForm) -> Result<ProcessResponse, ClientError> {
            self.forms.lock().expect("forms lock").push(form);
            Ok(ProcessResponse::Failure {
                error: "Invalid CAPTCHA. Please try again.".into(),
            })
        }

        async fn simple_blend(&self, _form: SimpleBlendForm) -> Result<BlendResponse, ClientError> {
            Ok(BlendResponse::Failure {
                error: "unused".into(),
            })
        }
    }

    fn temp_image(contents: &[u8]) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("blend_studio_runtime_{suffix}.png"));
        std::fs::write(&path, contents).expect("write temp image");
        path
    }

    #[tokio::test]
    async fn captcha_command_maps_to_loaded_event() {
        let backend = FakeBackend::default();
        let event = execute(
            &backend,
            BackendCommand::FetchCaptcha {
                generation: CaptchaGeneration(4),
            },
        )
        .await;
        assert_eq!(
            event,
            UiEvent::CaptchaLoaded {
                generation: CaptchaGeneration(4),
                captcha_image: "Q0FQ".into(),
            }
        );
    }

    #[tokio::test]
    async fn captcha_error_maps_to_failed_event() {
        let backend = FakeBackend {
            fail_captcha: true,
            ..FakeBackend::default()
        };
        let event = execute(
            &backend,
            BackendCommand::FetchCaptcha {
                generation: CaptchaGeneration(1),
            },
        )
        .await;
        assert!(matches!(event, UiEvent::CaptchaFailed { .. }));
    }

    #[tokio::test]
    async fn preview_reads_file_into_data_url() {
        let path = temp_image(b"\x89PNG");
        let event = execute(
            &FakeBackend::default(),
            BackendCommand::ReadPreview {
                slot: ImageSlot::Second,
                path: path.clone(),
            },
        )
        .await;
        assert_eq!(
            event,
            UiEvent::PreviewLoaded {
                slot: ImageSlot::Second,
                data_url: "data:image/png;base64,iVBORw==".into(),
            }
        );
        std::fs::remove_file(path).expect("cleanup");
    }

    #[tokio::test]
    async fn process_reads_images_and_forwards_fields() {
        let path = temp_image(b"pixels");
        let backend = FakeBackend::default();
        let event = execute(
            &backend,
            BackendCommand::Process {
                ticket: SubmissionTicket(9),
                request: ProcessRequest {
                    image1: Some(path.clone()),
                    image2: None,
                    blend_level: "0.4".into(),
                    captcha: "abc".into(),
                    extra_fields: Vec::new(),
                },
            },
        )
        .await;

        assert_eq!(
            event,
            UiEvent::ProcessCompleted {
                ticket: SubmissionTicket(9),
                outcome: ProcessOutcome::Response(ProcessResponse::Failure {
                    error: "Invalid CAPTCHA. Please try again.".into(),
                }),
            }
        );
        let forms = backend.forms.lock().expect("forms lock");
        assert_eq!(forms.len(), 1);
        assert_eq!(
            forms[0].image1.as_ref().map(|upload| upload.bytes.clone()),
            Some(b"pixels".to_vec())
        );
        assert!(forms[0].image2.is_none());
        assert_eq!(forms[0].captcha, "abc");
        std::fs::remove_file(path).expect("cleanup");
    }

    #[tokio::test]
    async fn unreadable_image_is_a_transport_outcome() {
        let backend = FakeBackend::default();
        let event = execute(
            &backend,
            BackendCommand::Process {
                ticket: SubmissionTicket(1),
                request: ProcessRequest {
                    image1: Some(PathBuf::from("/no/such/image.png")),
                    ..ProcessRequest::default()
                },
            },
        )
        .await;
        assert!(matches!(
            event,
            UiEvent::ProcessCompleted {
                outcome: ProcessOutcome::Transport(_),
                ..
            }
        ));
        assert!(backend.forms.lock().expect("forms lock").is_empty());
    }

    #[test]
    fn launched_worker_answers_over_channel() {
        let (cmd_tx, cmd_rx) = bounded(4);
        let (ui_tx, ui_rx) = bounded(4);
        launch(Arc::new(FakeBackend::default()), cmd_rx, ui_tx);

        cmd_tx
            .send(BackendCommand::FetchCaptcha {
                generation: CaptchaGeneration(1),
            })
            .expect("send command");
        let event = ui_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker replied");
        assert!(matches!(event, UiEvent::CaptchaLoaded { .. }));
    }
}
