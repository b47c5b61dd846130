use super::*;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::Result;
use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::protocol::ProcessSuccess;
use tokio::{net::TcpListener, sync::Mutex};

const SESSION_COOKIE: &str = "session=challenge-1";
const EXPECTED_ANSWER: &str = "XK7P2Q";

#[derive(Debug, Clone, Default)]
struct RecordedField {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct StubState {
    captcha_hits: Arc<AtomicUsize>,
    process_hits: Arc<AtomicUsize>,
    last_process: Arc<Mutex<HashMap<String, RecordedField>>>,
}

async fn handle_new_captcha(State(state): State<StubState>) -> impl IntoResponse {
    state.captcha_hits.fetch_add(1, Ordering::SeqCst);
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        Json(json!({ "captcha_image": "Y2FwdGNoYQ==" })),
    )
}

async fn collect_fields(mut multipart: Multipart) -> HashMap<String, RecordedField> {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.insert(
            name,
            RecordedField {
                file_name,
                content_type,
                bytes,
            },
        );
    }
    fields
}

fn text_field(fields: &HashMap<String, RecordedField>, name: &str) -> String {
    fields
        .get(name)
        .map(|field| String::from_utf8_lossy(&field.bytes).into_owned())
        .unwrap_or_default()
}

async fn handle_process(
    State(state): State<StubState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    state.process_hits.fetch_add(1, Ordering::SeqCst);
    let fields = collect_fields(multipart).await;
    *state.last_process.lock().await = fields.clone();

    let has_session = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(SESSION_COOKIE));
    if !has_session || !text_field(&fields, "captcha").eq_ignore_ascii_case(EXPECTED_ANSWER) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Invalid CAPTCHA. Please try again." })),
        );
    }

    let selected = ["image1", "image2"].iter().all(|name| {
        fields
            .get(*name)
            .and_then(|field| field.file_name.as_deref())
            .is_some_and(|file_name| !file_name.is_empty())
    });
    if !selected {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "No files selected." })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "blended_image": "A",
            "histogram1": "B",
            "histogram2": "C",
            "histogram_blended": "D",
        })),
    )
}

async fn handle_simple_blend(multipart: Multipart) -> (StatusCode, Json<Value>) {
    let fields = collect_fields(multipart).await;
    match text_field(&fields, "blend_level").parse::<f64>() {
        Ok(level) if (0.0..=1.0).contains(&level) => (
            StatusCode::OK,
            Json(json!({ "success": true, "blended_image": "YmxlbmQ=" })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Invalid blend level" })),
        ),
    }
}

async fn spawn_blend_server() -> Result<(String, StubState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = StubState::default();
    let app = Router::new()
        .route("/new-captcha", get(handle_new_captcha))
        .route("/process", post(handle_process))
        .route("/api/blend", post(handle_simple_blend))
        .route(
            "/flagless/process",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Please upload both images." })),
                )
            }),
        )
        .route(
            "/broken/process",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn sample_upload(filename: &str, bytes: &[u8]) -> ImageUpload {
    ImageUpload {
        filename: filename.to_string(),
        mime_type: Some("image/png".to_string()),
        bytes: bytes.to_vec(),
    }
}

fn full_form(captcha: &str) -> ProcessForm {
    ProcessForm {
        image1: Some(sample_upload("left.png", b"left-bytes")),
        image2: Some(sample_upload("right.png", b"right-bytes")),
        blend_level: "0.3".to_string(),
        captcha: captcha.to_string(),
        extra_fields: vec![("note".to_string(), "from test".to_string())],
    }
}

#[test]
fn rejects_server_url_without_scheme() {
    assert!(matches!(
        HttpBlendClient::new("localhost:5000"),
        Err(ClientError::InvalidServerUrl(_))
    ));
}

#[test]
fn trims_trailing_slash_from_server_url() {
    let client = HttpBlendClient::new("http://127.0.0.1:5000/").expect("client");
    assert_eq!(client.server_url(), "http://127.0.0.1:5000");
    assert_eq!(
        client.endpoint(NEW_CAPTCHA_PATH),
        "http://127.0.0.1:5000/new-captcha"
    );
}

#[tokio::test]
async fn new_captcha_issues_single_get() -> Result<()> {
    let (server_url, state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(server_url)?;

    let captcha = client.new_captcha().await?;

    assert_eq!(captcha.captcha_image, "Y2FwdGNoYQ==");
    assert_eq!(state.captcha_hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn process_sends_all_fields_and_session_cookie() -> Result<()> {
    let (server_url, state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(server_url)?;
    client.new_captcha().await?;

    let response = client.process(full_form("xk7p2q")).await?;

    assert_eq!(
        response,
        ProcessResponse::Success(ProcessSuccess {
            blended_image: "A".into(),
            histogram1: "B".into(),
            histogram2: "C".into(),
            histogram_blended: "D".into(),
        })
    );
    let fields = state.last_process.lock().await.clone();
    let image1 = fields.get("image1").expect("image1 part");
    assert_eq!(image1.file_name.as_deref(), Some("left.png"));
    assert_eq!(image1.content_type.as_deref(), Some("image/png"));
    assert_eq!(image1.bytes, b"left-bytes");
    assert_eq!(
        fields.get("image2").and_then(|f| f.file_name.as_deref()),
        Some("right.png")
    );
    assert_eq!(text_field(&fields, "blend_level"), "0.3");
    assert_eq!(text_field(&fields, "captcha"), "xk7p2q");
    assert_eq!(text_field(&fields, "note"), "from test");
    assert_eq!(state.process_hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn application_failure_is_parsed_despite_error_status() -> Result<()> {
    let (server_url, _state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(server_url)?;
    client.new_captcha().await?;

    let response = client.process(full_form("wrong")).await?;

    assert_eq!(
        response,
        ProcessResponse::Failure {
            error: "Invalid CAPTCHA. Please try again.".into()
        }
    );
    Ok(())
}

#[tokio::test]
async fn missing_image_is_sent_as_empty_file_part() -> Result<()> {
    let (server_url, state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(server_url)?;
    client.new_captcha().await?;
    let mut form = full_form(EXPECTED_ANSWER);
    form.image2 = None;

    let response = client.process(form).await?;

    assert_eq!(
        response,
        ProcessResponse::Failure {
            error: "No files selected.".into()
        }
    );
    let fields = state.last_process.lock().await.clone();
    let image2 = fields.get("image2").expect("image2 part present");
    assert!(image2.bytes.is_empty());
    assert_eq!(image2.file_name.as_deref().unwrap_or_default(), "");
    Ok(())
}

#[tokio::test]
async fn error_body_without_success_flag_is_an_application_failure() -> Result<()> {
    let (server_url, _state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(format!("{server_url}/flagless"))?;

    let response = client.process(full_form(EXPECTED_ANSWER)).await?;

    assert_eq!(
        response,
        ProcessResponse::Failure {
            error: "Please upload both images.".into()
        }
    );
    Ok(())
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() -> Result<()> {
    let (server_url, _state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(format!("{server_url}/broken"))?;

    let err = client
        .process(full_form(EXPECTED_ANSWER))
        .await
        .expect_err("non-json body");

    assert!(matches!(err, ClientError::Decode { status: 502, .. }));
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() -> Result<()> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let client = HttpBlendClient::new(format!("http://{addr}"))?;

    let err = client.new_captcha().await.expect_err("nothing listening");

    assert!(matches!(err, ClientError::Transport(_)));
    Ok(())
}

#[tokio::test]
async fn simple_blend_skips_captcha() -> Result<()> {
    let (server_url, state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(server_url)?;

    let response = client
        .simple_blend(SimpleBlendForm {
            image1: sample_upload("a.png", b"a"),
            image2: sample_upload("b.png", b"b"),
            blend_level: "0.5".to_string(),
        })
        .await?;

    assert_eq!(
        response,
        BlendResponse::Success {
            blended_image: "YmxlbmQ=".into()
        }
    );
    assert_eq!(state.captcha_hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn simple_blend_surfaces_validation_failure() -> Result<()> {
    let (server_url, _state) = spawn_blend_server().await?;
    let client = HttpBlendClient::new(server_url)?;

    let response = client
        .simple_blend(SimpleBlendForm {
            image1: sample_upload("a.png", b"a"),
            image2: sample_upload("b.png", b"b"),
            blend_level: "7".to_string(),
        })
        .await?;

    assert_eq!(
        response,
        BlendResponse::Failure {
            error: "Invalid blend level".into()
        }
    );
    Ok(())
}
