use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart::Form, Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::ImageSlot,
    protocol::{
        BlendResponse, CaptchaResponse, ProcessResponse, BLEND_LEVEL_FIELD, CAPTCHA_FIELD,
        NEW_CAPTCHA_PATH, PROCESS_PATH, SIMPLE_BLEND_PATH,
    },
};
use tracing::{debug, info, warn};
use url::Url;

pub mod config;
pub mod data_url;
pub mod error;
pub mod upload;

pub use error::ClientError;
pub use upload::{read_as_data_url, ImageUpload};

/// Everything the blend form submits to `/process`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessForm {
    pub image1: Option<ImageUpload>,
    pub image2: Option<ImageUpload>,
    pub blend_level: String,
    pub captcha: String,
    /// Any further declared form fields, sent as plain text parts.
    pub extra_fields: Vec<(String, String)>,
}

impl ProcessForm {
    fn into_multipart(self) -> Result<Form, ClientError> {
        let mut form = Form::new()
            .part(ImageSlot::First.field_name(), image_part(self.image1)?)
            .part(ImageSlot::Second.field_name(), image_part(self.image2)?)
            .text(BLEND_LEVEL_FIELD, self.blend_level)
            .text(CAPTCHA_FIELD, self.captcha);
        for (name, value) in self.extra_fields {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

/// Payload for the CAPTCHA-free `/api/blend` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleBlendForm {
    pub image1: ImageUpload,
    pub image2: ImageUpload,
    pub blend_level: String,
}

impl SimpleBlendForm {
    fn into_multipart(self) -> Result<Form, ClientError> {
        Ok(Form::new()
            .part(ImageSlot::First.field_name(), self.image1.into_part()?)
            .part(ImageSlot::Second.field_name(), self.image2.into_part()?)
            .text(BLEND_LEVEL_FIELD, self.blend_level))
    }
}

fn image_part(upload: Option<ImageUpload>) -> Result<reqwest::multipart::Part, ClientError> {
    match upload {
        Some(upload) => upload.into_part(),
        None => upload::empty_file_part(),
    }
}

#[async_trait]
pub trait BlendBackend: Send + Sync {
    async fn new_captcha(&self) -> Result<CaptchaResponse, ClientError>;
    async fn process(&self, form: ProcessForm) -> Result<ProcessResponse, ClientError>;
    async fn simple_blend(&self, form: SimpleBlendForm) -> Result<BlendResponse, ClientError>;
}

/// reqwest-backed client for the blend service.
///
/// The CAPTCHA answer is checked against the challenge stored in the server
/// session, so the client keeps cookies between `/new-captcha` and `/process`.
#[derive(Clone)]
pub struct HttpBlendClient {
    http: Client,
    server_url: String,
}

impl HttpBlendClient {
    pub fn new(server_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(server_url, None)
    }

    pub fn with_timeout(
        server_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let server_url = normalize_server_url(server_url.into())?;
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            server_url,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }
}

fn normalize_server_url(raw: String) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(ClientError::InvalidServerUrl(raw)),
    }
}

/// Parses a JSON body without checking the HTTP status first: the backend
/// answers application failures with 4xx/5xx and a JSON explanation.
async fn read_json_body<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
        status: status.as_u16(),
        source,
    })
}

#[async_trait]
impl BlendBackend for HttpBlendClient {
    async fn new_captcha(&self) -> Result<CaptchaResponse, ClientError> {
        let response = self
            .http
            .get(self.endpoint(NEW_CAPTCHA_PATH))
            .send()
            .await?;
        let captcha: CaptchaResponse = read_json_body(response).await?;
        debug!(
            image_len = captcha.captcha_image.len(),
            "received new captcha"
        );
        Ok(captcha)
    }

    async fn process(&self, form: ProcessForm) -> Result<ProcessResponse, ClientError> {
        info!(
            blend_level = %form.blend_level,
            has_image1 = form.image1.is_some(),
            has_image2 = form.image2.is_some(),
            extra_fields = form.extra_fields.len(),
            "submitting blend request"
        );
        let response = self
            .http
            .post(self.endpoint(PROCESS_PATH))
            .multipart(form.into_multipart()?)
            .send()
            .await?;
        let status = response.status();
        let parsed: ProcessResponse = read_json_body(response).await?;
        match &parsed {
            ProcessResponse::Success(_) => info!(%status, "blend request succeeded"),
            ProcessResponse::Failure { error } => {
                warn!(%status, error = %error, "blend request rejected by server")
            }
        }
        Ok(parsed)
    }

    async fn simple_blend(&self, form: SimpleBlendForm) -> Result<BlendResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint(SIMPLE_BLEND_PATH))
            .multipart(form.into_multipart()?)
            .send()
            .await?;
        read_json_body(response).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
