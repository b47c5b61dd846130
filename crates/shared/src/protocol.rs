use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const NEW_CAPTCHA_PATH: &str = "/new-captcha";
pub const PROCESS_PATH: &str = "/process";
pub const SIMPLE_BLEND_PATH: &str = "/api/blend";

pub const BLEND_LEVEL_FIELD: &str = "blend_level";
pub const CAPTCHA_FIELD: &str = "captcha";

/// Message used when the server flags a failure without saying why.
pub const UNSPECIFIED_FAILURE: &str = "request failed without an error message";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaResponse {
    /// Base64 PNG, without a data URL prefix.
    pub captcha_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSuccess {
    pub blended_image: String,
    pub histogram1: String,
    pub histogram2: String,
    pub histogram_blended: String,
}

/// Body of a `/process` response. The server reports application failures
/// with `success: false` and a human readable `error`; a body without the
/// flag counts as a failure too.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawProcessResponse")]
pub enum ProcessResponse {
    Success(ProcessSuccess),
    Failure { error: String },
}

#[derive(Debug, Deserialize)]
struct RawProcessResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    blended_image: Option<String>,
    #[serde(default)]
    histogram1: Option<String>,
    #[serde(default)]
    histogram2: Option<String>,
    #[serde(default)]
    histogram_blended: Option<String>,
}

impl TryFrom<RawProcessResponse> for ProcessResponse {
    type Error = ProtocolError;

    fn try_from(raw: RawProcessResponse) -> Result<Self, Self::Error> {
        if !raw.success {
            return Ok(ProcessResponse::Failure {
                error: raw.error.unwrap_or_else(|| UNSPECIFIED_FAILURE.to_string()),
            });
        }

        Ok(ProcessResponse::Success(ProcessSuccess {
            blended_image: raw
                .blended_image
                .ok_or(ProtocolError::MissingField("blended_image"))?,
            histogram1: raw
                .histogram1
                .ok_or(ProtocolError::MissingField("histogram1"))?,
            histogram2: raw
                .histogram2
                .ok_or(ProtocolError::MissingField("histogram2"))?,
            histogram_blended: raw
                .histogram_blended
                .ok_or(ProtocolError::MissingField("histogram_blended"))?,
        }))
    }
}

/// Body of a `/api/blend` response: blending without CAPTCHA or histograms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBlendResponse")]
pub enum BlendResponse {
    Success { blended_image: String },
    Failure { error: String },
}

#[derive(Debug, Deserialize)]
struct RawBlendResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    blended_image: Option<String>,
}

impl TryFrom<RawBlendResponse> for BlendResponse {
    type Error = ProtocolError;

    fn try_from(raw: RawBlendResponse) -> Result<Self, Self::Error> {
        if !raw.success {
            return Ok(BlendResponse::Failure {
                error: raw.error.unwrap_or_else(|| UNSPECIFIED_FAILURE.to_string()),
            });
        }
        Ok(BlendResponse::Success {
            blended_image: raw
                .blended_image
                .ok_or(ProtocolError::MissingField("blended_image"))?,
        })
    }
}
