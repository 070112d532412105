use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::StatusCode;

use crate::analysis;
use crate::config::GeminiConfig;
use crate::credentials::CredentialStore;
use crate::error::{AnalysisError, GenerationError};
use crate::formats::BookAnalysis;
use crate::provider::{Analyzer, ImageGenerator};
use crate::video_job::{OperationHandle, OperationStatus, VideoOperations};

pub fn model_endpoint(base_url: &str, model: &str, method: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/models/{model}:{method}")
}

pub fn operation_endpoint(base_url: &str, operation_name: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let operation_name = operation_name.trim_start_matches('/');
    format!("{base_url}/{operation_name}")
}

/// Gemini API bindings for analysis, image and video generation.
///
/// The API key is read from the shared [`CredentialStore`] on every request
/// so a re-selected key takes effect for the next call.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    credentials: Arc<CredentialStore>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, credentials: Arc<CredentialStore>) -> anyhow::Result<Self> {
        config.validate().context("validate gemini config")?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    fn api_key(&self) -> Result<String, GenerationError> {
        self.credentials.api_key().ok_or_else(|| {
            GenerationError::new("no api key selected").with_status("UNAUTHENTICATED")
        })
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        response_schema: serde_json::Value,
    ) -> Result<String, GenerationError> {
        let endpoint = model_endpoint(
            &self.config.base_url,
            &self.config.text_model,
            "generateContent",
        );
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            },
        });
        let value = self.post_json(&endpoint, &body).await?;
        extract_candidate_text(&value)
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .http
            .post(endpoint)
            .header("x-goog-api-key", self.api_key()?)
            .json(body)
            .send()
            .await?;
        read_response(response).await
    }

    async fn get_json(&self, endpoint: &str) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .http
            .get(endpoint)
            .header("x-goog-api-key", self.api_key()?)
            .send()
            .await?;
        read_response(response).await
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze(&self, text: &str) -> Result<BookAnalysis, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        if text.chars().count() > analysis::MAX_INPUT_CHARS {
            tracing::warn!(
                max_chars = analysis::MAX_INPUT_CHARS,
                "book text truncated for analysis"
            );
        }

        tracing::info!(engine = "gemini", model = %self.config.text_model, "analyze book");
        let prompt = analysis::build_prompt(text);
        let raw = self
            .generate_text(&prompt, analysis::response_schema())
            .await?;
        analysis::parse_analysis(&raw)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let endpoint = model_endpoint(&self.config.base_url, &self.config.image_model, "predict");
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "aspectRatio": "16:9" },
        });
        tracing::debug!(model = %self.config.image_model, "generate image");
        let value = self.post_json(&endpoint, &body).await?;
        extract_image_data_url(&value)
    }
}

#[async_trait]
impl VideoOperations for GeminiClient {
    async fn submit(&self, prompt: &str) -> Result<OperationHandle, GenerationError> {
        let endpoint = model_endpoint(
            &self.config.base_url,
            &self.config.video_model,
            "predictLongRunning",
        );
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": "16:9" },
        });
        tracing::debug!(model = %self.config.video_model, "submit video operation");
        let value = self.post_json(&endpoint, &body).await?;
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GenerationError::new("missing operation `name` in response"))?;
        Ok(OperationHandle {
            name: name.to_owned(),
        })
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, GenerationError> {
        let endpoint = operation_endpoint(&self.config.base_url, &handle.name);
        let value = self.get_json(&endpoint).await?;
        parse_operation(&value)
    }
}

async fn read_response(response: reqwest::Response) -> Result<serde_json::Value, GenerationError> {
    let status = response.status();
    let raw = response.text().await?;
    if !status.is_success() {
        return Err(parse_error(status, &raw));
    }
    serde_json::from_str(&raw)
        .map_err(|err| GenerationError::new(format!("parse response json: {err}")))
}

fn parse_error(status: StatusCode, raw: &str) -> GenerationError {
    let fallback = || {
        let message = if raw.trim().is_empty() {
            status.to_string()
        } else {
            raw.trim().to_owned()
        };
        GenerationError::new(message).with_code(status.as_u16())
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return fallback();
    };
    let Some(error) = value.get("error") else {
        return fallback();
    };
    operation_error(error).unwrap_or_else(fallback)
}

/// Reads a `google.rpc.Status`-shaped object.
fn operation_error(error: &serde_json::Value) -> Option<GenerationError> {
    let message = error.get("message")?.as_str()?.to_owned();
    let mut err = GenerationError::new(message);
    if let Some(code) = error
        .get("code")
        .and_then(|v| v.as_u64())
        .and_then(|v| u16::try_from(v).ok())
    {
        err = err.with_code(code);
    }
    if let Some(status) = error.get("status").and_then(|v| v.as_str()) {
        err = err.with_status(status);
    }
    Some(err)
}

fn extract_candidate_text(value: &serde_json::Value) -> Result<String, GenerationError> {
    let parts = value
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array())
        .ok_or_else(|| GenerationError::new("missing `candidates[0].content.parts` in response"))?;

    let mut text = String::new();
    for part in parts {
        if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(part_text);
        }
    }

    if text.trim().is_empty() {
        return Err(GenerationError::new("model output text is empty"));
    }
    Ok(text)
}

fn extract_image_data_url(value: &serde_json::Value) -> Result<String, GenerationError> {
    let prediction = value
        .pointer("/predictions/0")
        .ok_or_else(|| GenerationError::new("no image returned (prompt may have been filtered)"))?;
    let encoded = prediction
        .get("bytesBase64Encoded")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GenerationError::new("missing `bytesBase64Encoded` in prediction"))?;
    let mime_type = prediction
        .get("mimeType")
        .and_then(|v| v.as_str())
        .unwrap_or("image/png");

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|err| GenerationError::new(format!("image payload is not valid base64: {err}")))?;

    Ok(format!("data:{mime_type};base64,{encoded}"))
}

fn parse_operation(value: &serde_json::Value) -> Result<OperationStatus, GenerationError> {
    if !value.get("done").and_then(|v| v.as_bool()).unwrap_or(false) {
        return Ok(OperationStatus::Pending);
    }

    if let Some(error) = value.get("error") {
        return Err(operation_error(error)
            .unwrap_or_else(|| GenerationError::new(format!("video operation failed: {error}"))));
    }

    let uri = value
        .pointer("/response/generateVideoResponse/generatedSamples/0/video/uri")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GenerationError::new("video operation finished without a video"))?;
    Ok(OperationStatus::Done {
        video_uri: uri.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_trim_slashes() {
        assert_eq!(
            model_endpoint("https://host/v1beta/", "veo", "predictLongRunning"),
            "https://host/v1beta/models/veo:predictLongRunning"
        );
        assert_eq!(
            operation_endpoint("https://host/v1beta", "/models/veo/operations/abc"),
            "https://host/v1beta/models/veo/operations/abc"
        );
    }

    #[test]
    fn parse_error_reads_rpc_status() {
        let raw = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        let err = parse_error(StatusCode::NOT_FOUND, raw);
        assert_eq!(err.code, Some(404));
        assert_eq!(err.status.as_deref(), Some("NOT_FOUND"));
        assert_eq!(err.message, "Requested entity was not found.");
    }

    #[test]
    fn parse_error_falls_back_to_raw_body() {
        let err = parse_error(StatusCode::BAD_GATEWAY, "upstream timeout");
        assert_eq!(err.code, Some(502));
        assert_eq!(err.status, None);
        assert_eq!(err.message, "upstream timeout");
    }

    #[test]
    fn parse_operation_states() {
        let pending = serde_json::json!({ "name": "op", "done": false });
        assert_eq!(parse_operation(&pending).unwrap(), OperationStatus::Pending);

        let done = serde_json::json!({
            "name": "op",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://files/v1" } }
            ] } },
        });
        assert_eq!(
            parse_operation(&done).unwrap(),
            OperationStatus::Done {
                video_uri: "https://files/v1".to_owned()
            }
        );

        let failed = serde_json::json!({
            "name": "op",
            "done": true,
            "error": { "code": 3, "message": "prompt was blocked" },
        });
        let err = parse_operation(&failed).unwrap_err();
        assert_eq!(err.code, Some(3));
        assert_eq!(err.message, "prompt was blocked");
    }

    #[test]
    fn image_prediction_becomes_data_url() {
        let value = serde_json::json!({
            "predictions": [{ "bytesBase64Encoded": "iVBORw0KGgo=", "mimeType": "image/png" }]
        });
        assert_eq!(
            extract_image_data_url(&value).unwrap(),
            "data:image/png;base64,iVBORw0KGgo="
        );

        let filtered = serde_json::json!({});
        assert!(extract_image_data_url(&filtered).is_err());
    }

    #[test]
    fn candidate_text_is_concatenated() {
        let value = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(extract_candidate_text(&value).unwrap(), "{\"a\":1}");
    }
}
