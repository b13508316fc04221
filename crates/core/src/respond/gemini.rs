use crate::config::{ApiKey, WordRange};
use crate::emotion::EmotionLabel;
use crate::respond::{compose_prompt, ResponseError, ResponseGenerator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiResponder {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    words: WordRange,
}

impl GeminiResponder {
    pub fn new(api_key: ApiKey, words: WordRange) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_owned(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_owned(),
            words,
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(&self, prompt: &str, emotion: EmotionLabel) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: compose_prompt(prompt, emotion, self.words),
                }],
            }],
        }
    }

    fn classify_status(status: StatusCode, body: String) -> ResponseError {
        match status.as_u16() {
            401 | 403 | 408 | 429 | 500..=599 => {
                ResponseError::UpstreamUnavailable(format!("HTTP {status}: {body}"))
            }
            _ => ResponseError::Api(format!("HTTP {status}: {body}")),
        }
    }

    fn extract_text(response: GenerateResponse) -> Result<String, ResponseError> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ResponseError::EmptyResponse);
        }
        Ok(text.to_owned())
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl ResponseGenerator for GeminiResponder {
    fn generate(
        &self,
        prompt: String,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<String, ResponseError>> {
        async move {
            let body = self.request_body(&prompt, emotion);

            // Single attempt; the user resends on failure.
            let response = self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", self.api_key.expose())
                .json(&body)
                .send()
                .await
                .map_err(|e| ResponseError::UpstreamUnavailable(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(Self::classify_status(status, error_text));
            }

            let parsed: GenerateResponse = response
                .json()
                .await
                .map_err(|e| ResponseError::InvalidResponse(format!("Failed to parse JSON: {e}")))?;

            Self::extract_text(parsed)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> GeminiResponder {
        GeminiResponder::new(ApiKey::new("test-key").unwrap(), WordRange::default())
    }

    #[test]
    fn request_body_wraps_composed_prompt() {
        let body = responder().request_body("I lost my keys", EmotionLabel::Sad);
        let json = serde_json::to_value(&body).unwrap();
        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("I lost my keys"));
        assert!(text.contains("emotion Sad"));
    }

    #[test]
    fn endpoint_uses_model_name() {
        let r = responder().with_base_url("http://localhost:9/v1/").with_model("m");
        assert_eq!(r.endpoint(), "http://localhost:9/v1/models/m:generateContent");
    }

    #[test]
    fn extracts_joined_candidate_text() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Oh no, "},{"text":"retrace your steps."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            GeminiResponder::extract_text(parsed).unwrap(),
            "Oh no, retrace your steps."
        );
    }

    #[test]
    fn missing_or_blank_text_is_empty_response() {
        for raw in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#,
        ] {
            let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
            assert!(matches!(
                GeminiResponder::extract_text(parsed),
                Err(ResponseError::EmptyResponse)
            ));
        }
    }

    #[test]
    fn auth_and_server_errors_are_upstream_unavailable() {
        for code in [401u16, 403, 429, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                GeminiResponder::classify_status(status, String::new()),
                ResponseError::UpstreamUnavailable(_)
            ));
        }
        assert!(matches!(
            GeminiResponder::classify_status(StatusCode::BAD_REQUEST, String::new()),
            ResponseError::Api(_)
        ));
    }

    #[tokio::test]
    async fn connection_failure_is_upstream_unavailable() {
        let r = responder().with_base_url("http://127.0.0.1:1");
        let err = r
            .generate("hello".into(), EmotionLabel::Neutral)
            .await
            .unwrap_err();
        assert!(matches!(err, ResponseError::UpstreamUnavailable(_)));
    }
}
