//! Gemini `generateContent` client and the per-parameter batch runner.
//!
//! One request is in flight at a time; failures retry with jittered
//! exponential backoff, and an extraction that still fails degrades to a
//! NOT_FOUND outcome instead of aborting the batch.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use tendersift_core::Parameter;

use crate::prompt::PromptRequest;
use crate::response::{estimate_confidence, parse_model_output};
use crate::{Extraction, LlmError, ProgressEvent};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client configuration resolved by the caller (flags > env > config file).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub retry_attempts: u32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
            retry_attempts: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Seam for the model call, so the batch runner is testable without a
/// network.
pub trait ExtractionClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Gemini REST implementation of [`ExtractionClient`].
pub struct GeminiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

impl ExtractionClient for GeminiClient {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/{}:generateContent?key={}",
                GEMINI_ENDPOINT, self.config.model, self.config.api_key
            );

            let body = GenerateRequest {
                contents: [Content {
                    parts: [Part { text: prompt }],
                }],
                // Low temperature for consistent extraction.
                generation_config: GenerationConfig {
                    temperature: 0.1,
                    top_p: 0.9,
                    top_k: 40,
                    max_output_tokens: 1024,
                },
            };

            let resp = self
                .http
                .post(&url)
                .json(&body)
                .timeout(self.config.timeout)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LlmError::Status(status.as_u16()));
            }

            let data: serde_json::Value = resp.json().await?;
            let text = collect_candidate_text(&data);
            if text.trim().is_empty() {
                return Err(LlmError::EmptyResponse);
            }
            Ok(text)
        })
    }
}

fn collect_candidate_text(data: &serde_json::Value) -> String {
    data["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Call the model with jittered exponential backoff.
async fn generate_with_retry(
    client: &dyn ExtractionClient,
    parameter: Parameter,
    prompt: &str,
    retry_attempts: u32,
    progress: &(dyn Fn(ProgressEvent) + Send + Sync),
    cancel: &CancellationToken,
) -> Result<String, LlmError> {
    let attempts = retry_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        match client.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                tracing::warn!(%parameter, attempt = attempt + 1, error = %e, "model call failed");
                last_error = e.to_string();
            }
        }

        if attempt + 1 < attempts {
            let backoff_ms = 1000u64 * (1u64 << attempt.min(6)) + fastrand::u64(0..250);
            progress(ProgressEvent::Retrying {
                parameter,
                attempt: attempt + 2,
                backoff_ms,
            });
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            }
        }
    }

    Err(LlmError::RetriesExhausted(attempts, last_error))
}

/// One batch entry: a parameter and its prompt, if the match produced one.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub parameter: Parameter,
    /// `None` when the parameter's match had no pages; the model is never
    /// contacted and a fixed not-found extraction is emitted.
    pub request: Option<PromptRequest>,
}

/// Run the extraction batch sequentially, one model request in flight.
///
/// A parameter whose extraction fails (or is cancelled) degrades to a
/// NOT_FOUND outcome; the batch always returns one extraction per item, in
/// input order.
pub async fn extract_batch(
    client: &dyn ExtractionClient,
    items: Vec<BatchItem>,
    retry_attempts: u32,
    progress: impl Fn(ProgressEvent) + Send + Sync,
    cancel: &CancellationToken,
) -> Vec<Extraction> {
    let total = items.len();
    let mut extractions = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        let Some(request) = item.request else {
            progress(ProgressEvent::SkippedNoPages {
                index,
                total,
                parameter: item.parameter,
            });
            extractions.push(Extraction::not_found(item.parameter));
            continue;
        };

        if cancel.is_cancelled() {
            extractions.push(Extraction::not_found(item.parameter));
            continue;
        }

        progress(ProgressEvent::Extracting {
            index,
            total,
            parameter: item.parameter,
        });

        let extraction = match generate_with_retry(
            client,
            item.parameter,
            &request.prompt,
            retry_attempts,
            &progress,
            cancel,
        )
        .await
        {
            Ok(raw) => {
                let (answer, details) = parse_model_output(&raw);
                let confidence = estimate_confidence(&answer, &details);
                Extraction {
                    parameter: item.parameter,
                    answer,
                    details,
                    confidence,
                    page_numbers: request.page_numbers,
                }
            }
            Err(e) => {
                tracing::error!(parameter = %item.parameter, error = %e, "extraction failed");
                Extraction {
                    page_numbers: request.page_numbers,
                    ..Extraction::not_found(item.parameter)
                }
            }
        };

        progress(ProgressEvent::Extracted {
            index,
            total,
            extraction: Box::new(extraction.clone()),
        });
        extractions.push(extraction);
    }

    extractions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted client: pops one canned result per call.
    struct ScriptedClient {
        calls: AtomicUsize,
        script: Mutex<Vec<Result<String, LlmError>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ExtractionClient for ScriptedClient {
        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(LlmError::EmptyResponse));
            Box::pin(async move { next })
        }
    }

    fn request(parameter: Parameter) -> PromptRequest {
        PromptRequest {
            parameter,
            prompt: "prompt".to_string(),
            page_numbers: vec![2, 5],
        }
    }

    #[tokio::test]
    async fn empty_match_never_contacts_the_model() {
        let client = ScriptedClient::new(vec![]);
        let items = vec![BatchItem {
            parameter: Parameter::IdeaAuthor,
            request: None,
        }];

        let results =
            extract_batch(&client, items, 3, |_| {}, &CancellationToken::new()).await;

        assert_eq!(client.call_count(), 0);
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_found());
        assert!(results[0].page_numbers.is_empty());
    }

    #[tokio::test]
    async fn successful_extraction_carries_pages_and_confidence() {
        let client = ScriptedClient::new(vec![Ok(
            r#"{"answer": "עיריית חיפה", "details": "הרשות המזמינה של המכרז הנוכחי"}"#.to_string(),
        )]);
        let items = vec![BatchItem {
            parameter: Parameter::ClientName,
            request: Some(request(Parameter::ClientName)),
        }];

        let results =
            extract_batch(&client, items, 3, |_| {}, &CancellationToken::new()).await;

        assert!(results[0].is_found());
        assert_eq!(results[0].answer, "עיריית חיפה");
        assert_eq!(results[0].page_numbers, vec![2, 5]);
        assert!(results[0].confidence > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds() {
        // Script pops from the end: first call errors, second succeeds.
        let client = ScriptedClient::new(vec![
            Ok(r#"{"answer": "24 חודשים", "details": "תקופת ההתקשרות"}"#.to_string()),
            Err(LlmError::Status(500)),
        ]);
        let items = vec![BatchItem {
            parameter: Parameter::ContractPeriod,
            request: Some(request(Parameter::ContractPeriod)),
        }];

        let retried = AtomicUsize::new(0);
        let results = extract_batch(
            &client,
            items,
            3,
            |event| {
                if matches!(event, ProgressEvent::Retrying { .. }) {
                    retried.fetch_add(1, Ordering::SeqCst);
                }
            },
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(client.call_count(), 2);
        assert_eq!(retried.load(Ordering::SeqCst), 1);
        assert!(results[0].is_found());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_degrade_to_not_found() {
        let client = ScriptedClient::new(vec![
            Err(LlmError::Status(500)),
            Err(LlmError::Status(500)),
            Err(LlmError::Status(500)),
        ]);
        let items = vec![BatchItem {
            parameter: Parameter::BidGuarantee,
            request: Some(request(Parameter::BidGuarantee)),
        }];

        let results =
            extract_batch(&client, items, 3, |_| {}, &CancellationToken::new()).await;

        assert_eq!(client.call_count(), 3);
        assert!(!results[0].is_found());
        // Failed extraction keeps its page context for the report.
        assert_eq!(results[0].page_numbers, vec![2, 5]);
    }

    #[tokio::test]
    async fn cancelled_batch_degrades_remaining_items() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = ScriptedClient::new(vec![Ok("unused".to_string())]);
        let items = vec![BatchItem {
            parameter: Parameter::TenderName,
            request: Some(request(Parameter::TenderName)),
        }];

        let results = extract_batch(&client, items, 3, |_| {}, &cancel).await;

        assert_eq!(client.call_count(), 0);
        assert!(!results[0].is_found());
    }

    #[test]
    fn candidate_text_concatenates_parts() {
        let data: serde_json::Value = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "חלק א"}, {"text": " חלק ב"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(collect_candidate_text(&data), "חלק א חלק ב");
    }
}
