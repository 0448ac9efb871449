use crate::errors::AppError;
use crate::AppResult;
use rvstruct::ValueStruct;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

mod read_client;
pub use read_client::*;

#[derive(Debug, Clone, ValueStruct)]
pub struct SubscriptionKey(String);

/// Status of an asynchronous Read operation. The service reports
/// `notStarted` and `running` while the job is in flight; anything
/// unrecognized is treated the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    Succeeded,
    Failed,
    NotStarted,
    #[serde(other)]
    Running,
}

/// Payload returned by the operation-location endpoint. Line results come
/// in one of two vendor shapes: `analyzeResult.readResults` (v3.x) or a
/// top-level `recognitionResults` (v2.x).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOperationResponse {
    pub status: OperationStatus,
    #[serde(default)]
    pub analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    pub recognition_results: Option<Vec<ReadPage>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub read_results: Vec<ReadPage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPage {
    #[serde(default)]
    pub lines: Vec<ReadLine>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadLine {
    pub text: String,
    #[serde(default)]
    pub bounding_box: Vec<f64>,
}

impl ReadOperationResponse {
    /// Normalizes the two vendor shapes into one page sequence.
    /// `None` means the payload carried neither shape, which the caller
    /// renders as a "no text" fallback rather than an error.
    pub fn pages(&self) -> Option<&[ReadPage]> {
        if let Some(ref analyze_result) = self.analyze_result {
            return Some(&analyze_result.read_results);
        }
        self.recognition_results.as_deref()
    }
}

/// Joins line texts with spaces within a page and pages with newlines.
pub fn extract_text(pages: &[ReadPage]) -> String {
    pages
        .iter()
        .map(|page| {
            page.lines
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixed-cadence poll loop: sleep `poll_interval`, fetch the operation
/// status, repeat up to `max_attempts` times. No backoff, no jitter.
/// The status fetch is injected so attempt accounting is testable
/// without a network.
pub async fn poll_until_terminal<F, Fut>(
    mut fetch_status: F,
    max_attempts: u32,
    poll_interval: Duration,
) -> AppResult<ReadOperationResponse>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<ReadOperationResponse>>,
{
    for attempt in 1..=max_attempts {
        tokio::time::sleep(poll_interval).await;
        let response = fetch_status(attempt).await?;
        match response.status {
            OperationStatus::Succeeded => return Ok(response),
            OperationStatus::Failed => {
                return Err(AppError::ProcessingFailed {
                    message: format!("terminal 'failed' status reported on attempt {attempt}"),
                })
            }
            OperationStatus::NotStarted | OperationStatus::Running => {}
        }
    }
    Err(AppError::PollTimeout {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn status_only(status: OperationStatus) -> ReadOperationResponse {
        ReadOperationResponse {
            status,
            analyze_result: None,
            recognition_results: None,
        }
    }

    fn page(line_texts: &[&str]) -> ReadPage {
        ReadPage {
            lines: line_texts
                .iter()
                .map(|text| ReadLine {
                    text: text.to_string(),
                    bounding_box: vec![],
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn poll_stops_on_success_attempt() -> Result<(), Box<dyn std::error::Error>> {
        let calls = AtomicU32::new(0);
        let response = poll_until_terminal(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                let status = if attempt >= 3 {
                    OperationStatus::Succeeded
                } else {
                    OperationStatus::Running
                };
                async move { Ok(status_only(status)) }
            },
            15,
            Duration::ZERO,
        )
        .await?;
        assert_eq!(response.status, OperationStatus::Succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn poll_times_out_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result = poll_until_terminal(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(status_only(OperationStatus::Running)) }
            },
            15,
            Duration::ZERO,
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 15);
        assert!(matches!(result, Err(AppError::PollTimeout { attempts: 15 })));
    }

    #[tokio::test]
    async fn poll_raises_processing_failed() {
        let result = poll_until_terminal(
            |attempt| {
                let status = if attempt >= 2 {
                    OperationStatus::Failed
                } else {
                    OperationStatus::NotStarted
                };
                async move { Ok(status_only(status)) }
            },
            15,
            Duration::ZERO,
        )
        .await;
        assert!(matches!(result, Err(AppError::ProcessingFailed { .. })));
    }

    #[tokio::test]
    async fn poll_propagates_transport_errors() {
        let result = poll_until_terminal(
            |_| async {
                Err(AppError::SystemError {
                    message: "connection reset".to_string(),
                })
            },
            15,
            Duration::ZERO,
        )
        .await;
        assert!(matches!(result, Err(AppError::SystemError { .. })));
    }

    #[test]
    fn status_parses_both_known_and_unknown_values() {
        let succeeded: OperationStatus = serde_json::from_str(r#""succeeded""#).unwrap();
        let failed: OperationStatus = serde_json::from_str(r#""failed""#).unwrap();
        let not_started: OperationStatus = serde_json::from_str(r#""notStarted""#).unwrap();
        let unknown: OperationStatus = serde_json::from_str(r#""somethingNew""#).unwrap();
        assert_eq!(succeeded, OperationStatus::Succeeded);
        assert_eq!(failed, OperationStatus::Failed);
        assert_eq!(not_started, OperationStatus::NotStarted);
        assert_eq!(unknown, OperationStatus::Running);
    }

    #[test]
    fn pages_prefers_analyze_result_shape() {
        let response = ReadOperationResponse {
            status: OperationStatus::Succeeded,
            analyze_result: Some(AnalyzeResult {
                read_results: vec![page(&["v3"])],
            }),
            recognition_results: Some(vec![page(&["v2"])]),
        };
        let pages = response.pages().unwrap();
        assert_eq!(pages[0].lines[0].text, "v3");
    }

    #[test]
    fn pages_falls_back_to_recognition_results_shape() {
        let response = ReadOperationResponse {
            status: OperationStatus::Succeeded,
            analyze_result: None,
            recognition_results: Some(vec![page(&["v2"])]),
        };
        let pages = response.pages().unwrap();
        assert_eq!(pages[0].lines[0].text, "v2");
    }

    #[test]
    fn pages_is_none_when_no_shape_is_present() {
        assert!(status_only(OperationStatus::Succeeded).pages().is_none());
    }

    #[test]
    fn extract_text_joins_lines_and_pages() {
        let pages = vec![page(&["line1a", "line1b"]), page(&["line2a", "line2b"])];
        assert_eq!(extract_text(&pages), "line1a line1b\nline2a line2b");
    }

    #[test]
    fn read_operation_response_parses_v3_payload() {
        let payload = r#"{
            "status": "succeeded",
            "createdDateTime": "2021-02-04T06:32:08Z",
            "analyzeResult": {
                "version": "3.2.0",
                "readResults": [
                    {
                        "page": 1,
                        "width": 338.0,
                        "height": 479.0,
                        "unit": "pixel",
                        "lines": [
                            {
                                "boundingBox": [25.0, 14.0, 318.0, 14.0, 318.0, 59.0, 25.0, 59.0],
                                "text": "NOTHING",
                                "words": []
                            }
                        ]
                    }
                ]
            }
        }"#;
        let response: ReadOperationResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.status, OperationStatus::Succeeded);
        let pages = response.pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines[0].text, "NOTHING");
        assert_eq!(pages[0].lines[0].bounding_box.len(), 8);
    }
}
