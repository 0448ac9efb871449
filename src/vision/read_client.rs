use bytes::Bytes;
use rvstruct::ValueStruct;
use url::Url;

use crate::errors::AppError;
use crate::reporter::AppReporter;
use crate::vision::{poll_until_terminal, ReadOperationResponse, SubscriptionKey};
use crate::AppResult;

const READ_ANALYZE_PATH: &str = "vision/v3.2/read/analyze";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "operation-location";

#[derive(Debug, Clone)]
pub struct ReadClientOptions {
    pub endpoint: Url,
    pub subscription_key: SubscriptionKey,
    pub max_poll_attempts: u32,
    pub poll_interval: std::time::Duration,
}

impl ReadClientOptions {
    pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 15;
    pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3);

    pub fn new(endpoint: Url, subscription_key: SubscriptionKey) -> Self {
        Self {
            endpoint,
            subscription_key,
            max_poll_attempts: Self::DEFAULT_MAX_POLL_ATTEMPTS,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Clone)]
pub struct ReadClient<'a> {
    client: reqwest::Client,
    options: ReadClientOptions,
    reporter: &'a AppReporter<'a>,
}

impl<'a> ReadClient<'a> {
    pub fn new(options: ReadClientOptions, reporter: &'a AppReporter<'a>) -> Self {
        let client = reqwest::Client::new();
        Self {
            client,
            options,
            reporter,
        }
    }

    /// Submits the raw file bytes for analysis. The service acknowledges
    /// with HTTP 202 and an operation-location header pointing at the
    /// status endpoint; anything else is a rejected submission.
    pub async fn submit(&self, data: Bytes) -> AppResult<Url> {
        let analyze_url = self.options.endpoint.join(READ_ANALYZE_PATH)?;
        tracing::debug!("Submitting {} bytes to {}", data.len(), analyze_url);
        let response = self
            .client
            .post(analyze_url)
            .header(
                SUBSCRIPTION_KEY_HEADER,
                self.options.subscription_key.value(),
            )
            .header(
                reqwest::header::CONTENT_TYPE,
                mime::APPLICATION_OCTET_STREAM.as_ref(),
            )
            .body(data)
            .send()
            .await?;

        let response_status = response.status();
        if response_status != reqwest::StatusCode::ACCEPTED {
            let response_body = response.json::<serde_json::Value>().await.ok();
            return Err(AppError::SubmissionRejected {
                status: response_status,
                message: rejection_message(response_status, response_body.as_ref()),
            });
        }

        let operation_location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|value| value.to_str().ok());
        operation_location_url(response_status, operation_location)
    }

    pub async fn fetch_status(&self, operation_location: &Url) -> AppResult<ReadOperationResponse> {
        let response = self
            .client
            .get(operation_location.clone())
            .header(
                SUBSCRIPTION_KEY_HEADER,
                self.options.subscription_key.value(),
            )
            .send()
            .await?
            .error_for_status()?;
        let operation: ReadOperationResponse = response.json().await?;
        tracing::debug!("Operation status: {:?}", operation.status);
        Ok(operation)
    }

    /// Full submit-then-poll flow with the fixed 15 x 3s cadence.
    pub async fn analyze(&self, data: Bytes) -> AppResult<ReadOperationResponse> {
        let operation_location = self.submit(data).await?;
        self.reporter.report(format!(
            "2/4: Submission accepted. Polling {operation_location}"
        ))?;

        let max_attempts = self.options.max_poll_attempts;
        let operation_location = &operation_location;
        poll_until_terminal(
            |attempt| async move {
                self.reporter.report(format!(
                    "3/4: Attempt {attempt}/{max_attempts}: checking operation status..."
                ))?;
                self.fetch_status(operation_location).await
            },
            max_attempts,
            self.options.poll_interval,
        )
        .await
    }
}

/// Pulls a human-readable reason out of a rejection body. The service
/// nests it under `error.message`, some gateway errors put it at the top
/// level, and some responses carry no JSON body at all.
fn rejection_message(
    status: reqwest::StatusCode,
    body: Option<&serde_json::Value>,
) -> String {
    body.and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.pointer("/message"))
            .and_then(|message| message.as_str())
            .map(|message| message.to_string())
    })
    .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string())
}

/// A 202 without a parsable operation-location header cannot be polled,
/// so it counts as a rejected submission rather than proceeding with a
/// null status URL.
fn operation_location_url(status: reqwest::StatusCode, header: Option<&str>) -> AppResult<Url> {
    match header {
        Some(value) => Url::parse(value).map_err(|e| AppError::SubmissionRejected {
            status,
            message: format!("Invalid {OPERATION_LOCATION_HEADER} header: {e}"),
        }),
        None => Err(AppError::SubmissionRejected {
            status,
            message: format!("Response is missing the {OPERATION_LOCATION_HEADER} header"),
        }),
    }
}

#[allow(unused_imports)]
mod tests {
    use super::*;
    use crate::vision::OperationStatus;
    use console::Term;

    #[test]
    fn rejection_message_prefers_nested_error_shape() {
        let body = serde_json::json!({
            "error": { "code": "InvalidImageSize", "message": "Input image is too large." }
        });
        assert_eq!(
            rejection_message(reqwest::StatusCode::BAD_REQUEST, Some(&body)),
            "Input image is too large."
        );
    }

    #[test]
    fn rejection_message_accepts_top_level_shape() {
        let body = serde_json::json!({ "message": "Access denied." });
        assert_eq!(
            rejection_message(reqwest::StatusCode::UNAUTHORIZED, Some(&body)),
            "Access denied."
        );
    }

    #[test]
    fn rejection_message_falls_back_to_status_reason() {
        assert_eq!(
            rejection_message(reqwest::StatusCode::SERVICE_UNAVAILABLE, None),
            "Service Unavailable"
        );
    }

    #[test]
    fn missing_operation_location_is_a_rejection() {
        let result = operation_location_url(reqwest::StatusCode::ACCEPTED, None);
        assert!(matches!(
            result,
            Err(AppError::SubmissionRejected {
                status: reqwest::StatusCode::ACCEPTED,
                ..
            })
        ));
    }

    #[test]
    fn unparsable_operation_location_is_a_rejection() {
        let result = operation_location_url(reqwest::StatusCode::ACCEPTED, Some("not a url"));
        assert!(matches!(result, Err(AppError::SubmissionRejected { .. })));
    }

    #[test]
    fn operation_location_parses_into_url() -> Result<(), Box<dyn std::error::Error>> {
        let url = operation_location_url(
            reqwest::StatusCode::ACCEPTED,
            Some("https://westeurope.api.cognitive.microsoft.com/vision/v3.2/read/analyzeResults/abc-123"),
        )?;
        assert_eq!(url.path(), "/vision/v3.2/read/analyzeResults/abc-123");
        Ok(())
    }

    #[test]
    fn analyze_url_joins_endpoint_base() -> Result<(), Box<dyn std::error::Error>> {
        let endpoint = Url::parse("https://myresource.cognitiveservices.azure.com/")?;
        let analyze_url = endpoint.join(READ_ANALYZE_PATH)?;
        assert_eq!(
            analyze_url.as_str(),
            "https://myresource.cognitiveservices.azure.com/vision/v3.2/read/analyze"
        );
        Ok(())
    }

    #[tokio::test]
    #[cfg_attr(not(feature = "ci-azure-vision"), ignore)]
    async fn analyze_live_test() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let term = Term::stdout();
        let reporter: AppReporter = AppReporter::from(&term);
        let endpoint: Url = Url::parse(
            std::env::var("TEST_AZURE_VISION_ENDPOINT")
                .expect("TEST_AZURE_VISION_ENDPOINT required")
                .as_str(),
        )?;
        let subscription_key = SubscriptionKey::new(
            std::env::var("TEST_AZURE_VISION_KEY").expect("TEST_AZURE_VISION_KEY required"),
        );
        let test_image = std::env::var("TEST_AZURE_VISION_IMAGE").expect("TEST_AZURE_VISION_IMAGE required");
        let data: Bytes = tokio::fs::read(test_image).await?.into();

        let client = ReadClient::new(ReadClientOptions::new(endpoint, subscription_key), &reporter);
        let payload = client.analyze(data).await?;

        assert_eq!(payload.status, OperationStatus::Succeeded);
        assert!(payload.pages().is_some());
        Ok(())
    }
}
