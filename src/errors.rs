use indicatif::style::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration value '{name}' is missing. Set it via CLI options or environment")]
    ConfigurationMissing { name: String },
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },
    #[error("The Vision API rejected the submission. HTTP status: {status}. {message}")]
    SubmissionRejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("The Vision API reported the read operation as failed: {message}")]
    ProcessingFailed { message: String },
    #[error("The read operation did not finish after {attempts} status checks")]
    PollTimeout { attempts: u32 },
    #[error("Input/output error")]
    InputOutputError(#[from] std::io::Error),
    #[error("HTTP client error:\n{0}")]
    HttpClientError(#[from] reqwest::Error),
    #[error("URL parse error:\n{0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("Image conversion error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
    #[error("System error: {message}")]
    SystemError { message: String },
}
