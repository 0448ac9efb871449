use crate::errors::AppError;
use crate::vision::{ReadClientOptions, SubscriptionKey};
use clap::*;
use std::path::PathBuf;
use url::Url;

pub const ENDPOINT_ENV_VAR: &str = "AZURE_VISION_ENDPOINT";
pub const API_KEY_ENV_VAR: &str = "AZURE_VISION_KEY";

#[derive(Parser, Debug)]
#[command(author, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    #[command(about = "Run Read OCR on an image or PDF and render the detected line boxes")]
    Scan {
        #[arg(help = "Image or PDF file to analyze, such as ./receipt.png")]
        file: PathBuf,

        #[arg(
            short = 'o',
            long,
            help = "Where to write the annotated image (default: <file>.boxes.<ext> next to the input)"
        )]
        output: Option<PathBuf>,

        #[arg(
            long,
            help = "Displayed width in pixels; the image and boxes are scaled to it (default: natural width)"
        )]
        display_width: Option<u32>,

        #[arg(
            long,
            help = "Displayed height in pixels; the image and boxes are scaled to it (default: natural height)"
        )]
        display_height: Option<u32>,

        #[command(flatten)]
        vision_args: VisionArgs,
    },
}

#[derive(Args, Debug, Clone)]
#[group(required = false)]
pub struct VisionArgs {
    #[arg(
        long,
        help = "Azure Vision endpoint base URL, such as https://myresource.cognitiveservices.azure.com/ (default: AZURE_VISION_ENDPOINT)"
    )]
    pub endpoint: Option<String>,

    #[arg(long, help = "Azure Vision subscription key (default: AZURE_VISION_KEY)")]
    pub api_key: Option<String>,
}

impl TryInto<ReadClientOptions> for VisionArgs {
    type Error = AppError;

    fn try_into(self) -> Result<ReadClientOptions, Self::Error> {
        let endpoint = required_config(self.endpoint, ENDPOINT_ENV_VAR)?;
        let api_key = required_config(self.api_key, API_KEY_ENV_VAR)?;
        // The analyze path is joined relative to the endpoint, so a
        // missing trailing slash must not eat the last path segment.
        let endpoint = if endpoint.ends_with('/') {
            endpoint
        } else {
            format!("{endpoint}/")
        };
        let endpoint_url = Url::parse(endpoint.as_str())?;
        Ok(ReadClientOptions::new(
            endpoint_url,
            SubscriptionKey::new(api_key),
        ))
    }
}

fn required_config(arg_value: Option<String>, env_name: &str) -> Result<String, AppError> {
    match arg_value.or_else(|| crate::config_env_var(env_name).ok()) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::ConfigurationMissing {
            name: env_name.to_string(),
        }),
    }
}

#[allow(unused_imports)]
mod tests {
    use super::*;
    use rvstruct::ValueStruct;

    #[test]
    fn empty_configuration_values_are_missing() {
        let args = VisionArgs {
            endpoint: Some("  ".to_string()),
            api_key: Some("key".to_string()),
        };
        let result: Result<ReadClientOptions, AppError> = args.try_into();
        assert!(matches!(
            result,
            Err(AppError::ConfigurationMissing { ref name }) if name == ENDPOINT_ENV_VAR
        ));
    }

    #[test]
    fn missing_api_key_is_reported_by_name() {
        let args = VisionArgs {
            endpoint: Some("https://myresource.cognitiveservices.azure.com/".to_string()),
            api_key: Some(String::new()),
        };
        let result: Result<ReadClientOptions, AppError> = args.try_into();
        assert!(matches!(
            result,
            Err(AppError::ConfigurationMissing { ref name }) if name == API_KEY_ENV_VAR
        ));
    }

    #[test]
    fn endpoint_gains_a_trailing_slash() -> Result<(), Box<dyn std::error::Error>> {
        let args = VisionArgs {
            endpoint: Some("https://myresource.cognitiveservices.azure.com".to_string()),
            api_key: Some("key".to_string()),
        };
        let options: ReadClientOptions = args.try_into()?;
        assert_eq!(
            options.endpoint.as_str(),
            "https://myresource.cognitiveservices.azure.com/"
        );
        assert_eq!(options.subscription_key.value(), "key");
        assert_eq!(
            options.max_poll_attempts,
            ReadClientOptions::DEFAULT_MAX_POLL_ATTEMPTS
        );
        Ok(())
    }
}
