use crate::errors::AppError;
use crate::overlay;
use crate::reporter::AppReporter;
use crate::vision::{extract_text, ReadClient, ReadClientOptions};
use crate::AppResult;
use bytes::Bytes;
use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NO_TEXT_FALLBACK: &str = "No text was detected.";

pub struct ScanCommandResult {
    pub pages: usize,
    pub lines: usize,
    pub annotated_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScanCommandOptions {
    pub client_options: ReadClientOptions,
    pub output: Option<PathBuf>,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
}

impl ScanCommandOptions {
    pub fn new(
        client_options: ReadClientOptions,
        output: Option<PathBuf>,
        display_width: Option<u32>,
        display_height: Option<u32>,
    ) -> Self {
        ScanCommandOptions {
            client_options,
            output,
            display_width,
            display_height,
        }
    }
}

pub async fn command_scan(
    term: &Term,
    file: &Path,
    options: ScanCommandOptions,
) -> AppResult<ScanCommandResult> {
    let bold_style = Style::new().bold();
    term.write_line(
        format!(
            "Reading text from {}.",
            bold_style.apply_to(file.display())
        )
        .as_str(),
    )?;

    if !file.is_file() {
        return Err(AppError::InputFileNotFound {
            path: file.display().to_string(),
        });
    }
    let media_type = mime_guess::from_path(file).first_or_octet_stream();
    let data: Bytes = tokio::fs::read(file).await?.into();

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    progress_bar.set_message("Waiting for the Read operation...");
    progress_bar.enable_steady_tick(Duration::from_millis(120));
    let reporter = AppReporter::from(&progress_bar);

    reporter.report(format!(
        "1/4: Submitting {} ({}, {} bytes) to the Read API...",
        file.display(),
        media_type,
        data.len()
    ))?;

    let client = ReadClient::new(options.client_options.clone(), &reporter);
    let payload = client.analyze(data.clone()).await?;
    reporter.report("4/4: Read operation succeeded.")?;
    progress_bar.finish_and_clear();

    let (pages, lines, text) = match payload.pages() {
        Some(pages) if !pages.is_empty() => (
            pages.len(),
            pages.iter().map(|page| page.lines.len()).sum(),
            extract_text(pages),
        ),
        _ => (0, 0, NO_TEXT_FALLBACK.to_string()),
    };

    term.write_line(format!("\n{}\n", text).as_str())?;

    let annotated_path = if media_type.type_() == mime::IMAGE {
        let rendered = overlay::render_line_boxes(
            media_type,
            data,
            payload.pages().unwrap_or(&[]),
            options.display_width,
            options.display_height,
        )?;
        let output_path = options
            .output
            .unwrap_or_else(|| annotated_output_path(file));
        tokio::fs::write(&output_path, &rendered).await?;
        Some(output_path)
    } else {
        term.write_line(
            format!(
                "Skipping the box overlay: {} is not an image.",
                media_type
            )
            .as_str(),
        )?;
        None
    };

    Ok(ScanCommandResult {
        pages,
        lines,
        annotated_path,
    })
}

fn annotated_output_path(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let file_name = match file.extension() {
        Some(extension) => format!("{}.boxes.{}", stem, extension.to_string_lossy()),
        None => format!("{stem}.boxes"),
    };
    file.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::SubscriptionKey;
    use url::Url;

    fn test_options() -> ScanCommandOptions {
        ScanCommandOptions::new(
            ReadClientOptions::new(
                Url::parse("https://myresource.cognitiveservices.azure.com/").unwrap(),
                SubscriptionKey::new("key".to_string()),
            ),
            None,
            None,
            None,
        )
    }

    #[test]
    fn annotated_path_sits_next_to_the_input() {
        assert_eq!(
            annotated_output_path(Path::new("/tmp/scans/receipt.png")),
            PathBuf::from("/tmp/scans/receipt.boxes.png")
        );
        assert_eq!(
            annotated_output_path(Path::new("receipt")),
            PathBuf::from("receipt.boxes")
        );
    }

    #[tokio::test]
    async fn missing_input_file_fails_before_any_network_call() {
        let term = Term::stdout();
        let temp_dir = tempfile::TempDir::with_prefix("scan_command_tests").unwrap();
        let missing = temp_dir.path().join("does_not_exist.png");

        let result = command_scan(&term, &missing, test_options()).await;
        assert!(matches!(
            result,
            Err(AppError::InputFileNotFound { ref path }) if path.contains("does_not_exist.png")
        ));
    }
}
