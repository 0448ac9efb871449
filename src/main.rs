use clap::Parser;
use console::{Style, Term};

use std::error::Error;

mod args;
use crate::commands::*;
use crate::errors::AppError;
use args::*;

mod reporter;

mod errors;

mod commands;

mod vision;

mod overlay;

pub type AppResult<T> = Result<T, AppError>;

pub fn config_env_var(name: &str) -> Result<String, String> {
    std::env::var(name).map_err(|e| format!("{}: {}", name, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let term = Term::stdout();
    let bold_style = Style::new().bold();

    term.write_line(
        format!(
            "{} v{}",
            bold_style.clone().green().apply_to("OCR Overlay"),
            bold_style.apply_to(env!("CARGO_PKG_VERSION"))
        )
        .as_str(),
    )?;

    let cli = CliArgs::parse();
    if let Err(err) = handle_args(cli, &term).await {
        term.write_line(
            format!(
                "{}: {}\nDetails: {:?}",
                bold_style.clone().red().apply_to("Error"),
                err,
                err.source()
            )
            .as_str(),
        )?;
    }

    Ok(())
}

async fn handle_args(cli: CliArgs, term: &Term) -> AppResult<()> {
    let bold_style = Style::new().bold();

    match cli.command {
        CliCommand::Scan {
            file,
            output,
            display_width,
            display_height,
            vision_args,
        } => {
            let options = ScanCommandOptions::new(
                vision_args.try_into()?,
                output,
                display_width,
                display_height,
            );
            let scan_result = command_scan(term, &file, options).await?;
            term.write_line(
                format!(
                    "{} lines detected across {} pages.",
                    bold_style.clone().green().apply_to(scan_result.lines),
                    bold_style.clone().green().apply_to(scan_result.pages),
                )
                .as_str(),
            )?;
            if let Some(annotated_path) = scan_result.annotated_path {
                term.write_line(
                    format!(
                        "Annotated image written to {}.",
                        bold_style.apply_to(annotated_path.display())
                    )
                    .as_str(),
                )?;
            }
        }
    }

    Ok(())
}
