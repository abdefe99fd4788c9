use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pagecap_lib::output::{CacheAction, PAGECAP_OUTPUT_VERSION};
use pagecap_lib::{CaptureError, ErrorOutput, PagecapOutput, ProgressEvent};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &PagecapOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: CaptureError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = PagecapOutput::Error(ErrorOutput {
        version: PAGECAP_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is reserved for fatal errors; unsuccessful captures use 1.
    ExitCode::from(2)
}

/// Print one progress event to stderr.
pub fn render_progress(event: &ProgressEvent, colorize: bool) {
    eprintln!("{}", format_progress(event, colorize));
}

pub fn format_progress(event: &ProgressEvent, colorize: bool) -> String {
    let pct = color(&format!("[{:>3}%]", event.percent), "36", colorize);
    match (event.current_section, event.total_sections) {
        (Some(current), Some(total)) => {
            format!("{pct} {} ({current}/{total})", event.message)
        }
        _ => format!("{pct} {}", event.message),
    }
}

/// Write JSON output to file or stdout.
fn write_json_output(
    body: &PagecapOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &PagecapOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &PagecapOutput, colorize: bool) -> String {
    let status = |success: bool| {
        if success {
            color("OK", "32", colorize)
        } else {
            color("FAILED", "31", colorize)
        }
    };

    match body {
        PagecapOutput::Capture(out) => {
            let mut buf = String::new();
            let result = &out.result;
            let cached = if result.from_cache { " (cached)" } else { "" };
            writeln!(
                buf,
                "{} Capture of {}{}",
                status(result.success),
                result.metadata.url,
                cached
            )
            .ok();
            if let Some(error) = &result.error {
                writeln!(buf, "Error: {error}").ok();
            }
            writeln!(
                buf,
                "Viewport: {}x{}, page height {:.0}px",
                result.metadata.viewport_width,
                result.metadata.viewport_height,
                result.metadata.full_page_height
            )
            .ok();
            if let Some(path) = &result.full_page_path {
                writeln!(buf, "Full page: {}", path.display()).ok();
            }
            if !result.sections.is_empty() {
                writeln!(buf, "Sections ({}):", result.sections.len()).ok();
                for section in &result.sections {
                    let shot = section
                        .screenshot_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "-".to_string());
                    writeln!(
                        buf,
                        "- {:12} y={:<6.0} h={:<6.0} {}",
                        section.section_type.as_str(),
                        section.bounding_box.y,
                        section.bounding_box.height,
                        shot
                    )
                    .ok();
                }
            }
            if let Some(raw) = &result.raw_data {
                let colors: Vec<&str> = raw.colors.iter().take(5).map(|c| c.hex.as_str()).collect();
                if !colors.is_empty() {
                    writeln!(buf, "Top colors: {}", colors.join(", ")).ok();
                }
            }
            buf
        }
        PagecapOutput::Responsive(out) => {
            let mut buf = String::new();
            let result = &out.result;
            writeln!(
                buf,
                "{} Responsive capture of {}",
                status(result.success),
                result.metadata.url
            )
            .ok();
            if let Some(error) = &result.error {
                writeln!(buf, "Error: {error}").ok();
            }
            for summary in &result.metadata.viewports {
                writeln!(
                    buf,
                    "- {:8} {}x{}: {} sections, page height {:.0}px",
                    summary.name.as_str(),
                    summary.width,
                    summary.height,
                    summary.section_count,
                    summary.full_page_height
                )
                .ok();
            }
            for info in &result.sections {
                let classes = if info.design_classes.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", info.design_classes.join(" "))
                };
                writeln!(
                    buf,
                    "{} {}: {} diffs{}",
                    color(info.section.section_type.as_str(), "34", colorize),
                    info.section.id,
                    info.style_diffs.len(),
                    classes
                )
                .ok();
            }
            buf
        }
        PagecapOutput::Cache(out) => {
            let mut buf = String::new();
            let header = color("[CACHE]", "36", colorize);
            match out.action {
                CacheAction::Prune => {
                    writeln!(buf, "{header} Pruned {} entries", out.removed.unwrap_or(0)).ok();
                }
                CacheAction::Clear => {
                    writeln!(buf, "{header} Cleared {} entries", out.removed.unwrap_or(0)).ok();
                }
                CacheAction::Show | CacheAction::List => {
                    if out.entries.is_empty() {
                        writeln!(buf, "{header} No live entries").ok();
                    }
                    for entry in &out.entries {
                        writeln!(
                            buf,
                            "{header} {} captured {} expires {} ({} sections)",
                            entry.domain,
                            entry.captured_at.to_rfc3339(),
                            entry.expires_at.to_rfc3339(),
                            entry.sections.len()
                        )
                        .ok();
                    }
                }
            }
            buf
        }
        PagecapOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Exit code for a capture that ran to completion.
pub fn exit_code_for_capture(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagecap_lib::output::{CacheOutput, CaptureOutput};
    use pagecap_lib::progress::ProgressPhase;
    use pagecap_lib::types::CaptureMetadata;
    use pagecap_lib::{BoundingBox, CaptureResult, DetectedSection, SectionType};

    fn metadata() -> CaptureMetadata {
        CaptureMetadata {
            url: "https://example.com".into(),
            captured_at: Utc::now(),
            viewport_width: 1440,
            viewport_height: 900,
            full_page_height: 1800.0,
        }
    }

    #[test]
    fn exit_code_for_capture_maps_success() {
        assert_eq!(exit_code_for_capture(true), ExitCode::SUCCESS);
        assert_eq!(exit_code_for_capture(false), ExitCode::from(1));
    }

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let code = render_error(
            CaptureError::Config("boom".to_string()),
            OutputFormat::Json,
            None,
        );
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn format_pretty_lists_sections() {
        let mut hero = DetectedSection::new(
            "section-01",
            SectionType::Hero,
            BoundingBox::new(0.0, 80.0, 1440.0, 700.0),
        );
        hero.screenshot_path = Some(PathBuf::from("sections/01-hero.png"));
        let output = PagecapOutput::Capture(CaptureOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            website_id: "example".into(),
            result: CaptureResult {
                success: true,
                full_page_path: Some(PathBuf::from("full-page.png")),
                sections: vec![hero],
                metadata: metadata(),
                raw_data: None,
                error: None,
                from_cache: true,
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("OK Capture of https://example.com (cached)"));
        assert!(pretty.contains("Sections (1):"));
        assert!(pretty.contains("hero"));
        assert!(pretty.contains("sections/01-hero.png"));
    }

    #[test]
    fn format_pretty_reports_failed_capture() {
        let output = PagecapOutput::Capture(CaptureOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            website_id: "example".into(),
            result: CaptureResult::failure(metadata(), "navigation failed"),
        });
        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("FAILED Capture"));
        assert!(pretty.contains("Error: navigation failed"));
    }

    #[test]
    fn format_pretty_cache_counts() {
        let output = PagecapOutput::Cache(CacheOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            action: CacheAction::Prune,
            removed: Some(3),
            entries: vec![],
        });
        assert!(format_pretty(&output, false).contains("Pruned 3 entries"));
    }

    #[test]
    fn format_pretty_handles_errors() {
        let output = PagecapOutput::Error(ErrorOutput {
            version: PAGECAP_OUTPUT_VERSION.to_string(),
            message: Some("bad input".to_string()),
            error: pagecap_lib::error::ErrorPayload {
                category: pagecap_lib::error::ErrorCategory::Config,
                message: "bad input".to_string(),
                remediation: Some("check flags".to_string()),
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[ERROR] bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }

    #[test]
    fn progress_lines_show_section_counts() {
        let event = ProgressEvent {
            phase: ProgressPhase::Sections,
            percent: 70,
            message: "Capturing hero".into(),
            current_section: Some(2),
            total_sections: Some(3),
        };
        assert_eq!(format_progress(&event, false), "[ 70%] Capturing hero (2/3)");
    }
}
