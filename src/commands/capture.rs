use std::path::PathBuf;
use std::process::ExitCode;

use pagecap_lib::browser::launcher_for;
use pagecap_lib::output::{CaptureOutput, PAGECAP_OUTPUT_VERSION};
use pagecap_lib::{CaptureError, CaptureOrchestrator, PagecapOutput, Viewport};
use tracing::debug;

use super::stderr_progress;
use crate::cli::CaptureArgs;
use crate::formatting::{exit_code_for_capture, render_error, write_output};
use crate::settings::{
    apply_overrides, build_request, format_effective_config, load_config, CaptureFlagSources,
};

/// Run the capture command.
pub async fn run_capture(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    args: CaptureArgs,
    viewport: Viewport,
) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => apply_overrides(cfg, &args),
        Err(err) => return render_error(err, format, output),
    };
    let flags = CaptureFlagSources::from_args(raw_args);
    let request = build_request(&args, Some(viewport), &flags);
    debug!(
        "{}",
        format_effective_config(&config, &request, config_path.as_deref())
    );

    let launcher = match launcher_for(&config.browser) {
        Ok(launcher) => launcher,
        Err(err) => return render_error(err, format, output),
    };
    let orchestrator = CaptureOrchestrator::new(config, launcher);

    let (progress, printer) = stderr_progress();
    let result = orchestrator.capture(&request, &progress).await;
    drop(progress);
    let _ = printer.await;

    let success = result.success;
    let body = PagecapOutput::Capture(CaptureOutput {
        version: PAGECAP_OUTPUT_VERSION.to_string(),
        website_id: request.website_id,
        result,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(CaptureError::Unknown(err.to_string()), format, output);
    }
    exit_code_for_capture(success)
}
