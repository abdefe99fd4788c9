use std::path::PathBuf;
use std::process::ExitCode;

use pagecap_lib::browser::launcher_for;
use pagecap_lib::output::{ResponsiveOutput, PAGECAP_OUTPUT_VERSION};
use pagecap_lib::{
    CaptureError, PagecapOutput, ResponsiveCaptureCoordinator, ResponsiveRequest, ViewportName,
};
use tracing::debug;

use super::stderr_progress;
use crate::cli::CaptureArgs;
use crate::formatting::{exit_code_for_capture, render_error, write_output};
use crate::settings::{
    apply_overrides, build_request, format_effective_config, load_config, CaptureFlagSources,
};

/// Run the responsive command.
pub async fn run_responsive(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    args: CaptureArgs,
    viewports: Vec<ViewportName>,
) -> ExitCode {
    let format = args.format;
    let output = args.output.clone();
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => apply_overrides(cfg, &args),
        Err(err) => return render_error(err, format, output),
    };
    let flags = CaptureFlagSources::from_args(raw_args);
    let request = ResponsiveRequest {
        capture: build_request(&args, None, &flags),
        viewports,
    };
    debug!(
        viewports = ?request.viewports,
        "{}",
        format_effective_config(&config, &request.capture, config_path.as_deref())
    );

    let launcher = match launcher_for(&config.browser) {
        Ok(launcher) => launcher,
        Err(err) => return render_error(err, format, output),
    };
    let coordinator = ResponsiveCaptureCoordinator::new(config, launcher);

    let (progress, printer) = stderr_progress();
    let result = coordinator.capture(&request, &progress).await;
    drop(progress);
    let _ = printer.await;

    let success = result.success;
    let body = PagecapOutput::Responsive(ResponsiveOutput {
        version: PAGECAP_OUTPUT_VERSION.to_string(),
        website_id: request.capture.website_id,
        result,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(CaptureError::Unknown(err.to_string()), format, output);
    }
    exit_code_for_capture(success)
}
