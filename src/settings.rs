use std::path::Path;
use std::time::Duration;

use pagecap_lib::{CaptureError, CaptureRequest, Config, Viewport};

use crate::cli::CaptureArgs;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct CaptureFlagSources {
    pub viewport: bool,
    pub max_retries: bool,
    pub page_timeout: bool,
}

impl CaptureFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            max_retries: flag_present(args, "--max-retries"),
            page_timeout: flag_present(args, "--page-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Builds a request whose options are set only for flags the user typed;
/// everything else falls through to the config.
pub fn build_request(
    args: &CaptureArgs,
    viewport: Option<Viewport>,
    flags: &CaptureFlagSources,
) -> CaptureRequest {
    let mut request = CaptureRequest::new(&args.website_id, &args.url);
    request.viewport = viewport.filter(|_| flags.viewport);
    request.max_retries = flags.max_retries.then_some(args.max_retries);
    request.page_timeout = flags
        .page_timeout
        .then(|| Duration::from_secs(args.page_timeout));
    request.skip_cache = args.skip_cache;
    request.headless = args.headed.then_some(false);
    request
}

/// Folds the config-level flags (`--out`, `--no-styles`) into the config.
pub fn apply_overrides(mut config: Config, args: &CaptureArgs) -> Config {
    if let Some(out) = &args.out {
        config.capture.output_dir = out.clone();
    }
    if args.no_styles {
        config.style.extract_styles = false;
    }
    config
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/pagecap/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, CaptureError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        CaptureError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        CaptureError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format the effective capture settings as a single-line string.
pub fn format_effective_config(
    config: &Config,
    request: &CaptureRequest,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let capture = &config.capture;
    let viewport = request.viewport.unwrap_or(capture.viewport);
    format!(
        "Effective config [{source}]: viewport={}, retries={}, page-timeout={}s, headless={}, out={}, styles={}, cache={} (ttl {}s, skip={})",
        viewport,
        request.max_retries.unwrap_or(capture.max_retries),
        request
            .page_timeout
            .unwrap_or(capture.page_timeout)
            .as_secs(),
        request.headless.unwrap_or(capture.headless),
        capture.output_dir.display(),
        config.style.extract_styles,
        config.cache.enabled,
        config.cache.ttl.as_secs(),
        request.skip_cache,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use std::path::PathBuf;

    fn args() -> CaptureArgs {
        CaptureArgs {
            url: "https://example.com".into(),
            website_id: "example".into(),
            out: None,
            max_retries: 3,
            page_timeout: 30,
            skip_cache: false,
            headed: false,
            no_styles: false,
            format: OutputFormat::Json,
            output: None,
        }
    }

    #[test]
    fn build_request_leaves_defaults_to_config() {
        let request = build_request(
            &args(),
            Some(Viewport::default()),
            &CaptureFlagSources::default(),
        );
        assert!(request.viewport.is_none());
        assert!(request.max_retries.is_none());
        assert!(request.page_timeout.is_none());
        assert!(request.headless.is_none());
        assert!(!request.skip_cache);
    }

    #[test]
    fn build_request_prefers_cli_when_flags_present() {
        let mut cli = args();
        cli.max_retries = 5;
        cli.page_timeout = 12;
        cli.headed = true;
        cli.skip_cache = true;
        let flags = CaptureFlagSources::from_args(&[
            "pagecap".to_string(),
            "--viewport=800x600".to_string(),
            "--max-retries".to_string(),
            "5".to_string(),
            "--page-timeout".to_string(),
            "12".to_string(),
        ]);
        let request = build_request(
            &cli,
            Some(Viewport {
                width: 800,
                height: 600,
            }),
            &flags,
        );
        assert_eq!(request.viewport.map(|v| v.width), Some(800));
        assert_eq!(request.max_retries, Some(5));
        assert_eq!(request.page_timeout, Some(Duration::from_secs(12)));
        assert_eq!(request.headless, Some(false));
        assert!(request.skip_cache);
    }

    #[test]
    fn overrides_touch_only_given_flags() {
        let config = apply_overrides(Config::default(), &args());
        assert_eq!(config.capture.output_dir, PathBuf::from("captures"));
        assert!(config.style.extract_styles);

        let mut cli = args();
        cli.out = Some(PathBuf::from("shots"));
        cli.no_styles = true;
        let config = apply_overrides(Config::default(), &cli);
        assert_eq!(config.capture.output_dir, PathBuf::from("shots"));
        assert!(!config.style.extract_styles);
    }

    #[test]
    fn load_config_wraps_validation_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pagecap.toml");
        std::fs::write(&path, "[capture]\nmax_retries = 0\n").expect("write config");
        let err = load_config(Some(&path)).expect_err("zero retries is invalid");
        assert!(matches!(err, CaptureError::Config(_)));
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn format_effective_config_includes_fields() {
        let mut request = CaptureRequest::new("example", "https://example.com");
        request.max_retries = Some(4);
        let summary =
            format_effective_config(&Config::default(), &request, Some(Path::new("pagecap.toml")));
        assert!(summary.contains("viewport=1440x900"));
        assert!(summary.contains("retries=4"));
        assert!(summary.contains("page-timeout=30s"));
        assert!(summary.contains("headless=true"));
        assert!(summary.contains("pagecap.toml"));
    }
}
