use clap::{Parser, Subcommand, ValueEnum};
use pagecap_lib::{Viewport, ViewportName};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagecap")]
#[command(
    version,
    about = "Page Capture - Reverse-engineer live webpages into typed sections",
    long_about = "Page Capture (pagecap)\n\nModes:\n- capture: stabilize a page, detect its sections, screenshot each one and extract styles.\n- responsive: the same at mobile/tablet/desktop widths, with breakpoint style diffs.\n- cache: inspect or maintain the domain-keyed capture cache.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML); CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

/// Flags shared by `capture` and `responsive`.
#[derive(clap::Args, Debug, Clone)]
pub struct CaptureArgs {
    #[arg(long, help = "Page URL (http or https)")]
    pub url: String,

    #[arg(long, help = "Identifier for the artifact directory")]
    pub website_id: String,

    #[arg(long, value_name = "DIR", help = "Artifact base directory")]
    pub out: Option<PathBuf>,

    #[arg(long, default_value = "3", help = "Attempts for launch, load and screenshots")]
    pub max_retries: u32,

    #[arg(
        long,
        default_value = "30",
        value_name = "SECONDS",
        help = "Navigation timeout per attempt"
    )]
    pub page_timeout: u64,

    #[arg(long, help = "Ignore cached results (the fresh result is still cached)")]
    pub skip_cache: bool,

    #[arg(long, help = "Show the browser window")]
    pub headed: bool,

    #[arg(long, help = "Skip computed-style extraction")]
    pub no_styles: bool,

    #[arg(long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, short, help = "Output file path (stdout if omitted)")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a page's sections at a single viewport
    Capture {
        #[command(flatten)]
        args: CaptureArgs,

        #[arg(
            long,
            default_value = "1440x900",
            help = "Viewport dimensions (WIDTHxHEIGHT)"
        )]
        viewport: Viewport,
    },

    /// Capture a page at several viewports and diff section styles
    Responsive {
        #[command(flatten)]
        args: CaptureArgs,

        #[arg(
            long,
            value_delimiter = ',',
            default_value = "mobile,tablet,desktop",
            help = "Viewports to capture (mobile,tablet,desktop)"
        )]
        viewports: Vec<ViewportName>,
    },

    /// Inspect or maintain the capture cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,

        #[arg(long, value_enum, default_value = "json", help = "Output format", global = true)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommand {
    /// Remove expired and unreadable entries
    Prune,
    /// Remove every entry
    Clear,
    /// List live entries
    List,
    /// Print the live entry for a domain or URL
    Show { domain: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_command_uses_defaults() {
        let cli = Cli::parse_from([
            "pagecap",
            "capture",
            "--url",
            "https://example.com",
            "--website-id",
            "example",
        ]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Capture { args, viewport } => {
                assert_eq!(args.url, "https://example.com");
                assert_eq!(args.website_id, "example");
                assert!(args.out.is_none());
                assert_eq!(args.max_retries, 3);
                assert_eq!(args.page_timeout, 30);
                assert!(!args.skip_cache);
                assert!(!args.headed);
                assert!(!args.no_styles);
                assert!(matches!(args.format, OutputFormat::Json));
                assert!(args.output.is_none());
                assert_eq!(viewport.width, 1440);
                assert_eq!(viewport.height, 900);
            }
            _ => panic!("expected capture command"),
        }
    }

    #[test]
    fn capture_command_respects_overrides() {
        let cli = Cli::parse_from([
            "pagecap",
            "--verbose",
            "capture",
            "--url",
            "https://example.com",
            "--website-id",
            "example",
            "--out",
            "shots",
            "--viewport",
            "1280x720",
            "--max-retries",
            "5",
            "--page-timeout",
            "12",
            "--skip-cache",
            "--headed",
            "--no-styles",
            "--format",
            "pretty",
            "--output",
            "result.json",
            "--config",
            "pagecap.toml",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("pagecap.toml")));
        match cli.command {
            Commands::Capture { args, viewport } => {
                assert_eq!(args.out.as_deref(), Some(std::path::Path::new("shots")));
                assert_eq!(viewport.width, 1280);
                assert_eq!(viewport.height, 720);
                assert_eq!(args.max_retries, 5);
                assert_eq!(args.page_timeout, 12);
                assert!(args.skip_cache);
                assert!(args.headed);
                assert!(args.no_styles);
                assert!(matches!(args.format, OutputFormat::Pretty));
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("result.json")));
            }
            _ => panic!("expected capture command with overrides"),
        }
    }

    #[test]
    fn responsive_command_parses_viewport_list() {
        let cli = Cli::parse_from([
            "pagecap",
            "responsive",
            "--url",
            "https://example.com",
            "--website-id",
            "example",
            "--viewports",
            "desktop,mobile",
        ]);
        match cli.command {
            Commands::Responsive { viewports, .. } => {
                assert_eq!(viewports, vec![ViewportName::Desktop, ViewportName::Mobile]);
            }
            _ => panic!("expected responsive command"),
        }
    }

    #[test]
    fn responsive_defaults_to_all_viewports() {
        let cli = Cli::parse_from([
            "pagecap",
            "responsive",
            "--url",
            "https://example.com",
            "--website-id",
            "example",
        ]);
        match cli.command {
            Commands::Responsive { viewports, .. } => {
                assert_eq!(viewports, ViewportName::ALL.to_vec());
            }
            _ => panic!("expected responsive command"),
        }
    }

    #[test]
    fn cache_show_takes_domain() {
        let cli = Cli::parse_from(["pagecap", "cache", "show", "example.com"]);
        match cli.command {
            Commands::Cache {
                action: CacheCommand::Show { domain },
                format,
            } => {
                assert_eq!(domain, "example.com");
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected cache show"),
        }
    }
}
