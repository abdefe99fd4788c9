use std::path::PathBuf;
use std::process::ExitCode;

use pagecap_lib::output::{CacheAction, CacheOutput, PAGECAP_OUTPUT_VERSION};
use pagecap_lib::{normalize_domain, Cache, PagecapOutput};

use crate::cli::{CacheCommand, OutputFormat};
use crate::formatting::{render_error, write_output};
use crate::settings::load_config;

/// Run a cache maintenance command.
pub fn run_cache(config_path: Option<PathBuf>, action: CacheCommand, format: OutputFormat) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, None),
    };
    let cache = Cache::new(&config.cache);

    let outcome = match action {
        CacheCommand::Prune => cache
            .prune()
            .map(|removed| cache_output(CacheAction::Prune, Some(removed), Vec::new())),
        CacheCommand::Clear => cache
            .clear()
            .map(|removed| cache_output(CacheAction::Clear, Some(removed), Vec::new())),
        CacheCommand::List => cache
            .entries()
            .map(|entries| cache_output(CacheAction::List, None, entries)),
        CacheCommand::Show { domain } => {
            let url = as_url(&domain);
            normalize_domain(&url).map(|_| {
                let entries = cache.get(&url).into_iter().collect();
                cache_output(CacheAction::Show, None, entries)
            })
        }
    };

    let body = match outcome {
        Ok(body) => body,
        Err(err) => return render_error(err, format, None),
    };
    if let Err(err) = write_output(&body, format, None) {
        eprintln!("Failed to write cache output: {err}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

fn cache_output(
    action: CacheAction,
    removed: Option<usize>,
    entries: Vec<pagecap_lib::CacheEntry>,
) -> PagecapOutput {
    PagecapOutput::Cache(CacheOutput {
        version: PAGECAP_OUTPUT_VERSION.to_string(),
        action,
        removed,
        entries,
    })
}

/// Bare domains are accepted alongside full URLs.
fn as_url(domain: &str) -> String {
    if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}
