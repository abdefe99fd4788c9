//! Domain-keyed capture cache.
//!
//! Entries are JSON files named after the normalized domain. Reads are
//! best-effort: a missing, corrupt or expired entry is a miss. Concurrent
//! captures of the same domain may race on writes; the last writer wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::CacheConfig;
use crate::types::{CaptureMetadata, CaptureResult, DetectedSection, RawPageData};
use crate::{CaptureError, Result};

const ENTRY_SUFFIX: &str = ".json";
const TOKENS_SUFFIX: &str = ".tokens.json";

/// Lowercased host without a leading `www.`; ports are kept.
pub fn normalize_domain(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CaptureError::Config(format!(
            "only http(s) URLs can be captured, got '{}'",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| CaptureError::Config(format!("URL '{raw}' has no host")))?
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub domain: String,
    pub captured_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub full_page_path: Option<PathBuf>,
    #[serde(default)]
    pub sections: Vec<DetectedSection>,
    pub metadata: CaptureMetadata,
    #[serde(default)]
    pub raw_data: Option<RawPageData>,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn into_result(self) -> CaptureResult {
        CaptureResult {
            success: true,
            full_page_path: self.full_page_path,
            sections: self.sections,
            metadata: self.metadata,
            raw_data: self.raw_data,
            error: None,
            from_cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenEntry<T> {
    domain: String,
    expires_at: DateTime<Utc>,
    tokens: T,
}

#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
    token_ttl: Duration,
    enabled: bool,
}

impl Cache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            ttl: config.ttl,
            token_ttl: config.token_ttl,
            enabled: config.enabled,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn file_stem(domain: &str) -> String {
        domain.replace([':', '/', '\\'], "_")
    }

    fn entry_path(&self, domain: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", Self::file_stem(domain), ENTRY_SUFFIX))
    }

    fn tokens_path(&self, domain: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", Self::file_stem(domain), TOKENS_SUFFIX))
    }

    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.get_at(url, Utc::now())
    }

    /// Looks up a live entry for the URL's domain as of `now`.
    pub fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        let domain = normalize_domain(url).ok()?;
        let entry: CacheEntry = read_json(&self.entry_path(&domain))?;
        if entry.is_expired_at(now) {
            debug!(%domain, expired_at = %entry.expires_at, "cache entry expired");
            return None;
        }
        Some(entry)
    }

    pub fn put(&self, url: &str, result: &CaptureResult) -> Result<()> {
        self.put_at(url, result, Utc::now())
    }

    pub fn put_at(&self, url: &str, result: &CaptureResult, now: DateTime<Utc>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let domain = normalize_domain(url)?;
        let entry = CacheEntry {
            domain: domain.clone(),
            captured_at: now,
            expires_at: now + chrono_duration(self.ttl)?,
            full_page_path: result.full_page_path.clone(),
            sections: result.sections.clone(),
            metadata: result.metadata.clone(),
            raw_data: result.raw_data.clone(),
        };
        write_json(&self.entry_path(&domain), &entry)?;
        debug!(%domain, expires_at = %entry.expires_at, "cached capture");
        Ok(())
    }

    /// Design-token payloads, kept for the longer token TTL.
    pub fn get_tokens<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let domain = normalize_domain(url).ok()?;
        let entry: TokenEntry<T> = read_json(&self.tokens_path(&domain))?;
        (Utc::now() < entry.expires_at).then_some(entry.tokens)
    }

    pub fn put_tokens<T: Serialize>(&self, url: &str, tokens: &T) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let domain = normalize_domain(url)?;
        let entry = TokenEntry {
            domain: domain.clone(),
            expires_at: Utc::now() + chrono_duration(self.token_ttl)?,
            tokens,
        };
        write_json(&self.tokens_path(&domain), &entry)
    }

    /// Every readable capture entry, expired ones included.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries: Vec<CacheEntry> = self
            .json_files()?
            .into_iter()
            .filter(|path| !is_tokens_file(path))
            .filter_map(|path| read_json(&path))
            .collect();
        entries.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(entries)
    }

    pub fn prune(&self) -> Result<usize> {
        self.prune_at(Utc::now())
    }

    /// Removes expired and unreadable entries; returns how many went.
    pub fn prune_at(&self, now: DateTime<Utc>) -> Result<usize> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Expiry {
            expires_at: DateTime<Utc>,
        }

        let mut removed = 0;
        for path in self.json_files()? {
            let stale = read_json::<Expiry>(&path).map_or(true, |e| now >= e.expires_at);
            if stale {
                fs::remove_file(&path)
                    .map_err(|e| CaptureError::Cache(format!("{}: {}", path.display(), e)))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize> {
        let files = self.json_files()?;
        for path in &files {
            fs::remove_file(path)
                .map_err(|e| CaptureError::Cache(format!("{}: {}", path.display(), e)))?;
        }
        Ok(files.len())
    }

    fn json_files(&self) -> Result<Vec<PathBuf>> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CaptureError::Cache(format!(
                    "{}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };
        let mut files = Vec::new();
        for item in dir {
            let path = item?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_tokens_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TOKENS_SUFFIX))
}

fn chrono_duration(ttl: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(ttl)
        .map_err(|e| CaptureError::Config(format!("cache ttl out of range: {e}")))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable cache file");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache file ignored");
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CaptureError::Cache(format!("{}: {}", parent.display(), e)))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).map_err(|e| CaptureError::Cache(format!("{}: {}", path.display(), e)))
}
