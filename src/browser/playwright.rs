//! Playwright integration over a long-lived Node.js helper.
//!
//! The helper launches Chromium once, opens a single page and then answers
//! newline-delimited JSON requests on stdin (`{id, op, ...}`) with
//! `{id, ok, value|error}` lines on stdout. Node and Playwright availability
//! are checked before the helper is spawned.

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{BrowserLauncher, LaunchOptions, PageDriver, PageScript, ScreenshotRequest};
use crate::types::BoundingBox;
use crate::{CaptureError, Result, Viewport};

/// Helper script; argv is `[node, width, height, headlessFlag]`.
pub(crate) const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const [, width, height, headlessFlag] = process.argv;

function reply(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function describe(err) {
  return err && err.message ? err.message : String(err);
}

async function run() {
  let browser;
  let page;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    const context = await browser.newContext({
      viewport: { width: parseInt(width, 10), height: parseInt(height, 10) }
    });
    page = await context.newPage();
  } catch (err) {
    reply({ id: 0, ok: false, error: describe(err) });
    if (browser) await browser.close().catch(() => {});
    process.exit(1);
  }
  reply({ id: 0, ok: true, value: 'ready' });

  async function handle(request) {
    switch (request.op) {
      case 'goto':
        await page.goto(request.url, { waitUntil: 'load', timeout: request.timeoutMs });
        await page.waitForLoadState('networkidle', { timeout: Math.min(request.timeoutMs, 10000) }).catch(() => {});
        return null;
      case 'evaluate':
        return await page.evaluate(request.source);
      case 'viewport':
        await page.setViewportSize({ width: request.width, height: request.height });
        return null;
      case 'screenshot': {
        const options = { path: request.path, fullPage: request.fullPage };
        if (request.clip) options.clip = request.clip;
        await page.screenshot(options);
        return null;
      }
      case 'close':
        await browser.close();
        return null;
      default:
        throw new Error('unknown op ' + request.op);
    }
  }

  const lines = readline.createInterface({ input: process.stdin });
  let queue = Promise.resolve();
  lines.on('line', (line) => {
    queue = queue.then(async () => {
      let request;
      try {
        request = JSON.parse(line);
      } catch (err) {
        return;
      }
      try {
        const value = await handle(request);
        reply({ id: request.id, ok: true, value: value === undefined ? null : value });
      } catch (err) {
        reply({ id: request.id, ok: false, error: describe(err) });
      }
      if (request.op === 'close') process.exit(0);
    });
  });
  lines.on('close', async () => {
    await queue;
    await browser.close().catch(() => {});
    process.exit(0);
  });
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Extra time granted over a navigation's own timeout for the round-trip.
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: BridgeCommand<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum BridgeCommand<'a> {
    Goto {
        url: &'a str,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
    Evaluate {
        source: &'a str,
    },
    Viewport {
        width: u32,
        height: u32,
    },
    Screenshot {
        path: String,
        #[serde(rename = "fullPage")]
        full_page: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        clip: Option<BoundingBox>,
    },
    Close,
}

impl BridgeCommand<'_> {
    fn op(&self) -> &'static str {
        match self {
            BridgeCommand::Goto { .. } => "goto",
            BridgeCommand::Evaluate { .. } => "evaluate",
            BridgeCommand::Viewport { .. } => "viewport",
            BridgeCommand::Screenshot { .. } => "screenshot",
            BridgeCommand::Close => "close",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BridgeReply {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Launches a fresh Node helper (and so a fresh browser) per call.
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    node_command: String,
}

impl PlaywrightLauncher {
    pub fn new(node_command: impl Into<String>) -> Self {
        Self {
            node_command: node_command.into(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
        ensure_node_available(&self.node_command).await?;
        ensure_playwright_available(&self.node_command).await?;
        let session = PlaywrightSession::spawn(&self.node_command, options).await?;
        Ok(Box::new(session))
    }
}

/// One helper process driving one page.
pub struct PlaywrightSession {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    next_id: u64,
    command_timeout: Duration,
    closed: bool,
}

impl PlaywrightSession {
    async fn spawn(node_command: &str, options: &LaunchOptions) -> Result<Self> {
        let mut cmd = Command::new(node_command);
        cmd.arg("-e")
            .arg(BRIDGE_SCRIPT)
            .arg(options.viewport.width.to_string())
            .arg(options.viewport.height.to_string())
            .arg(if options.headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, node_command))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::browser("Playwright helper has no stdout pipe"))?;
        let stderr_task = child.stderr.take().map(|mut err| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = err.read_to_string(&mut buf).await;
                buf
            })
        });

        let mut session = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            stderr_task,
            next_id: 0,
            command_timeout: options.command_timeout,
            closed: false,
        };

        let ready = tokio::time::timeout(options.command_timeout, session.read_reply(0)).await;
        match ready {
            Ok(Ok(reply)) if reply.ok => {
                debug!(viewport = %options.viewport, headless = options.headless, "playwright helper ready");
                Ok(session)
            }
            Ok(Ok(reply)) => Err(map_playwright_status_error(
                "launch",
                reply.error.unwrap_or_default(),
            )),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CaptureError::timeout(
                "browser launch",
                options.command_timeout,
            )),
        }
    }

    async fn request(&mut self, command: BridgeCommand<'_>, limit: Duration) -> Result<Value> {
        if self.closed {
            return Err(CaptureError::browser("page is already closed"));
        }
        self.next_id += 1;
        let id = self.next_id;
        let op = command.op();
        let mut line = serde_json::to_string(&BridgeRequest { id, command })?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CaptureError::browser("Playwright helper stdin is closed"))?;
        if let Err(err) = stdin.write_all(line.as_bytes()).await {
            warn!(op, error = %err, "failed to write to playwright helper");
            return Err(self.exited("write").await);
        }
        let _ = stdin.flush().await;

        let started = Instant::now();
        let reply = match tokio::time::timeout(limit, self.read_reply(id)).await {
            Ok(reply) => reply?,
            Err(_) => return Err(CaptureError::timeout(op, started.elapsed())),
        };
        trace!(op, id, ok = reply.ok, "playwright reply");

        if reply.ok {
            return Ok(reply.value);
        }
        let message = reply.error.unwrap_or_else(|| "unknown error".to_string());
        Err(match op {
            "goto" => CaptureError::Navigation(message),
            "screenshot" => CaptureError::Screenshot(message),
            _ => map_playwright_status_error(op, message),
        })
    }

    /// Reads lines until the reply for `id` arrives. Stray output and late
    /// replies to timed-out requests are skipped.
    async fn read_reply(&mut self, id: u64) -> Result<BridgeReply> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => match serde_json::from_str::<BridgeReply>(&line) {
                    Ok(reply) if reply.id == id => return Ok(reply),
                    Ok(reply) => trace!(expected = id, got = reply.id, "skipping stale reply"),
                    Err(_) => trace!(%line, "ignoring helper output"),
                },
                Ok(None) => return Err(self.exited("read").await),
                Err(err) => return Err(CaptureError::Io(err)),
            }
        }
    }

    /// Builds the error for a helper that went away, using whatever it wrote
    /// to stderr.
    async fn exited(&mut self, stage: &str) -> CaptureError {
        self.closed = true;
        let status = match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            _ => "unknown".to_string(),
        };
        let stderr = match self.stderr_task.take() {
            Some(task) => tokio::time::timeout(CLOSE_TIMEOUT, task)
                .await
                .ok()
                .and_then(|joined| joined.ok())
                .unwrap_or_default(),
            None => String::new(),
        };
        debug!(stage, %status, "playwright helper exited");
        map_playwright_error(status, &stderr)
    }
}

#[async_trait]
impl PageDriver for PlaywrightSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.request(
            BridgeCommand::Goto {
                url,
                timeout_ms: timeout.as_millis() as u64,
            },
            timeout + NAVIGATION_GRACE,
        )
        .await
        .map(|_| ())
    }

    async fn evaluate(&mut self, script: &PageScript) -> Result<Value> {
        let limit = self.command_timeout;
        self.request(
            BridgeCommand::Evaluate {
                source: &script.source,
            },
            limit,
        )
        .await
        .map_err(|err| match err {
            CaptureError::Browser(msg) => {
                CaptureError::Browser(format!("probe '{}' failed: {}", script.name, msg))
            }
            other => other,
        })
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let limit = self.command_timeout;
        self.request(
            BridgeCommand::Viewport {
                width: viewport.width,
                height: viewport.height,
            },
            limit,
        )
        .await
        .map(|_| ())
    }

    async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<()> {
        let limit = self.command_timeout;
        self.request(
            BridgeCommand::Screenshot {
                path: request.path.to_string_lossy().into_owned(),
                full_page: request.full_page,
                clip: request.clip,
            },
            limit,
        )
        .await
        .map(|_| ())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Err(err) = self.request(BridgeCommand::Close, CLOSE_TIMEOUT).await {
            debug!(error = %err, "close request failed; killing helper");
        }
        self.closed = true;
        self.stdin = None;
        match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(_) => Ok(()),
            Err(_) => {
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}

/// Maps a spawn error to an appropriate CaptureError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> CaptureError {
    if err.kind() == io::ErrorKind::NotFound {
        CaptureError::Browser(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        CaptureError::Io(err)
    }
}

/// Maps helper stderr output to an appropriate CaptureError.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> CaptureError {
    let lower = stderr.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return CaptureError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`."
                .to_string(),
        );
    }

    if lower.contains("executable doesn't exist") {
        return CaptureError::Browser(format!(
            "Chromium executable for Playwright is missing: {}",
            stderr.trim()
        ));
    }

    CaptureError::Browser(format!(
        "Playwright helper exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Maps a failed helper reply to an appropriate CaptureError.
pub(crate) fn map_playwright_status_error(op: &str, message: String) -> CaptureError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        CaptureError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`."
                .to_string(),
        )
    } else if lower.contains("executable doesn't exist") {
        CaptureError::Browser(format!(
            "Chromium executable for Playwright is missing: {}",
            message
        ))
    } else {
        CaptureError::Browser(format!("Playwright {} failed: {}", op, message))
    }
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| CaptureError::timeout("node availability check", NODE_CHECK_TIMEOUT))?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(CaptureError::Browser(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures the Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            CaptureError::timeout("playwright availability check", NODE_CHECK_TIMEOUT)
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_playwright_error_handles_plain_stderr_missing_module() {
        let err = map_playwright_error("1", "Error: Cannot find module 'playwright'");
        match err {
            CaptureError::Browser(msg) => assert!(
                msg.contains("npm install playwright"),
                "expected npm install hint, got: {msg}"
            ),
            other => panic!("expected browser error, got {other:?}"),
        }
    }

    #[test]
    fn map_playwright_error_handles_non_json_missing_module() {
        let err = map_playwright_error(
            "exit status: 1",
            "Error: Cannot find module 'playwright'\n    at Module._resolveFilename",
        );
        let msg = format!("{}", err);
        assert!(
            msg.contains("Playwright npm package is missing"),
            "expected missing playwright hint, got: {msg}"
        );
    }

    #[test]
    fn missing_browser_binary_mentions_executable() {
        let err = map_playwright_status_error(
            "launch",
            "browserType.launch: Executable doesn't exist at /tmp/chromium".to_string(),
        );
        let payload = err.to_payload();
        assert!(payload
            .remediation
            .unwrap_or_default()
            .contains("npx playwright install chromium"));
    }

    #[test]
    fn status_error_preserves_other_messages() {
        let err = map_playwright_status_error("evaluate", "Target closed".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Playwright evaluate failed"));
        assert!(msg.contains("Target closed"));
    }

    #[test]
    fn requests_serialize_with_op_tag() {
        let request = BridgeRequest {
            id: 7,
            command: BridgeCommand::Goto {
                url: "https://example.com",
                timeout_ms: 30_000,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["op"], "goto");
        assert_eq!(json["timeoutMs"], 30_000);

        let shot = BridgeRequest {
            id: 8,
            command: BridgeCommand::Screenshot {
                path: "a.png".into(),
                full_page: true,
                clip: None,
            },
        };
        let json = serde_json::to_value(&shot).unwrap();
        assert_eq!(json["op"], "screenshot");
        assert_eq!(json["fullPage"], true);
        assert!(json.get("clip").is_none());

        let close = serde_json::to_value(&BridgeRequest {
            id: 9,
            command: BridgeCommand::Close,
        })
        .unwrap();
        assert_eq!(close["op"], "close");
    }

    #[test]
    fn replies_default_missing_fields() {
        let reply: BridgeReply = serde_json::from_str(r#"{"id":3,"ok":true}"#).unwrap();
        assert_eq!(reply.id, 3);
        assert!(reply.value.is_null());
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn ensure_node_available_fails_for_missing_binary() {
        let result = ensure_node_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ensure_playwright_available_fails_for_missing_binary() {
        let result = ensure_playwright_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }
}
