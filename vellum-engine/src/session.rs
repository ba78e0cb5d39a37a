//! The live rendering engine: one headless browser process, one DevTools
//! connection, one ephemeral surface (tab) per render call.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{broadcast, Mutex};

use crate::cdp::{CdpEvent, Connection};
use crate::config::EngineConfig;
use crate::error::EngineError;

// A4 paper, in inches, matching the page size of every captured document.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

// How long the surface must stay free of in-flight resource loads before it
// counts as quiesced.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

const DEVTOOLS_BANNER: &str = "DevTools listening on ";

const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "google-chrome",
    "chrome",
];

const HEADLESS_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-gpu",
    "--no-first-run",
    "--no-default-browser-check",
    "--remote-debugging-port=0",
];

// ---------------------------------------------------------------------------
// Launch helpers
// ---------------------------------------------------------------------------

fn discover_binary(config: &EngineConfig) -> Result<PathBuf, EngineError> {
    if let Some(binary) = &config.binary {
        return Ok(binary.clone());
    }
    let path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path) {
        for name in BROWSER_CANDIDATES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(EngineError::unavailable(
        "no chromium/chrome binary found on PATH; set the engine binary explicitly",
    ))
}

/// Read the engine's stderr until it announces its DevTools endpoint.
/// Keeps draining stderr in the background afterwards so the engine never
/// blocks on a full pipe.
async fn scrape_devtools_endpoint(stderr: ChildStderr) -> Result<String, EngineError> {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::new();
    let mut endpoint: Option<String> = None;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| EngineError::unavailable(format!("failed to read engine output: {err}")))?
    {
        if let Some(pos) = line.find(DEVTOOLS_BANNER) {
            endpoint = Some(line[pos + DEVTOOLS_BANNER.len()..].trim().to_string());
            break;
        }
        if tail.len() == 8 {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    match endpoint {
        Some(url) => {
            tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });
            Ok(url)
        }
        None => {
            let context: Vec<String> = tail.into_iter().collect();
            Err(EngineError::unavailable(format!(
                "engine exited before announcing a devtools endpoint: {}",
                context.join(" | ")
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// EngineSession
// ---------------------------------------------------------------------------

/// One live connection to the embedded rendering engine.
///
/// Created by the manager on first demand, shared by every concurrent
/// render; each call gets its own isolated surface and discards it
/// unconditionally.
pub struct EngineSession {
    connection: Connection,
    child: Mutex<Option<Child>>,
    open_surfaces: AtomicUsize,
    quiescence_timeout: Duration,
    // Profile dir must outlive the engine process; removed on drop.
    _profile_dir: TempDir,
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("open_surfaces", &self.open_surfaces)
            .field("quiescence_timeout", &self.quiescence_timeout)
            .finish_non_exhaustive()
    }
}

impl EngineSession {
    /// Spawn the engine process with a non-interactive profile and connect
    /// to its DevTools endpoint. Every failure here is `EngineUnavailable`;
    /// a partially-started process is killed on the way out.
    pub(crate) async fn launch(config: &EngineConfig) -> Result<EngineSession, EngineError> {
        let binary = discover_binary(config)?;
        let profile_dir = TempDir::new().map_err(|err| {
            EngineError::unavailable(format!("failed to create engine profile dir: {err}"))
        })?;

        let mut command = Command::new(&binary);
        command
            .args(HEADLESS_ARGS)
            .arg(format!("--user-data-dir={}", profile_dir.path().display()))
            .args(&config.extra_args)
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(binary = %binary.display(), "starting rendering engine");

        let mut child = command.spawn().map_err(|err| {
            EngineError::unavailable(format!(
                "failed to spawn rendering engine '{}': {err}",
                binary.display()
            ))
        })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::unavailable("engine stderr was not captured"))?;

        let endpoint = tokio::time::timeout(config.startup_timeout, scrape_devtools_endpoint(stderr))
            .await
            .map_err(|_| {
                EngineError::unavailable(format!(
                    "engine did not announce a devtools endpoint within {:?}",
                    config.startup_timeout
                ))
            })??;

        let connection = Connection::open(&endpoint).await?;
        tracing::debug!(%endpoint, "rendering engine ready");

        Ok(EngineSession {
            connection,
            child: Mutex::new(Some(child)),
            open_surfaces: AtomicUsize::new(0),
            quiescence_timeout: config.quiescence_timeout,
            _profile_dir: profile_dir,
        })
    }

    /// Number of surfaces currently open on this engine.
    pub fn open_surfaces(&self) -> usize {
        self.open_surfaces.load(Ordering::SeqCst)
    }

    /// Render `markup` to paginated PDF bytes on a fresh, isolated surface.
    ///
    /// The surface is discarded on every exit path; a render either returns
    /// a complete byte stream or a typed error, never partial output.
    pub async fn render(&self, markup: &str) -> Result<Vec<u8>, EngineError> {
        let created = self
            .connection
            .command("Target.createTarget", json!({ "url": "about:blank" }), None)
            .await?;
        let target_id = created
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::failed("createTarget reply missing targetId"))?
            .to_string();
        self.open_surfaces.fetch_add(1, Ordering::SeqCst);

        let outcome = self.render_on_surface(&target_id, markup).await;

        if let Err(err) = self
            .connection
            .command("Target.closeTarget", json!({ "targetId": target_id }), None)
            .await
        {
            tracing::warn!(error = %err, target = %target_id, "failed to close rendering surface");
        }
        self.open_surfaces.fetch_sub(1, Ordering::SeqCst);

        outcome
    }

    async fn render_on_surface(
        &self,
        target_id: &str,
        markup: &str,
    ) -> Result<Vec<u8>, EngineError> {
        let attached = self
            .connection
            .command(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::failed("attachToTarget reply missing sessionId"))?
            .to_string();

        self.connection
            .command("Page.enable", json!({}), Some(&session_id))
            .await?;
        self.connection
            .command("Network.enable", json!({}), Some(&session_id))
            .await?;

        let frame_tree = self
            .connection
            .command("Page.getFrameTree", json!({}), Some(&session_id))
            .await?;
        let frame_id = frame_tree
            .pointer("/frameTree/frame/id")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::failed("getFrameTree reply missing main frame id"))?
            .to_string();

        // Subscribe before loading so no resource-load event slips past.
        let events = self.connection.events();

        self.connection
            .command(
                "Page.setDocumentContent",
                json!({ "frameId": frame_id, "html": markup }),
                Some(&session_id),
            )
            .await?;

        // The document shell bootstraps its styling runtime asynchronously;
        // capturing before the network quiesces yields an unstyled page.
        self.await_quiescence(events, &session_id).await?;

        let printed = self
            .connection
            .command(
                "Page.printToPDF",
                json!({
                    "paperWidth": A4_WIDTH_IN,
                    "paperHeight": A4_HEIGHT_IN,
                    "printBackground": true,
                }),
                Some(&session_id),
            )
            .await?;
        let data = printed
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::failed("printToPDF reply missing document payload"))?;

        BASE64
            .decode(data)
            .map_err(|err| EngineError::failed(format!("undecodable document payload: {err}")))
    }

    /// Block until no resource loads are in flight on the surface and it has
    /// stayed that way for [`NETWORK_IDLE_WINDOW`]. Exceeding the configured
    /// bound is `RenderTimeout`, distinct from every other render failure.
    async fn await_quiescence(
        &self,
        mut events: broadcast::Receiver<CdpEvent>,
        session_id: &str,
    ) -> Result<(), EngineError> {
        let timeout = self.quiescence_timeout;
        let mut closed = self.connection.closed();
        let wait = async {
            let mut inflight: HashSet<String> = HashSet::new();
            loop {
                if inflight.is_empty() {
                    match tokio::time::timeout(
                        NETWORK_IDLE_WINDOW,
                        next_network_event(&mut events, session_id),
                    )
                    .await
                    {
                        // Nothing started during the idle window: quiesced.
                        Err(_) => return Ok(()),
                        Ok(Err(err)) => return Err(err),
                        Ok(Ok(NetworkEvent::Started(id))) => {
                            inflight.insert(id);
                        }
                        Ok(Ok(NetworkEvent::Settled(_))) => {}
                    }
                } else {
                    match next_network_event(&mut events, session_id).await? {
                        NetworkEvent::Started(id) => {
                            inflight.insert(id);
                        }
                        NetworkEvent::Settled(id) => {
                            inflight.remove(&id);
                        }
                    }
                }
            }
        };
        tokio::time::timeout(timeout, async {
            tokio::select! {
                outcome = wait => outcome,
                // Engine death or shutdown: fail now rather than running out
                // the deadline.
                _ = closed.changed() => Err(EngineError::failed(
                    "devtools connection closed during quiescence wait",
                )),
            }
        })
        .await
        .map_err(|_| EngineError::RenderTimeout { timeout })?
    }

    /// Hard-stop the engine process and drop the connection. In-flight
    /// renders fail when the connection closes; nothing is drained.
    pub(crate) async fn close(&self) {
        self.connection.close();
        let mut child = self.child.lock().await;
        if let Some(mut child) = child.take() {
            if let Err(err) = child.kill().await {
                tracing::warn!(error = %err, "failed to kill rendering engine process");
            }
        }
    }
}

enum NetworkEvent {
    Started(String),
    Settled(String),
}

/// Next resource-load event for this surface's session.
async fn next_network_event(
    events: &mut broadcast::Receiver<CdpEvent>,
    session_id: &str,
) -> Result<NetworkEvent, EngineError> {
    loop {
        match events.recv().await {
            Ok(event) => {
                if event.session_id.as_deref() != Some(session_id) {
                    continue;
                }
                let Some(request_id) = event.params.get("requestId").and_then(Value::as_str)
                else {
                    continue;
                };
                match event.method.as_str() {
                    "Network.requestWillBeSent" => {
                        return Ok(NetworkEvent::Started(request_id.to_string()))
                    }
                    "Network.loadingFinished" | "Network.loadingFailed" => {
                        return Ok(NetworkEvent::Settled(request_id.to_string()))
                    }
                    _ => continue,
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "devtools event stream lagged during quiescence wait");
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(EngineError::failed(
                    "devtools event stream closed during quiescence wait",
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
