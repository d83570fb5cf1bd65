//! Live-reload proxy session.
//!
//! The dev session fronts the application server with a reverse proxy:
//! requests hit this listener, get forwarded to the configured target at
//! `127.0.0.1:<port>`, and HTML responses come back with a small reload
//! script injected. The script connects to the [`crate::reload`] hub, so
//! recompiled stylesheets swap in without a full page reload.
//!
//! ```text
//! ┌─────────┐   http    ┌──────────────┐   http    ┌─────────────┐
//! │ Browser │──────────►│ SyncSession  │──────────►│ App server  │
//! │         │◄──────────│ (this module)│◄──────────│ (proxy tgt) │
//! └────┬────┘  injected └──────────────┘           └─────────────┘
//!      │ ws
//!      ▼
//!  ReloadHub ◄── notify_css() from the compiler
//! ```
//!
//! Without a proxy target, the sync step only mirrors already-present
//! theme files into the output directory once.

use crate::{
    config::Config,
    log,
    reload::ReloadHub,
    watch,
};
use anyhow::{Context, Result, anyhow, bail};
use std::{
    fs,
    io::Read,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    thread,
};
use tiny_http::{Header, Request, Response, Server};

/// Script tag injected into proxied HTML pages.
const RELOAD_SNIPPET: &str = concat!("<script>", include_str!("embed/reload.js"), "</script>");

/// Local port the proxy session listens on.
const SESSION_PORT: u16 = 3000;

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Pipeline Sync Step
// ============================================================================

/// The sync step of the default pipeline: mirror leftover theme files
/// into the output once, then open the proxy session when a target is
/// configured. Returns the session so the caller can block on it after
/// the remaining pipeline stages.
pub fn sync(config: &'static Config) -> Result<Option<SyncSession>> {
    let copied = copy_prebuilt_themes(config)?;
    if copied > 0 {
        log!("serve"; "mirrored {copied} prebuilt theme files");
    }

    match config.proxy {
        Some(_) => SyncSession::open(config).map(Some),
        None => Ok(None),
    }
}

/// Sync-only invocation: proxy session in parallel with the watcher, no
/// clean/compile/RTL stages. Blocks until Ctrl+C.
pub fn sync_only(config: &'static Config) -> Result<()> {
    let session = SyncSession::open(config)?;

    let hub = session.hub();
    thread::spawn(move || {
        if let Err(e) = watch::watch_blocking(config, Some(hub)) {
            log!("error"; "watch failed: {e:#}");
        }
    });

    session.wait();
    Ok(())
}

/// Copy hand-authored theme files (`*.css`, `*.php` colocated with the
/// sources) into the themes output directory verbatim. This is the
/// secondary publishing path for files the compiler does not produce.
pub fn copy_prebuilt_themes(config: &Config) -> Result<usize> {
    if !config.themes_dir.is_dir() {
        return Ok(0);
    }
    fs::create_dir_all(&config.themes_out)?;

    let mut copied = 0;
    for entry in fs::read_dir(&config.themes_dir)? {
        let entry = entry?;
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if path.is_file() && matches!(ext, "css" | "php") {
            fs::copy(&path, config.themes_out.join(entry.file_name()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ============================================================================
// Proxy Session
// ============================================================================

/// A running reverse-proxy/live-reload session.
pub struct SyncSession {
    hub: ReloadHub,
    handle: thread::JoinHandle<()>,
}

impl SyncSession {
    /// Bind the proxy listener and the reload hub, then serve requests on
    /// a background thread. Setup failures here are fatal: the caller
    /// asked for a session and cannot proceed without one.
    pub fn open(config: &'static Config) -> Result<Self> {
        let Some(port) = config.proxy.as_deref() else {
            bail!("a proxy target is required to open a session");
        };
        let target = format!("127.0.0.1:{port}");

        let (server, addr) = try_bind_port(SESSION_PORT, MAX_PORT_RETRIES)?;
        let server = Arc::new(server);
        let hub = ReloadHub::start()?;

        // Graceful shutdown: unblock the request loop on Ctrl+C.
        let server_for_signal = Arc::clone(&server);
        ctrlc::set_handler(move || {
            log!("serve"; "shutting down...");
            server_for_signal.unblock();
        })
        .context("failed to set Ctrl+C handler")?;

        log!("serve"; "http://{addr} -> http://{target}");

        let handle = thread::spawn(move || {
            let client = reqwest::blocking::Client::new();
            for request in server.incoming_requests() {
                if let Err(e) = forward(&client, &target, request) {
                    log!("serve"; "proxy error: {e:#}");
                }
            }
        });

        Ok(Self { hub, handle })
    }

    /// Handle to the reload hub, for compilers running in dev mode.
    pub fn hub(&self) -> ReloadHub {
        self.hub.clone()
    }

    /// Block until the session shuts down.
    pub fn wait(self) {
        self.handle.join().ok();
    }
}

fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let interface = IpAddr::V4(Ipv4Addr::LOCALHOST);
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {base_port} in use, using {port} instead");
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < max_retries => continue,
            Err(e) => {
                return Err(anyhow!(
                    "failed to bind after {max_retries} attempts (ports {base_port}-{port}): {e}"
                ));
            }
        }
    }
    unreachable!()
}

// ============================================================================
// Request Forwarding
// ============================================================================

/// Hop-by-hop and managed headers that must not be forwarded verbatim.
const SKIPPED_REQUEST_HEADERS: &[&str] = &["host", "connection", "accept-encoding", "content-length"];
const SKIPPED_RESPONSE_HEADERS: &[&str] = &["connection", "transfer-encoding", "content-length"];

/// Forward one request to the proxy target and relay the response,
/// injecting the reload script into HTML bodies.
fn forward(client: &reqwest::blocking::Client, target: &str, mut request: Request) -> Result<()> {
    let url = format!("http://{target}{}", request.url());
    let method = reqwest::Method::from_bytes(request.method().to_string().as_bytes())
        .map_err(|e| anyhow!("bad method: {e}"))?;

    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;

    let mut upstream = client.request(method, &url);
    for header in request.headers() {
        let name = header.field.to_string();
        if SKIPPED_REQUEST_HEADERS
            .iter()
            .any(|s| name.eq_ignore_ascii_case(s))
        {
            continue;
        }
        upstream = upstream.header(name.as_str(), header.value.as_str());
    }

    let response = upstream.body(body).send().with_context(|| format!("upstream {url}"))?;

    let status = response.status().as_u16();
    let is_html = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));

    let headers: Vec<Header> = response
        .headers()
        .iter()
        .filter(|(name, _)| {
            !SKIPPED_RESPONSE_HEADERS
                .iter()
                .any(|s| name.as_str().eq_ignore_ascii_case(s))
        })
        .filter_map(|(name, value)| Header::from_bytes(name.as_str().as_bytes(), value.as_bytes()).ok())
        .collect();

    let bytes = response.bytes()?;
    let data = if is_html {
        inject_snippet(&bytes)
    } else {
        bytes.to_vec()
    };

    let mut reply = Response::from_data(data).with_status_code(status);
    for header in headers {
        reply.add_header(header);
    }
    request.respond(reply)?;
    Ok(())
}

/// Insert the reload script before `</body>`, or append it when no such
/// tag exists (partial responses, error pages).
fn inject_snippet(html: &[u8]) -> Vec<u8> {
    let needle = b"</body>";
    let pos = html
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle));

    let mut out = Vec::with_capacity(html.len() + RELOAD_SNIPPET.len());
    match pos {
        Some(idx) => {
            out.extend_from_slice(&html[..idx]);
            out.extend_from_slice(RELOAD_SNIPPET.as_bytes());
            out.extend_from_slice(&html[idx..]);
        }
        None => {
            out.extend_from_slice(html);
            out.extend_from_slice(RELOAD_SNIPPET.as_bytes());
        }
    }
    out
}
