//! Live-reload hub.
//!
//! Browsers connected through the proxy session open a WebSocket back to
//! this hub; the compiler notifies it after each dev-mode write and the
//! hub broadcasts the stylesheet name so clients can swap it in without
//! a full page reload.

use crate::log;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};
use tungstenite::{Message, WebSocket, accept};

/// Port the reload socket listens on (livereload convention).
pub const RELOAD_PORT: u16 = 35729;

#[derive(Serialize)]
struct ReloadMessage<'a> {
    kind: &'a str,
    file: &'a str,
}

/// Broadcast handle shared between the session, the watcher and the
/// compilers. Cloning shares the same client list.
#[derive(Clone)]
pub struct ReloadHub {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
}

impl ReloadHub {
    /// Bind the reload listener and start accepting browser connections
    /// on a background thread. Binding failure is a session setup error
    /// and propagates as fatal.
    pub fn start() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", RELOAD_PORT))
            .context("failed to bind live-reload socket")?;

        let clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>> = Arc::new(Mutex::new(Vec::new()));
        let accepting = Arc::clone(&clients);

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                match accept(stream) {
                    Ok(ws) => {
                        if let Ok(mut list) = accepting.lock() {
                            list.push(ws);
                        }
                    }
                    Err(e) => log!("serve"; "reload handshake failed: {e}"),
                }
            }
        });

        Ok(Self { clients })
    }

    /// Push a compiled stylesheet name to every connected session.
    /// Dead connections are pruned on send failure.
    pub fn notify_css(&self, file: &str) {
        let Ok(payload) = serde_json::to_string(&ReloadMessage { kind: "css", file }) else {
            return;
        };
        let Ok(mut clients) = self.clients.lock() else {
            return;
        };
        clients.retain_mut(|ws| ws.send(Message::text(payload.clone())).is_ok());
    }

    #[cfg(test)]
    fn detached() -> Self {
        Self {
            clients: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_without_clients_is_noop() {
        let hub = ReloadHub::detached();
        hub.notify_css("style_blue.css");
    }

    #[test]
    fn test_reload_message_shape() {
        let json = serde_json::to_string(&ReloadMessage {
            kind: "css",
            file: "rtl_style_blue.css",
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"css","file":"rtl_style_blue.css"}"#);
    }
}
