//! Per-server peer registry (spec §4.3): Sessions are discoverable by peer host address so a
//! Listener that accepts an inbound TCP connection can look up an existing Session and
//! arbitrate a collision. All access is via an async mutex; there is no other shared mutable
//! state between the per-session and listener tasks (spec §5).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

/// A command a Listener (or another Session) can deliver to a running Session task.
pub enum SessionCommand {
    /// An inbound TCP connection arrived for this peer while a session is already registered;
    /// the Session decides whether this is a real collision and, if so, arbitrates it.
    Inbound(TcpStream),
}

#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(tx: mpsc::Sender<SessionCommand>) -> Self {
        SessionHandle { tx }
    }

    pub async fn send(&self, command: SessionCommand) {
        let _ = self.tx.send(command).await;
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    sessions: Arc<Mutex<HashMap<IpAddr, SessionHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, addr: IpAddr, handle: SessionHandle) {
        self.sessions.lock().await.insert(addr, handle);
    }

    pub async fn unregister(&self, addr: IpAddr) {
        self.sessions.lock().await.remove(&addr);
    }

    pub async fn lookup(&self, addr: IpAddr) -> Option<SessionHandle> {
        self.sessions.lock().await.get(&addr).cloned()
    }
}
