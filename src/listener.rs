//! Accepts inbound TCP connections on the server port, looks up the configured peer by remote
//! address, and either hands the connection to an already-running Session for collision
//! arbitration or spawns a fresh passive Session for it (spec §4.3/§6).

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::{info, warn};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::rde::RdeHandle;
use crate::session::{self, Registry, SessionCommand};

pub async fn run(config: Arc<ServerConfig>, registry: Registry, rde: RdeHandle) -> std::io::Result<()> {
    let bind_addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), config.port);
    let listener = TcpListener::bind(bind_addr).await?;
    info!("listening for peers on {}", bind_addr);

    loop {
        let (stream, remote) = listener.accept().await?;
        let peer_addr = remote.ip();
        match config.peers.iter().find(|p| p.host == peer_addr) {
            None => {
                warn!("rejecting inbound connection from unconfigured peer {}", peer_addr);
            }
            Some(peer_config) => match registry.lookup(peer_addr).await {
                Some(handle) => {
                    handle.send(SessionCommand::Inbound(stream)).await;
                }
                None => {
                    info!("accepted inbound connection from {}, starting passive session", peer_addr);
                    session::spawn(peer_config.clone(), rde.clone(), registry.clone(), Some(stream));
                }
            },
        }
    }
}
