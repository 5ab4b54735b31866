//! Glue that binds one FSM instance to one transport connection (spec §4.3).
//!
//! A `Session` owns exactly one `Fsm` and, at most, one live `MessageProtocol` (a framed TCP
//! stream). It translates wire bytes, real timer expiries, and transport events into `Event`s,
//! drives the FSM, and executes the effects the FSM emits. One lightweight task per session,
//! matching the scheduling model in spec §5: suspension points are a socket read, a socket
//! write, a timer expiry, or a collision-check message from the Listener.

mod registry;
mod timers;

pub use registry::{Registry, SessionCommand, SessionHandle};

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::codec::{Message, MessageCodec, MessageProtocol, Prefix, UpdateMessage};
use crate::config::{PeerConfig, Start};
use crate::fsm::{local_wins_collision, Effect, Event, Fsm, State, StartKind, TcpDirective, TcpEvent, TimerName};
use crate::rde::{LocRibEntry, PeerIdentity, RdeHandle};

use timers::TimerWheel;

/// Spawns a session task for `config` and registers it so the Listener can find it by peer
/// address. `inbound` is `Some` when the Listener already accepted a TCP connection for this
/// peer and is handing it to a freshly spawned passive session.
pub fn spawn(config: Arc<PeerConfig>, rde: RdeHandle, registry: Registry, inbound: Option<TcpStream>) {
    let (command_tx, command_rx) = mpsc::channel(4);
    let handle = SessionHandle::new(command_tx);
    let host = config.host;
    let registry_for_task = registry.clone();
    tokio::spawn(async move {
        registry_for_task.register(host, handle).await;
        let mut session = Session::new(config, rde, command_rx);
        session.run(inbound).await;
        registry_for_task.unregister(host).await;
    });
}

struct Session {
    fsm: Fsm,
    rde: RdeHandle,
    protocol: Option<MessageProtocol>,
    timers: TimerWheel,
    commands: mpsc::Receiver<SessionCommand>,
    connect_tx: mpsc::Sender<io::Result<TcpStream>>,
    connect_rx: mpsc::Receiver<io::Result<TcpStream>>,
    /// Adj-RIB-Out entries already pushed to this peer, so the route_advertisement timer only
    /// sends what changed since the last poll (spec §4.4 phase 3 / §9).
    advertised: HashMap<Prefix, LocRibEntry>,
}

impl Session {
    fn new(config: Arc<PeerConfig>, rde: RdeHandle, commands: mpsc::Receiver<SessionCommand>) -> Self {
        let (connect_tx, connect_rx) = mpsc::channel(1);
        Session {
            fsm: Fsm::new(config),
            rde,
            protocol: None,
            timers: TimerWheel::new(),
            commands,
            connect_tx,
            connect_rx,
            advertised: HashMap::new(),
        }
    }

    async fn run(&mut self, inbound: Option<TcpStream>) {
        if let Some(stream) = inbound {
            self.adopt(stream).await;
        } else if self.fsm.config.start == Start::Automatic {
            self.apply(Event::Start(StartKind::Automatic)).await;
        }

        loop {
            tokio::select! {
                frame = recv_frame(&mut self.protocol), if self.protocol.is_some() => {
                    match frame {
                        Some(Ok(message)) => self.apply(Event::Recv(message)).await,
                        Some(Err(err)) => {
                            debug!("{} read error: {}", self.fsm.config.host, err);
                            self.apply(Event::TcpConnection(TcpEvent::Fails)).await;
                        }
                        None => {
                            debug!("{} peer closed the connection", self.fsm.config.host);
                            self.apply(Event::TcpConnection(TcpEvent::Fails)).await;
                        }
                    }
                }
                name = self.timers.next_expired() => {
                    self.apply(Event::Timer(name)).await;
                }
                Some(result) = self.connect_rx.recv() => {
                    match result {
                        Ok(stream) => {
                            self.protocol = Some(MessageProtocol::new(stream, MessageCodec::new()));
                            self.sync_codec_flags();
                            self.apply(Event::TcpConnection(TcpEvent::RequestAcked)).await;
                        }
                        Err(err) => {
                            debug!("{} connect failed: {}", self.fsm.config.host, err);
                            self.apply(Event::TcpConnection(TcpEvent::Fails)).await;
                        }
                    }
                }
                Some(command) = self.commands.recv() => {
                    match command {
                        SessionCommand::Inbound(stream) => self.handle_inbound(stream).await,
                    }
                }
            }
        }
    }

    async fn apply(&mut self, event: Event) {
        let poll_adj_rib_out =
            self.fsm.state == State::Established && event == Event::Timer(TimerName::RouteAdvertisement);
        let before = self.fsm.timers;
        let (_, effects) = self.fsm.step(event);
        self.timers.sync(&before, &self.fsm);
        self.sync_codec_flags();
        for effect in effects {
            self.execute(effect).await;
        }
        if poll_adj_rib_out {
            self.disseminate().await;
        }
    }

    /// Diffs the RDE's current Adj-RIB-Out against what this session already advertised and
    /// sends UPDATEs for anything new, changed, or withdrawn (spec §9's resolution of the
    /// dissemination open question: the route_advertisement timer drives the poll).
    async fn disseminate(&mut self) {
        let current = self.rde.adj_rib_out().await;

        let withdrawn: Vec<Prefix> = self
            .advertised
            .keys()
            .filter(|prefix| !current.contains_key(prefix))
            .copied()
            .collect();
        if !withdrawn.is_empty() {
            self.send(Message::Update(UpdateMessage {
                withdrawn_routes: withdrawn,
                path_attributes: Vec::new(),
                nlri: Vec::new(),
            }))
            .await;
        }

        for (prefix, entry) in &current {
            if self.advertised.get(prefix) != Some(entry) {
                self.send(Message::Update(UpdateMessage {
                    withdrawn_routes: Vec::new(),
                    path_attributes: entry.path_attributes.clone(),
                    nlri: vec![*prefix],
                }))
                .await;
            }
        }

        self.advertised = current;
    }

    fn sync_codec_flags(&mut self) {
        if let Some(protocol) = self.protocol.as_mut() {
            let codec = protocol.codec_mut();
            codec.four_octets_asn = self.fsm.flags.four_octets_asn;
            codec.extended_message = self.fsm.flags.extended_message;
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::TcpConnection(TcpDirective::Connect) => self.start_connect(),
            Effect::TcpConnection(TcpDirective::Disconnect) => {
                self.protocol = None;
            }
            Effect::Send(message) => self.send(message).await,
            Effect::Recv(Message::Update(update)) => {
                let peer = PeerIdentity {
                    bgp_id: self.fsm.config.bgp_id,
                    address: self.fsm.config.host,
                    is_ebgp: self.fsm.config.is_ebgp(),
                };
                self.rde.queue_update(peer, update).await;
            }
            Effect::Recv(_) => {}
        }
    }

    async fn send(&mut self, message: Message) {
        if let Some(protocol) = self.protocol.as_mut() {
            if let Err(err) = protocol.send(message).await {
                warn!("{} write error: {}", self.fsm.config.host, err);
                self.protocol = None;
            }
        }
    }

    fn start_connect(&mut self) {
        let addr = SocketAddr::new(self.fsm.config.host, self.fsm.config.port);
        let tx = self.connect_tx.clone();
        tokio::spawn(async move {
            let result = TcpStream::connect(addr).await;
            let _ = tx.send(result).await;
        });
    }

    /// Adopts an already-accepted inbound connection as this session's transport, driving the
    /// FSM through Start (if still idle) and TcpConnection::Confirmed.
    async fn adopt(&mut self, stream: TcpStream) {
        self.protocol = Some(MessageProtocol::new(stream, MessageCodec::new()));
        self.sync_codec_flags();
        if self.fsm.state == State::Idle {
            self.apply(Event::Start(StartKind::Automatic)).await;
        }
        self.apply(Event::TcpConnection(TcpEvent::Confirmed)).await;
    }

    /// Connection-collision resolution (spec §4.2/§4.3): only a real race -- both an
    /// actively-opened and a passively-accepted connection for the same peer -- when the FSM
    /// has already started exchanging OPENs. The endpoint with the higher BGP-ID keeps its
    /// existing connection; the loser tears its connection down and adopts the new one.
    async fn handle_inbound(&mut self, stream: TcpStream) {
        match self.fsm.state {
            State::OpenSent | State::OpenConfirm => {
                if local_wins_collision(self.fsm.config.local_bgp_id, self.fsm.config.bgp_id) {
                    info!(
                        "{}: inbound connection loses collision (local BGP-ID {} wins), rejecting",
                        self.fsm.config.host, self.fsm.config.local_bgp_id
                    );
                }
                else {
                    info!(
                        "{}: existing connection loses collision (peer BGP-ID {} wins), adopting inbound",
                        self.fsm.config.host, self.fsm.config.bgp_id
                    );
                    self.apply(Event::Error).await;
                    self.adopt(stream).await;
                }
            }
            State::Established => {
                debug!(
                    "{}: rejecting duplicate inbound connection while established",
                    self.fsm.config.host
                );
            }
            _ => self.adopt(stream).await,
        }
    }
}

async fn recv_frame(protocol: &mut Option<MessageProtocol>) -> Option<io::Result<Message>> {
    match protocol {
        Some(protocol) => protocol.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelayOpenTimer, Mode, Timers};
    use crate::codec::OpenMessage;
    use crate::rde;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn config(port: u16) -> Arc<PeerConfig> {
        config_with_route_advertisement(port, 30)
    }

    fn config_with_route_advertisement(port: u16, route_advertisement: u16) -> Arc<PeerConfig> {
        Arc::new(PeerConfig {
            local_asn: 65000,
            local_bgp_id: Ipv4Addr::new(10, 0, 0, 1),
            asn: 65001,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            host: IpAddr::from(Ipv4Addr::new(127, 0, 0, 1)),
            port,
            mode: Mode::Active,
            start: Start::Automatic,
            notification_without_open: true,
            timers: Timers {
                connect_retry: 120,
                delay_open: DelayOpenTimer {
                    enabled: false,
                    seconds: 5,
                },
                hold_time: 90,
                keep_alive: 30,
                as_origination: 15,
                route_advertisement,
            },
            networks: Vec::new(),
        })
    }

    // S1 -- active-open handshake, driven over a real loopback TCP connection.
    #[tokio::test]
    async fn test_active_session_completes_handshake_over_loopback() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let rde = rde::spawn(65000);
        let registry = Registry::new();
        spawn(config(port), rde, registry, None);

        let (stream, _) = timeout(Duration::from_secs(2), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let mut peer = MessageProtocol::new(stream, MessageCodec::new());

        let open = timeout(Duration::from_secs(2), peer.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(open, Message::Open(_)));

        peer.send(Message::Open(OpenMessage {
            version: 4,
            asn: 65000,
            hold_time: 90,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            capabilities: Vec::new(),
        }))
        .await
        .unwrap();

        let keepalive = timeout(Duration::from_secs(2), peer.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(keepalive, Message::Keepalive);

        peer.send(Message::Keepalive).await.unwrap();

        let update = timeout(Duration::from_secs(2), peer.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(update, Message::Update(_)));
    }

    // route_advertisement timer polls Adj-RIB-Out and pushes what's new (spec §9).
    #[tokio::test]
    async fn test_route_advertisement_timer_disseminates_adj_rib_out() {
        use crate::codec::{Attribute, AsPathSegment, Origin, Prefix, SegmentKind};
        use crate::rde::PeerIdentity;

        let rde = rde::spawn(65000);
        let prefix = Prefix::new(Ipv4Addr::new(192, 0, 2, 0), 24);
        rde.queue_update(
            PeerIdentity {
                bgp_id: Ipv4Addr::new(10, 9, 9, 9),
                address: IpAddr::from(Ipv4Addr::new(10, 9, 9, 9)),
                is_ebgp: true,
            },
            crate::codec::UpdateMessage {
                withdrawn_routes: Vec::new(),
                path_attributes: vec![
                    Attribute::Origin(Origin::Igp),
                    Attribute::AsPath(vec![AsPathSegment {
                        kind: SegmentKind::AsSequence,
                        asns: vec![65009],
                    }]),
                    Attribute::NextHop(Ipv4Addr::new(10, 9, 9, 9)),
                ],
                nlri: vec![prefix],
            },
        )
        .await;
        rde.force_tick().await;

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let registry = Registry::new();
        spawn(config_with_route_advertisement(port, 1), rde, registry, None);

        let (stream, _) = timeout(Duration::from_secs(2), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let mut peer = MessageProtocol::new(stream, MessageCodec::new());

        timeout(Duration::from_secs(2), peer.next()).await.unwrap().unwrap().unwrap(); // OPEN
        peer.send(Message::Open(OpenMessage {
            version: 4,
            asn: 65000,
            hold_time: 90,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            capabilities: Vec::new(),
        }))
        .await
        .unwrap();
        timeout(Duration::from_secs(2), peer.next()).await.unwrap().unwrap().unwrap(); // KEEPALIVE
        peer.send(Message::Keepalive).await.unwrap();
        timeout(Duration::from_secs(2), peer.next()).await.unwrap().unwrap().unwrap(); // initial UPDATE for configured networks

        let advertised = timeout(Duration::from_secs(3), peer.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match advertised {
            Message::Update(update) => assert_eq!(update.nlri, vec![prefix]),
            other => panic!("expected UPDATE, got {:?}", other),
        }
    }
}
