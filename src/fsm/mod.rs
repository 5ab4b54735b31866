//! Pure BGP-4 finite state machine: `(State, Event) -> (State, Vec<Effect>)`.
//!
//! Nothing here performs I/O. Timers are abstract (seconds + running flag); the surrounding
//! `session` module owns real clocks and turns their expiry into `Event::Timer`. This is what
//! makes the transition function exhaustively unit-testable in isolation (spec §9).

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::codec::{
    Attribute, AsPathSegment, Capability, CeaseSubcode, FsmSubcode, Message, NotificationMessage,
    OpenMessage, OpenSubcode, Origin, SegmentKind, UpdateMessage, AS_TRANS,
};
use crate::config::{Mode, PeerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpEvent {
    Confirmed,
    RequestAcked,
    Fails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerName {
    ConnectRetry,
    DelayOpen,
    HoldTime,
    KeepAlive,
    AsOrigination,
    RouteAdvertisement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(StartKind),
    Stop(StartKind),
    TcpConnection(TcpEvent),
    Timer(TimerName),
    Recv(Message),
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpDirective {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    TcpConnection(TcpDirective),
    Send(Message),
    /// A `recv` effect re-surfaced after FSM handling, for upper-layer dispatch (e.g. into RDE).
    Recv(Message),
}

/// A single abstract timer: a configured duration and whether it's currently running.
/// `set` stores a value without starting it; `start` arms it; `stop` disarms it.
/// `generation` bumps every time `start`/`restart` actually arms the timer, so the Session's
/// real-clock wheel can tell "still the same countdown" from "re-armed, push the deadline out"
/// even when `running`/`seconds` look identical before and after (e.g. re-arming hold_time to
/// the same value on every KEEPALIVE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub seconds: u16,
    pub running: bool,
    pub generation: u32,
}

impl Timer {
    fn new(seconds: u16) -> Self {
        Timer {
            seconds,
            running: false,
            generation: 0,
        }
    }

    fn set(&mut self, seconds: u16) {
        self.seconds = seconds;
        self.running = false;
    }

    fn start(&mut self) {
        self.running = self.seconds > 0;
        if self.running {
            self.generation += 1;
        }
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn restart(&mut self) {
        self.stop();
        self.start();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub connect_retry: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NegotiatedFlags {
    pub four_octets_asn: bool,
    pub extended_message: bool,
    pub ibgp: bool,
    /// Set when the peer's OPEN advertised the graceful restart capability. Negotiation of
    /// actual restart behavior is out of scope; this only records that it was offered.
    pub peer_graceful_restart: bool,
}

/// A session's FSM instance. Owns timers, counters, negotiated flags, and the immutable
/// peer configuration; everything else lives in `Session`.
#[derive(Debug, Clone)]
pub struct Fsm {
    pub state: State,
    pub config: Arc<PeerConfig>,
    pub counters: Counters,
    pub timers: [Timer; 6],
    pub flags: NegotiatedFlags,
    pub hold_time: u16,
    delay_open_running: bool,
}

fn timer_index(name: TimerName) -> usize {
    match name {
        TimerName::ConnectRetry => 0,
        TimerName::DelayOpen => 1,
        TimerName::HoldTime => 2,
        TimerName::KeepAlive => 3,
        TimerName::AsOrigination => 4,
        TimerName::RouteAdvertisement => 5,
    }
}

impl Fsm {
    pub fn new(config: Arc<PeerConfig>) -> Self {
        let timers = [
            Timer::new(config.timers.connect_retry),
            Timer::new(config.timers.delay_open.seconds),
            Timer::new(config.timers.hold_time),
            Timer::new(config.timers.keep_alive),
            Timer::new(config.timers.as_origination),
            Timer::new(config.timers.route_advertisement),
        ];
        let hold_time = config.timers.hold_time;
        Fsm {
            state: State::Idle,
            config,
            counters: Counters::default(),
            timers,
            flags: NegotiatedFlags::default(),
            hold_time,
            delay_open_running: false,
        }
    }

    pub fn timer(&self, name: TimerName) -> &Timer {
        &self.timers[timer_index(name)]
    }

    fn timer_mut(&mut self, name: TimerName) -> &mut Timer {
        &mut self.timers[timer_index(name)]
    }

    fn set_timer(&mut self, name: TimerName, seconds: u16) {
        self.timer_mut(name).set(seconds);
    }

    fn start_timer(&mut self, name: TimerName) {
        self.timer_mut(name).start();
    }

    fn stop_timer(&mut self, name: TimerName) {
        self.timer_mut(name).stop();
    }

    fn restart_timer(&mut self, name: TimerName) {
        self.timer_mut(name).restart();
    }

    fn zero_connect_retry(&mut self) {
        self.counters.connect_retry = 0;
    }

    fn bump_connect_retry(&mut self) {
        self.counters.connect_retry += 1;
    }

    fn delay_open_enabled(&self) -> bool {
        self.config.timers.delay_open.enabled
    }

    fn arm_hold_and_keepalive(&mut self) {
        self.restart_timer(TimerName::HoldTime);
        if self.hold_time > 0 {
            self.set_timer(TimerName::KeepAlive, self.hold_time / 3);
            self.start_timer(TimerName::KeepAlive);
        } else {
            self.stop_timer(TimerName::KeepAlive);
        }
    }

    fn build_open(&self) -> OpenMessage {
        let asn = if self.config.local_asn > u16::MAX as u32 {
            AS_TRANS
        } else {
            self.config.local_asn as u16
        };
        let mut capabilities = vec![
            Capability::FourOctetAsn(self.config.local_asn),
            Capability::MultiProtocol { afi: 1, safi: 1 },
        ];
        if self.config.timers.hold_time > 0 {
            capabilities.push(Capability::RouteRefresh);
        }
        capabilities.push(Capability::GracefulRestart {
            restarted: false,
            restart_time: 0,
            afs: Vec::new(),
        });
        OpenMessage {
            version: crate::codec::open::VERSION,
            asn,
            hold_time: self.config.timers.hold_time,
            bgp_id: self.config.local_bgp_id,
            capabilities,
        }
    }

    fn originate_update(&self) -> Message {
        Message::Update(UpdateMessage {
            withdrawn_routes: Vec::new(),
            path_attributes: vec![
                Attribute::Origin(Origin::Igp),
                Attribute::AsPath(if self.config.is_ebgp() {
                    vec![AsPathSegment {
                        kind: SegmentKind::AsSequence,
                        asns: vec![self.config.local_asn],
                    }]
                } else {
                    vec![AsPathSegment {
                        kind: SegmentKind::AsSequence,
                        asns: Vec::new(),
                    }]
                }),
                Attribute::NextHop(local_next_hop(&self.config.local_bgp_id)),
            ],
            nlri: self.config.networks.clone(),
        })
    }

    fn apply_open(&mut self, open: &OpenMessage) {
        for cap in &open.capabilities {
            match cap {
                Capability::FourOctetAsn(asn) => {
                    self.flags.four_octets_asn = true;
                    self.flags.ibgp = *asn == self.config.local_asn;
                }
                Capability::ExtendedMessage => self.flags.extended_message = true,
                Capability::GracefulRestart { .. } => self.flags.peer_graceful_restart = true,
                _ => {}
            }
        }
        self.hold_time = self.hold_time.min(open.hold_time);
    }

    fn idle_result(&mut self, notification: Option<NotificationMessage>, bump: bool) -> (State, Vec<Effect>) {
        self.state = State::Idle;
        self.reset();
        if bump {
            self.bump_connect_retry();
        }
        let mut effects = Vec::new();
        if let Some(notification) = notification {
            effects.push(Effect::Send(Message::Notification(notification)));
        }
        effects.push(Effect::TcpConnection(TcpDirective::Disconnect));
        (State::Idle, effects)
    }

    fn reset(&mut self) {
        for timer in &mut self.timers {
            timer.stop();
        }
        self.delay_open_running = false;
    }

    /// Advance the FSM by one event, returning the new state and the effects to execute.
    pub fn step(&mut self, event: Event) -> (State, Vec<Effect>) {
        match self.state {
            State::Idle => self.step_idle(event),
            State::Connect => self.step_connect(event),
            State::Active => self.step_active(event),
            State::OpenSent => self.step_open_sent(event),
            State::OpenConfirm => self.step_open_confirm(event),
            State::Established => self.step_established(event),
        }
    }

    fn step_idle(&mut self, event: Event) -> (State, Vec<Effect>) {
        match event {
            Event::Start(_) => {
                self.zero_connect_retry();
                self.restart_timer(TimerName::ConnectRetry);
                let next = if self.config.mode == Mode::Active {
                    State::Connect
                } else {
                    State::Active
                };
                self.state = next;
                // Only an active-mode start dials out; a passive start just begins
                // listening for the peer's inbound connection (spec §4.2, idle transitions).
                let effects = if next == State::Connect {
                    vec![Effect::TcpConnection(TcpDirective::Connect)]
                } else {
                    Vec::new()
                };
                (next, effects)
            }
            _ => (State::Idle, Vec::new()),
        }
    }

    fn start_open_sent(&mut self) -> Vec<Effect> {
        self.stop_timer(TimerName::ConnectRetry);
        self.restart_timer(TimerName::HoldTime);
        self.state = State::OpenSent;
        vec![Effect::Send(Message::Open(self.build_open()))]
    }

    fn step_connect_or_active(&mut self, event: Event, retry_target: State) -> (State, Vec<Effect>) {
        match event {
            Event::Timer(TimerName::ConnectRetry) => {
                self.restart_timer(TimerName::ConnectRetry);
                self.delay_open_running = false;
                self.state = retry_target;
                (retry_target, vec![Effect::TcpConnection(TcpDirective::Connect)])
            }
            Event::TcpConnection(TcpEvent::Confirmed) | Event::TcpConnection(TcpEvent::RequestAcked) => {
                if self.delay_open_enabled() {
                    self.stop_timer(TimerName::ConnectRetry);
                    self.set_timer(TimerName::DelayOpen, self.config.timers.delay_open.seconds);
                    self.start_timer(TimerName::DelayOpen);
                    self.delay_open_running = true;
                    (self.state, Vec::new())
                } else {
                    let effects = self.start_open_sent();
                    (State::OpenSent, effects)
                }
            }
            Event::Timer(TimerName::DelayOpen) => {
                self.delay_open_running = false;
                let effects = self.start_open_sent();
                (State::OpenSent, effects)
            }
            Event::Recv(Message::Open(open)) if self.delay_open_running => {
                self.stop_timer(TimerName::ConnectRetry);
                self.stop_timer(TimerName::DelayOpen);
                self.delay_open_running = false;
                self.apply_open(&open);
                self.arm_hold_and_keepalive();
                self.state = State::OpenConfirm;
                (
                    State::OpenConfirm,
                    vec![
                        Effect::Send(Message::Open(self.build_open())),
                        Effect::Send(Message::Keepalive),
                    ],
                )
            }
            Event::Recv(Message::Notification(n)) if n.code == 2 && n.subcode == OpenSubcode::UnsupportedVersionNumber as u8 => {
                let bump = !self.delay_open_running;
                self.idle_result(None, bump)
            }
            Event::TcpConnection(TcpEvent::Fails) => {
                if self.delay_open_running {
                    self.delay_open_running = false;
                    self.state = State::Active;
                    (State::Active, Vec::new())
                } else {
                    self.idle_result(None, true)
                }
            }
            _ => self.idle_result(None, true),
        }
    }

    fn step_connect(&mut self, event: Event) -> (State, Vec<Effect>) {
        self.step_connect_or_active(event, State::Connect)
    }

    /// A clean manual teardown (spec §5): NOTIFICATION{cease} first, unless the peer config
    /// opted out via `notification_without_open = false`.
    fn stop_notification(&self) -> Option<NotificationMessage> {
        if self.config.notification_without_open {
            Some(NotificationMessage {
                code: 6,
                subcode: CeaseSubcode::AdministrativeShutdown as u8,
                data: Vec::new(),
            })
        } else {
            None
        }
    }

    fn step_active(&mut self, event: Event) -> (State, Vec<Effect>) {
        if let Event::Stop(StartKind::Manual) = event {
            let notification = self.stop_notification();
            return self.idle_result(notification, false);
        }
        self.step_connect_or_active(event, State::Active)
    }

    fn step_open_sent(&mut self, event: Event) -> (State, Vec<Effect>) {
        match event {
            Event::Recv(Message::Open(open)) => {
                self.apply_open(&open);
                self.arm_hold_and_keepalive();
                self.state = State::OpenConfirm;
                (State::OpenConfirm, vec![Effect::Send(Message::Keepalive)])
            }
            Event::Recv(Message::Notification(n)) if n.code == 2 && n.subcode == OpenSubcode::UnsupportedVersionNumber as u8 => {
                self.idle_result(None, true)
            }
            Event::Timer(TimerName::HoldTime) => {
                let notification = NotificationMessage {
                    code: 4,
                    subcode: 0,
                    data: Vec::new(),
                };
                self.idle_result(Some(notification), true)
            }
            Event::TcpConnection(TcpEvent::Fails) => {
                self.restart_timer(TimerName::ConnectRetry);
                self.state = State::Active;
                (State::Active, vec![Effect::TcpConnection(TcpDirective::Disconnect)])
            }
            Event::Stop(_) => {
                let notification = self.stop_notification();
                self.idle_result(notification, false)
            }
            _ => {
                let notification = NotificationMessage {
                    code: 5,
                    subcode: FsmSubcode::UnexpectedMessageInOpenSent as u8,
                    data: Vec::new(),
                };
                self.idle_result(Some(notification), true)
            }
        }
    }

    fn step_open_confirm(&mut self, event: Event) -> (State, Vec<Effect>) {
        match event {
            Event::Recv(Message::Keepalive) => {
                self.arm_hold_and_keepalive();
                self.start_timer(TimerName::AsOrigination);
                self.start_timer(TimerName::RouteAdvertisement);
                self.state = State::Established;
                (State::Established, vec![Effect::Send(self.originate_update())])
            }
            Event::Recv(Message::Open(_)) | Event::Error => {
                let notification = NotificationMessage {
                    code: 6,
                    subcode: CeaseSubcode::ConnectionCollisionResolution as u8,
                    data: Vec::new(),
                };
                self.idle_result(Some(notification), false)
            }
            Event::Recv(Message::Notification(n)) if n.code == 2 && n.subcode == OpenSubcode::UnsupportedVersionNumber as u8 => {
                self.idle_result(None, true)
            }
            Event::Timer(TimerName::KeepAlive) => {
                self.restart_timer(TimerName::KeepAlive);
                (State::OpenConfirm, vec![Effect::Send(Message::Keepalive)])
            }
            Event::Timer(TimerName::HoldTime) => {
                let notification = NotificationMessage {
                    code: 4,
                    subcode: 0,
                    data: Vec::new(),
                };
                self.idle_result(Some(notification), true)
            }
            Event::Stop(_) => {
                let notification = self.stop_notification();
                self.idle_result(notification, false)
            }
            _ => (State::OpenConfirm, Vec::new()),
        }
    }

    fn step_established(&mut self, event: Event) -> (State, Vec<Effect>) {
        match event {
            Event::Timer(TimerName::KeepAlive) => {
                let mut effects = vec![Effect::Send(Message::Keepalive)];
                if self.hold_time > 0 {
                    self.restart_timer(TimerName::KeepAlive);
                } else {
                    effects.clear();
                    effects.push(Effect::Send(Message::Keepalive));
                }
                (State::Established, effects)
            }
            Event::Timer(TimerName::HoldTime) => {
                let notification = NotificationMessage {
                    code: 4,
                    subcode: 0,
                    data: Vec::new(),
                };
                self.idle_result(Some(notification), true)
            }
            Event::Recv(Message::Keepalive) => {
                self.restart_timer(TimerName::HoldTime);
                (State::Established, Vec::new())
            }
            Event::Recv(Message::Update(update)) => {
                self.restart_timer(TimerName::HoldTime);
                (
                    State::Established,
                    vec![Effect::Recv(Message::Update(update))],
                )
            }
            Event::Recv(Message::Open(_)) | Event::Recv(Message::Notification(_)) => {
                let notification = NotificationMessage {
                    code: 6,
                    subcode: CeaseSubcode::AdministrativeReset as u8,
                    data: Vec::new(),
                };
                self.idle_result(Some(notification), false)
            }
            Event::Timer(TimerName::AsOrigination) => {
                self.restart_timer(TimerName::AsOrigination);
                (State::Established, vec![Effect::Send(self.originate_update())])
            }
            Event::Timer(TimerName::RouteAdvertisement) => {
                self.restart_timer(TimerName::RouteAdvertisement);
                (State::Established, Vec::new())
            }
            Event::Stop(_) => {
                let notification = self.stop_notification();
                self.idle_result(notification, false)
            }
            _ => (State::Established, Vec::new()),
        }
    }
}

fn local_next_hop(bgp_id: &Ipv4Addr) -> Ipv4Addr {
    *bgp_id
}

/// Collision arbitration (spec §4.2): the endpoint with the higher BGP-ID wins.
/// Returns `true` if `local_bgp_id` should keep its connection.
pub fn local_wins_collision(local_bgp_id: Ipv4Addr, remote_bgp_id: Ipv4Addr) -> bool {
    local_bgp_id > remote_bgp_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelayOpenTimer, Start, Timers};
    use std::net::{IpAddr, Ipv4Addr};

    fn peer_config(mode: Mode) -> Arc<PeerConfig> {
        Arc::new(PeerConfig {
            local_asn: 65000,
            local_bgp_id: Ipv4Addr::new(10, 0, 0, 1),
            asn: 65001,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            host: IpAddr::from(Ipv4Addr::new(10, 0, 0, 2)),
            port: 179,
            mode,
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
                route_advertisement: 30,
            },
            networks: Vec::new(),
        })
    }

    fn open_from(asn: u16, bgp_id: Ipv4Addr, hold_time: u16) -> Message {
        Message::Open(OpenMessage {
            version: 4,
            asn,
            hold_time,
            bgp_id,
            capabilities: Vec::new(),
        })
    }

    // S1 — active-open handshake
    #[test]
    fn test_active_open_handshake() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        let (state, effects) = fsm.step(Event::Start(StartKind::Automatic));
        assert_eq!(state, State::Connect);
        assert_eq!(effects, vec![Effect::TcpConnection(TcpDirective::Connect)]);

        let (state, effects) = fsm.step(Event::TcpConnection(TcpEvent::RequestAcked));
        assert_eq!(state, State::OpenSent);
        assert!(matches!(effects[0], Effect::Send(Message::Open(_))));

        let (state, _) = fsm.step(Event::Recv(open_from(65001, Ipv4Addr::new(10, 0, 0, 2), 90)));
        assert_eq!(state, State::OpenConfirm);

        let (state, effects) = fsm.step(Event::Recv(Message::Keepalive));
        assert_eq!(state, State::Established);
        assert!(matches!(effects[0], Effect::Send(Message::Update(_))));
        assert_eq!(fsm.hold_time, 90);
    }

    // S2 — hold-timer expiry
    #[test]
    fn test_hold_timer_expiry() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        fsm.state = State::Established;
        fsm.hold_time = 3;
        let (state, effects) = fsm.step(Event::Timer(TimerName::HoldTime));
        assert_eq!(state, State::Idle);
        assert_eq!(effects.len(), 2);
        match &effects[0] {
            Effect::Send(Message::Notification(n)) => assert_eq!(n.code, 4),
            _ => panic!("expected NOTIFICATION"),
        }
        assert_eq!(effects[1], Effect::TcpConnection(TcpDirective::Disconnect));
    }

    // S3 — unsupported version
    #[test]
    fn test_unsupported_version_delay_open_running() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        fsm.state = State::Connect;
        fsm.delay_open_running = true;
        let before = fsm.counters.connect_retry;
        let notification = Message::Notification(NotificationMessage {
            code: 2,
            subcode: OpenSubcode::UnsupportedVersionNumber as u8,
            data: Vec::new(),
        });
        let (state, _) = fsm.step(Event::Recv(notification));
        assert_eq!(state, State::Idle);
        assert_eq!(fsm.counters.connect_retry, before);
    }

    #[test]
    fn test_unsupported_version_delay_open_not_running() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        fsm.state = State::Connect;
        let before = fsm.counters.connect_retry;
        let notification = Message::Notification(NotificationMessage {
            code: 2,
            subcode: OpenSubcode::UnsupportedVersionNumber as u8,
            data: Vec::new(),
        });
        let (state, _) = fsm.step(Event::Recv(notification));
        assert_eq!(state, State::Idle);
        assert_eq!(fsm.counters.connect_retry, before + 1);
    }

    // Idempotence of idle
    #[test]
    fn test_idle_idempotent_under_stop() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        for kind in [StartKind::Manual, StartKind::Automatic] {
            let (state, effects) = fsm.step(Event::Stop(kind));
            assert_eq!(state, State::Idle);
            assert!(effects.is_empty());
        }
    }

    // Counter monotonicity
    #[test]
    fn test_counter_zeroed_on_start() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        fsm.counters.connect_retry = 5;
        let (_, _) = fsm.step(Event::Start(StartKind::Automatic));
        assert_eq!(fsm.counters.connect_retry, 0);
    }

    // Collision symmetry
    #[test]
    fn test_collision_higher_bgp_id_wins() {
        let a = Ipv4Addr::new(10, 0, 0, 1);
        let b = Ipv4Addr::new(10, 0, 0, 2);
        assert!(local_wins_collision(b, a));
        assert!(!local_wins_collision(a, b));
    }

    // S5 — four-octet negotiation
    #[test]
    fn test_four_octet_negotiation() {
        let mut config = peer_config(Mode::Active);
        Arc::get_mut(&mut config).unwrap().local_asn = 70000;
        let mut fsm = Fsm::new(config);
        let open = OpenMessage {
            version: 4,
            asn: AS_TRANS,
            hold_time: 90,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            capabilities: vec![Capability::FourOctetAsn(70000)],
        };
        fsm.apply_open(&open);
        assert!(fsm.flags.four_octets_asn);
        assert!(fsm.flags.ibgp);
    }

    #[test]
    fn test_graceful_restart_capability_recorded_not_negotiated() {
        let config = peer_config(Mode::Active);
        let mut fsm = Fsm::new(config);
        assert!(!fsm.flags.peer_graceful_restart);

        let open = OpenMessage {
            version: 4,
            asn: 65001,
            hold_time: 90,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            capabilities: vec![Capability::GracefulRestart {
                restarted: true,
                restart_time: 120,
                afs: Vec::new(),
            }],
        };
        fsm.apply_open(&open);
        assert!(fsm.flags.peer_graceful_restart);
    }

    #[test]
    fn test_passive_start_does_not_dial() {
        let mut fsm = Fsm::new(peer_config(Mode::Passive));
        let (state, effects) = fsm.step(Event::Start(StartKind::Automatic));
        assert_eq!(state, State::Active);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_idle_invariant_after_reset() {
        let mut fsm = Fsm::new(peer_config(Mode::Active));
        fsm.state = State::OpenSent;
        for timer in &mut fsm.timers {
            timer.start();
        }
        fsm.idle_result(None, false);
        for timer in &fsm.timers {
            assert!(!timer.running);
        }
    }
}
