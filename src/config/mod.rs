mod file;

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use serde::Deserialize;

use crate::codec::Prefix;

/// Parse a TOML config file and return a validated `ServerConfig`.
pub fn from_file(path: &str) -> io::Result<ServerConfig> {
    let spec = file::ServerConfigSpec::from_file(path)?;
    ServerConfig::from_spec(spec)
}

pub type Networks = Vec<Prefix>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Active,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Start {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayOpenTimer {
    pub enabled: bool,
    pub seconds: u16,
}

/// Per-peer timer settings, all in seconds. Mirrors the six named FSM timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub connect_retry: u16,
    pub delay_open: DelayOpenTimer,
    pub hold_time: u16,
    pub keep_alive: u16,
    pub as_origination: u16,
    pub route_advertisement: u16,
}

impl From<file::TimersSpec> for Timers {
    fn from(spec: file::TimersSpec) -> Self {
        Timers {
            connect_retry: spec.connect_retry.seconds,
            delay_open: DelayOpenTimer {
                enabled: spec.delay_open.enabled,
                seconds: spec.delay_open.seconds,
            },
            hold_time: spec.hold_time.seconds,
            keep_alive: spec.keep_alive.seconds,
            as_origination: spec.as_origination.seconds,
            route_advertisement: spec.route_advertisement.seconds,
        }
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub asn: u32,
    pub bgp_id: Ipv4Addr,
    pub port: u16,
    pub networks: Networks,
    pub peers: Vec<Arc<PeerConfig>>,
}

/// Immutable per-session peer configuration (spec §3).
#[derive(Debug)]
pub struct PeerConfig {
    pub local_asn: u32,
    pub local_bgp_id: Ipv4Addr,
    pub asn: u32,
    pub bgp_id: Ipv4Addr,
    pub host: IpAddr,
    pub port: u16,
    pub mode: Mode,
    pub start: Start,
    pub notification_without_open: bool,
    pub timers: Timers,
    pub networks: Networks,
}

impl PeerConfig {
    pub fn is_ebgp(&self) -> bool {
        self.asn != self.local_asn
    }
}

impl ServerConfig {
    fn from_spec(spec: file::ServerConfigSpec) -> io::Result<Self> {
        let networks = spec.parse_networks()?;
        let peers = spec
            .peers
            .iter()
            .map(|p| {
                Arc::new(PeerConfig {
                    local_asn: spec.asn,
                    local_bgp_id: spec.bgp_id,
                    asn: p.asn,
                    bgp_id: p.bgp_id,
                    host: p.host,
                    port: p.port,
                    mode: p.mode,
                    start: p.start,
                    notification_without_open: p.notification_without_open,
                    timers: p.timers.clone().into(),
                    networks: networks.clone(),
                })
            })
            .collect();

        Ok(Self {
            asn: spec.asn,
            bgp_id: spec.bgp_id,
            port: spec.port,
            networks,
            peers,
        })
    }
}
