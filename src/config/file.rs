use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;

use crate::codec::AS_TRANS;
use crate::utils::prefix_from_str;

use super::{Mode, Networks, Start};

struct Defaults;

impl Defaults {
    fn port() -> u16 {
        179
    }
    fn peer_asn() -> u32 {
        AS_TRANS as u32
    }
    fn mode() -> Mode {
        Mode::Active
    }
    fn start() -> Start {
        Start::Automatic
    }
    fn notification_without_open() -> bool {
        true
    }
    fn delay_open_enabled() -> bool {
        true
    }
    fn delay_open_seconds() -> u16 {
        5
    }
    fn connect_retry_seconds() -> u16 {
        120
    }
    fn hold_time_seconds() -> u16 {
        90
    }
    fn keep_alive_seconds() -> u16 {
        30
    }
    fn as_origination_seconds() -> u16 {
        15
    }
    fn route_advertisement_seconds() -> u16 {
        30
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct TimerSpec {
    pub(super) seconds: u16,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct DelayOpenSpec {
    #[serde(default = "Defaults::delay_open_enabled")]
    pub(super) enabled: bool,
    #[serde(default = "Defaults::delay_open_seconds")]
    pub(super) seconds: u16,
}

impl Default for DelayOpenSpec {
    fn default() -> Self {
        DelayOpenSpec {
            enabled: Defaults::delay_open_enabled(),
            seconds: Defaults::delay_open_seconds(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(super) struct TimersSpec {
    pub(super) connect_retry: TimerSpec,
    pub(super) delay_open: DelayOpenSpec,
    pub(super) hold_time: TimerSpec,
    pub(super) keep_alive: TimerSpec,
    pub(super) as_origination: TimerSpec,
    pub(super) route_advertisement: TimerSpec,
}

impl Default for TimersSpec {
    fn default() -> Self {
        TimersSpec {
            connect_retry: TimerSpec {
                seconds: Defaults::connect_retry_seconds(),
            },
            delay_open: DelayOpenSpec::default(),
            hold_time: TimerSpec {
                seconds: Defaults::hold_time_seconds(),
            },
            keep_alive: TimerSpec {
                seconds: Defaults::keep_alive_seconds(),
            },
            as_origination: TimerSpec {
                seconds: Defaults::as_origination_seconds(),
            },
            route_advertisement: TimerSpec {
                seconds: Defaults::route_advertisement_seconds(),
            },
        }
    }
}

/// Config (toml) representation of a single peer.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct PeerConfigSpec {
    #[serde(default = "Defaults::peer_asn")]
    pub(super) asn: u32,
    pub(super) bgp_id: Ipv4Addr,
    pub(super) host: IpAddr,
    #[serde(default = "Defaults::port")]
    pub(super) port: u16,
    #[serde(default = "Defaults::mode")]
    pub(super) mode: Mode,
    #[serde(default = "Defaults::start")]
    pub(super) start: Start,
    #[serde(default = "Defaults::notification_without_open")]
    pub(super) notification_without_open: bool,
    #[serde(default)]
    pub(super) timers: TimersSpec,
}

/// Config (toml) representation of the whole server.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ServerConfigSpec {
    pub(super) asn: u32,
    pub(super) bgp_id: Ipv4Addr,
    #[serde(default = "Defaults::port")]
    pub(super) port: u16,
    #[serde(default)]
    pub(super) networks: Vec<String>,
    #[serde(default)]
    pub(super) peers: Vec<PeerConfigSpec>,
}

impl ServerConfigSpec {
    pub(super) fn from_file(path: &str) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        toml::from_str(&contents)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }

    pub(super) fn parse_networks(&self) -> io::Result<Networks> {
        self.networks
            .iter()
            .map(|s| {
                prefix_from_str(s).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.reason))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::ServerConfig;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            asn = 65000
            bgp_id = "1.1.1.1"
            networks = ["10.1.0.0/16"]

            [[peers]]
            bgp_id = "10.0.0.2"
            host = "127.0.0.1"
            port = 1179
            mode = "passive"

            [peers.timers.hold_time]
            seconds = 30
        "#;
        let spec: super::ServerConfigSpec = toml::from_str(toml).unwrap();
        let config = ServerConfig::from_spec(spec).unwrap();
        assert_eq!(config.asn, 65000);
        assert_eq!(config.bgp_id, Ipv4Addr::new(1, 1, 1, 1));
        assert_eq!(config.networks.len(), 1);
        assert_eq!(config.peers.len(), 1);

        let peer = &config.peers[0];
        assert_eq!(peer.port, 1179);
        assert_eq!(peer.mode, super::Mode::Passive);
        assert_eq!(peer.timers.hold_time, 30);
        assert_eq!(peer.timers.connect_retry, 120);
        assert!(peer.timers.delay_open.enabled);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let toml = r#"
            asn = 65000
            bgp_id = "1.1.1.1"
            bogus = true
        "#;
        assert!(toml::from_str::<super::ServerConfigSpec>(toml).is_err());
    }
}
