//------------ Config --------------------------------------------------------

//! The settings of a run.
//!
//! All settings have defaults that reproduce the daily update as it always
//! ran: the public feeds, 20 work items in flight, a visibility threshold of
//! 5 peers and decimal IPv4 registry matching. A JSON file can override any
//! subset of them; fields it leaves out keep their defaults.

use std::path::Path;

use serde_derive::Deserialize;

use crate::coordinator::DEFAULT_MAX_IN_FLIGHT;
use crate::errors::ConfigError;
use crate::ingest::DEFAULT_MIN_PEERS;
use crate::registry::Ipv4RirMatching;

pub const DEFAULT_VRP_URL: &str = "http://rpki.surfnet.nl:8080/export.csv";
pub const DEFAULT_RIS_V4_URL: &str =
    "http://www.ris.ripe.net/dumps/riswhoisdump.IPv4.gz";
pub const DEFAULT_RIS_V6_URL: &str =
    "http://www.ris.ripe.net/dumps/riswhoisdump.IPv6.gz";
pub const DEFAULT_RIR_V4_URL: &str =
    "http://www.iana.org/assignments/ipv4-address-space/ipv4-address-space.csv";
pub const DEFAULT_RIR_V6_URL: &str = "http://www.iana.org/assignments/\
    ipv6-unicast-address-assignments/ipv6-unicast-address-assignments.csv";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// The VRP export, CSV.
    pub vrps: String,
    /// The RIS whois dump of IPv4 routes.
    pub ris_v4: String,
    /// The RIS whois dump of IPv6 routes.
    pub ris_v6: String,
    /// The IANA IPv4 address space registry, CSV.
    pub rirs_v4: String,
    /// The IANA IPv6 unicast assignments registry, CSV.
    pub rirs_v6: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            vrps: DEFAULT_VRP_URL.to_string(),
            ris_v4: DEFAULT_RIS_V4_URL.to_string(),
            ris_v6: DEFAULT_RIS_V6_URL.to_string(),
            rirs_v4: DEFAULT_RIR_V4_URL.to_string(),
            rirs_v6: DEFAULT_RIR_V6_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub feeds: FeedConfig,
    /// The number of work items that run at the same time, in every stage.
    pub max_in_flight: usize,
    /// Routes seen by fewer peers are not loaded.
    pub min_peers: u32,
    pub ipv4_rir_matching: Ipv4RirMatching,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: FeedConfig::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            min_peers: DEFAULT_MIN_PEERS,
            ipv4_rir_matching: Ipv4RirMatching::default(),
        }
    }
}

impl Config {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(path, &json)
    }

    /// Apply the settings given on the command line on top of these.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(n) = overrides.max_in_flight {
            self.max_in_flight = n;
        }
        if let Some(n) = overrides.min_peers {
            self.min_peers = n;
        }
        if let Some(m) = overrides.ipv4_rir_matching {
            self.ipv4_rir_matching = m;
        }
        self
    }
}

//------------ Overrides -----------------------------------------------------

/// Settings that replace those of a [Config] when given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overrides {
    pub max_in_flight: Option<usize>,
    pub min_peers: Option<u32>,
    pub ipv4_rir_matching: Option<Ipv4RirMatching>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.max_in_flight, 20);
        assert_eq!(config.min_peers, 5);
        assert_eq!(config.ipv4_rir_matching, Ipv4RirMatching::DecimalPrefix);
        assert!(config.feeds.ris_v6.ends_with("riswhoisdump.IPv6.gz"));
        assert_eq!(
            config.feeds.rirs_v6,
            "http://www.iana.org/assignments/ipv6-unicast-address-assignments/\
            ipv6-unicast-address-assignments.csv"
        );
    }

    #[test]
    fn partial_file() {
        let config = Config::from_json(
            Path::new("rov.json"),
            r#"{
                "max_in_flight": 4,
                "ipv4_rir_matching": "cidr",
                "feeds": { "vrps": "file:///tmp/export.csv" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.min_peers, 5);
        assert_eq!(config.ipv4_rir_matching, Ipv4RirMatching::Cidr);
        assert_eq!(config.feeds.vrps, "file:///tmp/export.csv");
        assert_eq!(config.feeds.ris_v4, DEFAULT_RIS_V4_URL);
    }

    #[test]
    fn unknown_fields() {
        assert!(matches!(
            Config::from_json(Path::new("rov.json"), r#"{ "capacity": 4 }"#),
            Err(ConfigError::Json { .. })
        ));
        assert!(matches!(
            Config::from_json(
                Path::new("rov.json"),
                r#"{ "reset_match_trail": false }"#
            ),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn overrides_replace_file_settings() {
        let file = Config::from_json(
            Path::new("rov.json"),
            r#"{
                "max_in_flight": 4,
                "min_peers": 2,
                "ipv4_rir_matching": "cidr"
            }"#,
        )
        .unwrap();

        let config = file.clone().with_overrides(&Overrides::default());
        assert_eq!(config, file);

        let config = file.clone().with_overrides(&Overrides {
            max_in_flight: Some(12),
            ..Default::default()
        });
        assert_eq!(config.max_in_flight, 12);
        assert_eq!(config.min_peers, 2);
        assert_eq!(config.ipv4_rir_matching, Ipv4RirMatching::Cidr);

        let config = file.clone().with_overrides(&Overrides {
            min_peers: Some(7),
            ..Default::default()
        });
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.min_peers, 7);

        let config = file.with_overrides(&Overrides {
            ipv4_rir_matching: Some("decimal".parse().unwrap()),
            ..Default::default()
        });
        assert_eq!(config.ipv4_rir_matching, Ipv4RirMatching::DecimalPrefix);
        assert_eq!(config.min_peers, 2);
    }

    #[test]
    fn overrides_on_defaults() {
        let config = Config::default().with_overrides(&Overrides {
            max_in_flight: Some(1),
            min_peers: Some(0),
            ipv4_rir_matching: Some("cidr".parse().unwrap()),
        });
        assert_eq!(config.max_in_flight, 1);
        assert_eq!(config.min_peers, 0);
        assert_eq!(config.ipv4_rir_matching, Ipv4RirMatching::Cidr);
        assert_eq!(config.feeds, FeedConfig::default());
    }
}
