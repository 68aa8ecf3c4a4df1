//! Network configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Properties handed to the engine for network sources
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP user agent; the engine default is used when unset
    pub user_agent: Option<String>,

    /// HTTP referrer sent with requests
    pub referrer: Option<String>,

    /// Connection speed hint in kbit/s, 0 for unknown
    pub connection_speed_kbps: u64,
}

impl ConfigSection for NetworkConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::in_range(
            self.connection_speed_kbps,
            0,
            10_000_000,
            "network.connection_speed_kbps",
        )];

        if let Some(ref agent) = self.user_agent {
            results.push(Validator::not_empty(agent, "network.user_agent"));
        }
        if let Some(ref referrer) = self.referrer {
            results.push(Validator::not_empty(referrer, "network.referrer"));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent;
        }
        if other.referrer.is_some() {
            self.referrer = other.referrer;
        }
        self.connection_speed_kbps = other.connection_speed_kbps;
    }

    fn section_name(&self) -> &'static str {
        "network"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(NetworkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_blank_user_agent_rejected() {
        let config = NetworkConfig {
            user_agent: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_speed_limit() {
        let config = NetworkConfig {
            connection_speed_kbps: 20_000_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_keeps_unset_strings() {
        let mut base = NetworkConfig {
            user_agent: Some("Cadence/0.1".to_string()),
            ..Default::default()
        };
        base.merge(NetworkConfig {
            referrer: Some("https://example.com".to_string()),
            connection_speed_kbps: 512,
            ..Default::default()
        });
        assert_eq!(base.user_agent.as_deref(), Some("Cadence/0.1"));
        assert_eq!(base.referrer.as_deref(), Some("https://example.com"));
        assert_eq!(base.connection_speed_kbps, 512);
    }
}
