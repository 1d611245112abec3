//! Socket options and their serde configuration form.

use serde::{Deserialize, Serialize};

use crate::name::PeerName;

/// Whether the exclude token of an outbound message is honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    /// The token is parsed and validated but every matching pipe receives
    /// the message, including the one it names
    #[default]
    Ignore,
    /// The pipe named by the token is skipped
    SkipExcluded,
}

/// Options accepted by the routing sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOption {
    /// Name announced to every peer (at most 4 bytes; set once)
    LocalName(PeerName),
    /// Exclusion policy for outbound messages
    Exclusion(ExclusionPolicy),
}

/// Router configuration, loadable from TOML or any serde format
///
/// ```toml
/// local_name = "edge"
/// exclusion = "skip_excluded"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Name announced to peers; the all-zero name when absent
    pub local_name: Option<PeerName>,
    /// Exclusion policy
    pub exclusion: ExclusionPolicy,
}

impl RouterConfig {
    /// Create a configuration with a local name and default policy
    pub fn named(name: impl Into<PeerName>) -> Self {
        Self {
            local_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Options to apply to a freshly created socket, in order
    pub fn options(&self) -> Vec<SocketOption> {
        let mut options = Vec::with_capacity(2);
        if let Some(name) = self.local_name {
            options.push(SocketOption::LocalName(name));
        }
        options.push(SocketOption::Exclusion(self.exclusion));
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert_eq!(config.local_name, None);
        assert_eq!(config.exclusion, ExclusionPolicy::Ignore);
        assert_eq!(
            config.options(),
            vec![SocketOption::Exclusion(ExclusionPolicy::Ignore)]
        );
    }

    #[test]
    fn test_named_config_options() {
        let config = RouterConfig::named("edge");
        assert_eq!(
            config.options(),
            vec![
                SocketOption::LocalName(PeerName::from("edge")),
                SocketOption::Exclusion(ExclusionPolicy::Ignore),
            ]
        );
    }

    #[test]
    fn test_config_from_toml() {
        let config: RouterConfig = toml::from_str(
            r#"
            local_name = "gateway"
            exclusion = "skip_excluded"
            "#,
        )
        .unwrap();

        assert_eq!(config.local_name, Some(PeerName::from("gate")));
        assert_eq!(config.exclusion, ExclusionPolicy::SkipExcluded);
    }

    #[test]
    fn test_config_toml_keeps_exact_name_bytes() {
        for raw in ["né", "a\\b", "q\"x", "ok"] {
            let config = RouterConfig::named(raw);
            let text = toml::to_string(&config).unwrap();
            let back: RouterConfig = toml::from_str(&text).unwrap();
            assert_eq!(back, config, "{text}");
        }
        let config: RouterConfig = toml::from_str(r#"local_name = "né""#).unwrap();
        assert_eq!(
            config.local_name.unwrap().as_bytes(),
            &[b'n', 0xc3, 0xa9, 0]
        );
    }

    #[test]
    fn test_config_toml_keeps_split_utf8_name() {
        // Truncation to four bytes cuts "é" in half.
        let config = RouterConfig::named("abcé");
        assert_eq!(config.local_name.unwrap().as_bytes(), &[b'a', b'b', b'c', 0xc3]);
        let text = toml::to_string(&config).unwrap();
        let back: RouterConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config, "{text}");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: RouterConfig = toml::from_str("").unwrap();
        assert_eq!(config, RouterConfig::default());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result: Result<RouterConfig, _> = toml::from_str(r#"exclusion = "sometimes""#);
        assert!(result.is_err());
    }
}
