// ABOUTME: SSH address of the deploy server.
// ABOUTME: Parses "[user@]host[:port]" where host may be an alias from ~/.ssh/config.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::ssh::SessionConfig;

const DEFAULT_PORT: u16 = 22;

/// Server address as written by the user.
///
/// User and port stay unset unless given, so `~/.ssh/config` can supply them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshAddress {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
}

impl SshAddress {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("SSH address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) if !user.is_empty() => (Some(user), rest),
            Some(_) => return Err("SSH user cannot be empty".to_string()),
            None => (None, s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port))?;
                (host, Some(port))
            }
            None => (rest, None),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(SshAddress {
            host: host.to_string(),
            port,
            user: user.map(|u| u.to_string()),
        })
    }

    /// Git remote URL for a repository at `path` on this server.
    ///
    /// A leading `~/` keeps the path relative to the remote home directory.
    /// User and port are only included when given, leaving the rest to the
    /// ssh client and its config.
    pub fn git_url(&self, path: &str) -> String {
        let path = path.strip_prefix("~/").map_or_else(
            || path.trim_start_matches('/').to_string(),
            |rest| format!("~/{rest}"),
        );
        format!("ssh://{self}/{path}")
    }

    /// Session settings for connecting to this address.
    ///
    /// The host is looked up in `~/.ssh/config`; explicit user and port win.
    pub fn session_config(&self) -> SessionConfig {
        let entry = match russh_config::parse_home(&self.host) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("No ssh config entry for {}: {}", self.host, e);
                None
            }
        };
        self.session_config_from(entry)
    }

    fn session_config_from(&self, entry: Option<russh_config::Config>) -> SessionConfig {
        let Some(entry) = entry else {
            return SessionConfig::new(&self.host, self.user_or_default())
                .port(self.port.unwrap_or(DEFAULT_PORT))
                .trust_on_first_use(true);
        };

        let mut config = SessionConfig::new(
            entry.host_name,
            self.user.clone().unwrap_or(entry.user),
        )
        .port(self.port.unwrap_or(entry.port))
        .trust_on_first_use(true);
        if let Some(identity_file) = entry.identity_file {
            config = config.key_path(identity_file);
        }
        config
    }

    /// User to log in as, falling back to `$USER` and then `root`.
    fn user_or_default(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }
}

impl fmt::Display for SshAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for SshAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SshAddress::parse(s)
    }
}

impl Serialize for SshAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SshAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SshAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_host_only() {
        let addr = SshAddress::parse("home.lan").unwrap();
        assert_eq!(addr.host, "home.lan");
        assert_eq!(addr.port, None);
        assert!(addr.user.is_none());
    }

    #[test]
    fn parse_user_host_port() {
        let addr = SshAddress::parse("deploy@10.0.0.2:2222").unwrap();
        assert_eq!(addr.user.as_deref(), Some("deploy"));
        assert_eq!(addr.host, "10.0.0.2");
        assert_eq!(addr.port, Some(2222));
    }

    #[test]
    fn parse_rejects_bad_port() {
        assert!(SshAddress::parse("host:ssh").unwrap_err().contains("port"));
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(SshAddress::parse("").is_err());
        assert!(SshAddress::parse("@host").is_err());
        assert!(SshAddress::parse("user@:22").is_err());
    }

    #[test]
    fn display_keeps_given_parts() {
        assert_eq!(
            SshAddress::parse("pi@raspberry").unwrap().to_string(),
            "pi@raspberry"
        );
        assert_eq!(
            SshAddress::parse("pi@raspberry:2200").unwrap().to_string(),
            "pi@raspberry:2200"
        );
        assert_eq!(SshAddress::parse("homelab").unwrap().to_string(), "homelab");
    }

    #[test]
    fn git_url_keeps_home_relative_path() {
        let addr = SshAddress::parse("pi@raspberry:2200").unwrap();
        assert_eq!(
            addr.git_url("~/.hmd/blog/git"),
            "ssh://pi@raspberry:2200/~/.hmd/blog/git"
        );
        assert_eq!(
            addr.git_url("/srv/git/blog"),
            "ssh://pi@raspberry:2200/srv/git/blog"
        );
    }

    #[test]
    fn git_url_of_alias_leaves_user_and_port_to_ssh() {
        let addr = SshAddress::parse("homelab").unwrap();
        assert_eq!(
            addr.git_url("~/.hmd/blog/git"),
            "ssh://homelab/~/.hmd/blog/git"
        );
    }

    const SSH_CONFIG: &str = "Host homelab\n  HostName 10.0.0.5\n  User deploy\n  Port 2222\n  IdentityFile /keys/homelab\n";

    #[test]
    fn alias_resolves_through_ssh_config() {
        let addr = SshAddress::parse("homelab").unwrap();
        let entry = russh_config::parse(SSH_CONFIG, "homelab").unwrap();

        let session = addr.session_config_from(Some(entry));

        assert_eq!(session.host, "10.0.0.5");
        assert_eq!(session.user, "deploy");
        assert_eq!(session.port, 2222);
        assert_eq!(session.key_path, Some(PathBuf::from("/keys/homelab")));
        assert!(session.trust_on_first_use);
    }

    #[test]
    fn explicit_user_and_port_override_ssh_config() {
        let addr = SshAddress::parse("admin@homelab:2200").unwrap();
        let entry = russh_config::parse(SSH_CONFIG, "homelab").unwrap();

        let session = addr.session_config_from(Some(entry));

        assert_eq!(session.host, "10.0.0.5");
        assert_eq!(session.user, "admin");
        assert_eq!(session.port, 2200);
    }

    #[test]
    fn unknown_host_is_used_literally() {
        let addr = SshAddress::parse("pi@raspberry").unwrap();
        let entry = russh_config::parse(SSH_CONFIG, "raspberry").unwrap();

        let session = addr.session_config_from(Some(entry));

        assert_eq!(session.host, "raspberry");
        assert_eq!(session.user, "pi");
        assert_eq!(session.port, 22);
        assert_eq!(session.key_path, None);
    }

    #[test]
    fn missing_ssh_config_defaults_port() {
        let addr = SshAddress::parse("pi@raspberry").unwrap();

        let session = addr.session_config_from(None);

        assert_eq!(session.host, "raspberry");
        assert_eq!(session.user, "pi");
        assert_eq!(session.port, 22);
    }
}
