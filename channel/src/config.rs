//! Channel configuration
//!
//! Configuration is validated at construction; a channel never runs with an
//! origin pattern or scope it could not interpret.

use crate::error::ConfigError;
use std::fmt;

/// Peer origin filter for inbound events.
///
/// Either the wildcard (accept any sender origin) or one exact
/// `http(s)://host[:port]` origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerOrigin {
    /// Accept events from any origin
    Wildcard,
    /// Accept events only from this exact origin
    Origin(String),
}

impl PeerOrigin {
    /// Parses an origin pattern, validating its shape
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        if pattern == "*" {
            return Ok(PeerOrigin::Wildcard);
        }
        if is_valid_origin(pattern) {
            Ok(PeerOrigin::Origin(pattern.to_string()))
        } else {
            Err(ConfigError::InvalidOrigin(pattern.to_string()))
        }
    }

    /// Checks whether an event's declared sender origin is acceptable
    pub fn accepts(&self, origin: &str) -> bool {
        match self {
            PeerOrigin::Wildcard => true,
            PeerOrigin::Origin(expected) => expected == origin,
        }
    }
}

impl fmt::Display for PeerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerOrigin::Wildcard => write!(f, "*"),
            PeerOrigin::Origin(origin) => write!(f, "{}", origin),
        }
    }
}

fn is_valid_origin(pattern: &str) -> bool {
    let rest = match pattern
        .strip_prefix("https://")
        .or_else(|| pattern.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return false,
    };

    let (host, port) = match rest.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (rest, None),
    };

    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return false;
    }

    match port {
        None => true,
        Some(port) => !port.is_empty() && port.len() <= 5 && port.chars().all(|c| c.is_ascii_digit()),
    }
}

/// Namespace prefix disambiguating method names when several channels share
/// one transport.
///
/// On the wire, every method of a scoped channel travels as
/// `scope::method`; inbound methods missing the prefix are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceScope(String);

impl NamespaceScope {
    /// Parses a scope, rejecting empty scopes and the `::` separator
    pub fn parse(scope: &str) -> Result<Self, ConfigError> {
        if scope.is_empty() || scope.contains("::") {
            return Err(ConfigError::InvalidScope(scope.to_string()));
        }
        Ok(NamespaceScope(scope.to_string()))
    }

    /// Returns the scope text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefixes a local method name into its wire form
    pub fn apply(&self, method: &str) -> String {
        format!("{}::{}", self.0, method)
    }

    /// Strips the prefix from a wire method name; `None` if it does not
    /// carry this scope
    pub fn strip<'a>(&self, wire_method: &'a str) -> Option<&'a str> {
        wire_method.strip_prefix(self.0.as_str())?.strip_prefix("::")
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end of the handshake this channel plays.
///
/// The two roles partition the transaction-id space by parity, so both
/// peers allocate ids independently without collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    /// Owns the peer frame; starts not ready and allocates even ids
    Host,
    /// Runs inside the hosted frame, talking to its own parent context;
    /// starts already ready and allocates odd ids
    Guest,
}

impl ChannelRole {
    /// True if this role is ready before any handshake message arrives
    pub fn starts_ready(&self) -> bool {
        matches!(self, ChannelRole::Guest)
    }

    /// First transaction id this role allocates (stepping by 2)
    pub fn first_transaction_id(&self) -> u64 {
        match self {
            ChannelRole::Host => 2,
            ChannelRole::Guest => 1,
        }
    }
}

/// Construction-time channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    peer_origin: PeerOrigin,
    scope: Option<NamespaceScope>,
    role: ChannelRole,
}

impl ChannelConfig {
    /// Creates a configuration for the given peer origin pattern and role
    pub fn new(peer_origin: &str, role: ChannelRole) -> Result<Self, ConfigError> {
        Ok(Self {
            peer_origin: PeerOrigin::parse(peer_origin)?,
            scope: None,
            role,
        })
    }

    /// Sets the namespace scope
    pub fn with_scope(mut self, scope: &str) -> Result<Self, ConfigError> {
        self.scope = Some(NamespaceScope::parse(scope)?);
        Ok(self)
    }

    /// Returns the peer origin filter
    pub fn peer_origin(&self) -> &PeerOrigin {
        &self.peer_origin
    }

    /// Returns the namespace scope, if configured
    pub fn scope(&self) -> Option<&NamespaceScope> {
        self.scope.as_ref()
    }

    /// Returns the handshake role
    pub fn role(&self) -> ChannelRole {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_origin_accepts_anything() {
        let origin = PeerOrigin::parse("*").unwrap();
        assert!(origin.accepts("https://evil.example.com"));
    }

    #[test]
    fn test_exact_origin_match() {
        let origin = PeerOrigin::parse("https://app.example.com:8443").unwrap();
        assert!(origin.accepts("https://app.example.com:8443"));
        assert!(!origin.accepts("https://app.example.com"));
        assert!(!origin.accepts("http://app.example.com:8443"));
    }

    #[test]
    fn test_invalid_origin_patterns() {
        for pattern in [
            "",
            "app.example.com",
            "ftp://app.example.com",
            "https://",
            "https://host:port",
            "https://host:123456",
            "https://host/path",
        ] {
            assert!(
                PeerOrigin::parse(pattern).is_err(),
                "expected rejection: {pattern}"
            );
        }
    }

    #[test]
    fn test_scope_apply_and_strip() {
        let scope = NamespaceScope::parse("testScope").unwrap();
        assert_eq!(scope.apply("echo"), "testScope::echo");
        assert_eq!(scope.strip("testScope::echo"), Some("echo"));
        assert_eq!(scope.strip("otherScope::echo"), None);
        assert_eq!(scope.strip("echo"), None);
    }

    #[test]
    fn test_scope_rejects_separator_and_empty() {
        assert!(NamespaceScope::parse("a::b").is_err());
        assert!(NamespaceScope::parse("").is_err());
    }

    #[test]
    fn test_role_parity_partition() {
        assert_eq!(ChannelRole::Host.first_transaction_id() % 2, 0);
        assert_eq!(ChannelRole::Guest.first_transaction_id() % 2, 1);
        assert!(ChannelRole::Guest.starts_ready());
        assert!(!ChannelRole::Host.starts_ready());
    }

    #[test]
    fn test_config_builder() {
        let config = ChannelConfig::new("*", ChannelRole::Host)
            .unwrap()
            .with_scope("files")
            .unwrap();
        assert_eq!(config.scope().unwrap().as_str(), "files");
        assert_eq!(config.role(), ChannelRole::Host);
    }
}
