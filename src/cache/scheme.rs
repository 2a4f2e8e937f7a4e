//! Backend scheme registry and URI handling
//!
//! Backend URIs look like `scheme://server1;server2;.../`. The scheme picks a
//! [`BackendKind`]; the rest is an ordered list of `host:port` addresses.

use super::backend::BoundClient;
use super::errors::{CacheError, CacheResult};
use super::providers::FallbackClient;
use super::resolver::ClientResolver;
use super::types::BackendOptions;
use std::fmt;
use std::str::FromStr;

/// Every registered backend scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// `memcache://`: best available memcached client
    Memcache,
    /// `memcached://`: alias of `memcache`
    Memcached,
    /// `libmemcached://`: alias of `memcache`
    Libmemcached,
    /// `memory://`: in-process LRU fallback
    Memory,
}

impl BackendKind {
    /// Registration order, used in error messages
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Memcache,
        BackendKind::Memcached,
        BackendKind::Libmemcached,
        BackendKind::Memory,
    ];

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Memcache => "memcache",
            Self::Memcached => "memcached",
            Self::Libmemcached => "libmemcached",
            Self::Memory => "memory",
        }
    }

    /// Names of all registered schemes
    pub fn registered_names() -> Vec<&'static str> {
        Self::ALL.iter().map(BackendKind::scheme).collect()
    }

    /// Whether this kind talks to a memcached server
    pub fn is_networked(&self) -> bool {
        !matches!(self, Self::Memory)
    }

    /// Construct the client for this kind
    pub(crate) fn connect(
        &self,
        servers: &[String],
        opts: &BackendOptions,
        resolver: &ClientResolver,
    ) -> CacheResult<BoundClient> {
        match self {
            Self::Memcache | Self::Memcached | Self::Libmemcached => {
                Ok(BoundClient::Network(resolver.connect(servers, opts)?))
            }
            Self::Memory => Ok(BoundClient::Fallback(FallbackClient::from_options(
                servers, opts,
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    /// Scheme names match exactly
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.scheme() == s)
            .ok_or_else(|| unknown_backend(s))
    }
}

pub(crate) fn unknown_backend(name: &str) -> CacheError {
    CacheError::configuration(format!(
        "Unknown cache backend: {}. Please use one of the following backends: {}",
        name,
        BackendKind::registered_names().join(", ")
    ))
}

/// A parsed backend URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUri {
    pub kind: BackendKind,
    pub servers: Vec<String>,
}

impl BackendUri {
    pub fn new(kind: BackendKind, servers: Vec<String>) -> Self {
        Self { kind, servers }
    }

    /// Parse `scheme://s1;s2;.../`. Trailing `/` and `;` are stripped and
    /// empty segments dropped. A bare `scheme` has no servers.
    pub fn parse(uri: &str) -> CacheResult<Self> {
        let (scheme, rest) = uri.split_once("://").unwrap_or((uri, ""));
        let kind: BackendKind = scheme.parse()?;

        let servers = rest
            .trim_end_matches(|c| c == '/' || c == ';')
            .split(';')
            .map(str::trim)
            .filter(|server| !server.is_empty())
            .map(String::from)
            .collect();

        Ok(Self { kind, servers })
    }

    /// Render back to `scheme://s1;s2/`
    pub fn render(&self) -> String {
        format!("{}://{}/", self.kind.scheme(), self.servers.join(";"))
    }
}

impl fmt::Display for BackendUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for BackendUri {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names() {
        assert_eq!(
            BackendKind::registered_names(),
            vec!["memcache", "memcached", "libmemcached", "memory"]
        );
    }

    #[test]
    fn test_parse_kind_is_exact() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("Memory".parse::<BackendKind>().unwrap_err().is_configuration());
        assert!(" memcached ".parse::<BackendKind>().is_err());
        assert!(BackendUri::parse("MEMORY://").is_err());
    }

    #[test]
    fn test_unknown_scheme_lists_registered_names() {
        let err = "bogus".parse::<BackendKind>().unwrap_err();
        assert!(err.is_configuration());
        let message = err.to_string();
        assert!(message.contains("bogus"));
        assert!(message.contains("memcache, memcached, libmemcached, memory"));
    }

    #[test]
    fn test_parse_server_list() {
        let uri = BackendUri::parse("memcache://10.0.0.1:11211;10.0.0.2:11211/").unwrap();
        assert_eq!(uri.kind, BackendKind::Memcache);
        assert_eq!(uri.servers, vec!["10.0.0.1:11211", "10.0.0.2:11211"]);
    }

    #[test]
    fn test_parse_strips_trailing_separators() {
        let uri = BackendUri::parse("memcached://a:1;b:2;/").unwrap();
        assert_eq!(uri.servers, vec!["a:1", "b:2"]);

        let uri = BackendUri::parse("memcached://a:1;;b:2;;//").unwrap();
        assert_eq!(uri.servers, vec!["a:1", "b:2"]);
    }

    #[test]
    fn test_parse_memory_without_servers() {
        for raw in ["memory://", "memory:///", "memory"] {
            let uri = BackendUri::parse(raw).unwrap();
            assert_eq!(uri.kind, BackendKind::Memory);
            assert!(uri.servers.is_empty(), "{} should have no servers", raw);
        }
    }

    #[test]
    fn test_render_round_trip() {
        let uri = BackendUri::new(
            BackendKind::Libmemcached,
            vec!["a:11211".to_string(), "b:11211".to_string()],
        );
        assert_eq!(uri.render(), "libmemcached://a:11211;b:11211/");
        assert_eq!(BackendUri::parse(&uri.render()).unwrap(), uri);

        let memory = BackendUri::new(BackendKind::Memory, vec![]);
        assert_eq!(memory.to_string(), "memory:///");
        assert_eq!(memory.to_string().parse::<BackendUri>().unwrap(), memory);
    }

    #[test]
    fn test_networked_kinds() {
        assert!(BackendKind::Memcache.is_networked());
        assert!(BackendKind::Memcached.is_networked());
        assert!(BackendKind::Libmemcached.is_networked());
        assert!(!BackendKind::Memory.is_networked());
    }
}
