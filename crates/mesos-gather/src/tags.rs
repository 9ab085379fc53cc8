//! Tags attached to every sample of an endpoint.

use std::io;

use serde::Serialize;
use tracing::warn;

use crate::endpoint::{default_port, Endpoint};

/// Value substituted when the local hostname cannot be read.
pub const UNKNOWN_HOST: &str = "unknown";

/// Source of the reporting host's identity.
pub trait HostnameProvider: Send + Sync {
    fn hostname(&self) -> io::Result<String>;
}

impl<F> HostnameProvider for F
where
    F: Fn() -> io::Result<String> + Send + Sync,
{
    fn hostname(&self) -> io::Result<String> {
        self()
    }
}

/// Reads the hostname from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostname;

impl HostnameProvider for SystemHostname {
    #[cfg(unix)]
    fn hostname(&self) -> io::Result<String> {
        let mut buf = vec![0u8; 256];
        // SAFETY: buf is writable for buf.len() bytes.
        let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(end);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    #[cfg(not(unix))]
    fn hostname(&self) -> io::Result<String> {
        std::env::var("COMPUTERNAME").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))
    }
}

/// The `{host, port}` tag pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSet {
    pub host: String,
    pub port: String,
}

impl TagSet {
    /// Build tags for `endpoint`. A failing or empty hostname degrades to
    /// [`UNKNOWN_HOST`].
    pub fn for_endpoint(endpoint: &Endpoint, hostname: &dyn HostnameProvider) -> Self {
        let port = if endpoint.port().is_empty() {
            default_port(endpoint.scheme()).to_string()
        } else {
            endpoint.port().to_string()
        };

        let host = match hostname.hostname() {
            Ok(h) if !h.trim().is_empty() => h.trim().to_string(),
            Ok(_) => {
                warn!(%endpoint, "local hostname is empty, tagging as unknown");
                UNKNOWN_HOST.to_string()
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "local hostname unavailable, tagging as unknown");
                UNKNOWN_HOST.to_string()
            }
        };

        Self { host, port }
    }

    /// Look up a tag by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "host" => Some(&self.host),
            "port" => Some(&self.port),
            _ => None,
        }
    }

    /// Key/value pairs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("host", self.host.as_str()), ("port", self.port.as_str())].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(name: &'static str) -> impl HostnameProvider {
        move || -> io::Result<String> { Ok(name.to_string()) }
    }

    fn failing() -> impl HostnameProvider {
        || -> io::Result<String> { Err(io::Error::other("no hostname")) }
    }

    #[test]
    fn tags_carry_explicit_port_and_hostname() {
        let ep = Endpoint::parse("http://localhost:5051").unwrap();
        let tags = TagSet::for_endpoint(&ep, &fixed("agent-7"));
        assert_eq!(tags.get("host"), Some("agent-7"));
        assert_eq!(tags.get("port"), Some("5051"));
        assert_eq!(tags.get("cluster"), None);
    }

    #[test]
    fn default_port_comes_from_scheme() {
        let ep = Endpoint::parse("https://master.local").unwrap();
        let tags = TagSet::for_endpoint(&ep, &fixed("h"));
        assert_eq!(tags.port, "443");
    }

    #[test]
    fn hostname_failure_degrades_to_unknown() {
        let ep = Endpoint::parse("http://localhost:5050").unwrap();
        let tags = TagSet::for_endpoint(&ep, &failing());
        assert_eq!(tags.host, UNKNOWN_HOST);
        assert_eq!(tags.port, "5050");
    }

    #[test]
    fn empty_hostname_degrades_to_unknown() {
        let ep = Endpoint::parse("http://localhost:5050").unwrap();
        let tags = TagSet::for_endpoint(&ep, &fixed("  "));
        assert_eq!(tags.host, UNKNOWN_HOST);
    }

    #[test]
    fn iter_yields_exactly_host_and_port() {
        let ep = Endpoint::parse("http://localhost:5050").unwrap();
        let tags = TagSet::for_endpoint(&ep, &fixed("h"));
        let keys: Vec<_> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["host", "port"]);
    }

    #[cfg(unix)]
    #[test]
    fn system_hostname_is_readable() {
        let name = SystemHostname.hostname().unwrap();
        assert!(!name.contains('\0'));
    }
}
