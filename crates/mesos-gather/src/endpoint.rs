//! Address resolution.
//!
//! Turns a configured address such as `http://localhost:5050` into an
//! [`Endpoint`] with the port always filled in from the scheme when the
//! address does not name one.

use std::fmt;

use http::Uri;

use crate::error::ResolutionError;

/// A validated, immutable endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: String,
    authority: String,
    base_path: String,
}

impl Endpoint {
    /// Parse an address string into an endpoint.
    pub fn parse(address: &str) -> Result<Self, ResolutionError> {
        let uri: Uri = address
            .trim()
            .parse()
            .map_err(|e: http::uri::InvalidUri| ResolutionError::new(address, e.to_string()))?;

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| ResolutionError::new(address, "missing scheme"))?
            .to_ascii_lowercase();
        let authority = uri
            .authority()
            .ok_or_else(|| ResolutionError::new(address, "missing host"))?;
        if authority.host().is_empty() {
            return Err(ResolutionError::new(address, "missing host"));
        }
        if authority.as_str().contains('@') {
            return Err(ResolutionError::new(address, "credentials in addresses are not supported"));
        }
        if uri.query().is_some() {
            return Err(ResolutionError::new(address, "query strings are not supported"));
        }

        let port = match explicit_port(authority.as_str()) {
            Some(text) => text
                .parse::<u16>()
                .map_err(|_| ResolutionError::new(address, "invalid port"))?
                .to_string(),
            None => default_port(&scheme).to_string(),
        };

        Ok(Self {
            host: authority.host().to_string(),
            authority: authority.as_str().to_string(),
            base_path: uri.path().trim_end_matches('/').to_string(),
            scheme,
            port,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the scheme default. Empty only for schemes
    /// without a well-known port.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// `scheme://authority[/base/path]` without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority, self.base_path)
    }

    /// Full URL of `path` under this endpoint.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url())
        } else {
            format!("{}/{path}", self.base_url())
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// Well-known port for a scheme, empty when there is none.
pub fn default_port(scheme: &str) -> &'static str {
    match scheme {
        "http" => "80",
        "https" => "443",
        _ => "",
    }
}

/// Port text after the host, if the authority names one. `http::Uri`
/// drops ports that do not fit a u16, so read it from the raw authority.
fn explicit_port(authority: &str) -> Option<&str> {
    let after_host = match authority.rfind(']') {
        Some(i) => &authority[i + 1..],
        None => authority,
    };
    after_host.rsplit_once(':').map(|(_, port)| port)
}

/// Resolve every address in order, stopping at the first malformed one.
pub fn resolve_all<I, S>(addresses: I) -> Result<Vec<Endpoint>, ResolutionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    addresses
        .into_iter()
        .map(|a| Endpoint::parse(a.as_ref()))
        .collect()
}
