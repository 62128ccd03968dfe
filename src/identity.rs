use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::SocketAddr;

// Hashed (address, user agent) pair used as the rate limit key.
// Spoofable, only good enough for coarse throttling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// sha256("<address>:<user agent>") as lowercase hex
pub fn identify(source_address: &str, user_agent: &str) -> ClientIdentity {
    let mut hasher = Sha256::new();
    hasher.update(source_address);
    hasher.update(":");
    hasher.update(user_agent);
    ClientIdentity(format!("{:x}", hasher.finalize()))
}

/// Resolves the address a request came from.
///
/// The peer IP is used unless `trust_forwarded` is set, in which case the
/// first `X-Forwarded-For` hop wins, then `X-Real-IP`.
pub fn client_address(headers: &HeaderMap, peer: SocketAddr, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = real_ip {
            return addr.to_string();
        }
    }

    peer.ip().to_string()
}

pub fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 7], 51234))
    }

    #[test]
    fn test_identify_known_digest() {
        assert_eq!(
            identify("1.2.3.4", "curl/8.0").as_str(),
            "75c89ebbaf1a55dadb55d1bd638cb38c4d8534cfcee3ab626d5a8cc90255e27b"
        );
        // missing user agent hashes as empty
        assert_eq!(
            identify("1.2.3.4", "").as_str(),
            "99407fe80651ed8e7fa50eeab61084752319d654d0cd426517da3e3dd3445c35"
        );
    }

    #[test]
    fn test_identify_is_deterministic() {
        assert_eq!(identify("1.2.3.4", "ua"), identify("1.2.3.4", "ua"));
        assert_ne!(identify("1.2.3.4", "ua"), identify("1.2.3.5", "ua"));
        assert_ne!(identify("1.2.3.4", "ua"), identify("1.2.3.4", "ub"));
    }

    #[test]
    fn test_client_address_uses_peer_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_address(&headers, peer(), false), "10.0.0.7");
    }

    #[test]
    fn test_client_address_forwarded_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 9.9.9.9 , 172.16.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("8.8.8.8"));
        assert_eq!(client_address(&headers, peer(), true), "9.9.9.9");

        headers.remove("x-forwarded-for");
        assert_eq!(client_address(&headers, peer(), true), "8.8.8.8");

        headers.remove("x-real-ip");
        assert_eq!(client_address(&headers, peer(), true), "10.0.0.7");
    }

    #[test]
    fn test_user_agent_missing_is_empty() {
        assert_eq!(user_agent(&HeaderMap::new()), "");
    }
}
