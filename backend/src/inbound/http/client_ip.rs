//! Client address extraction for rate limiting.

use std::net::IpAddr;

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};

use crate::domain::RateLimitKey;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

fn header_ip(req: &HttpRequest, name: &str) -> Option<IpAddr> {
    let value = req.headers().get(name)?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}

/// Best-effort client address.
///
/// Reads the first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    /// Resolve the address for `req`.
    pub fn of(req: &HttpRequest) -> Self {
        let ip = header_ip(req, FORWARDED_FOR)
            .or_else(|| header_ip(req, REAL_IP))
            .or_else(|| req.peer_addr().map(|addr| addr.ip()));
        Self(ip)
    }

    /// Rate-limit key for this address.
    pub fn rate_limit_key(&self) -> RateLimitKey {
        match self.0 {
            Some(ip) => RateLimitKey::ip(&ip.to_string()),
            None => RateLimitKey::ip(UNKNOWN_CLIENT),
        }
    }
}

impl FromRequest for ClientIp {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self::of(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;
    use std::net::SocketAddr;

    fn peer() -> SocketAddr {
        "192.0.2.50:41000".parse().expect("socket addr")
    }

    #[rstest]
    #[case::forwarded_first_entry(
        vec![(FORWARDED_FOR, "203.0.113.9, 10.0.0.1"), (REAL_IP, "198.51.100.7")],
        "203.0.113.9"
    )]
    #[case::real_ip(vec![(REAL_IP, "198.51.100.7")], "198.51.100.7")]
    #[case::garbage_falls_through(vec![(FORWARDED_FOR, "not-an-ip")], "192.0.2.50")]
    #[case::peer(vec![], "192.0.2.50")]
    fn resolves_in_order(#[case] headers: Vec<(&'static str, &'static str)>, #[case] expected: &str) {
        let req = headers
            .into_iter()
            .fold(TestRequest::default().peer_addr(peer()), |req, header| {
                req.insert_header(header)
            })
            .to_http_request();
        let expected: IpAddr = expected.parse().expect("ip");
        assert_eq!(ClientIp::of(&req), ClientIp(Some(expected)));
    }

    #[rstest]
    fn unknown_client_shares_one_key() {
        let req = TestRequest::default().to_http_request();
        let ip = ClientIp::of(&req);
        assert_eq!(ip, ClientIp(None));
        assert_eq!(
            ip.rate_limit_key().hash(),
            RateLimitKey::ip(UNKNOWN_CLIENT).hash()
        );
    }
}
