use axum::http::Request;
use governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};
use tower_governor::{
    errors::GovernorError,
    governor::{GovernorConfig, GovernorConfigBuilder},
    key_extractor::KeyExtractor,
};

use crate::config::Config;

/// Keys requests by client IP, trusting the usual reverse proxy headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IpKeyExtractor;

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req))
    }
}

fn client_ip<T>(req: &Request<T>) -> IpAddr {
    let headers = req.headers();

    // 1. Behind Cloudflare the real client is in cf-connecting-ip.
    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    // 2. Otherwise the first hop of X-Forwarded-For is the client.
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    // 3. Local dev without a proxy. Unknown clients share one bucket.
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

pub type LoginConfig = GovernorConfig<IpKeyExtractor, NoOpMiddleware<QuantaInstant>>;

/// Brute-force protection for `/login`: `login_burst` attempts, then one more every
/// `login_period_secs`.
pub fn create_login_config(config: &Config) -> Arc<LoginConfig> {
    Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(IpKeyExtractor)
            .period(Duration::from_secs(config.login_period_secs.max(1)))
            .burst_size(config.login_burst.max(1))
            .finish()
            .expect("period and burst size are never zero"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn prefers_cloudflare_header() {
        let req = request(&[
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-forwarded-for", "198.51.100.1"),
        ]);
        assert_eq!(client_ip(&req), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn takes_first_forwarded_hop() {
        let req = request(&[("x-forwarded-for", "198.51.100.1, 10.0.0.1")]);
        assert_eq!(client_ip(&req), "198.51.100.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn falls_back_to_localhost() {
        let req = request(&[("x-forwarded-for", "not an ip")]);
        assert_eq!(client_ip(&req), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn zero_settings_are_clamped() {
        let config = Config {
            login_burst: 0,
            login_period_secs: 0,
            ..Config::default()
        };
        let _ = create_login_config(&config);
    }
}
