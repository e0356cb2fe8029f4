//! Request extractors: bearer token and client address.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use marquee_core::backend::AccessToken;

/// The caller's bearer token, if the request carried one.
///
/// Never rejects; handlers decide what an anonymous caller may do.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<AccessToken>);

impl Caller {
    /// Borrow the token.
    pub const fn token(&self) -> Option<&AccessToken> {
        self.0.as_ref()
    }
}

impl<S: Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_credentials)
            .filter(|token| !token.is_empty())
            .map(AccessToken::new);

        Ok(Self(token))
    }
}

/// Credentials of a `Bearer` authorization value. The scheme name is
/// case-insensitive.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, credentials) = value.trim_start().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| credentials.trim())
}

/// Best-effort client address, recorded with votes for abuse tracing.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S: Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = ip_from_x_forwarded_for(&parts.headers)
            .or_else(|| ip_from_header(&parts.headers, &CF_CONNECTING_IP))
            .or_else(|| ip_from_header(&parts.headers, &X_REAL_IP))
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            });

        Ok(Self(ip))
    }
}

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const CF_CONNECTING_IP: HeaderName = HeaderName::from_static("cf-connecting-ip");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

fn last_header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get_all(name)
        .into_iter()
        .next_back()
        .and_then(|value| value.to_str().ok())
}

/// Rightmost entry: the address appended by the proxy closest to us.
fn ip_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    last_header_value(headers, &X_FORWARDED_FOR)
        .and_then(|value| value.rsplit(',').next())
        .and_then(|entry| entry.trim().parse().ok())
}

fn ip_from_header(headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
    last_header_value(headers, name).and_then(|value| value.trim().parse().ok())
}
