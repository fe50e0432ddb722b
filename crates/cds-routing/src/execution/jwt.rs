//! Bearer token extraction from the transport's authorization header.

use crate::host::{Request, TransportMessage};
use tracing::warn;

const AUTHORIZATION: &str = "authorization";

/// Extract the bearer token for a request
///
/// The raw transport message is looked up on the request itself first and
/// then on each enclosing request, since hosts attach it at different levels.
/// Returns `None` and logs a warning when the header is absent, has no token
/// segment, or uses another scheme.
pub fn retrieve_jwt(request: &Request) -> Option<String> {
    let header = find_transport(request).and_then(|transport| transport.header(AUTHORIZATION));
    token_from_header(header)
}

fn find_transport(request: &Request) -> Option<&TransportMessage> {
    if let Some(transport) = request.transport() {
        return Some(transport);
    }
    let mut current = request.context();
    while let Some(outer) = current {
        if let Some(transport) = outer.transport() {
            return Some(transport);
        }
        current = outer.context();
    }
    None
}

fn token_from_header(header: Option<&str>) -> Option<String> {
    let Some(header) = header else {
        warn!("Authorization header not set");
        return None;
    };

    let mut parts = header.split(' ');
    let scheme = parts.next().unwrap_or_default();
    let token = match parts.next() {
        Some(token) if !token.is_empty() => token,
        _ => {
            warn!("Token in authorization header missing");
            return None;
        }
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        warn!(scheme = %scheme, "Authorization type is not Bearer");
        return None;
    }

    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        let req = Request::builder("READ")
            .header("authorization", "Bearer abc.def.ghi")
            .build();
        assert_eq!(retrieve_jwt(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let req = Request::builder("READ")
            .header("Authorization", "bearer abc")
            .build();
        assert_eq!(retrieve_jwt(&req).as_deref(), Some("abc"));
    }

    #[test]
    fn test_basic_scheme_rejected() {
        let req = Request::builder("READ")
            .header("authorization", "Basic xyz")
            .build();
        assert_eq!(retrieve_jwt(&req), None);
    }

    #[test]
    fn test_missing_header() {
        let req = Request::builder("READ").build();
        assert_eq!(retrieve_jwt(&req), None);
    }

    #[test]
    fn test_missing_token_segment() {
        let req = Request::builder("READ").header("authorization", "Bearer").build();
        assert_eq!(retrieve_jwt(&req), None);
    }

    #[test]
    fn test_falls_back_to_enclosing_request() {
        let batch = Request::builder("BATCH")
            .header("authorization", "Bearer outer")
            .build();
        let req = Request::builder("READ").context(batch).build();
        assert_eq!(retrieve_jwt(&req).as_deref(), Some("outer"));
    }
}
