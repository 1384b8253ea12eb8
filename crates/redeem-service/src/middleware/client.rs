//! 客户端来源中间件
//!
//! 提取客户端 IP 与 User-Agent 写入请求扩展，随领取记录一起落库

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{HeaderMapExt, UserAgent};

/// 请求来源
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 请求来源中间件
pub async fn client_origin(mut request: Request<Body>, next: Next) -> Response {
    let origin = ClientOrigin {
        ip_address: extract_client_ip(&request),
        user_agent: request
            .headers()
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string()),
    };
    request.extensions_mut().insert(origin);
    next.run(request).await
}

/// 依次取 X-Forwarded-For 的第一个地址、X-Real-IP、连接对端地址
///
/// 请求头中的值必须能解析为 IP 地址，否则视为缺失并继续回退
fn extract_client_ip(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(parse_ip)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_ip)
        })
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/claim/x");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let request = request_with(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(extract_client_ip(&request).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_unparseable_headers_are_ignored() {
        let oversized = "x".repeat(100);
        let request = request_with(&[
            ("x-forwarded-for", oversized.as_str()),
            ("x-real-ip", "2001:db8::1"),
        ]);
        assert_eq!(extract_client_ip(&request).as_deref(), Some("2001:db8::1"));

        let request = request_with(&[("x-forwarded-for", "unknown"), ("x-real-ip", "not-an-ip")]);
        assert_eq!(extract_client_ip(&request), None);
    }

    #[test]
    fn test_real_ip_fallback() {
        let request = request_with(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(extract_client_ip(&request).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn test_socket_address_fallback() {
        let mut request = request_with(&[]);
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(extract_client_ip(&request).as_deref(), Some("192.0.2.1"));

        assert_eq!(extract_client_ip(&request_with(&[])), None);
    }
}
