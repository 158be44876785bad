// Path: crates/vmcore-types/src/http.rs
//! The HTTP-shaped status codes and response bodies of spec.md §6.6/§6.7.
//! Both normal and error responses are rendered through this one shape so
//! apps can treat the two uniformly.

use std::fmt;

/// The closed set of status codes the execution core can ever emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    DeclaredLimitsViolated,
    ExecutionTimeout,
    InternalError,
    LimitExceeded,
    InvalidOperation,
    ArithmeticError,
    ReentrancyAttempt,
    MemoryFault,
    OutOfRange,
}

impl StatusCode {
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::DeclaredLimitsViolated => 420,
            StatusCode::ExecutionTimeout => 421,
            StatusCode::InternalError => 500,
            StatusCode::LimitExceeded => 520,
            StatusCode::InvalidOperation => 521,
            StatusCode::ArithmeticError => 522,
            StatusCode::ReentrancyAttempt => 523,
            StatusCode::MemoryFault => 524,
            StatusCode::OutOfRange => 525,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::DeclaredLimitsViolated => "Declared Limits Violated",
            StatusCode::ExecutionTimeout => "Execution Timeout",
            StatusCode::InternalError => "Internal Error",
            StatusCode::LimitExceeded => "Limit Exceeded",
            StatusCode::InvalidOperation => "Invalid Operation",
            StatusCode::ArithmeticError => "Arithmetic Error",
            StatusCode::ReentrancyAttempt => "Reentrancy Attempt",
            StatusCode::MemoryFault => "Memory Fault",
            StatusCode::OutOfRange => "Out of Range",
        }
    }

    /// Whether this status, when observed on an attached request, fails fee
    /// payment (spec.md §4.6: "its status ≥ 400").
    pub fn is_error(self) -> bool {
        self.code() >= 400
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// `"HTTP/1.1 <code> <reason>\r\nServer: <app>\r\nContent-Length: <n>\r\n\r\n<body>"`
/// (spec.md §6.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub server: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(server: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::Ok,
            server: server.into(),
            body,
        }
    }

    pub fn error(status: StatusCode, server: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            status,
            server: server.into(),
            body: format!("Error: {message}.").into_bytes(),
        }
    }

    /// Renders the response in its wire form.
    pub fn to_wire(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nServer: {}\r\nContent-Length: {}\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.server,
            self.body.len()
        );
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// An inbound request to an application's dispatcher (spec.md §3
/// `AppRequest.httpRequest`, §6.5). Rendered the same HTTP-shape as
/// `HttpResponse` so apps can parse requests and responses uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Injects an attachment's digest into this request (spec.md §3, §9 Open
    /// Question (b)). The canonical form: one `X-Attached-Digest` header per
    /// attachment, appended in the attachment's declaration order — this is
    /// deterministic and unambiguous for the app to parse regardless of
    /// execution order, since attachments are injected once at
    /// `finalize_request` time, before any request begins executing.
    pub fn inject_attachment_digest(&mut self, digest: &crate::Digest) {
        self.headers.push(("X-Attached-Digest".to_string(), digest.to_string()));
    }

    /// Renders the request in its wire form.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.1\r\n", self.method, self.path);
        for (k, v) in &self.headers {
            head.push_str(&format!("{k}: {v}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_digest_injection_is_deterministic_and_ordered() {
        let mut req = HttpRequest::new("POST", "/transfer", b"body".to_vec());
        let a = crate::Digest::of(b"attachment-a");
        let b = crate::Digest::of(b"attachment-b");
        req.inject_attachment_digest(&a);
        req.inject_attachment_digest(&b);
        assert_eq!(req.headers[0], ("X-Attached-Digest".to_string(), a.to_string()));
        assert_eq!(req.headers[1], ("X-Attached-Digest".to_string(), b.to_string()));
    }

    #[test]
    fn wire_form_matches_http_shape() {
        let resp = HttpResponse::error(StatusCode::ReentrancyAttempt, "app22", "reentrancy is not allowed");
        let wire = String::from_utf8(resp.to_wire()).unwrap();
        assert!(wire.starts_with("HTTP/1.1 523 Reentrancy Attempt\r\n"));
        assert!(wire.contains("Server: app22\r\n"));
        assert!(wire.ends_with("Error: reentrancy is not allowed."));
    }

    #[test]
    fn ok_status_is_not_an_error() {
        assert!(!StatusCode::Ok.is_error());
        assert!(StatusCode::BadRequest.is_error());
        assert!(StatusCode::InternalError.is_error());
    }
}
