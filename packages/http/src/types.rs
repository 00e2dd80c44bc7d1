//! Requests and responses exchanged with an [`HttpExecutor`](crate::HttpExecutor).

use std::collections::HashMap;

use serde::de::DeserializeOwned;

/// The methods the preference API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    PUT,
    DELETE,
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL.
    pub path: String,
    pub headers: HashMap<String, String>,
    /// Sent as `text/plain`.
    pub body: Option<String>,
}

impl HttpRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// What the server answered, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase, e.g. "Not Found".
    pub status_text: String,
    /// The body parsed as JSON; `Null` if it was empty or not JSON.
    pub body: serde_json::Value,
    pub body_text: String,
}

impl HttpResponse {
    /// Wrap a raw body, parsing it as JSON where possible.
    pub fn from_text(status: u16, status_text: impl Into<String>, body_text: String) -> Self {
        let body = serde_json::from_str(&body_text).unwrap_or(serde_json::Value::Null);
        Self {
            status,
            status_text: status_text.into(),
            body,
            body_text,
        }
    }

    /// A 200 response carrying `body`.
    pub fn ok(body: serde_json::Value) -> Self {
        let body_text = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body,
            body_text,
        }
    }

    /// An error response with an empty body.
    pub fn error(status: u16, status_text: impl Into<String>) -> Self {
        Self::from_text(status, status_text, String::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_with_text_body() {
        let request = HttpRequest::put("https://example.com/preferences/app-theme")
            .with_text_body("dark")
            .with_header("Authorization", "Bearer abc");

        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.text(), Some("dark"));
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
        assert_eq!(HttpRequest::delete("x").text(), None);
    }

    #[test]
    fn method_conversion() {
        assert_eq!(http::Method::from(Method::GET), http::Method::GET);
        assert_eq!(http::Method::from(Method::PUT), http::Method::PUT);
        assert_eq!(http::Method::from(Method::DELETE), http::Method::DELETE);
    }

    #[test]
    fn body_is_parsed_when_json() {
        let listing = HttpResponse::from_text(200, "OK", r#"{"a":"1"}"#.to_string());
        assert_eq!(listing.body, serde_json::json!({"a": "1"}));

        let empty = HttpResponse::from_text(204, "No Content", String::new());
        assert!(empty.body.is_null());
        assert!(empty.is_success());

        let html = HttpResponse::from_text(502, "Bad Gateway", "<html/>".to_string());
        assert!(html.body.is_null());
        assert_eq!(html.body_text, "<html/>");
        assert!(!html.is_success());
    }

    #[test]
    fn ok_response_round_trips_body() {
        let response = HttpResponse::ok(serde_json::json!({"app-a": "1"}));
        let parsed: HashMap<String, String> = response.json().unwrap();
        assert_eq!(parsed["app-a"], "1");
        assert!(HttpResponse::ok(serde_json::Value::Null).body_text.is_empty());
    }
}
