#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected payload: {message}")]
    UnexpectedPayload { message: String },
}

impl Error {
    /// Whether the server answered with 404 Not Found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let e = Error::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(format!("{}", e), "HTTP 503: Service Unavailable");
        assert!(!e.is_not_found());
    }

    #[test]
    fn not_found_detection() {
        let e = Error::Status {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert!(e.is_not_found());

        let e = Error::Transport {
            message: "connection refused".to_string(),
        };
        assert!(!e.is_not_found());
    }

    #[test]
    fn url_parse_conversion() {
        let e: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(e, Error::UrlParse(_)));
    }
}
