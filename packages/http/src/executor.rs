//! Where requests go.
//!
//! [`PreferencesApi`](crate::PreferencesApi) sends every request through an
//! [`HttpExecutor`], so the network can be replaced in tests.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};

use crate::types::{HttpRequest, HttpResponse};
use crate::Error;

/// Sends one request and returns the server's answer.
///
/// Any response the server sends back, including 4xx and 5xx, is `Ok`; `Err`
/// means no response was obtained.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

/// Blocking executor backed by reqwest.
pub struct ReqwestExecutor {
    client: Client,
}

fn transport(e: reqwest::Error) -> Error {
    Error::Transport {
        message: e.to_string(),
    }
}

impl ReqwestExecutor {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!("prefsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// 30 second timeout.
    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let mut builder = self
            .client
            .request(request.method.into(), request.path.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(
                HeaderName::try_from(name.as_str())?,
                HeaderValue::try_from(value.as_str())?,
            );
        }

        if let Some(text) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text.clone());
        }

        let response = builder.send().map_err(transport)?;
        let status = response.status();
        let body_text = response.text().map_err(transport)?;

        Ok(HttpResponse::from_text(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            body_text,
        ))
    }
}

/// In-memory executors for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use super::HttpExecutor;
    use crate::types::{HttpRequest, HttpResponse, Method};
    use crate::Error;

    #[derive(Default)]
    struct MockState {
        /// Canned responses by absolute URL.
        responses: HashMap<String, HttpResponse>,
        fallback: Option<HttpResponse>,
        /// When set, every request fails with this transport error.
        failure: Option<String>,
        requests: Vec<HttpRequest>,
        /// Remote preferences, when acting as a preference server.
        preferences: Option<BTreeMap<String, String>>,
    }

    /// Records every request and answers from canned responses or, when built
    /// with [`serving_preferences`](Self::serving_preferences), like a
    /// preference server.
    ///
    /// Clones share state, so a test can keep one clone to inspect while the
    /// client owns another.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        state: Arc<Mutex<MockState>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Act as a preference server holding `preferences`.
        ///
        /// `GET …/preferences` lists them, `PUT …/preferences/{key}` stores the
        /// text body and `DELETE …/preferences/{key}` removes the key (404 if
        /// absent). Keys are taken as they appear in the URL.
        pub fn serving_preferences<I, K, V>(preferences: I) -> Self
        where
            I: IntoIterator<Item = (K, V)>,
            K: Into<String>,
            V: Into<String>,
        {
            let mock = Self::new();
            mock.state().preferences = Some(
                preferences
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            );
            mock
        }

        /// Answer requests for exactly `url` with `response`.
        pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
            self.state().responses.insert(url.into(), response);
            self
        }

        /// Answer unmatched requests with `response` instead of 404.
        pub fn with_default_response(self, response: HttpResponse) -> Self {
            self.state().fallback = Some(response);
            self
        }

        /// Fail every request with a transport error carrying `message`.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            self.state().failure = Some(message.into());
            self
        }

        /// Start or stop failing every request.
        pub fn set_failing(&self, failing: bool) {
            let mut state = self.state();
            if !failing {
                state.failure = None;
            } else if state.failure.is_none() {
                state.failure = Some("mock network failure".to_string());
            }
        }

        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.state().requests.clone()
        }

        pub fn requests_with_method(&self, method: Method) -> Vec<HttpRequest> {
            self.state()
                .requests
                .iter()
                .filter(|r| r.method == method)
                .cloned()
                .collect()
        }

        pub fn clear_recorded(&self) {
            self.state().requests.clear();
        }

        /// Current remote preferences (empty unless serving preferences).
        pub fn remote_preferences(&self) -> BTreeMap<String, String> {
            self.state().preferences.clone().unwrap_or_default()
        }

        /// Change a remote preference behind the client's back.
        pub fn set_remote_preference(&self, key: impl Into<String>, value: impl Into<String>) {
            self.state()
                .preferences
                .get_or_insert_with(BTreeMap::new)
                .insert(key.into(), value.into());
        }

        fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    fn serve(
        preferences: &mut BTreeMap<String, String>,
        request: &HttpRequest,
    ) -> Option<HttpResponse> {
        let url = url::Url::parse(&request.path).ok()?;
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

        match (request.method, segments.as_slice()) {
            (Method::GET, [.., "preferences"]) => {
                Some(HttpResponse::ok(serde_json::to_value(&*preferences).ok()?))
            }
            (Method::PUT, [.., "preferences", key]) => {
                let value = request.text().unwrap_or_default().to_string();
                preferences.insert(key.to_string(), value);
                Some(HttpResponse::ok(serde_json::Value::Null))
            }
            (Method::DELETE, [.., "preferences", key]) => Some(match preferences.remove(*key) {
                Some(_) => HttpResponse::ok(serde_json::Value::Null),
                None => HttpResponse::error(404, "Not Found"),
            }),
            _ => None,
        }
    }

    impl HttpExecutor for MockExecutor {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            let mut state = self.state();
            state.requests.push(request.clone());

            if let Some(message) = &state.failure {
                return Err(Error::Transport {
                    message: message.clone(),
                });
            }

            if let Some(response) = state.responses.get(&request.path) {
                return Ok(response.clone());
            }

            if let Some(preferences) = state.preferences.as_mut() {
                if let Some(response) = serve(preferences, request) {
                    return Ok(response);
                }
            }

            Ok(state
                .fallback
                .clone()
                .unwrap_or_else(|| HttpResponse::error(404, "Not Found")))
        }
    }
}
