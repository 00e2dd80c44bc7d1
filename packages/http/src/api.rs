//! Client for the remote preference API.
//!
//! ## Protocol
//!
//! Relative to the base URL:
//!
//! - `fetch_all()` → `GET preferences` → every key/value pair of the user
//! - `put(key, value)` → `PUT preferences/{key}` with a `text/plain` body
//! - `delete(key)` → `DELETE preferences/{key}`
//!
//! The listing may be a JSON object (`{"key": "value", ...}`), a list of
//! `{"k": .., "v": ..}` (or `{"key": .., "value": ..}`) entries, or either of
//! those wrapped as `{"preferences": ...}`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::types::{HttpRequest, HttpResponse, Method};
use crate::Error;

/// Blocking client for the remote preference API.
#[derive(Clone)]
pub struct PreferencesApi {
    executor: Arc<dyn HttpExecutor>,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for PreferencesApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencesApi")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PreferencesPayload {
    Wrapped { preferences: Box<PreferencesPayload> },
    Map(BTreeMap<String, String>),
    List(Vec<PreferenceEntry>),
}

#[derive(Deserialize)]
struct PreferenceEntry {
    #[serde(alias = "key")]
    k: String,
    #[serde(alias = "value")]
    v: String,
}

impl PreferencesPayload {
    fn into_map(self) -> BTreeMap<String, String> {
        match self {
            PreferencesPayload::Wrapped { preferences } => preferences.into_map(),
            PreferencesPayload::Map(map) => map,
            PreferencesPayload::List(entries) => entries.into_iter().map(|e| (e.k, e.v)).collect(),
        }
    }
}

impl PreferencesApi {
    /// Create a client for the API rooted at `base_url`, sending requests
    /// through `executor`.
    pub fn new(base_url: &str, executor: Arc<dyn HttpExecutor>) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                message: format!("'{}' cannot be used as a base URL", base_url),
            });
        }

        Ok(Self {
            executor,
            base_url,
            token: None,
        })
    }

    /// Create a client backed by a real HTTP client with the given timeout.
    pub fn connect(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let executor = ReqwestExecutor::new(timeout)?;
        Self::new(base_url, Arc::new(executor))
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch every preference of the current user.
    pub fn fetch_all(&self) -> Result<BTreeMap<String, String>, Error> {
        let url = self.build_url(None)?;
        let response = self.send(HttpRequest::get(url.as_str()))?;

        let payload: PreferencesPayload =
            response.json().map_err(|e| Error::UnexpectedPayload {
                message: format!("preference listing: {}", e),
            })?;
        let preferences = payload.into_map();

        log::debug!("Fetched {} preference(s)", preferences.len());
        Ok(preferences)
    }

    /// Store `value` under `key`.
    pub fn put(&self, key: &str, value: &str) -> Result<(), Error> {
        let url = self.build_url(Some(key))?;
        self.send(HttpRequest::put(url.as_str()).with_text_body(value))?;
        Ok(())
    }

    /// Remove `key`. A key the server does not know counts as removed.
    pub fn delete(&self, key: &str) -> Result<(), Error> {
        let url = self.build_url(Some(key))?;
        match self.send(HttpRequest::delete(url.as_str())) {
            Err(e) if e.is_not_found() => {
                log::debug!("Preference {} was already absent remotely", key);
                Ok(())
            }
            Err(e) => Err(e),
            Ok(_) => Ok(()),
        }
    }

    /// Build the URL of the listing, or of a single key.
    fn build_url(&self, key: Option<&str>) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| Error::InvalidUrl {
                message: format!("'{}' cannot be used as a base URL", self.base_url),
            })?;
            segments.pop_if_empty().push("preferences");
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }

    fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        if let Some(token) = &self.token {
            request = request.with_header("Authorization", format!("Bearer {}", token));
        }

        let method = request.method;
        let response = self.executor.execute(&request)?;

        if !response.is_success() {
            log::debug!(
                "{:?} {} answered {} {}",
                method,
                request.path,
                response.status,
                response.status_text
            );
            return Err(Error::Status {
                status: response.status,
                message: response.status_text,
            });
        }

        if method == Method::GET && response.body.is_null() {
            return Err(Error::UnexpectedPayload {
                message: "empty or non-JSON response body".to_string(),
            });
        }

        Ok(response)
    }
}
