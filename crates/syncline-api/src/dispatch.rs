// Request dispatch
//
// Translates an endpoint path into a `Reaction`. The `Dispatch` trait is
// the seam the stores are generic over: production code uses
// `HttpDispatcher`, tests substitute a recording fake.

use std::future::Future;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::reaction::Reaction;
use crate::transport::TransportConfig;

/// Placeholder substituted by [`endpoint`] in path templates.
pub const PARAM_PLACEHOLDER: &str = "{}";

/// Anything that can carry a request to the server and report its outcome.
///
/// Implementations never return an error: transport failures become a
/// rejected [`Reaction`] so callers handle every outcome the same way.
pub trait Dispatch: Send + Sync {
    fn send(&self, path: &str) -> impl Future<Output = Reaction> + Send;
}

impl<D: Dispatch> Dispatch for std::sync::Arc<D> {
    fn send(&self, path: &str) -> impl Future<Output = Reaction> + Send {
        (**self).send(path)
    }
}

/// Characters a browser's `encodeURIComponent` leaves as they are.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Double URL-encode a path parameter.
///
/// The server decodes path parameters twice, so values such as
/// `"a b"` or `"a/b"` must be encoded twice on the way out.
pub fn encode_param(value: &str) -> String {
    let once = utf8_percent_encode(value, COMPONENT).to_string();
    utf8_percent_encode(&once, COMPONENT).to_string()
}

/// Fill a path template's `{}` placeholder with a double-encoded value.
pub fn endpoint(template: &str, value: &str) -> String {
    template.replacen(PARAM_PLACEHOLDER, &encode_param(value), 1)
}

// ── HttpDispatcher ──────────────────────────────────────────────────

/// [`Dispatch`] over plain HTTP GET requests.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDispatcher {
    /// Create a dispatcher rooted at `base_url` (e.g. `http://localhost:8800`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a dispatcher with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the full URL for a server path, keeping any base path prefix.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        join_path(&self.base_url, path)
    }

    /// Send a GET request and return the body, or the failure as an [`Error`].
    pub async fn get_text(&self, path: &str) -> Result<String, Error> {
        let url = self.url_for(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl Dispatch for HttpDispatcher {
    async fn send(&self, path: &str) -> Reaction {
        match self.get_text(path).await {
            Ok(body) => Reaction::ok(Some(body)),
            Err(Error::Status { status, body }) => {
                debug!(status, path, "request rejected by server");
                if body.trim().is_empty() {
                    Reaction::rejected(format!("HTTP {status}"))
                } else {
                    Reaction::rejected(body)
                }
            }
            Err(e) => {
                warn!(error = %e, path, "request failed");
                Reaction::rejected(e.to_string())
            }
        }
    }
}

/// Append `path` to `base`, preserving the base's own path prefix.
pub fn join_path(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_twice() {
        assert_eq!(encode_param("a b"), "a%2520b");
        assert_eq!(encode_param("*.mkv"), "*.mkv");
        assert_eq!(encode_param("(it's)!~"), "(it's)!~");
        assert_eq!(encode_param("50%"), "50%2525");
        assert_eq!(encode_param("plain"), "plain");
    }

    #[test]
    fn endpoint_fills_placeholder() {
        assert_eq!(
            endpoint("/server/autoqueue/add/{}", "dir/file"),
            "/server/autoqueue/add/dir%252Ffile"
        );
    }

    #[test]
    fn join_keeps_base_prefix() {
        let base = Url::parse("http://host:8800/seedsync/").expect("valid url");
        let url = join_path(&base, "/server/autoqueue/get").expect("valid join");
        assert_eq!(url.as_str(), "http://host:8800/seedsync/server/autoqueue/get");
    }

    #[test]
    fn join_keeps_encoded_segments() {
        let base = Url::parse("http://host:8800").expect("valid url");
        let url = join_path(&base, &endpoint("/server/autoqueue/remove/{}", "a b"))
            .expect("valid join");
        assert_eq!(url.path(), "/server/autoqueue/remove/a%2520b");
    }
}
