//! Request configuration.
//!
//! [`Options`] is the layerable record shared by the client defaults and the
//! per-call overrides: every key is optional, and merging is shallow (an
//! override replaces the default key as a whole, `headers` included).
//!
//! [`RequestConfig`] is the request-scoped context built from the merged
//! options. The pipeline owns it exclusively and mutates it stage by stage;
//! engines fill in `request_path`, `http_method` and `request_data`, and the
//! dispatch stage stores the `response`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::mount::MountTable;
use crate::resolve::{EnvVar, Field, TokenSource};
use crate::transport::Transport;
use crate::types::{Method, VaultResponse};

/// Default API path segment.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Environment variable read by the default address resolver.
pub const ADDRESS_ENV: &str = "VAULT_ADDR";

/// Environment variable read by the default token resolver.
pub const TOKEN_ENV: &str = "VAULT_TOKEN";

/// Strip a single leading and a single trailing `/`.
///
/// ```rust
/// use vaultline_client::trim_slashes;
///
/// assert_eq!(trim_slashes("/secret/foo/"), "secret/foo");
/// assert_eq!(trim_slashes("v1"), "v1");
/// ```
pub fn trim_slashes(value: &str) -> &str {
    let value = value.strip_prefix('/').unwrap_or(value);
    value.strip_suffix('/').unwrap_or(value)
}

/// Layerable configuration for a request.
#[derive(Clone, Default)]
pub struct Options {
    /// HTTP transport used for dispatch.
    pub transport: Option<Arc<dyn Transport>>,
    /// Server base URL.
    pub address: Option<Field<String>>,
    /// API path segment (e.g. `v1`).
    pub api_version: Option<String>,
    /// Client token.
    pub token: Option<Field<String>>,
    /// File holding the token, read by the default token resolver.
    pub token_path: Option<PathBuf>,
    /// Name of the engine that shapes the request.
    pub engine: Option<Field<String>>,
    /// Mount the secret lives under.
    pub mount: Option<String>,
    /// Whether `path` already starts with the mount.
    pub path_includes_mount: Option<bool>,
    /// Extra HTTP headers.
    pub headers: Option<HashMap<String, String>>,
    /// Whether to send the `X-Vault-Request: true` marker.
    pub is_vault_request: Option<bool>,
}

impl Options {
    /// The baseline defaults.
    ///
    /// Address and token are resolved from `VAULT_ADDR` / `VAULT_TOKEN` (or
    /// `token_path`) when each request is sent, the engine comes from an
    /// empty [`MountTable`] (always `kv`), the API version is `v1`, and the
    /// request marker header is on. No transport is set; see
    /// [`crate::Vault::new`].
    pub fn defaults() -> Self {
        Self {
            transport: None,
            address: Some(Field::resolver(EnvVar::new(ADDRESS_ENV))),
            api_version: Some(DEFAULT_API_VERSION.to_owned()),
            token: Some(Field::resolver(TokenSource::default())),
            token_path: None,
            engine: Some(Field::resolver(MountTable::default())),
            mount: None,
            path_includes_mount: Some(false),
            headers: Some(HashMap::new()),
            is_vault_request: Some(true),
        }
    }

    /// Layer `overrides` on top of `self`. Override wins per key.
    #[must_use]
    pub fn merge(&self, overrides: Options) -> Options {
        Options {
            transport: overrides.transport.or_else(|| self.transport.clone()),
            address: overrides.address.or_else(|| self.address.clone()),
            api_version: overrides.api_version.or_else(|| self.api_version.clone()),
            token: overrides.token.or_else(|| self.token.clone()),
            token_path: overrides.token_path.or_else(|| self.token_path.clone()),
            engine: overrides.engine.or_else(|| self.engine.clone()),
            mount: overrides.mount.or_else(|| self.mount.clone()),
            path_includes_mount: overrides.path_includes_mount.or(self.path_includes_mount),
            headers: overrides.headers.or_else(|| self.headers.clone()),
            is_vault_request: overrides.is_vault_request.or(self.is_vault_request),
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<Field<String>>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<Field<String>>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Select the engine by name, or pass a resolver that picks one.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<Field<String>>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    #[must_use]
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = Some(mount.into());
        self
    }

    #[must_use]
    pub fn with_path_includes_mount(mut self, includes: bool) -> Self {
        self.path_includes_mount = Some(includes);
        self
    }

    /// Add one header, keeping any headers already set on these options.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replace the header set.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_vault_request(mut self, enabled: bool) -> Self {
        self.is_vault_request = Some(enabled);
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("transport", &self.transport.as_ref().map(|_| ".."))
            .field("address", &self.address)
            .field("api_version", &self.api_version)
            .field("token", &self.token.as_ref().map(redact))
            .field("token_path", &self.token_path)
            .field("engine", &self.engine)
            .field("mount", &self.mount)
            .field("path_includes_mount", &self.path_includes_mount)
            .field("headers", &self.headers)
            .field("is_vault_request", &self.is_vault_request)
            .finish()
    }
}

/// Full input of [`crate::Vault::execute`].
#[derive(Debug, Clone)]
pub struct Request {
    /// Logical operation.
    pub method: Method,
    /// Secret path, with or without surrounding slashes.
    pub path: String,
    /// Payload for writes.
    pub data: Option<Value>,
    /// Per-call overrides of the client defaults.
    pub options: Options,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            data: None,
            options: Options::default(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// Request-scoped context threaded through the pipeline.
#[derive(Clone)]
pub struct RequestConfig {
    /// Logical secret path.
    pub path: String,
    /// Logical operation.
    pub method: Method,
    /// Caller payload.
    pub data: Option<Value>,
    /// Server base URL; static once resolved.
    pub address: Option<Field<String>>,
    /// API path segment.
    pub api_version: Option<String>,
    /// Client token; static once resolved.
    pub token: Option<Field<String>>,
    /// Token file consulted by the default token resolver.
    pub token_path: Option<PathBuf>,
    /// Engine name; static once resolved.
    pub engine: Option<Field<String>>,
    /// Mount the secret lives under.
    pub mount: Option<String>,
    /// Whether `path` already starts with the mount.
    pub path_includes_mount: bool,
    /// Extra HTTP headers.
    pub headers: HashMap<String, String>,
    /// Whether to send the request marker header.
    pub is_vault_request: bool,
    /// HTTP transport.
    pub transport: Option<Arc<dyn Transport>>,
    /// Path below `<address>/<api_version>/`, set by the engine.
    pub request_path: Option<String>,
    /// HTTP verb, set by the engine.
    pub http_method: Option<reqwest::Method>,
    /// Body to send, set by the engine.
    pub request_data: Option<Value>,
    /// Raw response, set after dispatch.
    pub response: Option<VaultResponse>,
}

impl RequestConfig {
    /// Merge stage: shallow-merge `defaults` with the request's overrides.
    pub(crate) fn merge(defaults: &Options, request: Request) -> Self {
        let Request {
            method,
            path,
            data,
            options,
        } = request;
        let merged = defaults.merge(options);

        Self {
            path,
            method,
            data,
            address: merged.address,
            api_version: merged.api_version,
            token: merged.token,
            token_path: merged.token_path,
            engine: merged.engine,
            mount: merged.mount,
            path_includes_mount: merged.path_includes_mount.unwrap_or(false),
            headers: merged.headers.unwrap_or_default(),
            is_vault_request: merged.is_vault_request.unwrap_or(false),
            transport: merged.transport,
            request_path: None,
            http_method: None,
            request_data: None,
            response: None,
        }
    }

    /// Normalize stage: strip one leading and one trailing slash from the
    /// path and API version.
    pub(crate) fn normalize(&mut self) {
        self.path = trim_slashes(&self.path).to_owned();
        if let Some(version) = &mut self.api_version {
            *version = trim_slashes(version).to_owned();
        }
    }

    /// Resolved address, if it is static and non-empty.
    pub fn address(&self) -> Option<&str> {
        static_non_empty(self.address.as_ref())
    }

    /// Resolved token, if it is static and non-empty.
    pub fn token(&self) -> Option<&str> {
        static_non_empty(self.token.as_ref())
    }

    /// Resolved engine name, if it is static and non-empty.
    pub fn engine_name(&self) -> Option<&str> {
        static_non_empty(self.engine.as_ref())
    }

    /// API version, if set and non-empty.
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref().filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("data", &self.data.as_ref().map(|_| ".."))
            .field("address", &self.address)
            .field("api_version", &self.api_version)
            .field("token", &self.token.as_ref().map(redact))
            .field("token_path", &self.token_path)
            .field("engine", &self.engine)
            .field("mount", &self.mount)
            .field("path_includes_mount", &self.path_includes_mount)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("is_vault_request", &self.is_vault_request)
            .field("transport", &self.transport.as_ref().map(|_| ".."))
            .field("request_path", &self.request_path)
            .field("http_method", &self.http_method)
            .field("request_data", &self.request_data.as_ref().map(|_| ".."))
            .field("response", &self.response.as_ref().map(|r| r.status))
            .finish()
    }
}

fn static_non_empty(field: Option<&Field<String>>) -> Option<&str> {
    field
        .and_then(Field::as_static)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn redact(field: &Field<String>) -> &'static str {
    match field {
        Field::Static(_) => "<redacted>",
        Field::Resolver(_) => "<resolver>",
    }
}
