//! Dynamic config fields.
//!
//! A [`Field`] is either a static value or a [`Resolve`] implementation that
//! computes the value from the in-progress [`RequestConfig`] when a request
//! is sent. Resolvers run in exactly one pipeline stage, before validation,
//! so the rest of the pipeline only ever sees static values.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{RequestConfig, TOKEN_ENV};
use crate::error::VaultError;

/// Computes a config value on demand.
///
/// Returning `Ok(None)` means "not available" and is not an error at this
/// layer; the pipeline decides whether a missing value is fatal.
#[async_trait]
pub trait Resolve<T>: Send + Sync {
    /// Compute the value for the given request config.
    ///
    /// # Errors
    ///
    /// Implementations return their own failures (I/O, custom lookups)
    /// unchanged; the pipeline does not wrap them.
    async fn resolve(&self, config: &RequestConfig) -> Result<Option<T>, VaultError>;
}

/// A config value that is either fixed or resolved per request.
pub enum Field<T> {
    /// A fixed value.
    Static(T),
    /// A value computed from the request config at send time.
    Resolver(Arc<dyn Resolve<T>>),
}

impl<T: Send + 'static> Field<T> {
    /// Wrap a resolver.
    pub fn resolver(resolver: impl Resolve<T> + 'static) -> Self {
        Self::Resolver(Arc::new(resolver))
    }

    /// The value, if this field is static.
    pub fn as_static(&self) -> Option<&T> {
        match self {
            Self::Static(value) => Some(value),
            Self::Resolver(_) => None,
        }
    }

    /// Produce the value, invoking the resolver if there is one.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error unchanged.
    pub async fn resolve(&self, config: &RequestConfig) -> Result<Option<T>, VaultError>
    where
        T: Clone,
    {
        match self {
            Self::Static(value) => Ok(Some(value.clone())),
            Self::Resolver(resolver) => resolver.resolve(config).await,
        }
    }
}

impl<T: Clone> Clone for Field<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(value) => Self::Static(value.clone()),
            Self::Resolver(resolver) => Self::Resolver(Arc::clone(resolver)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<String> for Field<String> {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Self::Static(value.to_owned())
    }
}

/// Reads one environment variable at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    name: String,
}

impl EnvVar {
    /// Resolver for the named variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Current value; `None` when unset or not valid Unicode.
    pub fn read(&self) -> Option<String> {
        std::env::var(&self.name).ok()
    }
}

#[async_trait]
impl Resolve<String> for EnvVar {
    async fn resolve(&self, _config: &RequestConfig) -> Result<Option<String>, VaultError> {
        Ok(self.read())
    }
}

/// Default token resolver.
///
/// Reads the file at [`RequestConfig::token_path`] when one is set, using
/// the whole content verbatim as the token. Otherwise falls back to an
/// environment variable (`VAULT_TOKEN` by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSource {
    env: EnvVar,
}

impl TokenSource {
    /// Token source falling back to the given environment variable.
    pub fn from_env(name: impl Into<String>) -> Self {
        Self {
            env: EnvVar::new(name),
        }
    }

    /// Read a token file synchronously as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Io`] if the file cannot be read.
    pub fn read_file(path: &Path) -> Result<String, VaultError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::from_env(TOKEN_ENV)
    }
}

#[async_trait]
impl Resolve<String> for TokenSource {
    async fn resolve(&self, config: &RequestConfig) -> Result<Option<String>, VaultError> {
        if let Some(path) = &config.token_path {
            return Self::read_file(path).map(Some);
        }
        Ok(self.env.read())
    }
}

/// Adapter turning a synchronous closure into a [`Resolve`] implementation.
pub struct FnResolver<F>(F);

#[async_trait]
impl<T, F> Resolve<T> for FnResolver<F>
where
    T: Send + 'static,
    F: Fn(&RequestConfig) -> Result<Option<T>, VaultError> + Send + Sync,
{
    async fn resolve(&self, config: &RequestConfig) -> Result<Option<T>, VaultError> {
        (self.0)(config)
    }
}

/// Build a resolver field from a closure.
///
/// ```rust
/// use vaultline_client::{Options, resolver_fn};
///
/// let options = Options::default().with_address(resolver_fn(|config| {
///     Ok(Some(format!("https://{}.vault.internal", config.mount.as_deref().unwrap_or("root"))))
/// }));
/// # drop(options);
/// ```
pub fn resolver_fn<T, F>(f: F) -> Field<T>
where
    T: Send + 'static,
    F: Fn(&RequestConfig) -> Result<Option<T>, VaultError> + Send + Sync + 'static,
{
    Field::resolver(FnResolver(f))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::config::{Options, Request};
    use crate::types::Method;

    const UNSET_VAR: &str = "VAULTLINE_TEST_RESOLVE_NEVER_SET";

    fn config() -> RequestConfig {
        RequestConfig::merge(&Options::default(), Request::new(Method::Read, "kv/foo"))
    }

    #[tokio::test]
    async fn env_var_unset_resolves_to_none() {
        let resolver = EnvVar::new(UNSET_VAR);
        assert_eq!(resolver.resolve(&config()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn env_var_reads_process_environment() {
        // PATH is set in every test environment we run in.
        let expected = std::env::var("PATH").ok();
        let resolver = EnvVar::new("PATH");
        assert_eq!(resolver.resolve(&config()).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn token_file_content_is_used_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"s.sometoken").unwrap();

        let mut cfg = config();
        cfg.token_path = Some(file.path().to_path_buf());

        let token = TokenSource::from_env(UNSET_VAR).resolve(&cfg).await.unwrap();
        assert_eq!(token.as_deref(), Some("s.sometoken"));
    }

    #[tokio::test]
    async fn token_file_whitespace_is_not_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"s.some token\n").unwrap();

        let mut cfg = config();
        cfg.token_path = Some(file.path().to_path_buf());

        let token = TokenSource::default().resolve(&cfg).await.unwrap();
        assert_eq!(token.as_deref(), Some("s.some token\n"));
    }

    #[tokio::test]
    async fn unreadable_token_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config();
        cfg.token_path = Some(dir.path().join("missing-token"));

        let err = TokenSource::default().resolve(&cfg).await.unwrap_err();
        assert!(matches!(err, VaultError::Io(_)), "got {err:?}");
        assert!(!err.is_invalid_config());
    }

    #[tokio::test]
    async fn token_without_file_or_env_is_none() {
        let token = TokenSource::from_env(UNSET_VAR)
            .resolve(&config())
            .await
            .unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn closure_resolver_sees_request_config() {
        let field: Field<String> = resolver_fn(|cfg| Ok(Some(format!("{}!", cfg.path))));
        assert_eq!(
            field.resolve(&config()).await.unwrap().as_deref(),
            Some("kv/foo!")
        );
    }

    #[tokio::test]
    async fn static_field_resolves_to_itself() {
        let field = Field::from("https://vault.local");
        assert_eq!(field.as_static().map(String::as_str), Some("https://vault.local"));
        assert_eq!(
            field.resolve(&config()).await.unwrap().as_deref(),
            Some("https://vault.local")
        );
    }

    #[test]
    fn debug_hides_resolver_internals() {
        let field: Field<String> = Field::resolver(EnvVar::new(UNSET_VAR));
        assert_eq!(format!("{field:?}"), "Resolver(..)");
    }
}
