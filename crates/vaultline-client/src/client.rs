//! Request pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::{Options, Request, RequestConfig, trim_slashes};
use crate::engine::{Engine, EngineRegistry};
use crate::error::VaultError;
use crate::resolve::Field;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{HttpRequest, Method, VaultResponse};
use crate::{TOKEN_HEADER, VAULT_REQUEST_HEADER, Vault};

const DATA_WITHOUT_BODY: &str = "data was given but the engine produced no request body";
const BODY_WITHOUT_DATA: &str = "engine produced a request body but no data was given";

/// Everything dispatch needs that the connectivity check has proven present.
struct Connection {
    transport: Arc<dyn Transport>,
    base_url: String,
    token: String,
}

impl Vault {
    /// Client with the baseline [`Options::defaults`] and a
    /// [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, VaultError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_defaults(
            Options::defaults().with_transport(Arc::new(transport)),
        ))
    }

    /// Client with the given defaults and the built-in engines.
    ///
    /// The defaults are used as given; layer them over
    /// [`Options::defaults`] with [`Options::merge`] to keep the
    /// environment-based resolvers.
    pub fn with_defaults(defaults: Options) -> Self {
        Self::with_registry(defaults, EngineRegistry::builtin())
    }

    /// Client with the given defaults and engine registry.
    pub fn with_registry(defaults: Options, engines: EngineRegistry) -> Self {
        Self {
            defaults: Arc::new(defaults),
            engines: Arc::new(engines),
        }
    }

    /// The defaults every request is merged over.
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Run one request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] when the transport, address, API
    /// version or token is missing after resolution, when no known engine is
    /// selected, or when the engine's transform leaves the request without a
    /// method or path or with a body that does not match the caller's data.
    /// Nothing is sent in those cases. The same error is returned after
    /// dispatch if the engine's post-request hook discards the response.
    /// Resolver, token file, and transport failures are returned unchanged.
    pub async fn execute(&self, request: Request) -> Result<VaultResponse, VaultError> {
        let mut config = RequestConfig::merge(&self.defaults, request);
        config.normalize();
        debug!(method = %config.method, path = %config.path, "vault request");

        let config = resolve_connection(config).await?;
        let (config, connection) = check_connection(config)?;
        let (mut config, engine) = self.select_engine(config).await?;

        engine.pre_request(&mut config);
        let (config, method, request_path) = check_shape(config)?;

        let mut config = dispatch(config, connection, method, &request_path).await?;
        engine.post_request(&mut config);

        match config.response.take() {
            Some(response) => Ok(response),
            None => Err(reject("post-request hook discarded the response", config)),
        }
    }

    /// Read the secret at `path`.
    ///
    /// # Errors
    ///
    /// See [`Vault::execute`].
    pub async fn read(&self, path: &str, options: Options) -> Result<VaultResponse, VaultError> {
        self.execute(Request::new(Method::Read, path).with_options(options))
            .await
    }

    /// List the keys under `path`.
    ///
    /// # Errors
    ///
    /// See [`Vault::execute`].
    pub async fn list(&self, path: &str, options: Options) -> Result<VaultResponse, VaultError> {
        self.execute(Request::new(Method::List, path).with_options(options))
            .await
    }

    /// Write `data` to `path`.
    ///
    /// # Errors
    ///
    /// See [`Vault::execute`].
    pub async fn write(
        &self,
        path: &str,
        data: Value,
        options: Options,
    ) -> Result<VaultResponse, VaultError> {
        self.execute(
            Request::new(Method::Write, path)
                .with_data(data)
                .with_options(options),
        )
        .await
    }

    /// Delete the secret at `path`.
    ///
    /// # Errors
    ///
    /// See [`Vault::execute`].
    pub async fn delete(&self, path: &str, options: Options) -> Result<VaultResponse, VaultError> {
        self.execute(Request::new(Method::Delete, path).with_options(options))
            .await
    }

    /// Fetch the server's help for `path`. Only engines that map `help` to
    /// an HTTP verb (such as `generic`) support this.
    ///
    /// # Errors
    ///
    /// See [`Vault::execute`].
    pub async fn help(&self, path: &str, options: Options) -> Result<VaultResponse, VaultError> {
        self.execute(Request::new(Method::Help, path).with_options(options))
            .await
    }

    async fn select_engine(
        &self,
        mut config: RequestConfig,
    ) -> Result<(RequestConfig, Arc<dyn Engine>), VaultError> {
        if let Some(Field::Resolver(resolver)) = &config.engine {
            let resolver = Arc::clone(resolver);
            config.engine = resolver.resolve(&config).await?.map(Field::Static);
        }

        let Some(name) = config.engine_name().map(str::to_owned) else {
            return Err(reject("no engine resolved", config));
        };
        match self.engines.get(&name) {
            Some(engine) => {
                debug!(engine = %name, "engine resolved");
                Ok((config, engine))
            }
            None => Err(reject(format!("unknown engine '{name}'"), config)),
        }
    }
}

/// Replace resolver-backed address and token with their resolved values.
///
/// The address is slash-trimmed once resolved. A resolver that yields `None`
/// leaves the field unset for the connectivity check to report.
async fn resolve_connection(mut config: RequestConfig) -> Result<RequestConfig, VaultError> {
    if let Some(Field::Resolver(resolver)) = &config.address {
        let resolver = Arc::clone(resolver);
        config.address = resolver.resolve(&config).await?.map(Field::Static);
    }
    if let Some(Field::Static(address)) = &mut config.address {
        *address = trim_slashes(address).to_owned();
    }

    if let Some(Field::Resolver(resolver)) = &config.token {
        let resolver = Arc::clone(resolver);
        config.token = resolver.resolve(&config).await?.map(Field::Static);
    }

    Ok(config)
}

fn check_connection(config: RequestConfig) -> Result<(RequestConfig, Connection), VaultError> {
    let connection = match (
        &config.transport,
        config.address(),
        config.api_version(),
        config.token(),
    ) {
        (Some(transport), Some(address), Some(api_version), Some(token)) => Some(Connection {
            transport: Arc::clone(transport),
            base_url: format!("{address}/{api_version}"),
            token: token.to_owned(),
        }),
        _ => None,
    };

    match connection {
        Some(connection) => Ok((config, connection)),
        None => {
            let reason = format!("missing {}", missing_connection_fields(&config).join(", "));
            Err(reject(reason, config))
        }
    }
}

fn missing_connection_fields(config: &RequestConfig) -> Vec<&'static str> {
    [
        ("transport", config.transport.is_some()),
        ("address", config.address().is_some()),
        ("api version", config.api_version().is_some()),
        ("token", config.token().is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| (!present).then_some(name))
    .collect()
}

/// Validate what the engine produced and hand back the verb and path.
fn check_shape(
    mut config: RequestConfig,
) -> Result<(RequestConfig, reqwest::Method, String), VaultError> {
    if let Some(path) = &mut config.request_path {
        *path = trim_slashes(path).to_owned();
    }

    let shape = match (
        &config.http_method,
        config.request_path.as_deref().filter(|p| !p.is_empty()),
    ) {
        (None, _) => Err(format!("engine has no HTTP method for '{}'", config.method)),
        (_, None) => Err("engine did not set a request path".to_owned()),
        (Some(method), Some(path)) => match (config.data.is_some(), config.request_data.is_some()) {
            (true, false) => Err(DATA_WITHOUT_BODY.to_owned()),
            (false, true) => Err(BODY_WITHOUT_DATA.to_owned()),
            _ => Ok((method.clone(), path.to_owned())),
        },
    };

    match shape {
        Ok((method, path)) => Ok((config, method, path)),
        Err(reason) => Err(reject(reason, config)),
    }
}

async fn dispatch(
    mut config: RequestConfig,
    connection: Connection,
    method: reqwest::Method,
    request_path: &str,
) -> Result<RequestConfig, VaultError> {
    let Connection {
        transport,
        base_url,
        token,
    } = connection;

    let mut headers = BTreeMap::new();
    set_header(&mut headers, TOKEN_HEADER, token);
    let caller: BTreeMap<&String, &String> = config.headers.iter().collect();
    for (name, value) in caller {
        set_header(&mut headers, name, value.clone());
    }
    if config.is_vault_request {
        set_header(&mut headers, VAULT_REQUEST_HEADER, "true".to_owned());
    }

    let request = HttpRequest {
        method,
        url: format!("{base_url}/{request_path}"),
        headers,
        body: config.request_data.clone(),
    };
    trace!(headers = request.headers.len(), "request headers assembled");
    debug!(method = %request.method, url = %request.url, "dispatching vault request");

    let response = transport.send(request).await?;
    trace!(status = response.status, "vault request completed");
    config.response = Some(response);
    Ok(config)
}

/// Insert a header, replacing any existing header whose name differs only
/// in case.
fn set_header(headers: &mut BTreeMap<String, String>, name: &str, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_owned(), value);
}

fn reject(reason: impl Into<String>, config: RequestConfig) -> VaultError {
    let reason = reason.into();
    warn!(method = %config.method, path = %config.path, %reason, "rejecting vault request");
    VaultError::invalid_config(reason, config)
}
