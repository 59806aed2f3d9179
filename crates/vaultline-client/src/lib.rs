//! Client for Vault-style secrets servers.
//!
//! Every call runs through one linear pipeline: the per-call [`Options`] are
//! merged over the client defaults, dynamic fields (address, token, engine)
//! are resolved, the selected [`Engine`] turns the logical operation into a
//! concrete HTTP method and path, the shape is validated, and the request is
//! handed to a [`Transport`].
//!
//! # Example
//!
//! ```rust,no_run
//! use vaultline_client::{Options, Vault};
//!
//! # async fn example() -> Result<(), vaultline_client::VaultError> {
//! // Address and token come from `VAULT_ADDR` / `VAULT_TOKEN` at call time.
//! let vault = Vault::new()?;
//! let secret = vault.read("kv/myapp", Options::default()).await?;
//! println!("{}", secret.body);
//!
//! vault
//!     .write(
//!         "myapp",
//!         serde_json::json!({ "db_host": "10.0.0.1" }),
//!         Options::default().with_engine("kv-mounted").with_mount("kv"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
pub mod engine;
mod error;
mod mount;
mod resolve;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{
    ADDRESS_ENV, DEFAULT_API_VERSION, Options, Request, RequestConfig, TOKEN_ENV, trim_slashes,
};
pub use engine::{Engine, EngineRegistry};
pub use error::VaultError;
pub use mount::MountTable;
pub use resolve::{EnvVar, Field, FnResolver, Resolve, TokenSource, resolver_fn};
pub use transport::{ReqwestTransport, Transport};
pub use types::{HttpRequest, Method, VaultResponse};

use std::sync::Arc;

/// Header carrying the client token on every request.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Marker header added when [`Options::is_vault_request`] is enabled.
pub const VAULT_REQUEST_HEADER: &str = "X-Vault-Request";

/// Vault client.
///
/// Holds the immutable defaults and the engine registry; both are shared
/// behind `Arc`, so cloning a client is cheap and concurrent calls never
/// observe each other's request state.
#[derive(Clone)]
pub struct Vault {
    defaults: Arc<Options>,
    engines: Arc<EngineRegistry>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("defaults", &self.defaults)
            .field("engines", &self.engines.names())
            .finish()
    }
}
