//! Secrets engine transforms.
//!
//! An engine turns a logical request (method + path) into the wire-level
//! shape: `request_path`, `http_method`, and `request_data` on the
//! [`RequestConfig`]. Engines are looked up by name in an
//! [`EngineRegistry`]; all of them share the same two-hook capability and
//! differ only in how they address secrets.
//!
//! Built-in engines:
//!
//! | name | addressing |
//! |---|---|
//! | `kv` | path passed through unchanged |
//! | `kv-mounted` | `<mount>/<path>` unless the path already includes the mount |
//! | `kv2` | KV version 2: `<mount>/data/<path>`, `<mount>/metadata/<path>` for lists |
//! | `generic` | like `kv`, plus `help` as `GET <path>?help=1` |

mod generic;
mod kv;
mod kv2;

use std::collections::HashMap;
use std::sync::Arc;

pub use generic::GenericEngine;
pub use kv::{KvEngine, MountedKvEngine};
pub use kv2::KvV2Engine;

use crate::config::RequestConfig;
use crate::types::Method;

/// Name of the mount-agnostic KV engine (the default).
pub const KV: &str = "kv";
/// Name of the mount-aware KV engine.
pub const KV_MOUNTED: &str = "kv-mounted";
/// Name of the KV version 2 engine.
pub const KV_V2: &str = "kv2";
/// Name of the generic passthrough engine.
pub const GENERIC: &str = "generic";

/// Query suffix that turns a read into a list.
pub(crate) const LIST_QUERY: &str = "?list=true";

/// A secrets engine transform.
pub trait Engine: Send + Sync {
    /// Fill in `request_path`, `http_method` and, for writes,
    /// `request_data`.
    ///
    /// Leaving `http_method` or `request_path` unset is how an engine says it
    /// does not support the request; the pipeline turns that into
    /// [`crate::VaultError::InvalidConfig`].
    fn pre_request(&self, config: &mut RequestConfig);

    /// Inspect or rewrite `config.response` after dispatch.
    fn post_request(&self, _config: &mut RequestConfig) {}
}

/// Verb table shared by the built-in engines.
///
/// `help` has no entry; engines that support it map it themselves.
pub fn http_method_for(method: Method) -> Option<reqwest::Method> {
    match method {
        Method::Read | Method::List => Some(reqwest::Method::GET),
        Method::Delete => Some(reqwest::Method::DELETE),
        Method::Write => Some(reqwest::Method::POST),
        Method::Help => None,
    }
}

/// Append the list marker for list requests.
pub(crate) fn with_list_query(method: Method, path: String) -> String {
    if method == Method::List {
        format!("{path}{LIST_QUERY}")
    } else {
        path
    }
}

/// Forward the caller's payload as the request body for writes.
pub(crate) fn forward_write_data(config: &mut RequestConfig) {
    if config.method == Method::Write {
        config.request_data.clone_from(&config.data);
    }
}

/// Name → engine lookup.
#[derive(Clone)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn Engine>>,
}

impl EngineRegistry {
    /// A registry with no engines.
    pub fn empty() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// A registry with every built-in engine registered under its name.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(KV, KvEngine);
        registry.register(KV_MOUNTED, MountedKvEngine);
        registry.register(KV_V2, KvV2Engine);
        registry.register(GENERIC, GenericEngine);
        registry
    }

    /// Register `engine` under `name`, returning the engine it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        engine: impl Engine + 'static,
    ) -> Option<Arc<dyn Engine>> {
        self.engines.insert(name.into(), Arc::new(engine))
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, engine: impl Engine + 'static) -> Self {
        self.register(name, engine);
        self
    }

    /// Look up an engine by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Engine>> {
        self.engines.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Options, Request};

    /// A normalized config for `method` on `path`, ready for `pre_request`.
    pub(crate) fn config_for(method: Method, path: &str, options: Options) -> RequestConfig {
        let request = Request::new(method, path).with_options(options);
        let mut config = RequestConfig::merge(&Options::default(), request);
        config.normalize();
        config
    }

    #[test]
    fn verb_table_matches_logical_methods() {
        assert_eq!(http_method_for(Method::Read), Some(reqwest::Method::GET));
        assert_eq!(http_method_for(Method::List), Some(reqwest::Method::GET));
        assert_eq!(http_method_for(Method::Delete), Some(reqwest::Method::DELETE));
        assert_eq!(http_method_for(Method::Write), Some(reqwest::Method::POST));
        assert_eq!(http_method_for(Method::Help), None);
    }

    #[test]
    fn builtin_registry_has_every_engine() {
        assert_eq!(
            EngineRegistry::builtin().names(),
            vec![GENERIC, KV, KV_MOUNTED, KV_V2]
        );
        assert_eq!(EngineRegistry::default().names().len(), 4);
        assert!(EngineRegistry::empty().names().is_empty());
    }

    #[test]
    fn register_replaces_existing_engine() {
        let mut registry = EngineRegistry::builtin();
        assert!(registry.register(KV, GenericEngine).is_some());
        assert!(registry.register("custom", KvEngine).is_none());
        assert!(registry.get("custom").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn list_query_only_for_list() {
        assert_eq!(with_list_query(Method::List, "kv".to_owned()), "kv?list=true");
        assert_eq!(with_list_query(Method::Read, "kv".to_owned()), "kv");
    }

    #[test]
    fn every_builtin_list_path_ends_with_list_query() {
        let registry = EngineRegistry::builtin();
        let variants = [
            Options::default().with_mount("secret"),
            Options::default().with_mount("secret").with_path_includes_mount(true),
        ];
        for name in registry.names() {
            let engine = registry.get(name).unwrap();
            for options in &variants {
                let mut config = config_for(Method::List, "secret/app", options.clone());
                engine.pre_request(&mut config);
                let path = config.request_path.unwrap_or_default();
                assert!(path.ends_with(LIST_QUERY), "{name}: {path}");
            }
        }
    }
}
