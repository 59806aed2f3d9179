//! Key/value engines.

use super::{Engine, forward_write_data, http_method_for, with_list_query};
use crate::config::{RequestConfig, trim_slashes};

/// Mount-agnostic KV engine: the request path is the secret path as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvEngine;

impl Engine for KvEngine {
    fn pre_request(&self, config: &mut RequestConfig) {
        let base = config.path.clone();
        shape(config, Some(base));
    }
}

/// Mount-aware KV engine.
///
/// Prefixes the path with `<mount>/` unless `path_includes_mount` says the
/// caller already did. Without a mount there is nothing to prefix, so the
/// request path stays unset and the request is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountedKvEngine;

impl Engine for MountedKvEngine {
    fn pre_request(&self, config: &mut RequestConfig) {
        let base = if config.path_includes_mount {
            Some(config.path.clone())
        } else {
            config
                .mount
                .as_deref()
                .map(|mount| format!("{}/{}", trim_slashes(mount), config.path))
        };
        shape(config, base);
    }
}

fn shape(config: &mut RequestConfig, base: Option<String>) {
    let method = config.method;
    config.request_path = base.map(|path| with_list_query(method, path));
    config.http_method = http_method_for(method);
    forward_write_data(config);
}
