//! KV version 2 engine.
//!
//! Secrets live under `<mount>/data/<path>`; listing goes through
//! `<mount>/metadata/<path>`. Writes are wrapped as `{"data": ...}`, and
//! read responses, which the server nests as `data.data` / `data.metadata`,
//! are lifted back to the top-level `data` and `metadata` keys.

use serde_json::{Value, json};

use super::{Engine, http_method_for, with_list_query};
use crate::config::{RequestConfig, trim_slashes};
use crate::mount::strip_mount;
use crate::types::Method;

#[derive(Debug, Clone, Copy, Default)]
pub struct KvV2Engine;

impl KvV2Engine {
    /// Split the request into `(mount, path below the mount)`.
    fn split(config: &RequestConfig) -> (String, String) {
        let path = config.path.as_str();
        match config.mount.as_deref().map(trim_slashes) {
            Some(mount) if config.path_includes_mount => {
                let rest = strip_mount(path, mount).unwrap_or(path);
                (mount.to_owned(), rest.to_owned())
            }
            Some(mount) => (mount.to_owned(), path.to_owned()),
            None => match path.split_once('/') {
                Some((mount, rest)) => (mount.to_owned(), rest.to_owned()),
                None => (path.to_owned(), String::new()),
            },
        }
    }
}

impl Engine for KvV2Engine {
    fn pre_request(&self, config: &mut RequestConfig) {
        let method = config.method;
        let (mount, rest) = Self::split(config);
        let section = if method == Method::List {
            "metadata"
        } else {
            "data"
        };

        let base = if rest.is_empty() {
            format!("{mount}/{section}")
        } else {
            format!("{mount}/{section}/{rest}")
        };

        config.request_path = Some(with_list_query(method, base));
        config.http_method = http_method_for(method);
        if method == Method::Write {
            config.request_data = config.data.clone().map(|data| json!({ "data": data }));
        }
    }

    fn post_request(&self, config: &mut RequestConfig) {
        if config.method != Method::Read {
            return;
        }
        if let Some(response) = config.response.as_mut() {
            lift_nested_data(&mut response.body);
        }
    }
}

fn lift_nested_data(body: &mut Value) {
    let Some(Value::Object(outer)) = body.get_mut("data") else {
        return;
    };
    let Some(inner) = outer.remove("data") else {
        return;
    };
    let metadata = outer.remove("metadata").unwrap_or(Value::Null);

    if let Some(top) = body.as_object_mut() {
        top.insert("data".to_owned(), inner);
        top.insert("metadata".to_owned(), metadata);
    }
}
