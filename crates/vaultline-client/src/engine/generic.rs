//! Passthrough engine with `help` support.

use super::{Engine, forward_write_data, http_method_for, with_list_query};
use crate::config::RequestConfig;
use crate::types::Method;

const HELP_QUERY: &str = "?help=1";

/// Sends the path as given, for any backend that follows the plain
/// read/list/write/delete conventions. Unlike [`super::KvEngine`] it also
/// serves `help`, as `GET <path>?help=1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericEngine;

impl Engine for GenericEngine {
    fn pre_request(&self, config: &mut RequestConfig) {
        let method = config.method;
        let (path, verb) = if method == Method::Help {
            (format!("{}{HELP_QUERY}", config.path), Some(reqwest::Method::GET))
        } else {
            (with_list_query(method, config.path.clone()), http_method_for(method))
        };

        config.request_path = Some(path);
        config.http_method = verb;
        forward_write_data(config);
    }
}
