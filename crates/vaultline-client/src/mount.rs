//! Mount table used by the default engine resolver.
//!
//! Maps mount names to engine names. When a request names its mount
//! explicitly, that entry wins; otherwise the longest registered mount that
//! prefixes the request path (on a `/` boundary) is used, the same way the
//! server routes `/v1/<mount>/...`. Anything unmatched falls back to `kv`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{RequestConfig, trim_slashes};
use crate::engine::KV;
use crate::error::VaultError;
use crate::resolve::Resolve;

/// Mount → engine name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTable {
    entries: HashMap<String, String>,
    fallback: String,
}

impl Default for MountTable {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            fallback: KV.to_owned(),
        }
    }
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `engine` for `mount`. Surrounding slashes on the mount are
    /// ignored; a later registration for the same mount replaces the earlier.
    #[must_use]
    pub fn mount(mut self, mount: &str, engine: impl Into<String>) -> Self {
        self.entries
            .insert(trim_slashes(mount).to_owned(), engine.into());
        self
    }

    /// Engine used when no mount matches.
    #[must_use]
    pub fn with_fallback(mut self, engine: impl Into<String>) -> Self {
        self.fallback = engine.into();
        self
    }

    /// Engine name for a request.
    pub fn engine_for(&self, mount: Option<&str>, path: &str) -> &str {
        if let Some(engine) = mount.and_then(|m| self.entries.get(trim_slashes(m))) {
            return engine;
        }

        let mut best: Option<(&str, &str)> = None;
        for (prefix, engine) in &self.entries {
            if strip_mount(path, prefix).is_none() {
                continue;
            }
            match best {
                Some((current, _)) if current.len() >= prefix.len() => {}
                _ => best = Some((prefix.as_str(), engine.as_str())),
            }
        }

        best.map_or(self.fallback.as_str(), |(_, engine)| engine)
    }
}

/// The part of `path` below `mount`, if `path` is the mount itself or
/// continues it on a `/` boundary.
pub(crate) fn strip_mount<'a>(path: &'a str, mount: &str) -> Option<&'a str> {
    match path.strip_prefix(mount)? {
        "" => Some(""),
        rest => rest.strip_prefix('/'),
    }
}

#[async_trait]
impl Resolve<String> for MountTable {
    async fn resolve(&self, config: &RequestConfig) -> Result<Option<String>, VaultError> {
        Ok(Some(
            self.engine_for(config.mount.as_deref(), &config.path)
                .to_owned(),
        ))
    }
}
