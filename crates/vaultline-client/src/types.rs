//! Public types for the vaultline client.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Logical operation requested by the caller.
///
/// Distinct from the HTTP verb: the engine decides which verb (if any) a
/// logical method maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a secret.
    Read,
    /// List keys under a prefix.
    List,
    /// Write a secret. The only method that carries a payload.
    Write,
    /// Delete a secret.
    Delete,
    /// Fetch the server's help text for a path.
    Help,
}

impl Method {
    /// Lowercase name of the method.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::List => "list",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled HTTP request, as handed to a [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP verb chosen by the engine.
    pub method: reqwest::Method,
    /// `<address>/<api_version>/<request_path>`.
    pub url: String,
    /// Token header, caller headers, and the optional request marker.
    pub headers: BTreeMap<String, String>,
    /// JSON body, present only for requests that carry data.
    pub body: Option<serde_json::Value>,
}

/// Raw response returned by a transport.
///
/// Serializes as `{"status", "headers", "body"}`, which is what
/// `vaultline --full` prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body; `Null` when the server sent no content.
    pub body: serde_json::Value,
}

impl VaultResponse {
    /// The `data` object of a standard Vault response body, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.body.get("data")
    }
}
