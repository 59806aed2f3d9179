//! `vaultline` CLI: command-line front end for the vaultline client.
//!
//! Each subcommand is one logical method of [`vaultline_client::Vault`]; the
//! global flags become per-call [`Options`] layered over the client defaults,
//! so anything not given on the command line still comes from `VAULT_ADDR`,
//! `VAULT_TOKEN` and the default mount table.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vaultline_client::{Options, ReqwestTransport, Vault, VaultResponse};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";

// ── CLI structure ────────────────────────────────────────────────────

/// vaultline: read and write secrets on a Vault-style server.
#[derive(Parser)]
#[command(
    name = "vaultline",
    version,
    about = "vaultline CLI: read, list, write and delete secrets on a Vault-style server",
    long_about = None,
    disable_help_subcommand = true,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         VAULT_ADDR           Server address\n  \
         VAULT_TOKEN          Authentication token\n  \
         VAULT_TOKEN_PATH     File holding the token (wins over VAULT_TOKEN)\n  \
         VAULTLINE_LOG_LEVEL  Log filter when RUST_LOG is unset (default: warn)\n\n\
         {DIM}Examples:{RESET}\n  \
         vaultline read kv/myapp\n  \
         vaultline list kv\n  \
         vaultline write --engine kv-mounted --mount kv myapp db_host=10.0.0.1\n  \
         vaultline write --engine kv2 secret/myapp --json '{{\"port\": 5432}}'\n  \
         vaultline help --engine generic sys/mounts"
    ),
)]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "VAULTLINE_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Print status, headers and body instead of only the body.
    #[arg(long, global = true)]
    full: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Server address.
    #[arg(long, env = "VAULT_ADDR", global = true)]
    addr: Option<String>,

    /// Authentication token.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Read the token from this file instead.
    #[arg(long, env = "VAULT_TOKEN_PATH", global = true)]
    token_path: Option<PathBuf>,

    /// API path segment (default: v1).
    #[arg(long, global = true)]
    api_version: Option<String>,

    /// Engine that shapes the request: kv, kv-mounted, kv2 or generic.
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Mount the secret lives under.
    #[arg(long, global = true)]
    mount: Option<String>,

    /// The path already starts with the mount.
    #[arg(long, global = true)]
    path_includes_mount: bool,

    /// Extra header, repeatable.
    #[arg(short = 'H', long = "header", value_name = "KEY=VALUE", global = true)]
    headers: Vec<String>,

    /// Do not send the `X-Vault-Request: true` marker.
    #[arg(long, global = true)]
    no_vault_request: bool,

    /// Abort requests that take longer than this.
    #[arg(long, value_name = "SECS", global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a secret by path.
    Read {
        /// Secret path.
        path: String,
    },
    /// List keys under a path.
    List {
        /// Path prefix.
        path: String,
    },
    /// Write a secret from key=value pairs or a JSON object.
    Write {
        /// Secret path.
        path: String,
        /// Key-value pairs in key=value format.
        #[arg(conflicts_with = "json")]
        data: Vec<String>,
        /// The whole payload as a JSON object.
        #[arg(long, value_name = "JSON")]
        json: Option<String>,
    },
    /// Delete a secret by path.
    Delete {
        /// Secret path.
        path: String,
    },
    /// Show the server's help for a path (needs an engine that supports it).
    Help {
        /// Path to describe.
        path: String,
    },
}

impl ConnectionArgs {
    /// Per-call overrides from the flags that were actually given.
    fn options(&self) -> Result<Options> {
        let transport = match self.timeout_secs {
            Some(secs) => ReqwestTransport::with_timeout(Duration::from_secs(secs)),
            None => ReqwestTransport::new(),
        }
        .context("failed to build HTTP client")?;

        let mut options = Options::default().with_transport(Arc::new(transport));
        if let Some(addr) = &self.addr {
            options = options.with_address(addr.as_str());
        }
        // A token file is read by the default token resolver, so a static
        // token is only set when there is no file.
        match (&self.token_path, &self.token) {
            (Some(path), _) => options = options.with_token_path(path.clone()),
            (None, Some(token)) => options = options.with_token(token.as_str()),
            (None, None) => {}
        }
        if let Some(version) = &self.api_version {
            options = options.with_api_version(version.as_str());
        }
        if let Some(engine) = &self.engine {
            options = options.with_engine(engine.as_str());
        }
        if let Some(mount) = &self.mount {
            options = options.with_mount(mount.as_str());
        }
        if self.path_includes_mount {
            options = options.with_path_includes_mount(true);
        }
        if !self.headers.is_empty() {
            options = options.with_headers(parse_kv_pairs(&self.headers)?);
        }
        if self.no_vault_request {
            options = options.with_vault_request(false);
        }
        Ok(options)
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{RED}{BOLD}✗ Error:{RESET} {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let options = cli.conn.options()?;
    let full = cli.full;
    let vault = Vault::with_defaults(Options::defaults());

    let (verb, path, resp) = match cli.command {
        Commands::Read { path } => {
            let resp = vault.read(&path, options).await;
            ("read", path, resp)
        }
        Commands::List { path } => {
            let resp = vault.list(&path, options).await;
            ("list", path, resp)
        }
        Commands::Write { path, data, json } => {
            let payload = write_payload(&data, json.as_deref())?;
            let resp = vault.write(&path, payload, options).await;
            ("write", path, resp)
        }
        Commands::Delete { path } => {
            let resp = vault.delete(&path, options).await;
            ("delete", path, resp)
        }
        Commands::Help { path } => {
            let resp = vault.help(&path, options).await;
            ("help", path, resp)
        }
    };

    let resp = resp.with_context(|| format!("failed to {verb} '{path}'"))?;
    report(verb, &path, &resp, full)
}

// ── Helpers ──────────────────────────────────────────────────────────

fn parse_kv_pairs(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid key=value pair: '{pair}'"))?;
        if key.is_empty() {
            bail!("invalid key=value pair: '{pair}' has an empty key");
        }
        map.insert(key.to_owned(), value.to_owned());
    }
    Ok(map)
}

/// Payload for `write`: the `--json` document when given, otherwise the
/// key=value pairs as a flat object of strings.
fn write_payload(pairs: &[String], json: Option<&str>) -> Result<Value> {
    if let Some(doc) = json {
        let value: Value = serde_json::from_str(doc).context("--json is not valid JSON")?;
        if !value.is_object() {
            bail!("--json must be a JSON object");
        }
        return Ok(value);
    }

    let map = parse_kv_pairs(pairs)?;
    Ok(Value::Object(
        map.into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    ))
}

fn report(verb: &str, path: &str, resp: &VaultResponse, full: bool) -> Result<()> {
    debug!(status = resp.status, "request completed");
    match printable(resp, full)? {
        Some(value) => print_json(&value),
        None => eprintln!("{GREEN}{BOLD}✓{RESET} {verb} {path} {DIM}({}){RESET}", resp.status),
    }
    Ok(())
}

/// What goes to stdout: the whole response with `--full`, otherwise the body
/// unless it is empty.
fn printable(resp: &VaultResponse, full: bool) -> Result<Option<Value>> {
    if full {
        return serde_json::to_value(resp)
            .map(Some)
            .context("failed to serialize response");
    }
    Ok((!resp.body.is_null()).then(|| resp.body.clone()))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to format JSON: {e}"),
    }
}
