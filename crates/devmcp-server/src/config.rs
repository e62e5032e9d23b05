//! Server configuration surface.
//!
//! Plain key/value options consumed from the host dev server: mount root,
//! advertised host/port, SSE keep-alive, and whether to print or persist
//! the resolved endpoint URL into local IDE configuration files.

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Streaming transport configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Mount root for both endpoints (default: "/__mcp")
    pub mount_path: String,

    /// Host to bind and advertise
    pub host: String,

    /// Port to bind; 0 picks an ephemeral port
    pub port: u16,

    /// Keep-alive interval for the SSE stream
    pub keep_alive_interval: Duration,

    /// Print the resolved endpoint URL to stdout on start
    pub print_url: bool,

    /// IDE configuration files to persist the endpoint URL into
    pub update_config_files: Vec<EditorConfig>,

    /// Project root the IDE configuration paths are resolved against
    pub project_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mount_path: "/__mcp".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            keep_alive_interval: Duration::from_secs(30),
            print_url: true,
            update_config_files: Vec::new(),
            project_root: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// The address string passed to the TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path suffix of the stream endpoint, relative to the server root.
    pub fn sse_path(&self) -> String {
        format!("{}/sse", self.mount_path)
    }

    /// Path suffix of the message endpoint, relative to the server root.
    pub fn messages_path(&self) -> String {
        format!("{}/messages", self.mount_path)
    }
}

/// IDE configuration files the advertised endpoint can be written into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorConfig {
    /// `.vscode/mcp.json` - `servers` table with typed entries
    VsCode,
    /// `.cursor/mcp.json` - `mcpServers` table
    Cursor,
}

impl EditorConfig {
    fn relative_path(self) -> &'static str {
        match self {
            Self::VsCode => ".vscode/mcp.json",
            Self::Cursor => ".cursor/mcp.json",
        }
    }

    fn table_key(self) -> &'static str {
        match self {
            Self::VsCode => "servers",
            Self::Cursor => "mcpServers",
        }
    }

    fn entry(self, url: &str) -> Value {
        match self {
            Self::VsCode => json!({"type": "sse", "url": url}),
            Self::Cursor => json!({"url": url}),
        }
    }
}

/// Persist the advertised endpoint URL into the configured IDE files.
///
/// Existing file content is merged, not clobbered: only this server's
/// entry inside the relevant table is replaced. Failures are logged as
/// warnings; endpoint persistence is never fatal.
pub(crate) fn persist_endpoint(config: &ServerConfig, server_name: &str, url: &str) {
    for target in &config.update_config_files {
        if let Err(e) = write_editor_entry(&config.project_root, *target, server_name, url) {
            warn!(file = target.relative_path(), error = %e, "failed to persist endpoint URL");
        } else {
            debug!(file = target.relative_path(), %url, "endpoint URL persisted");
        }
    }
}

fn write_editor_entry(
    root: &Path,
    target: EditorConfig,
    server_name: &str,
    url: &str,
) -> std::io::Result<()> {
    let path = root.join(target.relative_path());

    let mut document: Value = match std::fs::read_to_string(&path) {
        Ok(existing) => serde_json::from_str(&existing).unwrap_or_else(|_| json!({})),
        Err(_) => json!({}),
    };
    if !document.is_object() {
        document = json!({});
    }

    if let Value::Object(doc) = &mut document {
        let entry = doc
            .entry(target.table_key().to_string())
            .or_insert_with(|| json!({}));
        if !entry.is_object() {
            *entry = json!({});
        }
        if let Value::Object(table) = entry {
            table.insert(server_name.to_string(), target.entry(url));
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pretty = serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string());
    std::fs::write(&path, pretty)
}
