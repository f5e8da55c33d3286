//! Shared setup for every command: config resolution, the definitions
//! artifact, operation arguments and the client.

use anyhow::{Context, Result};
use graphql_builder::{IncludeSpec, OperationRequest, Variables};
use graphql_config::{find_config, load_config, ClientConfig};
use graphql_definitions::{load_definitions, Definitions};
use graphql_dispatch::{
    subscription_endpoint, Client, ClientOptions, DispatchOptions, HttpTransport,
    NetworkTransport, WebSocketTransport,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Flags shared by all subcommands.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub definitions: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub debug: bool,
}

/// Inputs of one operation, as given on the command line.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct OperationArgs {
    /// Operation variables as a JSON object (or @file)
    #[arg(long, value_name = "JSON")]
    pub variables: Option<String>,

    /// Include specification as JSON (or @file)
    #[arg(long, value_name = "JSON")]
    pub include: Option<String>,

    /// Selection text replacing the root entity's default fields
    #[arg(long, value_name = "FIELDS")]
    pub fields: Option<String>,
}

impl OperationArgs {
    pub fn request(&self, name: &str) -> Result<OperationRequest> {
        let mut request = OperationRequest::new(name);

        if let Some(variables) = &self.variables {
            let value = parse_json_arg(variables).context("Failed to parse --variables")?;
            let Value::Object(map) = value else {
                anyhow::bail!("--variables must be a JSON object");
            };
            request = request.variables(Variables::from(map));
        }
        if let Some(include) = &self.include {
            let value = parse_json_arg(include).context("Failed to parse --include")?;
            request = request.include(IncludeSpec::parse(&value));
        }
        if let Some(fields) = &self.fields {
            request = request.fields(fields.clone());
        }

        Ok(request)
    }
}

/// Parses a JSON argument. A leading `@` reads the JSON from that file.
pub fn parse_json_arg(arg: &str) -> Result<Value> {
    let contents = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {path}"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&contents).context("Invalid JSON")
}

/// Parses a header string in "Name: Value" format.
pub fn parse_header(header: &str) -> Result<(String, String)> {
    let Some((name, value)) = header.split_once(':') else {
        anyhow::bail!("Invalid header format: '{header}'. Expected 'Header-Name: Header-Value'");
    };
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Header name cannot be empty");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Per-call options from `--timeout`, `--request-id` and `--header`.
pub fn dispatch_options(
    timeout: Option<u64>,
    request_id: Option<String>,
    headers: &[String],
) -> Result<DispatchOptions> {
    let mut options = DispatchOptions::new();
    if let Some(timeout) = timeout {
        options = options.with_timeout(Duration::from_secs(timeout));
    }
    if let Some(request_id) = request_id {
        options = options.with_request_id(request_id);
    }
    for header in headers {
        let (name, value) = parse_header(header)?;
        options = options.with_header(name, value);
    }
    Ok(options)
}

/// Config, definitions and paths a command runs with.
pub struct CommandContext {
    pub config: ClientConfig,
    /// Directory relative paths in the config resolve against
    pub base_dir: PathBuf,
    pub definitions: Arc<Definitions>,
}

impl CommandContext {
    /// Loads the config file (explicit or discovered), applies environment
    /// and flag overrides, then loads the definitions artifact.
    #[tracing::instrument(skip(options))]
    pub fn load(options: &GlobalOptions) -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read current directory")?;
        let (config, base_dir) = resolve_config(options, &current_dir)?;

        let definitions_path = options
            .definitions
            .clone()
            .or_else(|| config.definitions_path(&base_dir))
            .context(
                "No definitions artifact configured. Use --definitions, set DEFINITIONS, \
                 or add `definitions` to the config file.",
            )?;

        let definitions = load_definitions(&definitions_path).with_context(|| {
            format!("Failed to load definitions from {}", definitions_path.display())
        })?;

        Ok(Self {
            config,
            base_dir,
            definitions: Arc::new(definitions),
        })
    }

    /// A client for the configured endpoint. `chunk_size` overrides the
    /// configured batch chunk size.
    pub fn client(&self, chunk_size: Option<usize>) -> Result<Client<NetworkTransport>> {
        self.config
            .validate()
            .map_err(|message| anyhow::anyhow!("Invalid configuration: {message}"))?;

        let mut options = ClientOptions::new(&self.config.endpoint).with_debug(self.config.debug);
        if let Some(chunk_size) = chunk_size.or(self.config.batch_chunk_size) {
            options = options.with_chunk_size(chunk_size);
        }

        Ok(Client::new(
            Arc::clone(&self.definitions),
            network_transport(&self.config),
            options,
        ))
    }
}

fn resolve_config(options: &GlobalOptions, current_dir: &Path) -> Result<(ClientConfig, PathBuf)> {
    let config_path = match &options.config {
        Some(path) => Some(path.clone()),
        None => find_config(current_dir).context("Failed to search for config")?,
    };

    let (mut config, base_dir) = match config_path {
        Some(path) => {
            let config = load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            let base_dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map_or_else(|| current_dir.to_path_buf(), Path::to_path_buf);
            (config, base_dir)
        }
        None => {
            tracing::debug!("No config file, using flags and environment only");
            (ClientConfig::default(), current_dir.to_path_buf())
        }
    };

    config.apply_env();
    if let Some(endpoint) = &options.endpoint {
        config.endpoint.clone_from(endpoint);
    }
    if options.debug {
        config.debug = true;
    }

    Ok((config, base_dir))
}

/// HTTP for queries and mutations, websockets for subscriptions, both
/// carrying the configured headers.
pub fn network_transport(config: &ClientConfig) -> NetworkTransport {
    let mut http = HttpTransport::new(&config.endpoint)
        .with_headers(config.headers.clone())
        .with_retries(config.retries());
    if let Some(timeout) = config.timeout() {
        http = http.with_timeout(timeout);
    }

    let ws_endpoint = config
        .subscription_endpoint
        .clone()
        .unwrap_or_else(|| subscription_endpoint(&config.endpoint));
    let mut ws = WebSocketTransport::new(ws_endpoint).with_headers(config.headers.clone());

    if let Some(connect_timeout) = config.connect_timeout() {
        http = http.with_connect_timeout(connect_timeout);
        ws = ws.with_connect_timeout(connect_timeout);
    }

    NetworkTransport::new(http, ws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_header_valid() {
        let (name, value) = parse_header("Authorization: Bearer token").unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer token");
    }

    #[test]
    fn test_parse_header_with_colons_in_value() {
        let (name, value) = parse_header("X-Custom: value:with:colons").unwrap();
        assert_eq!(name, "X-Custom");
        assert_eq!(value, "value:with:colons");
    }

    #[test]
    fn test_parse_header_invalid() {
        assert!(parse_header("InvalidHeader").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_operation_args_request() {
        let args = OperationArgs {
            variables: Some(r#"{"id": "1", "search": null}"#.into()),
            include: Some(r#"["posts"]"#.into()),
            fields: Some("id".into()),
        };
        let request = args.request("user").unwrap();

        assert_eq!(request.name, "user");
        assert_eq!(request.variables.defined().count(), 2);
        assert_eq!(request.include, Some(IncludeSpec::parse(&json!(["posts"]))));
        assert_eq!(request.fields.as_deref(), Some("id"));
    }

    #[test]
    fn test_operation_args_rejects_non_object_variables() {
        let args = OperationArgs {
            variables: Some("[1, 2]".into()),
            ..OperationArgs::default()
        };
        assert!(args.request("user").is_err());
    }

    #[test]
    fn test_parse_json_arg_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("include.json");
        std::fs::write(&path, r#"{"posts": {"$": {"first": 2}}}"#).unwrap();

        let value = parse_json_arg(&format!("@{}", path.display())).unwrap();
        assert_eq!(value, json!({ "posts": { "$": { "first": 2 } } }));
    }

    #[test]
    fn test_dispatch_options() {
        let options = dispatch_options(
            Some(5),
            Some("search".into()),
            &["X-Trace: abc".to_string()],
        )
        .unwrap();
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.request_id.as_deref(), Some("search"));
        assert_eq!(options.headers["X-Trace"], "abc");
    }

    #[test]
    fn test_resolve_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".graphqlclientrc.yml");
        std::fs::write(
            &config_path,
            "endpoint: http://localhost:4000/graphql\ndefinitions: defs.json\n",
        )
        .unwrap();

        let options = GlobalOptions {
            config: Some(config_path),
            endpoint: Some("https://override.example.com/graphql".into()),
            ..GlobalOptions::default()
        };
        let (config, base_dir) = resolve_config(&options, Path::new("/elsewhere")).unwrap();

        assert_eq!(config.endpoint, "https://override.example.com/graphql");
        assert_eq!(base_dir, dir.path());
        assert_eq!(
            config.definitions_path(&base_dir),
            Some(dir.path().join("defs.json"))
        );
    }

    #[test]
    fn test_network_transport_derives_ws_endpoint() {
        let transport = network_transport(&ClientConfig::new("https://api.example.com/graphql"));
        assert_eq!(transport.http.endpoint(), "https://api.example.com/graphql");
        assert_eq!(transport.ws.endpoint(), "wss://api.example.com/graphql");

        let mut config = ClientConfig::new("https://api.example.com/graphql");
        config.subscription_endpoint = Some("wss://stream.example.com/graphql".into());
        assert_eq!(
            network_transport(&config).ws.endpoint(),
            "wss://stream.example.com/graphql"
        );
    }
}
