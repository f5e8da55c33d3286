mod commands;
mod exit_code;
mod progress;

use clap::{Parser, Subcommand};
use commands::common::{GlobalOptions, OperationArgs};
use graphql_definitions::OperationKind;
use std::path::PathBuf;

pub use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "graphql")]
#[command(about = "Build and run GraphQL operations from a persisted entity catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the client config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Path to the definitions artifact (overrides the config file)
    #[arg(short, long, value_name = "FILE", global = true, env = "DEFINITIONS")]
    definitions: Option<PathBuf>,

    /// GraphQL endpoint (overrides the config file)
    #[arg(short, long, value_name = "URL", global = true, env = "ENDPOINT")]
    endpoint: Option<String>,

    /// Log generated documents and failures to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress all output except results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output verbosity options
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Whether to show progress indicators (spinners, chunk bars)
    pub show_progress: bool,
    /// Whether to show informational output (timings, summaries)
    pub show_info: bool,
}

/// Per-call dispatch flags.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CallArgs {
    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Correlation id; an older call with the same id is reported as lapsed
    #[arg(long, value_name = "ID")]
    pub request_id: Option<String>,

    /// Extra HTTP header (can be specified multiple times)
    /// Format: "Header-Name: Header-Value"
    #[arg(long = "header", short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document generated for an operation without sending it
    Build {
        /// query, mutation or subscription
        kind: OperationKind,

        /// Operation name from the definitions artifact
        name: String,

        #[command(flatten)]
        operation: OperationArgs,

        /// Print the JSON request body instead of the document
        #[arg(long)]
        json: bool,
    },

    /// Build, send and print one query or mutation
    Run {
        /// query or mutation
        kind: OperationKind,

        /// Operation name from the definitions artifact
        name: String,

        #[command(flatten)]
        operation: OperationArgs,

        #[command(flatten)]
        call: CallArgs,
    },

    /// Send many operations of one kind as aliased, chunked requests
    Batch {
        /// query or mutation
        kind: OperationKind,

        /// JSON object mapping aliases to { name, variables, include, fields } (or @file)
        #[arg(long, value_name = "JSON")]
        operations: String,

        /// Operations per request (overrides the config file)
        #[arg(long, value_name = "N")]
        chunk_size: Option<usize>,

        #[command(flatten)]
        call: CallArgs,
    },

    /// Subscribe and print every message until interrupted
    Subscribe {
        /// Subscription name from the definitions artifact
        name: String,

        #[command(flatten)]
        operation: OperationArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    let output = OutputOptions {
        show_progress: !cli.quiet,
        show_info: !cli.quiet,
    };
    let options = GlobalOptions {
        config: cli.config,
        definitions: cli.definitions,
        endpoint: cli.endpoint,
        debug: cli.debug,
    };

    match cli.command {
        Commands::Build {
            kind,
            name,
            operation,
            json,
        } => commands::build::run(&options, kind, &name, &operation, json),
        Commands::Run {
            kind,
            name,
            operation,
            call,
        } => commands::run::run(&options, kind, &name, &operation, call, output).await,
        Commands::Batch {
            kind,
            operations,
            chunk_size,
            call,
        } => commands::batch::run(&options, kind, &operations, chunk_size, call, output).await,
        Commands::Subscribe { name, operation } => {
            commands::subscribe::run(&options, &name, &operation, output).await
        }
    }
}

/// Initialize logging on stderr. `RUST_LOG` wins; otherwise logging is off
/// unless `--debug` is set.
fn init_tracing(debug: bool) {
    let default_filter = if debug { "graphql=debug" } else { "off" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "graphql",
            "run",
            "query",
            "user",
            "--variables",
            r#"{"id":"1"}"#,
            "--include",
            r#"["posts"]"#,
            "--timeout",
            "5",
            "-H",
            "X-Trace: abc",
        ])
        .unwrap();

        let Commands::Run {
            kind,
            name,
            operation,
            call,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(kind, OperationKind::Query);
        assert_eq!(name, "user");
        assert_eq!(operation.include.as_deref(), Some(r#"["posts"]"#));
        assert_eq!(call.timeout, Some(5));
        assert_eq!(call.headers, ["X-Trace: abc"]);
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["graphql", "build", "fetch", "user"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "graphql",
            "subscribe",
            "postAdded",
            "--endpoint",
            "http://localhost:4000/graphql",
            "--quiet",
        ])
        .unwrap();
        assert_eq!(cli.endpoint.as_deref(), Some("http://localhost:4000/graphql"));
        assert!(cli.quiet);
    }
}
