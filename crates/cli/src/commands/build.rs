//! `graphql build`: print a generated document without sending it.

use crate::commands::common::{GlobalOptions, OperationArgs};
use crate::commands::load_or_exit;
use crate::ExitCode;
use anyhow::{Context, Result};
use colored::Colorize;
use graphql_builder::build_document;
use graphql_definitions::OperationKind;
use graphql_dispatch::GraphQLRequest;

#[tracing::instrument(skip(options, args))]
pub fn run(
    options: &GlobalOptions,
    kind: OperationKind,
    name: &str,
    args: &OperationArgs,
    json: bool,
) -> Result<()> {
    let ctx = load_or_exit(options);
    let request = args.request(name)?;

    let document = build_document(&ctx.definitions, kind, &request).unwrap_or_else(|e| {
        eprintln!("{} {e}", "✗".red().bold());
        ExitCode::BuildError.exit()
    });

    if json {
        let body = serde_json::to_string_pretty(&GraphQLRequest::from(document))
            .context("Failed to serialize request")?;
        println!("{body}");
        return Ok(());
    }

    println!("{}", document.text);
    if !document.variables.is_empty() {
        let variables = serde_json::to_string_pretty(&document.variables)
            .context("Failed to serialize variables")?;
        println!();
        println!("{}", "# variables".dimmed());
        println!("{variables}");
    }

    Ok(())
}
