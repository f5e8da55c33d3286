//! `graphql batch`: run many operations of one kind in chunked requests.

use crate::commands::common::{dispatch_options, parse_json_arg, GlobalOptions};
use crate::commands::{exit_on_dispatch_error, load_or_exit};
use crate::{CallArgs, ExitCode, OutputOptions};
use anyhow::{Context, Result};
use colored::Colorize;
use graphql_builder::OperationRequest;
use graphql_definitions::OperationKind;
use indexmap::IndexMap;

#[tracing::instrument(skip(options, operations, call, output))]
pub async fn run(
    options: &GlobalOptions,
    kind: OperationKind,
    operations: &str,
    chunk_size: Option<usize>,
    call: CallArgs,
    output: OutputOptions,
) -> Result<()> {
    if kind == OperationKind::Subscription {
        anyhow::bail!("Subscriptions cannot be batched");
    }

    let ctx = load_or_exit(options);
    let client = ctx.client(chunk_size)?;
    let dispatch = dispatch_options(call.timeout, call.request_id, &call.headers)?;

    let operations: IndexMap<String, OperationRequest> =
        serde_json::from_value(parse_json_arg(operations).context("Failed to parse --operations")?)
            .context("--operations must map aliases to { name, variables?, include?, fields? }")?;

    let total = operations.len().div_ceil(client.options().chunk_size.max(1));
    let bar = crate::progress::chunk_bar(total as u64, output.show_progress);

    let outcome = client
        .batch_chunked(kind, &operations, &dispatch, |report| {
            bar.inc(1);
            if !report.succeeded {
                bar.set_message(format!("chunk {} failed", report.index + 1));
            }
        })
        .await
        .unwrap_or_else(|e| exit_on_dispatch_error(&e));
    bar.finish_and_clear();

    let rendered = serde_json::to_string_pretty(&serde_json::json!({
        "data": outcome.data,
        "chunkErrors": outcome.chunk_errors,
        "lapsed": outcome.lapsed,
    }))
    .context("Failed to serialize batch result")?;
    println!("{rendered}");

    if output.show_info {
        let failed = outcome.chunk_errors.len();
        if failed == 0 {
            eprintln!(
                "{} {} operation(s) in {total} chunk(s)",
                "✓".green(),
                operations.len()
            );
        } else {
            eprintln!(
                "{}",
                format!("✗ {failed} of {total} chunk(s) failed").red()
            );
        }
    }

    if !outcome.is_complete() {
        ExitCode::OperationError.exit();
    }

    Ok(())
}
