//! `graphql run`: build, send and print one operation.

use crate::commands::common::{dispatch_options, GlobalOptions, OperationArgs};
use crate::commands::{exit_on_dispatch_error, load_or_exit};
use crate::{CallArgs, ExitCode, OutputOptions};
use anyhow::{Context, Result};
use colored::Colorize;
use graphql_definitions::OperationKind;
use graphql_dispatch::UniformResult;

#[tracing::instrument(skip(options, args, call, output))]
pub async fn run(
    options: &GlobalOptions,
    kind: OperationKind,
    name: &str,
    args: &OperationArgs,
    call: CallArgs,
    output: OutputOptions,
) -> Result<()> {
    if kind == OperationKind::Subscription {
        anyhow::bail!("Subscriptions are long-lived; use `graphql subscribe {name}` instead");
    }

    let ctx = load_or_exit(options);
    let client = ctx.client(None)?;
    let request = args.request(name)?;
    let dispatch = dispatch_options(call.timeout, call.request_id, &call.headers)?;

    let spinner = output
        .show_progress
        .then(|| crate::progress::spinner(&format!("Running {kind} {name}...")));

    let start_time = std::time::Instant::now();
    let result = client.submit(kind, &request, &dispatch).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let result = result.unwrap_or_else(|e| exit_on_dispatch_error(&e));
    print_result(&result)?;

    if output.show_info {
        eprintln!(
            "  {} {:.2}s",
            "⏱".dimmed(),
            start_time.elapsed().as_secs_f64()
        );
    }

    if result.is_error() {
        if output.show_info {
            for error in result.errors() {
                eprintln!("{} {}", "✗".red().bold(), error.message.red());
            }
        }
        ExitCode::OperationError.exit();
    }

    Ok(())
}

fn print_result(result: &UniformResult) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(&result.to_json()).context("Failed to serialize result")?;
    println!("{rendered}");
    Ok(())
}
