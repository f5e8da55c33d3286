//! `graphql subscribe`: stream subscription messages until interrupted.

use crate::commands::common::{GlobalOptions, OperationArgs};
use crate::commands::{exit_on_dispatch_error, load_or_exit};
use crate::OutputOptions;
use anyhow::Result;
use colored::Colorize;
use futures_util::StreamExt;

#[tracing::instrument(skip(options, args, output))]
pub async fn run(
    options: &GlobalOptions,
    name: &str,
    args: &OperationArgs,
    output: OutputOptions,
) -> Result<()> {
    let ctx = load_or_exit(options);
    let client = ctx.client(None)?;
    let request = args.request(name)?;

    let mut stream = client
        .subscribe_stream(&request)
        .await
        .unwrap_or_else(|e| exit_on_dispatch_error(&e));

    if output.show_info {
        eprintln!(
            "{} Subscribed to {} (Ctrl-C to stop)",
            "✓".green(),
            name.cyan()
        );
    }

    let mut received = 0_usize;
    loop {
        tokio::select! {
            message = stream.next() => {
                let Some(message) = message else {
                    if output.show_info {
                        eprintln!("{}", "Subscription ended by server".dimmed());
                    }
                    break;
                };
                received += 1;
                println!("{}", message.to_json());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted");
                break;
            }
        }
    }

    if output.show_info {
        eprintln!("  {} {received} message(s)", "✉".dimmed());
    }
    Ok(())
}
