pub mod batch;
pub mod build;
pub mod common;
pub mod run;
pub mod subscribe;

use crate::ExitCode;
use colored::Colorize;
use common::{CommandContext, GlobalOptions};
use graphql_definitions::DefinitionsError;
use graphql_dispatch::DispatchError;

/// Loads the command context, or reports the failure and exits with the
/// matching code.
pub fn load_or_exit(options: &GlobalOptions) -> CommandContext {
    CommandContext::load(options).unwrap_or_else(|e| {
        eprintln!("{} {e:#}", "✗".red().bold());
        let definitions_failed = e
            .chain()
            .any(|cause| cause.downcast_ref::<DefinitionsError>().is_some());
        if definitions_failed {
            ExitCode::DefinitionsError.exit()
        } else {
            ExitCode::ConfigError.exit()
        }
    })
}

/// Reports a dispatch setup failure and exits.
pub fn exit_on_dispatch_error(error: &DispatchError) -> ! {
    eprintln!("{} {error}", "✗".red().bold());
    match error {
        DispatchError::Build(_) => ExitCode::BuildError.exit(),
        DispatchError::Connect(_) => ExitCode::ConnectionError.exit(),
        DispatchError::Http(_) => ExitCode::ConfigError.exit(),
    }
}
