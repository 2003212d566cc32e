// src/system/hosting.rs

use std::future::Future;

use anyhow::Result;

use crate::core::{config::DispatcherConfig, resolver::CommandResolver};

/// True when the process was started for command dispatch: its first
/// argument equals the configured CLI sentinel.
pub fn is_cli_invocation(args: &[String], config: &DispatcherConfig) -> bool {
    args.first()
        .is_some_and(|argument| *argument == config.cli_sentinel)
}

/// Routes one process run.
///
/// When the sentinel matches, the sentinel argument is stripped and the
/// remainder is handed to the resolver; the normal service entry point is
/// skipped entirely for this run. Otherwise `service` — the host's
/// long-lived entry point — runs instead. A dispatch failure is returned to
/// the caller, which should treat it as a non-retriable, non-zero
/// termination.
pub async fn run_or_dispatch<F, Fut>(
    resolver: &CommandResolver,
    config: &DispatcherConfig,
    args: &[String],
    service: F,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if is_cli_invocation(args, config) {
        log::debug!(
            "CLI sentinel '{}' matched; dispatching instead of starting the service.",
            config.cli_sentinel
        );
        resolver.resolve(&args[1..]).await?;
        Ok(())
    } else {
        service().await
    }
}
