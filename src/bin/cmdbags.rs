// src/bin/cmdbags.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use cmdbags::{
    core::{config::DispatcherConfig, registry::BagRegistry, resolver::CommandResolver},
    models::{BagSpec, ParamSpec},
    system::{hosting, provider::ServiceCollection},
};

// --- Sample Command Bag ---

/// A small handler group registered under the `users` prefix, showing one
/// synchronous and one asynchronous operation.
struct UserCommands;

impl UserCommands {
    fn create_admin(self, name: String, age: i64) -> Result<()> {
        println!("Created administrator '{name}' (age {age}).");
        Ok(())
    }

    async fn import(self, count: u32) -> Result<()> {
        for n in 1..=count {
            tokio::time::sleep(Duration::from_millis(50)).await;
            println!("Imported user {n}/{count}.");
        }
        Ok(())
    }

    fn spec() -> BagSpec {
        BagSpec::builder::<Self>()
            .sync_op(
                "create-admin",
                vec![
                    ParamSpec::required::<String>("name"),
                    ParamSpec::with_default("age", 18i64),
                ],
                |bag: Self, (name, age): (String, i64)| bag.create_admin(name, age),
            )
            .async_op(
                "import",
                vec![ParamSpec::with_default("count", 3u32)],
                |bag: Self, (count,): (u32,)| bag.import(count),
            )
            .build()
    }
}

// --- Entry Point ---

/// The demonstration host. Invoked as `cmdbags cli users:create-admin
/// Alice [age]` it dispatches; invoked without the sentinel it runs the
/// (placeholder) service instead.
#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(error) = run(&args).await {
        eprintln!("\n{}: {error:#}", "Error".red().bold());
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let config = load_config()?;

    let mut registry = BagRegistry::new();
    registry.register("users", UserCommands::spec())?;

    let mut services = ServiceCollection::new();
    services.register(|| UserCommands);

    let resolver = CommandResolver::new(Arc::new(registry), services.build_provider());

    hosting::run_or_dispatch(&resolver, &config, args, || async {
        println!(
            "cmdbags demo service running. Re-run with '{} <prefix>:<command> [args...]' to dispatch a command instead.",
            config.cli_sentinel
        );
        Ok(())
    })
    .await
}

/// Settings come from the TOML file named by `CMDBAGS_CONFIG`, when set;
/// otherwise the defaults apply.
fn load_config() -> Result<DispatcherConfig> {
    match std::env::var("CMDBAGS_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read configuration file '{path}'"))?;
            Ok(DispatcherConfig::from_toml_str(&raw)?)
        }
        Err(_) => Ok(DispatcherConfig::default()),
    }
}
