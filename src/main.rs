mod cli;

use clap::Parser;
use cli::{Cli, Command};
use compkit::config::load_pipeline;
use compkit_core::{runtime::Runtime, ComponentDefinition, Error, WriteResult};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cli::init_logging(&cli.log_level);

    let plugins = compkit::plugins();
    match cli.command {
        Command::List => {
            for definition in plugins.definitions() {
                println!(
                    "{:<28}{:<24}{}",
                    definition.name(),
                    definition.runtime_name(),
                    definition.family().join(", ")
                );
            }
        }
        Command::Describe { name } => {
            let definition = plugins
                .definition(&name)
                .ok_or_else(|| Error::Config(format!("Unknown component: {}", name)))?;
            println!("{}", serde_json::to_string_pretty(&definition.describe())?);
        }
        Command::Run { config } => {
            let runtime = Runtime::new(plugins);
            let context = runtime.context().clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current batch");
                    context.request_shutdown().await;
                }
            });

            let mut results = Vec::with_capacity(config.len());
            for path in config {
                let pipeline = load_pipeline(&path)?;
                info!(job = %path.display(), uid = %pipeline.uid, "Running job");
                results.push(runtime.run(pipeline).await?);
                if runtime.context().should_shutdown().await {
                    break;
                }
            }
            let total = WriteResult::merge(results);
            println!("{}", serde_json::to_string_pretty(&total)?);
        }
    }

    Ok(())
}
