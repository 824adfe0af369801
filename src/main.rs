use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use aws_cost_advisor::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        cli::Commands::Start => {
            // Tracing is initialized once the config (log level/format) is loaded
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test => {
            init_tracing("warn", "text");
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Config { action } => {
            init_tracing("warn", "text");
            match action {
                cli::ConfigCommands::Show => commands::config::show(&args.config)?,
                cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
            }
        }
        cli::Commands::Analyze {
            bill,
            services,
            region,
            workload,
            plan,
        } => {
            init_tracing("warn", "text");
            commands::analyze::execute(
                &args.config,
                commands::analyze::AnalyzeArgs {
                    bill,
                    services,
                    region,
                    workload,
                    plan,
                },
            )?;
        }
        cli::Commands::Decode { file, plan } => {
            init_tracing("warn", "text");
            commands::decode::execute(&args.config, &file, &plan)?;
        }
        cli::Commands::Version => {
            println!("AWS Cost Advisor v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
