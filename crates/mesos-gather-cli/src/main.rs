use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "mesos-gather",
    about = "Collect metrics snapshots from Mesos masters and agents",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single collection cycle and print the samples
    Gather {
        /// Path to the TOML config file
        #[arg(short, long, default_value = "mesos-gather.toml")]
        config: String,
        /// Sample output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Collect every `interval` until interrupted.
    ///
    /// A failed cycle is logged and the next one runs on schedule.
    Run {
        #[arg(short, long, default_value = "mesos-gather.toml")]
        config: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print a sample configuration file
    SampleConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("mesos_gather=info".parse()?);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    match cli.command {
        Commands::Gather { config, format } => commands::gather::gather(&config, format).await,
        Commands::Run { config, format } => commands::gather::run(&config, format).await,
        Commands::SampleConfig => {
            commands::sample_config();
            Ok(())
        }
    }
}
