use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use home_etl::config::Config;
use home_etl::constants::DEFAULT_CONFIG_PATH;
use home_etl::error::Stage;
use home_etl::{logging, pipeline};

#[derive(Parser)]
#[command(name = "home-etl")]
#[command(about = "Property listing batch ETL: nested JSON in, normalized tables out")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the run configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract-transform-load pipeline
    Run,
    /// Create the destination tables and exit
    InitDb,
}

/// One exit code per failing stage so a scheduler can tell them apart.
fn exit_code_for(stage: Stage) -> u8 {
    match stage {
        Stage::Config => 1,
        Stage::Extract => 2,
        Stage::Transform => 3,
        Stage::Connect => 4,
        Stage::Load => 5,
    }
}

fn main() -> ExitCode {
    // The guard must live until exit so buffered file log lines flush.
    let _guard = logging::init_logging();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            println!("❌ Failed to load configuration: {e}");
            return ExitCode::from(exit_code_for(e.stage()));
        }
    };

    let result = match cli.command {
        Commands::Run => {
            println!("🚀 Running ETL pipeline...");
            pipeline::run(&config).map(|summary| {
                info!(
                    records = summary.input_records,
                    properties = summary.report.properties,
                    hoa = summary.report.hoa,
                    rehab = summary.report.rehab,
                    valuations = summary.report.valuations,
                    "Run completed"
                );
                println!("\n📊 Run results:");
                println!("   Input records: {}", summary.input_records);
                println!("   Properties:    {}", summary.report.properties);
                println!("   HOA entries:   {}", summary.report.hoa);
                println!("   Rehab rows:    {}", summary.report.rehab);
                println!("   Valuations:    {}", summary.report.valuations);
                println!(
                    "   Duration:      {}s",
                    (summary.finished_at - summary.started_at).num_seconds()
                );
            })
        }
        Commands::InitDb => {
            println!("🔧 Initializing database schema...");
            pipeline::init_db(&config)
        }
    };

    match result {
        Ok(()) => {
            println!("✅ Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = ?e.stage(), "Run failed: {}", e);
            println!("❌ Run failed: {e}");
            ExitCode::from(exit_code_for(e.stage()))
        }
    }
}
