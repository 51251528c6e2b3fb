pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;

use commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "lapsight",
    about = "Lapsight operator CLI",
    long_about = "Manage the Lapsight catalog database and query the laptop analysis engine.",
    after_help = "Examples:\n  lapsight migrate\n  lapsight seed\n  lapsight analyze lap-legion-5\n  lapsight recommend --usage gaming --max 2000000\n  lapsight games --tier 6 --refresh 144"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog with 60 days of price history")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM provider readiness, DB connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the full analysis report for one product")]
    Analyze {
        #[arg(help = "Product id, e.g. lap-legion-5")]
        product_id: String,
    },
    #[command(about = "Rank catalog laptops for a budget, usage mix and priority")]
    Recommend(RecommendFlags),
    #[command(about = "Estimate frame rates across the game catalog for a GPU tier")]
    Games {
        #[arg(long, help = "GPU tier from 1 (integrated) to 10 (flagship)")]
        tier: i64,
        #[arg(long, help = "Display refresh rate in Hz (default 60)")]
        refresh: Option<u32>,
    },
}

#[derive(Debug, Args)]
struct RecommendFlags {
    #[arg(
        long,
        help = "Usage kind: gaming|work|student|video|portable (repeatable, comma separated)"
    )]
    usage: Vec<String>,
    #[arg(long, help = "Priority: value|performance|portable|latest")]
    priority: Option<String>,
    #[arg(long, help = "Minimum budget in won")]
    min: Option<i64>,
    #[arg(long, help = "Maximum budget in won")]
    max: Option<i64>,
    #[arg(long, help = "Number of recommendations to return")]
    limit: Option<usize>,
}

impl From<RecommendFlags> for RecommendArgs {
    fn from(flags: RecommendFlags) -> Self {
        Self {
            usage: flags.usage,
            priority: flags.priority,
            min: flags.min,
            max: flags.max,
            limit: flags.limit,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Analyze { product_id } => commands::analyze::run(&product_id),
        Command::Recommend(flags) => commands::recommend::run(&RecommendArgs::from(flags)),
        Command::Games { tier, refresh } => commands::games::run(tier, refresh),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
