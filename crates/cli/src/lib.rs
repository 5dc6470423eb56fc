pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "haggle",
    about = "Haggle operator CLI",
    long_about = "Operate the haggle negotiation engine: migrations, demo fixtures, \
                  config inspection, and offline negotiation simulation.",
    after_help = "Examples:\n  haggle migrate\n  haggle simulate --opening-offer 17.00\n  haggle config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic demo fixtures into the configured database")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with secrets redacted"
    )]
    Config,
    #[command(about = "Run an offline agent-vs-agent negotiation and print the round log")]
    Simulate {
        #[arg(long, default_value = "20.00", help = "Hourly listing price in USD")]
        listing_price: String,
        #[arg(long, default_value = "15.00", help = "Renter's opening offer in USD")]
        opening_offer: String,
        #[arg(long, default_value = "moderate", help = "Owner strategy: aggressive|moderate|conservative")]
        owner_strategy: String,
        #[arg(long, default_value = "moderate", help = "Renter strategy: aggressive|moderate|conservative")]
        renter_strategy: String,
        #[arg(long, default_value_t = 12, help = "Safety cap on driven rounds")]
        max_rounds: u32,
    },
}

pub fn run() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Simulate {
            listing_price,
            opening_offer,
            owner_strategy,
            renter_strategy,
            max_rounds,
        } => commands::simulate::run(
            &listing_price,
            &opening_offer,
            &owner_strategy,
            &renter_strategy,
            max_rounds,
        ),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("HAGGLE_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
