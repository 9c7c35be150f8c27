use anyhow::Context;
use clap::{Parser, Subcommand};

use bookhub_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "bookhub", about = "Book review hub")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Apply migrations and seed the catalog
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookhub settings")?;
    bookhub_telemetry::init(&settings.telemetry);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => bookhub_app::run(settings).await,
        Command::Migrate => {
            bookhub_app::migrate(&settings).await?;
            tracing::info!("migrations up to date");
            Ok(())
        }
        Command::Seed => {
            let pool = bookhub_app::migrate(&settings).await?;
            bookhub_app::seed::seed(&pool).await?;
            Ok(())
        }
    }
}
