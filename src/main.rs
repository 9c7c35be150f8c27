use anyhow::Context;
use bookhub_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookhub settings")?;

    bookhub_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "bookhub bootstrap starting"
    );

    bookhub_app::run(settings).await
}
