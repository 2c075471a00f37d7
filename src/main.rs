// Entrypoint for the CLI application.
// - Keeps `main` small: load config, connect and sign in, then hand the
//   Saved Messages client to the UI loop.
// - Returns `anyhow::Result` so startup failures exit non-zero.

use tgcloud::{config::Config, telegram, telegram::TelegramCloud, ui};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loads `.env` before reading the environment.
    let config = Config::load()?;

    // Logs go to stderr so they do not interleave with the menu.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tgcloud=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = telegram::connect(&config).await?;
    ui::handle_login(&client, &config.session_path).await?;

    let cloud = TelegramCloud::saved_messages(client).await?;

    // Start the interactive menu. This call blocks until the user exits.
    ui::main_menu(&cloud).await?;
    cloud.save_session(&config.session_path)?;
    Ok(())
}
