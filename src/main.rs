use std::sync::Arc;

use eyre::{Context, Result};
use ollagram::backend::new_backend;
use ollagram::bot::{Authorizer, BOT_COMMANDS, Bot, Poller};
use ollagram::cli::Command;
use ollagram::config::{Configuration, init_logger, verbose};
use ollagram::storage::new_storage;
use ollagram::telegram::TelegramClient;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Command::new();
    if cmd.version() {
        cmd.print_version();
        return Ok(());
    }

    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let config = cmd.get_config()?;
    Configuration::init(config.clone())?;
    init_logger(&config.log)?;
    verbose!("[+] Logger initialized");

    if config.telegram.token.is_empty() {
        eyre::bail!("No Telegram token configured");
    }

    let Some(default_model) = config.backend.default_model.clone() else {
        eyre::bail!("No default model configured");
    };

    verbose!("[+] Initializing storage...");
    let storage = new_storage(&config.storage)
        .await
        .wrap_err("initializing storage")?;
    verbose!("[+] Storage initialized");

    verbose!("[+] Initializing backend...");
    let backend = new_backend(&config.backend).wrap_err("initializing backend")?;

    let client = Arc::new(TelegramClient::from(&config.telegram));
    let me = client.get_me().await.wrap_err("getting bot info")?;
    verbose!("[+] Running as {:?}", me.mention());

    if let Err(err) = client.set_my_commands(&BOT_COMMANDS).await {
        log::warn!("Failed to register bot commands: {:?}", err);
    }

    let authorizer = Authorizer::from_config(&config.telegram, storage.clone());
    let bot = Bot::new(me, client.clone(), backend, storage, &default_model)
        .with_authorizer(authorizer)
        .with_context_config(config.context.clone());
    log::info!("Starting with model {}", default_model);

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(err) => log::error!("Failed to listen for Ctrl-C: {}", err),
        }
    });

    Poller::new(client, Arc::new(bot)).run(token).await
}
