#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::bot::Bot;
use crate::config::constants::SHUTDOWN_TIMEOUT_SECS;
use crate::telegram::TelegramClient;

const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Long polls Telegram and hands every update to its own task.
pub struct Poller {
    client: Arc<TelegramClient>,
    bot: Arc<Bot>,
    retry_interval: Duration,
    shutdown_timeout: Duration,
}

impl Poller {
    pub fn new(client: Arc<TelegramClient>, bot: Arc<Bot>) -> Self {
        Self {
            client,
            bot,
            retry_interval: RETRY_INTERVAL,
            shutdown_timeout: Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Polls until `cancel` fires, then waits a bounded time for the
    /// updates still being handled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        self.client
            .delete_webhook(true)
            .await
            .wrap_err("dropping pending updates")?;
        log::info!("Polling for updates as {}", self.bot.me().full_name());

        let mut tasks = JoinSet::new();
        let mut offset = None;
        loop {
            while let Some(res) = tasks.try_join_next() {
                if let Err(err) = res {
                    log::error!("Update task failed: {}", err);
                }
            }

            let updates = tokio::select! {
                _ = cancel.cancelled() => break,
                updates = self.client.get_updates(offset) => updates,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(err) => {
                    log::warn!("Failed to get updates: {:?}", err);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_interval) => continue,
                    }
                }
            };

            for update in updates {
                offset = Some(update.update_id + 1);
                let queued = self.bot.enqueue(update);
                let bot = Arc::clone(&self.bot);
                tasks.spawn(async move { bot.handle(queued).await });
            }
        }

        log::info!("Shutting down, {} updates in flight", tasks.len());
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            log::warn!("Aborting {} unfinished updates", tasks.len());
            tasks.abort_all();
        }
        Ok(())
    }
}
