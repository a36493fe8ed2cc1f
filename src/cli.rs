use clap::Parser;
use eyre::{Context, Result};

use crate::config::{self, Configuration, load_configuration, lookup_config_path};

#[derive(Debug, Parser)]
#[command(
    version,
    about,
    long_about = r#"A Telegram bot that chats through a local Ollama server

Default configuration file location looks up in the following order:
    * $XDG_CONFIG_HOME/ollagram/config.toml
    * $HOME/.config/ollagram/config.toml
    * $HOME/.ollagram.toml

TOKEN, ADMIN_IDS, OLLAMA_BASE_URL, OLLAMA_PORT, INITMODEL, TIMEOUT and
ALLOW_ALL_USERS_IN_GROUPS override the file when set.
"#,
    disable_version_flag = true
)]
pub struct Command {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Show the version
    #[arg(short, long)]
    version: bool,
}

impl Command {
    pub fn new() -> Command {
        Self::parse()
    }

    /// The file configuration with the environment applied on top.
    pub fn get_config(&self) -> Result<Configuration> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| lookup_config_path().unwrap_or_default());

        let config = if config_path.is_empty() {
            // No config file, rely on the defaults and the environment
            Configuration::default()
        } else {
            load_configuration(config_path.as_str()).wrap_err("loading configuration")?
        };
        config.with_env().wrap_err("reading environment")
    }

    pub fn version(&self) -> bool {
        self.version
    }

    pub fn print_version(&self) {
        println!("{}", config::version())
    }
}
