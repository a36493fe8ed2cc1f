pub mod constants;
pub(crate) mod defaults;
pub mod models;
pub mod utils;

pub use models::*;
pub use utils::*;

#[cfg(test)]
use std::cell::RefCell;
#[cfg(not(test))]
use std::sync::OnceLock;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit the binary was built from, when the build exported one.
pub const BUILD_COMMIT: Option<&str> = option_env!("OLLAGRAM_BUILD_COMMIT");

/// Sent with every Telegram and Ollama request.
pub fn user_agent() -> String {
    format!("{}/{}", APP_NAME, VERSION)
}

pub fn version() -> String {
    version_line(BUILD_COMMIT)
}

fn version_line(commit: Option<&str>) -> String {
    match commit {
        Some(commit) => format!("{} {} (commit {})", APP_NAME, VERSION, commit),
        None => format!("{} {}", APP_NAME, VERSION),
    }
}

/// Set once at startup by [`Configuration::init`].
#[cfg(not(test))]
static CONFIG: OnceLock<Configuration> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_CONFIG: RefCell<&'static Configuration> = RefCell::new(Box::leak(Box::new(Configuration::default())))
}

#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::config::Configuration::instance().general.verbose {
            eprintln!($($arg)*);
        }
    };
}

pub use verbose;
