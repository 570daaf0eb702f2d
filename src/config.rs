use std::env;

pub const PROMPT: &str = "$ ";

/// Environment the shell reads once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub path: Option<String>,
    pub home: Option<String>,
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            home: None,
            prompt: String::from(PROMPT),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let config = Self {
            path: env::var("PATH").ok(),
            home: env::var("HOME").ok(),
            ..Self::default()
        };

        if config.path.is_none() {
            log::warn!("PATH is not set, only builtins are available");
        }
        log::debug!("{config:?}");

        config
    }
}
