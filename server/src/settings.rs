use std::default::Default;
use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub fn load() -> Result<Settings, ConfigError> {
    let env = env::var(RUN_MODE_ENV).unwrap_or_else(|_| "development".into());
    Config::builder()
        .add_source(File::with_name(DEFAULT_CFG_PATH))
        .add_source(File::with_name(&format!("config/{}", env)).required(false))
        .add_source(File::with_name(LOCAL_CFG_PATH).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX))
        .build()?
        .try_deserialize()
}

const DEFAULT_CFG_PATH: &str = "config/default";
const LOCAL_CFG_PATH: &str = "config/local";
const RUN_MODE_ENV: &str = "DECKMATE_RUN_MODE";
const ENV_PREFIX: &str = "deckmate";

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub logging: Logging,
    pub runtime: Runtime,
    pub server: Server,
    pub relay: Relay,
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Runtime {
    /// The shared state is mutex-serialized either way; one event loop is
    /// plenty for a card table.
    pub threaded: bool,
    pub worker_threads: usize,
    pub thread_name: String,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime {
            threaded: false,
            worker_threads: num_cpus::get_physical(),
            thread_name: "relay-worker".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind_addr: String,
    pub client_files_path: String,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            bind_addr: "127.0.0.1:3000".into(),
            client_files_path: "./static/".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Relay {
    /// Pending responses allowed per client. Should sit a bit above the
    /// number of messages one request by any other client can fan out.
    pub response_capacity: usize,
}

impl Default for Relay {
    fn default() -> Self {
        Relay {
            response_capacity: 8,
        }
    }
}
