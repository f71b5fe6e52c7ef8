use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

use crate::application::{
    handlers::{delivery_worker::WorkerConfig, dispatch_pool::PoolConfig},
    services::{progress::ProgressConfig, rate_governor::GovernorConfig},
};

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub discord_token: String,
    pub discord_api_base: String,
    pub guild_id: u64,
    pub operator_id: String,
    pub jwt_secret: String,
    pub run_log_path: String,
    pub dry_run: bool,
    pub dry_run_members: u64,
    pub confirmation_timeout: Duration,
    pub governor: GovernorConfig,
    pub pool: PoolConfig,
    pub worker: WorkerConfig,
    pub progress: ProgressConfig,
}

fn optional<T: FromStr>(name: &str, default: T, error: &'static str) -> Result<T, &'static str> {
    match var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| error),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn try_parse() -> Result<Config, &'static str> {
        let _ = dotenv();

        let governor_defaults = GovernorConfig::default();
        let pool_defaults = PoolConfig::default();
        let worker_defaults = WorkerConfig::default();
        let progress_defaults = ProgressConfig::default();

        Ok(Config {
            port: var("PORT")
                .map_err(|_| "An error occured while getting PORT env param")?
                .parse::<u16>()
                .map_err(|_| "An error occured while parsing PORT env param")?,
            scheme: var("SCHEME").map_err(|_| "An error occured while getting SCHEME env param")?,
            host: var("HOST").map_err(|_| "An error occured while getting HOST env param")?,
            discord_token: var("DISCORD_TOKEN")
                .map_err(|_| "An error occured while getting DISCORD_TOKEN env param")?,
            discord_api_base: var("DISCORD_API_BASE")
                .unwrap_or_else(|_| "https://discord.com/api/v10".to_string()),
            guild_id: var("GUILD_ID")
                .map_err(|_| "An error occured while getting GUILD_ID env param")?
                .parse::<u64>()
                .map_err(|_| "An error occured while parsing GUILD_ID env param")?,
            operator_id: var("OPERATOR_ID")
                .map_err(|_| "An error occured while getting OPERATOR_ID env param")?,
            jwt_secret: var("JWT_SECRET")
                .map_err(|_| "An error occured while getting JWT_SECRET env param")?,
            run_log_path: var("RUN_LOG_PATH").unwrap_or_else(|_| "dmblast_log.txt".to_string()),
            dry_run: optional(
                "DISPATCH_DRY_RUN",
                false,
                "An error occured while parsing DISPATCH_DRY_RUN env param",
            )?,
            dry_run_members: optional(
                "DRY_RUN_MEMBERS",
                25,
                "An error occured while parsing DRY_RUN_MEMBERS env param",
            )?,
            confirmation_timeout: Duration::from_secs(optional(
                "CONFIRMATION_TIMEOUT_SECS",
                120,
                "An error occured while parsing CONFIRMATION_TIMEOUT_SECS env param",
            )?),
            governor: GovernorConfig {
                global_concurrency: optional(
                    "GLOBAL_CONCURRENCY",
                    governor_defaults.global_concurrency,
                    "An error occured while parsing GLOBAL_CONCURRENCY env param",
                )?,
                cooldown: Duration::from_secs(optional(
                    "COOLDOWN_SECS",
                    governor_defaults.cooldown.as_secs(),
                    "An error occured while parsing COOLDOWN_SECS env param",
                )?),
                daily_cap: optional(
                    "DAILY_CAP",
                    governor_defaults.daily_cap,
                    "An error occured while parsing DAILY_CAP env param",
                )?,
                daily_window: governor_defaults.daily_window,
                jitter_min: Duration::from_millis(optional(
                    "JITTER_MIN_MS",
                    governor_defaults.jitter_min.as_millis() as u64,
                    "An error occured while parsing JITTER_MIN_MS env param",
                )?),
                jitter_max: Duration::from_millis(optional(
                    "JITTER_MAX_MS",
                    governor_defaults.jitter_max.as_millis() as u64,
                    "An error occured while parsing JITTER_MAX_MS env param",
                )?),
            },
            pool: PoolConfig {
                chunk_size: optional(
                    "CHUNK_SIZE",
                    pool_defaults.chunk_size,
                    "An error occured while parsing CHUNK_SIZE env param",
                )?,
                concurrency: optional(
                    "WORKER_CONCURRENCY",
                    pool_defaults.concurrency,
                    "An error occured while parsing WORKER_CONCURRENCY env param",
                )?,
                chunk_delay_min: Duration::from_millis(optional(
                    "CHUNK_DELAY_MIN_MS",
                    pool_defaults.chunk_delay_min.as_millis() as u64,
                    "An error occured while parsing CHUNK_DELAY_MIN_MS env param",
                )?),
                chunk_delay_max: Duration::from_millis(optional(
                    "CHUNK_DELAY_MAX_MS",
                    pool_defaults.chunk_delay_max.as_millis() as u64,
                    "An error occured while parsing CHUNK_DELAY_MAX_MS env param",
                )?),
            },
            worker: WorkerConfig {
                throttle_retries: worker_defaults.throttle_retries,
                max_throttle_wait: Duration::from_secs(optional(
                    "MAX_THROTTLE_WAIT_SECS",
                    worker_defaults.max_throttle_wait.as_secs(),
                    "An error occured while parsing MAX_THROTTLE_WAIT_SECS env param",
                )?),
            },
            progress: ProgressConfig {
                every_items: optional(
                    "PROGRESS_EVERY_ITEMS",
                    progress_defaults.every_items,
                    "An error occured while parsing PROGRESS_EVERY_ITEMS env param",
                )?,
                every_interval: Duration::from_secs(optional(
                    "PROGRESS_EVERY_SECS",
                    progress_defaults.every_interval.as_secs(),
                    "An error occured while parsing PROGRESS_EVERY_SECS env param",
                )?),
            },
        })
    }
}
