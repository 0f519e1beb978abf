//! Typed configuration for the feed binary.

use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, update::UpdateKind, Result};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub api_base: String,

    // Retrieval call shape
    pub poll_timeout: Duration,
    pub poll_limit: u32,
    pub allowed_updates: Vec<UpdateKind>,

    // Loop behavior
    pub empty_backoff: Duration,
    pub handler_concurrency: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base = env_str("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let poll_timeout = Duration::from_secs(env_u64("POLL_TIMEOUT_SECS").unwrap_or(25));
        let poll_limit = env_u32("POLL_LIMIT").unwrap_or(100).clamp(1, 100);
        let allowed_updates = match env_str("ALLOWED_UPDATES") {
            Some(csv) => parse_update_kinds(&csv)?,
            None => UpdateKind::KNOWN.to_vec(),
        };

        let empty_backoff = Duration::from_millis(env_u64("EMPTY_BACKOFF_MS").unwrap_or(1000));
        let handler_concurrency = env_u64("HANDLER_CONCURRENCY").unwrap_or(64).max(1) as usize;

        Ok(Self {
            bot_token,
            api_base,
            poll_timeout,
            poll_limit,
            allowed_updates,
            empty_backoff,
            handler_concurrency,
        })
    }
}

fn parse_update_kinds(csv: &str) -> Result<Vec<UpdateKind>> {
    let mut kinds = Vec::new();
    for raw in csv.split(',') {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        let kind = UpdateKind::from_wire_key(name);
        if kind == UpdateKind::Unknown {
            return Err(Error::Config(format!("unknown update kind `{name}`")));
        }
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}
