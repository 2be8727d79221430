// Stract is an open source web search engine.
// Copyright (C) 2024 Stract ApS
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Single immutable configuration value shared by reference across every
//! component, matching `crates/config` + `CrawlerConfig` in
//! `crates/core/src/config`. Loaded once, never re-read: if an operator
//! wants new values they restart the process.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaywrightMode {
    Auto,
    On,
    Off,
}

impl std::str::FromStr for PlaywrightMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(anyhow::anyhow!("invalid playwright mode: {other}")),
        }
    }
}

/// Config overlay loaded from an optional TOML file. Every field is
/// optional; present fields override the environment-derived defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverlay {
    pub user_agent: Option<String>,
    pub concurrent_requests: Option<usize>,
    pub concurrent_per_domain: Option<usize>,
    pub respect_robots: Option<bool>,
    pub focused_crawl_budget: Option<usize>,
    pub smart_min_results: Option<usize>,
    pub smart_trigger_cooldown_secs: Option<u64>,
    pub rank_auth_alpha: Option<f64>,
    pub rerank_top_n: Option<usize>,
    pub data_dir: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub ollama_timeout_secs: Option<u64>,
}

/// Immutable, process-lifetime configuration. Construct once via
/// [`CoreConfig::from_env`], then pass around as `Arc<CoreConfig>`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub user_agent: String,
    pub concurrent_requests: usize,
    pub concurrent_per_domain: usize,
    pub respect_robots: bool,
    pub use_playwright: PlaywrightMode,
    pub playwright_navigation_timeout: Duration,
    pub focused_crawl_budget: usize,
    pub smart_min_results: usize,
    pub smart_trigger_cooldown: Duration,
    pub rank_auth_alpha: f64,
    pub rerank_top_n: usize,
    pub data_dir: std::path::PathBuf,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            user_agent: "seeker/0.1".to_string(),
            concurrent_requests: 8,
            concurrent_per_domain: 2,
            respect_robots: true,
            use_playwright: PlaywrightMode::Auto,
            playwright_navigation_timeout: Duration::from_millis(30_000),
            focused_crawl_budget: 50,
            smart_min_results: 5,
            smart_trigger_cooldown: Duration::from_secs(60),
            rank_auth_alpha: 0.15,
            rerank_top_n: 5,
            data_dir: std::path::PathBuf::from("./data"),
            ollama_url: "http://localhost:11434/api/generate".to_string(),
            ollama_model: "llama3".to_string(),
            ollama_timeout: Duration::from_secs(12),
        }
    }
}

impl CoreConfig {
    /// Read every recognized `CRAWL_*` / `SMART_*` / `RANK_*` / `OLLAMA_*`
    /// knob from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            user_agent: std::env::var("CRAWL_USER_AGENT").unwrap_or(default.user_agent),
            concurrent_requests: env_or("CRAWL_CONCURRENT_REQUESTS", default.concurrent_requests),
            concurrent_per_domain: env_or(
                "CRAWL_CONCURRENT_PER_DOMAIN",
                default.concurrent_per_domain,
            ),
            respect_robots: env_bool("CRAWL_RESPECT_ROBOTS", default.respect_robots),
            use_playwright: std::env::var("CRAWL_USE_PLAYWRIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.use_playwright),
            playwright_navigation_timeout: Duration::from_millis(env_or(
                "PLAYWRIGHT_NAVIGATION_TIMEOUT",
                default.playwright_navigation_timeout.as_millis() as u64,
            )),
            focused_crawl_budget: env_or("FOCUSED_CRAWL_BUDGET", default.focused_crawl_budget),
            smart_min_results: env_or("SMART_MIN_RESULTS", default.smart_min_results),
            smart_trigger_cooldown: Duration::from_secs(env_or(
                "SMART_TRIGGER_COOLDOWN",
                default.smart_trigger_cooldown.as_secs(),
            )),
            rank_auth_alpha: env_or("RANK_AUTH_ALPHA", default.rank_auth_alpha),
            rerank_top_n: env_or("RERANK_TOP_N", default.rerank_top_n),
            data_dir: std::env::var("CRAWL_DATA_DIR")
                .map(std::path::PathBuf::from)
                .unwrap_or(default.data_dir),
            ollama_url: std::env::var("OLLAMA_URL").unwrap_or(default.ollama_url),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or(default.ollama_model),
            ollama_timeout: Duration::from_secs(env_or(
                "OLLAMA_TIMEOUT",
                default.ollama_timeout.as_secs(),
            )),
        }
    }

    /// Load from the environment, then overlay a TOML config file if one
    /// is given, matching `stract-cli`'s `config_path` args.
    pub fn load(overlay_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = Self::from_env();

        let Some(path) = overlay_path else {
            return Ok(config);
        };

        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {path:?}: {e}"))?;
        let overlay: ConfigOverlay = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {path:?}: {e}"))?;

        if let Some(v) = overlay.user_agent {
            config.user_agent = v;
        }
        if let Some(v) = overlay.concurrent_requests {
            config.concurrent_requests = v;
        }
        if let Some(v) = overlay.concurrent_per_domain {
            config.concurrent_per_domain = v;
        }
        if let Some(v) = overlay.respect_robots {
            config.respect_robots = v;
        }
        if let Some(v) = overlay.focused_crawl_budget {
            config.focused_crawl_budget = v;
        }
        if let Some(v) = overlay.smart_min_results {
            config.smart_min_results = v;
        }
        if let Some(v) = overlay.smart_trigger_cooldown_secs {
            config.smart_trigger_cooldown = Duration::from_secs(v);
        }
        if let Some(v) = overlay.rank_auth_alpha {
            config.rank_auth_alpha = v;
        }
        if let Some(v) = overlay.rerank_top_n {
            config.rerank_top_n = v;
        }
        if let Some(v) = overlay.data_dir {
            config.data_dir = v.into();
        }
        if let Some(v) = overlay.ollama_url {
            config.ollama_url = v;
        }
        if let Some(v) = overlay.ollama_model {
            config.ollama_model = v;
        }
        if let Some(v) = overlay.ollama_timeout_secs {
            config.ollama_timeout = Duration::from_secs(v);
        }

        Ok(config)
    }

    pub fn seed_log_path(&self) -> std::path::PathBuf {
        self.data_dir.join("seeds.jsonl")
    }

    pub fn cooldowns_path(&self) -> std::path::PathBuf {
        self.data_dir.join("cooldowns.json")
    }

    pub fn normalized_path(&self) -> std::path::PathBuf {
        self.data_dir.join("normalized.jsonl")
    }

    pub fn index_dir(&self) -> std::path::PathBuf {
        self.data_dir.join("index")
    }

    pub fn authority_path(&self) -> std::path::PathBuf {
        self.data_dir.join("authority.json")
    }

    pub fn raw_crawl_path(&self, epoch: u64) -> std::path::PathBuf {
        self.data_dir.join(format!("focused_{epoch}.jsonl"))
    }
}
