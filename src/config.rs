use serde::{Deserialize, Serialize};
use std::fs;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};
use crate::extract::Timeouts;

const CONFIG_PATH: &str = "data/config.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_used_cars_page")]
    pub used_cars_page: String,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_db_host")]
    pub db_host: String,
    #[serde(default = "default_db_user")]
    pub db_user: String,
    #[serde(default)]
    pub db_password: String,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,
    #[serde(default = "default_clickable_timeout_secs")]
    pub clickable_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_used_cars_page() -> String {
    "https://auto.ria.com/uk/car/used".to_string()
}

fn default_webdriver_url() -> String {
    "http://selenium:4444/wd/hub".to_string()
}

fn default_db_host() -> String {
    "data".to_string()
}

fn default_db_user() -> String {
    "ria".to_string()
}

fn default_db_name() -> String {
    "used_cars".to_string()
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_element_timeout_secs() -> u64 {
    10
}

fn default_clickable_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            used_cars_page: default_used_cars_page(),
            webdriver_url: default_webdriver_url(),
            db_host: default_db_host(),
            db_user: default_db_user(),
            db_password: String::new(),
            db_name: default_db_name(),
            tracing_level: default_tracing_level(),
            headless: default_headless(),
            element_timeout_secs: default_element_timeout_secs(),
            clickable_timeout_secs: default_clickable_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load `data/config.yaml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config: Config = match fs::read_to_string(CONFIG_PATH) {
            Ok(config_str) => serde_yaml::from_str(&config_str)
                .with_context(|| format!("Failed to parse {}", CONFIG_PATH))?,
            Err(_) => Config::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(page) = var("USED_CARS_PAGE") {
            self.used_cars_page = page;
        }

        if let Some(url) = var("WEBDRIVER_URL") {
            self.webdriver_url = url;
        }

        // POSTGRES_* names are still honoured so existing .env files keep working
        let db_var = |key: &str, legacy: &str| var(key).or_else(|| var(legacy));

        if let Some(host) = db_var("DB_HOST", "POSTGRES_HOST") {
            self.db_host = host;
        }

        if let Some(user) = db_var("DB_USER", "POSTGRES_USER") {
            self.db_user = user;
        }

        if let Some(password) = db_var("DB_PASSWORD", "POSTGRES_PASSWORD") {
            self.db_password = password;
        }

        if let Some(name) = db_var("DB_NAME", "POSTGRES_DB") {
            self.db_name = name;
        }

        if let Some(tracing_level) = var("TRACING_LEVEL") {
            self.tracing_level = tracing_level;
        }

        if let Some(headless) = var("HEADLESS") {
            self.headless = headless.parse()
                .context("Failed to parse HEADLESS environment variable")?;
        }

        if let Some(timeout) = var("ELEMENT_TIMEOUT_SECS") {
            self.element_timeout_secs = timeout.parse()
                .context("Failed to parse ELEMENT_TIMEOUT_SECS environment variable")?;
        }

        if let Some(timeout) = var("CLICKABLE_TIMEOUT_SECS") {
            self.clickable_timeout_secs = timeout.parse()
                .context("Failed to parse CLICKABLE_TIMEOUT_SECS environment variable")?;
        }

        if let Some(user_agent) = var("USER_AGENT") {
            self.user_agent = user_agent;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.used_cars_page.trim().is_empty() {
            anyhow::bail!("used_cars_page is required (set via data/config.yaml or USED_CARS_PAGE env var)");
        }

        if self.webdriver_url.trim().is_empty() {
            anyhow::bail!("webdriver_url is required (set via data/config.yaml or WEBDRIVER_URL env var)");
        }

        if self.db_name.trim().is_empty() {
            anyhow::bail!("db_name is required (set via data/config.yaml or DB_NAME env var)");
        }

        Ok(())
    }

    /// SQLite file for the configured database: `<db_host>/<db_name>.db`
    pub fn database_file(&self) -> PathBuf {
        PathBuf::from(&self.db_host).join(format!("{}.db", self.db_name))
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            element: Duration::from_secs(self.element_timeout_secs),
            clickable: Duration::from_secs(self.clickable_timeout_secs),
        }
    }

    /// Listings index URL for a page number
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/?page={}", self.used_cars_page.trim_end_matches('/'), page)
    }

    pub fn create_default() -> Result<()> {
        std::fs::create_dir_all("data")?;

        let config_str = serde_yaml::to_string(&Config::default())?;
        fs::write(CONFIG_PATH, config_str)?;
        Ok(())
    }
}
