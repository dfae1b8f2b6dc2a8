use crate::discord::DEFAULT_API_URL;
use crate::{BotError, Result};
use oumodules_claims::{ClaimStore, FileClaimStore, NoopClaimStore};
use oumodules_resolver::{MemoryCache, ResolverConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const TOKEN_ENV: &str = "OU_BOT_TOKEN";
pub const DISABLE_CLAIMS_ENV: &str = "DISABLE_FIRESTORE";
pub const CLAIMS_DIR_ENV: &str = "OU_MODULES_CLAIMS_DIR";
pub const CACHE_ENV: &str = "OU_MODULES_CACHE";
pub const DEFAULT_CLAIMS_DIR: &str = ".oumodules/claims";
pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_APPLICATION_ID: u64 = 511_181_619_785_236_500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimBackend {
    /// Every message is processed; duplicate deliveries are not detected.
    Disabled,
    Directory(PathBuf),
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: Option<String>,
    pub claims: ClaimBackend,
    /// Seed cache file; the bundled snapshot when unset.
    pub cache_path: Option<PathBuf>,
    pub api_url: String,
    pub application_id: u64,
    pub api_timeout_ms: u64,
    pub resolver: ResolverConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            claims: ClaimBackend::Directory(PathBuf::from(DEFAULT_CLAIMS_DIR)),
            cache_path: None,
            api_url: DEFAULT_API_URL.to_string(),
            application_id: DEFAULT_APPLICATION_ID,
            api_timeout_ms: 10_000,
            resolver: ResolverConfig::default(),
        }
    }
}

impl BotConfig {
    /// Settings from the process environment, with the token falling back to
    /// `config.json` in the working directory.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), Path::new(CONFIG_FILE))
    }

    pub fn from_lookup<F>(var: F, config_file: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let token = match non_empty(TOKEN_ENV) {
            Some(token) => Some(token),
            None => read_token_file(config_file)?,
        };
        let claims = if var(DISABLE_CLAIMS_ENV).as_deref() == Some("1") {
            ClaimBackend::Disabled
        } else {
            let dir = non_empty(CLAIMS_DIR_ENV).unwrap_or_else(|| DEFAULT_CLAIMS_DIR.to_string());
            ClaimBackend::Directory(PathBuf::from(dir))
        };

        let config = Self {
            token,
            claims,
            cache_path: non_empty(CACHE_ENV).map(PathBuf::from),
            ..Self::default()
        };
        config.validate().map_err(BotError::Config)?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("api_url must not be empty".to_string());
        }
        if self.api_timeout_ms == 0 {
            return Err("api_timeout_ms must be greater than 0".to_string());
        }
        if let ClaimBackend::Directory(dir) = &self.claims {
            if dir.as_os_str().is_empty() {
                return Err("claims directory must not be empty".to_string());
            }
        }
        self.resolver.validate()
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            BotError::Config(format!("no bot token: set {TOKEN_ENV} or add it to {CONFIG_FILE}"))
        })
    }

    pub fn claim_store(&self) -> Result<Arc<dyn ClaimStore>> {
        match &self.claims {
            ClaimBackend::Disabled => {
                log::warn!("claims disabled, duplicate deliveries will be answered twice");
                Ok(Arc::new(NoopClaimStore))
            }
            ClaimBackend::Directory(dir) => Ok(Arc::new(FileClaimStore::new(dir.clone())?)),
        }
    }

    pub fn load_cache(&self) -> Result<MemoryCache> {
        let cache = match &self.cache_path {
            Some(path) => MemoryCache::from_path(path)?,
            None => MemoryCache::bundled()?,
        };
        Ok(cache)
    }
}

fn read_token_file(path: &Path) -> Result<Option<String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let file: ConfigFile = serde_json::from_str(&raw)
        .map_err(|err| BotError::Config(format!("{}: {err}", path.display())))?;
    Ok(file.token)
}
