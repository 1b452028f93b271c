use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::currency::LocaleConfig;
use crate::errors::{Result, VirementError};
use crate::utils::paths;
use crate::workflow::{ApprovalPolicy, DEFAULT_EXTERNAL_THRESHOLD};

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default = "Config::default_threshold")]
    pub external_approval_threshold: Decimal,
    /// Snapshot of original budget balances used when none is given explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: LocaleConfig::default(),
            external_approval_threshold: DEFAULT_EXTERNAL_THRESHOLD,
            balances_file: None,
        }
    }
}

impl Config {
    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::new(self.external_approval_threshold)
    }

    fn default_threshold() -> Decimal {
        DEFAULT_EXTERNAL_THRESHOLD
    }

    fn check(&self) -> Result<()> {
        if self.external_approval_threshold.is_sign_negative() {
            return Err(VirementError::Config(format!(
                "external approval threshold must not be negative (got {})",
                self.external_approval_threshold
            )));
        }
        if self.locale.decimal_separator == self.locale.grouping_separator {
            return Err(VirementError::Config(
                "decimal and grouping separators must differ".into(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        paths::ensure_dir(&base)?;
        Ok(Self {
            path: paths::config_file_in(&base),
        })
    }

    /// Loads the stored configuration, or defaults when none was saved yet.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.check()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.check()?;
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
