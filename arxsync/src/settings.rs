use std::path::Path;

use arxsync_core::error::{ArxError, Result};
use serde::Deserialize;

const DEFAULT_LOG_LEVEL: &str = "arxsync=info,arxsync_core=info";

/// Defaults for the `import` command and logging.
///
/// Sources, lowest precedence first: built-in defaults, `arxsync.toml` in the
/// working directory (or the file passed with `--config`), then
/// `ARXSYNC__RESUME`, `ARXSYNC__LIVE`, `ARXSYNC__MIN_GAIN`, `ARXSYNC__LOG_LEVEL`.
/// Command-line flags override the result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub resume: bool,
    pub live: bool,
    pub min_gain: f32,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Settings {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("arxsync").required(false),
        };
        let settings = config::Config::builder()
            .set_default("resume", false)
            .and_then(|b| b.set_default("live", false))
            .and_then(|b| b.set_default("min_gain", 0.05))
            .and_then(|b| b.set_default("log_level", DEFAULT_LOG_LEVEL))
            .map_err(config_err)?
            .add_source(file)
            .add_source(config::Environment::with_prefix("ARXSYNC").separator("__"))
            .build()
            .map_err(config_err)?;

        let cfg: Settings = settings.try_deserialize().map_err(config_err)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.min_gain) {
            return Err(ArxError::Config(format!(
                "min_gain must be in [0, 1), got {}",
                self.min_gain
            )));
        }
        Ok(())
    }
}

fn config_err(e: config::ConfigError) -> ArxError {
    ArxError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let p = dir.path().join("arxsync.toml");
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(&dir, "resume = true\nmin_gain = 0.2\n");
        let s = Settings::load(Some(&p)).unwrap();
        assert!(s.resume);
        assert!(!s.live);
        assert_eq!(s.min_gain, 0.2);
        assert_eq!(s.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn out_of_range_min_gain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(&dir, "min_gain = 1.5\n");
        assert!(matches!(Settings::load(Some(&p)), Err(ArxError::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nope.toml");
        assert!(matches!(Settings::load(Some(&p)), Err(ArxError::Config(_))));
    }
}
