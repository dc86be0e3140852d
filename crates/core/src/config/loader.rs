use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `CAPTION_MATE_MATCHING__THRESHOLD=0.9`.
const ENV_PREFIX: &str = "CAPTION_MATE_";

fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Built-in defaults with environment variable overrides (no file)
pub fn load_default_config() -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[matching]
mode = "regex"
threshold = 0.9
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.matching.mode, MatchMode::Regex);
        assert_eq!(config.matching.threshold, 0.9);
    }

    #[test]
    fn test_load_config_from_str_bad_mode() {
        let toml = r#"
[matching]
mode = "fuzzy"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/caption-mate.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[matching]
force = true
languages = ["chs"]

[executor]
verify_checksums = true
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert!(config.matching.force);
        assert_eq!(config.matching.languages, vec!["chs"]);
        assert!(config.executor.verify_checksums);
        assert!(config.executor.dry_run);
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("caption-mate.toml", "[matching]\nthreshold = 0.5\n")?;
            jail.set_env("CAPTION_MATE_MATCHING__THRESHOLD", "0.95");
            jail.set_env("CAPTION_MATE_MATCHING__MODE", "regex");

            let config = load_config(Path::new("caption-mate.toml")).unwrap();
            assert_eq!(config.matching.threshold, 0.95);
            assert_eq!(config.matching.mode, MatchMode::Regex);

            let defaults = load_default_config().unwrap();
            assert_eq!(defaults.matching.mode, MatchMode::Regex);
            assert!(defaults.executor.dry_run);
            Ok(())
        });
    }
}
