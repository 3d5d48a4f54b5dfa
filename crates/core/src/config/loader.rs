use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides (`AFIPWS_TRANSPORT__TIMEOUT_SECS=10`).
pub const ENV_PREFIX: &str = "AFIPWS_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
cuit = "30000000007"

[files]
certificate = "cert.crt"
private_key = "private.key"

[transport]
timeout_secs = 5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.transport.timeout_secs, 5);
    }

    #[test]
    fn test_load_config_from_str_missing_cuit() {
        let toml = r#"
[files]
certificate = "cert.crt"
private_key = "private.key"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/afipws.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
cuit = "30000000007"
sandbox = false

[files]
certificate = "/etc/afipws/cert.crt"
private_key = "/etc/afipws/private.key"

[storage]
tickets_dir = "/var/lib/afipws"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert!(!config.sandbox);
        assert_eq!(config.storage.tickets_dir, PathBuf::from("/var/lib/afipws"));
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "afipws.toml",
                r#"
cuit = "30000000007"

[files]
certificate = "cert.crt"
private_key = "private.key"
"#,
            )?;
            jail.set_env("AFIPWS_PASSPHRASE", "from-env");
            jail.set_env("AFIPWS_TRANSPORT__TIMEOUT_SECS", "7");

            let config = load_config(Path::new("afipws.toml")).unwrap();
            assert_eq!(config.passphrase.as_deref(), Some("from-env"));
            assert_eq!(config.transport.timeout_secs, 7);
            Ok(())
        });
    }
}
