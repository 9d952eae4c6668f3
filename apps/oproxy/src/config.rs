use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use oproxy_provider_impl::provider::ollama::DEFAULT_BASE_URL;

use crate::cli::Cli;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;
const ENV_PREFIX: &str = "OPROXY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    pub upstream: String,
    #[serde(default)]
    pub log_json: bool,
}

impl GlobalConfig {
    /// Defaults, then the TOML file named by `--config`, then `OPROXY_*`
    /// variables, then explicit flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        Self::layered(cli, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn layered(cli: &Cli, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("upstream", DEFAULT_BASE_URL)?
            .set_default("log_json", false)?;
        if let Some(path) = cli.config.as_deref() {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let mut builder = builder
            .add_source(env)
            .set_override_option("host", cli.host.clone())?
            .set_override_option("port", cli.port)?
            .set_override_option("upstream", cli.upstream.clone())?;
        if cli.log_json {
            builder = builder.set_override("log_json", true)?;
        }
        builder.build()?.try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use config::Map;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    fn temp_toml(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("oproxy-{}-{name}.toml", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_sources() {
        let config = GlobalConfig::layered(&Cli::default(), env(&[])).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.upstream, "http://127.0.0.1:11434");
        assert!(!config.log_json);
        assert_eq!(config.bind_addr(), "127.0.0.1:8787");
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let path = temp_toml(
            "layers",
            "host = \"0.0.0.0\"\nport = 9000\nupstream = \"http://gpu-box:11434\"\n",
        );
        let cli = Cli {
            config: Some(path.clone()),
            port: Some(9100),
            ..Default::default()
        };

        let config = GlobalConfig::layered(
            &cli,
            env(&[("OPROXY_PORT", "9050"), ("OPROXY_UPSTREAM", "http://env:11434")]),
        )
        .unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.upstream, "http://env:11434");
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/oproxy.toml")),
            ..Default::default()
        };
        assert!(GlobalConfig::layered(&cli, env(&[])).is_err());
    }

    #[test]
    fn log_json_flag() {
        let cli = Cli {
            log_json: true,
            ..Default::default()
        };
        let config = GlobalConfig::layered(&cli, env(&[])).unwrap();
        assert!(config.log_json);
    }
}
