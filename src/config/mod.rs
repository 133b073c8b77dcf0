use config::{Config, ConfigError, File, Source};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log_level: Option<String>,
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(File::with_name("config.toml"))
}

pub fn load_config_from<S>(source: S) -> Result<AppConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let mut config: AppConfig = Config::builder()
        .add_source(source)
        .build()?
        .try_deserialize()?;

    set_defaults(&mut config);

    Ok(config)
}

pub fn set_defaults(config: &mut AppConfig) {
    if config.log_level.is_none() {
        config.log_level = Some("info".to_string());
    }
}
