use std::path::Path;

// Declare the modules that make up this crate.
#[cfg(feature = "clap")]
pub mod cli;
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    AnalysisParams, ApiPlan, ApiSettings, Config, ExportSettings, FetchSettings, LoggingSettings,
    RetryPolicy,
};

/// Environment variables with this prefix override file values,
/// e.g. `CRYPTOPAIR__API__API_KEY`.
pub const ENV_PREFIX: &str = "CRYPTOPAIR";

/// Loads the application configuration.
///
/// Built-in defaults are overlaid by the TOML file (an explicit `path` must
/// exist; the default `config.toml` is optional) and then by `CRYPTOPAIR__*`
/// environment variables. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config.toml").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("analysis.sma_windows"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
