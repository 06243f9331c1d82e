#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration value for {key}: '{value}' ({reason})")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),
}
