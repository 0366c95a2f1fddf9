use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Game directory is not set")]
    #[diagnostic(
        code(config::game_root_missing),
        help("Pass --game-root or set game_root in the config file (see 'content-manager config show')")
    )]
    GameRootNotSet,

    #[error("Game directory not found: {path}")]
    #[diagnostic(
        code(config::game_root_not_found),
        help("The game directory is the one holding the 'content' folder")
    )]
    GameRootNotFound { path: Utf8PathBuf },

    #[error("Payload directory not found: {path}")]
    #[diagnostic(
        code(payload::not_found),
        help("Unpack the archive first and pass the resulting directory")
    )]
    PayloadNotFound { path: Utf8PathBuf },

    #[error("Could not determine the config file location")]
    #[diagnostic(code(config::no_location), help("Pass --config <path> explicitly"))]
    ConfigLocationUnknown,

    #[error("Configuration file error: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check the config file for TOML syntax errors")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write configuration: {path}")]
    #[diagnostic(code(config::write_failed), help("Check file permissions"))]
    ConfigWriteFailed {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Installation planning failed")]
    #[diagnostic(code(install::failed))]
    Install {
        #[from]
        source: cm_install::Error,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn game_root_not_found(path: Utf8PathBuf) -> Self {
        Self::GameRootNotFound { path }
    }

    pub fn payload_not_found(path: Utf8PathBuf) -> Self {
        Self::PayloadNotFound { path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: toml::de::Error) -> Self {
        Self::ConfigParseError { path, source }
    }

    pub fn config_write_failed(path: Utf8PathBuf, source: std::io::Error) -> Self {
        Self::ConfigWriteFailed { path, source }
    }
}
