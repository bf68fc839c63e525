use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Serialize, de::DeserializeOwned};

/// Environment variable naming an alternative configuration file.
pub const CONFIG_FILE_ENV: &str = "BEDSIDE_CONFIG";

/// Configuration file read from the working directory when
/// `BEDSIDE_CONFIG` is not set. It is optional.
pub const DEFAULT_CONFIG_FILE: &str = "bedside.toml";

/// Prefix of the environment variables merged into the configuration.
/// Nested keys are separated by a double underscore, so
/// `BEDSIDE_PET__SLEEP_AT` sets `pet.sleep_at`.
pub const ENV_PREFIX: &str = "BEDSIDE_";

pub use types::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(#[from] figment::Error),
    #[error("failed to build application context: {0}")]
    Context(#[source] BoxError),
}

pub trait ContextProvider<Config>: Sized {
    fn new(config: Config) -> impl Future<Output = Result<Self, BoxError>>;
}

/// Install the global tracing subscriber.
///
/// The log level defaults to `info` and can be overridden with the
/// `RUST_LOG` environment variable.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        // remove the module path from every log entry
        .with_target(false)
        .init();
}

/// Extract the configuration from, lowest precedence first: the defaults of
/// `Config`, the TOML configuration file, `BEDSIDE_` environment variables
/// and finally `overrides` (usually the command line).
///
/// # Errors
///
/// If a provider fails or the merged values do not deserialize into
/// `Config`.
pub fn load_config<Config>(
    overrides: impl Provider,
) -> Result<Config, figment::Error>
where
    Config: DeserializeOwned + Serialize + Default,
{
    let path = dotenvy::var(CONFIG_FILE_ENV)
        .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
        .merge(overrides)
        .extract()
}

/// Initialize logging, load the configuration and build the application
/// context from it.
///
/// A `.env` file in the working directory is loaded first, if present.
///
/// # Errors
///
/// If the configuration cannot be extracted or the context cannot be
/// constructed from it.
pub async fn create_app_context<A, Config>(
    overrides: impl Provider,
) -> Result<A, AppError>
where
    A: ContextProvider<Config>,
    Config: DeserializeOwned + Serialize + Default,
{
    let dotenv = dotenvy::dotenv();

    init_tracing();

    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to read .env file");
        }
    }

    let config: Config = load_config(overrides)?;

    A::new(config).await.map_err(AppError::Context)
}

/// Resolves when the process is asked to stop (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// If the signal handlers cannot be installed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        )
        .expect("failed to install signal handler")
        .recv()
        .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::warn!("signal received, shutting down");
}
