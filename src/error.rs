use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load the bundled registry: {0}")]
    Registry(#[from] cosmic_registry::RegistryError),
    #[error("failed to set up logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
    #[error("{} already exists", .0.display())]
    ConfigExists(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
