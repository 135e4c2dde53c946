mod core;
mod error;
mod features;
mod logging;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Creates a cosmic_ls.toml on the current working directory or on the specified path
    Init {
        /// The path to create the cosmic_ls.toml file in.
        path: Option<PathBuf>,
    },
}

fn init(path: Option<PathBuf>) -> Result<PathBuf> {
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    let config_path = cosmic_config::config_path(&root);

    if config_path.exists() {
        return Err(Error::ConfigExists(config_path));
    }

    std::fs::create_dir_all(&root)?;
    std::fs::write(&config_path, cosmic_config::default_toml())?;
    Ok(config_path)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Init { path }) => init(path).map(|config_path| {
            println!("Created {}", config_path.display());
        }),
        None => server::start().await,
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
