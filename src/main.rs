mod app;
mod cli;
mod logging;
mod response;

use crate::app::App;
use crate::cli::Cli;
use crate::response::{IntoResponse, Response};
use clap::Parser;
use scanbridge_config::error::ErrorKind as ConfigError;
use scanbridge_config::{Config, ConfigLoader};
use std::process::ExitCode;

fn load_config(cli: &Cli) -> scanbridge_config::error::Result<Config> {
    let mut loader = ConfigLoader::for_executable()?;
    if let Some(file) = &cli.config {
        loader = loader.with_file(file);
    }
    let config = loader.load()?;
    config.ensure_directories()?;
    Ok(config)
}

fn emit(response: &Response) -> ExitCode {
    println!("{}", response.to_json());
    if response.success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            let kind: &ConfigError = &err;
            eprintln!("{err:?}");
            return emit(&kind.into_response());
        },
    };
    let _guard = logging::init(&config.logging);

    let app = App::from_config(&config);
    emit(&app.handle(cli.command).await)
}
