mod app;
mod config;
mod control;
mod depends;
mod display;
mod model;
mod repository;
mod resolver;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::CliCommand;

#[derive(Parser)]
#[command(name = "deb-deps")]
#[command(about = "Показывает прямые зависимости пакета из Debian-репозитория")]
struct Cli {
    /// Путь к YAML-конфигурации (по умолчанию def.yaml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Демонстрирует обработку ошибок загрузки конфигурации.
    #[arg(long)]
    test_errors: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run_main() {
        eprintln!("Ошибка: {error:#}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<()> {
    let cli = Cli::parse();

    let command = if cli.test_errors {
        CliCommand::TestErrors
    } else {
        CliCommand::Resolve { config: cli.config }
    };

    app::run(command)
}
