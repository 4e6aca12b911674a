use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::Term;
use tempfile::tempdir;
use tracing::debug;

use crate::config::{self, ConfigError};
use crate::display;
use crate::model::ResolutionRequest;
use crate::repository::{HttpIndexSource, IndexSource, LocalIndexSource};
use crate::resolver::Resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Resolve { config: Option<PathBuf> },
    TestErrors,
}

pub fn run(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Resolve { config } => resolve(config.as_deref()),
        CliCommand::TestErrors => demonstrate_error_handling(),
    }
}

fn resolve(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config(config_path).context("Не удалось загрузить конфигурацию")?;

    display::print_heading("Визуализатор графа зависимостей пакетов");
    println!();
    display::print_config(&config);
    println!();

    let request = ResolutionRequest::from_config(&config);
    let source: Box<dyn IndexSource> = if config.test_repository_mode {
        Box::new(LocalIndexSource)
    } else {
        Box::new(HttpIndexSource::new(Term::stderr().is_term())?)
    };

    let dependencies = Resolver::new(source.as_ref())
        .get_dependencies(&request)
        .with_context(|| {
            format!(
                "Не удалось определить зависимости пакета {}",
                request.display_name()
            )
        })?;

    display::print_dependencies(&request, &dependencies, config.ascii_tree_output);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum ScenarioInput {
    MissingFile,
    Content(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct ErrorScenario {
    name: &'static str,
    input: ScenarioInput,
}

const ERROR_SCENARIOS: &[ErrorScenario] = &[
    ErrorScenario {
        name: "Несуществующий файл",
        input: ScenarioInput::MissingFile,
    },
    ErrorScenario {
        name: "Некорректный YAML",
        input: ScenarioInput::Content("invalid: yaml: : :"),
    },
    ErrorScenario {
        name: "Отсутствует поле",
        input: ScenarioInput::Content("package_name: test\n"),
    },
    ErrorScenario {
        name: "Некорректная глубина",
        input: ScenarioInput::Content(
            "package_name: test\n\
             repository_url: http://test.com\n\
             test_repository_mode: false\n\
             package_version: '1.0'\n\
             output_filename: test.png\n\
             ascii_tree_output: true\n\
             max_dependency_depth: 0\n",
        ),
    },
];

fn run_error_scenarios(dir: &Path) -> Result<Vec<(&'static str, Option<ConfigError>)>> {
    let mut outcomes = Vec::new();

    for (index, scenario) in ERROR_SCENARIOS.iter().enumerate() {
        let path = match scenario.input {
            ScenarioInput::MissingFile => dir.join("nonexistent.yaml"),
            ScenarioInput::Content(content) => {
                let path = dir.join(format!("test_config_{}.yaml", index + 1));
                fs::write(&path, content)
                    .with_context(|| format!("Не удалось записать {}", path.display()))?;
                path
            }
        };

        debug!(scenario = scenario.name, path = %path.display(), "running config scenario");
        outcomes.push((scenario.name, config::load_config(Some(&path)).err()));
    }

    Ok(outcomes)
}

fn demonstrate_error_handling() -> Result<()> {
    display::print_heading("ДЕМОНСТРАЦИЯ ОБРАБОТКИ ОШИБОК");

    let dir = tempdir().context("Не удалось создать временный каталог")?;
    for (index, (name, error)) in run_error_scenarios(dir.path())?.into_iter().enumerate() {
        println!();
        println!("Тест {}: {}", index + 1, name);
        match error {
            Some(error) => println!(" Обработана: {:#}", anyhow::Error::from(error)),
            None => println!(" Ошибка не обнаружена"),
        }
    }

    Ok(())
}
