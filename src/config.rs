use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde_yaml::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::{DEFAULT_ARCHITECTURE, DEFAULT_COMPONENT, DEFAULT_RELEASE};

pub const DEFAULT_CONFIG_FILE: &str = "def.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Конфигурационный файл не найден: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Ошибка чтения файла {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Ошибка парсинга YAML")]
    Yaml(#[source] serde_yaml::Error),

    #[error("Конфигурационный файл пуст")]
    Empty,

    #[error("Конфигурация должна быть YAML-словарём")]
    NotAMapping,

    #[error("Отсутствует обязательное поле: {field}")]
    MissingField { field: &'static str },

    #[error("Некорректная структура конфигурации")]
    Schema(#[source] serde_yaml::Error),

    #[error("Версия пакета '{value}' записана числом; заключите её в кавычки")]
    UnquotedVersion { value: String },

    #[error("Максимальная глубина анализа должна быть положительным числом")]
    InvalidDepth,

    #[error("Некорректный URL репозитория '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A configuration key together with its display label.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
}

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "package_name",
        label: "Имя анализируемого пакета",
        required: true,
    },
    FieldSpec {
        key: "repository_url",
        label: "URL-адрес репозитория",
        required: true,
    },
    FieldSpec {
        key: "test_repository_mode",
        label: "Режим работы с тестовым репозиторием",
        required: true,
    },
    FieldSpec {
        key: "package_version",
        label: "Версия пакета",
        required: true,
    },
    FieldSpec {
        key: "output_filename",
        label: "Имя файла с изображением графа",
        required: true,
    },
    FieldSpec {
        key: "ascii_tree_output",
        label: "Режим вывода ASCII-дерева",
        required: true,
    },
    FieldSpec {
        key: "max_dependency_depth",
        label: "Максимальная глубина анализа",
        required: true,
    },
    FieldSpec {
        key: "release",
        label: "Релиз дистрибутива",
        required: false,
    },
    FieldSpec {
        key: "component",
        label: "Компонент репозитория",
        required: false,
    },
    FieldSpec {
        key: "architecture",
        label: "Архитектура",
        required: false,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub package_name: String,
    pub repository_url: String,
    pub test_repository_mode: bool,
    #[serde(deserialize_with = "string_or_integer")]
    pub package_version: String,
    pub output_filename: String,
    pub ascii_tree_output: bool,
    pub max_dependency_depth: i64,
    #[serde(default = "default_release")]
    pub release: String,
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_architecture")]
    pub architecture: String,
}

// Floats are rejected in `parse_config`: `1.10` would read back as `1.1`.
fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) if !value.is_f64() => Ok(value.to_string()),
        other => Err(de::Error::custom(format!(
            "ожидалась строка или целое число, получено {other:?}"
        ))),
    }
}

fn default_release() -> String {
    DEFAULT_RELEASE.to_string()
}

fn default_component() -> String {
    DEFAULT_COMPONENT.to_string()
}

fn default_architecture() -> String {
    DEFAULT_ARCHITECTURE.to_string()
}

impl Config {
    pub fn field_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "package_name" => self.package_name.clone(),
            "repository_url" => self.repository_url.clone(),
            "test_repository_mode" => self.test_repository_mode.to_string(),
            "package_version" => self.package_version.clone(),
            "output_filename" => self.output_filename.clone(),
            "ascii_tree_output" => self.ascii_tree_output.to_string(),
            "max_dependency_depth" => self.max_dependency_depth.to_string(),
            "release" => self.release.clone(),
            "component" => self.component.clone(),
            "architecture" => self.architecture.clone(),
            _ => return None,
        };
        Some(value)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    let config = parse_config(&content)?;
    debug!(path = %path.display(), package = %config.package_name, "configuration loaded");
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let document: Value = serde_yaml::from_str(content).map_err(ConfigError::Yaml)?;
    let mapping = match document {
        Value::Null => return Err(ConfigError::Empty),
        Value::Mapping(ref mapping) => mapping,
        _ => return Err(ConfigError::NotAMapping),
    };

    if let Some(field) = FIELDS
        .iter()
        .filter(|spec| spec.required)
        .find(|spec| !mapping.contains_key(spec.key))
    {
        return Err(ConfigError::MissingField { field: field.key });
    }

    if let Some(Value::Number(version)) = mapping.get("package_version") {
        if version.is_f64() {
            return Err(ConfigError::UnquotedVersion {
                value: version.to_string(),
            });
        }
    }

    let config: Config = serde_yaml::from_value(document).map_err(ConfigError::Schema)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.max_dependency_depth < 1 {
        return Err(ConfigError::InvalidDepth);
    }

    if !config.test_repository_mode {
        validate_repository_url(&config.repository_url)?;
    }

    Ok(())
}

fn validate_repository_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("неподдерживаемая схема '{other}'"),
        }),
    }
}
