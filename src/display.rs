use console::style;

use crate::config::{Config, FIELDS};
use crate::model::ResolutionRequest;

const LABEL_WIDTH: usize = 40;

pub fn render_config(config: &Config) -> String {
    let mut out = String::new();
    for field in FIELDS {
        let value = config.field_value(field.key).unwrap_or_default();
        out.push_str(&format!("{:width$}: {}\n", field.label, value, width = LABEL_WIDTH));
    }
    out
}

pub fn render_list(dependencies: &[String]) -> String {
    if dependencies.is_empty() {
        return "Прямые зависимости отсутствуют\n".to_string();
    }

    dependencies
        .iter()
        .enumerate()
        .map(|(index, name)| format!("{:>3}. {}\n", index + 1, name))
        .collect()
}

pub fn render_tree(request: &ResolutionRequest, dependencies: &[String]) -> String {
    let mut out = format!("{}\n", request.display_name());
    let last = dependencies.len().saturating_sub(1);
    for (index, name) in dependencies.iter().enumerate() {
        let branch = if index == last { "└── " } else { "├── " };
        out.push_str(branch);
        out.push_str(name);
        out.push('\n');
    }
    out
}

pub fn print_heading(title: &str) {
    println!("{}", style(title).bold().cyan());
}

pub fn print_config(config: &Config) {
    print_heading("НАСТРАИВАЕМЫЕ ПАРАМЕТРЫ КОНФИГУРАЦИИ");
    print!("{}", render_config(config));
}

pub fn print_dependencies(request: &ResolutionRequest, dependencies: &[String], ascii_tree: bool) {
    print_heading(&format!("ПРЯМЫЕ ЗАВИСИМОСТИ {}", request.display_name()));
    if ascii_tree && !dependencies.is_empty() {
        print!("{}", render_tree(request, dependencies));
    } else {
        print!("{}", render_list(dependencies));
    }
}
