use crate::config::Config;

pub const DEFAULT_RELEASE: &str = "focal";
pub const DEFAULT_COMPONENT: &str = "main";
pub const DEFAULT_ARCHITECTURE: &str = "amd64";

/// Ordered list of unique dependency names, in first-seen order.
pub type DependencyList = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub package_name: String,
    pub package_version: String,
    pub repository_url: String,
    pub release: String,
    pub component: String,
    pub architecture: String,
}

impl ResolutionRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            package_name: config.package_name.clone(),
            package_version: config.package_version.clone(),
            repository_url: config.repository_url.clone(),
            release: config.release.clone(),
            component: config.component.clone(),
            architecture: config.architecture.clone(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.package_name, self.package_version)
    }
}
