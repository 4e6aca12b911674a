use thiserror::Error;
use tracing::{debug, info};

use crate::control::{extract_depends, find_stanza, split_stanzas};
use crate::depends::parse_depends;
use crate::model::{DependencyList, ResolutionRequest};
use crate::repository::{IndexSource, RepositoryError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Пакет {name} версии {version} не найден в репозитории")]
    PackageNotFound { name: String, version: String },
}

pub struct Resolver<'a> {
    source: &'a dyn IndexSource,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn IndexSource) -> Self {
        Self { source }
    }

    pub fn get_dependencies(
        &self,
        request: &ResolutionRequest,
    ) -> Result<DependencyList, ResolveError> {
        let index = self.source.fetch_index(request)?;

        let stanzas = split_stanzas(&index);
        debug!(stanzas = stanzas.len(), "package index split");

        let stanza = find_stanza(
            &stanzas,
            &request.package_name,
            &request.package_version,
        )
        .ok_or_else(|| ResolveError::PackageNotFound {
            name: request.package_name.clone(),
            version: request.package_version.clone(),
        })?;

        let dependencies = parse_depends(extract_depends(stanza));
        info!(
            package = %request.package_name,
            version = %request.package_version,
            count = dependencies.len(),
            "direct dependencies resolved"
        );
        Ok(dependencies)
    }
}
