//! Template loading.
//!
//! Templates are opaque strings. The runtime asks a [`TemplateLoader`] for
//! one by locator at mount time; a failure degrades to empty content.

use std::collections::HashMap;
use std::path::{Component as PathComponent, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("template locator '{0}' escapes the template root")]
    InvalidLocator(String),
    #[error("failed to read template '{locator}'")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a template locator to its content.
pub trait TemplateLoader {
    fn get_template(&self, locator: &str) -> Result<String, TemplateError>;
}

/// In-memory templates keyed by locator.
#[derive(Debug, Clone, Default)]
pub struct InlineTemplates {
    templates: HashMap<String, String>,
}

impl InlineTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(locator, content);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, content: impl Into<String>) {
        self.templates.insert(locator.into(), content.into());
    }
}

impl TemplateLoader for InlineTemplates {
    fn get_template(&self, locator: &str) -> Result<String, TemplateError> {
        self.templates
            .get(locator)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(locator.to_owned()))
    }
}

/// Templates read from files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a locator to a path below the root. Only plain relative
    /// components are accepted.
    fn resolve(&self, locator: &str) -> Result<PathBuf, TemplateError> {
        let relative = Path::new(locator);
        let plain = !locator.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, PathComponent::Normal(_) | PathComponent::CurDir));
        if !plain {
            return Err(TemplateError::InvalidLocator(locator.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateLoader for DirectoryTemplates {
    fn get_template(&self, locator: &str) -> Result<String, TemplateError> {
        let path = self.resolve(locator)?;
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound(locator.to_owned())
            } else {
                TemplateError::Io {
                    locator: locator.to_owned(),
                    source,
                }
            }
        })
    }
}
