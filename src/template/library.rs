//! Template library
//!
//! Scans a directory tree for template JSON files. Files that fail to load
//! are reported and skipped so one broken template does not hide the rest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PhotocardError, Result};
use crate::template::model::TemplateConfig;

/// Extension of template files.
const TEMPLATE_EXTENSION: &str = "json";

/// A template file that could not be loaded.
#[derive(Debug)]
pub struct SkippedTemplate {
    pub path: PathBuf,
    pub error: PhotocardError,
}

/// Templates found under a root directory, keyed by template id.
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    root: PathBuf,
    templates: BTreeMap<String, (PathBuf, TemplateConfig)>,
    skipped: Vec<SkippedTemplate>,
}

impl TemplateLibrary {
    /// Walk `root` and load every `*.json` file as a template.
    ///
    /// When two files declare the same template id the first one in path
    /// order wins and the other is skipped.
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(PhotocardError::FileNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
                    .unwrap_or(false)
            })
            .map(|entry| entry.path().to_path_buf())
            .collect();
        paths.sort();

        let mut library = TemplateLibrary {
            root: root.to_path_buf(),
            ..Default::default()
        };

        for path in paths {
            match TemplateConfig::load(&path) {
                Ok(template) if library.templates.contains_key(&template.id) => {
                    tracing::warn!(path = %path.display(), id = %template.id, "duplicate template id");
                    library.skipped.push(SkippedTemplate {
                        error: PhotocardError::InvalidTemplate {
                            reason: format!("duplicate template id '{}'", template.id),
                        },
                        path,
                    });
                }
                Ok(template) => {
                    library
                        .templates
                        .insert(template.id.clone(), (path, template));
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping template");
                    library.skipped.push(SkippedTemplate { path, error });
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            loaded = library.templates.len(),
            skipped = library.skipped.len(),
            "scanned template library"
        );

        Ok(library)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a template by id.
    pub fn get(&self, id: &str) -> Result<&TemplateConfig> {
        self.templates
            .get(id)
            .map(|(_, template)| template)
            .ok_or_else(|| PhotocardError::TemplateNotFound { id: id.to_string() })
    }

    /// Path the template was loaded from.
    pub fn path_of(&self, id: &str) -> Option<&Path> {
        self.templates.get(id).map(|(path, _)| path.as_path())
    }

    /// Templates in id order.
    pub fn list(&self) -> impl Iterator<Item = &TemplateConfig> {
        self.templates.values().map(|(_, template)| template)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedTemplate] {
        &self.skipped
    }
}
