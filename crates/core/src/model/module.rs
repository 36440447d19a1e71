use serde::{Deserialize, Serialize};

use crate::model::ids::ModuleId;

/// Descriptor of one course module, as published by the content build.
///
/// Unknown fields in the feed are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    id: ModuleId,
    #[serde(default)]
    title: String,
}

impl ModuleMetadata {
    #[must_use]
    pub fn new(id: ModuleId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFeed {
    Wrapped { modules: Vec<ModuleMetadata> },
    Bare(Vec<ModuleMetadata>),
}

/// Parses the module feed, either `{ "modules": [...] }` or a bare array.
///
/// # Errors
///
/// Returns the `serde_json` error when the input matches neither shape.
pub fn parse_module_catalog(json: &str) -> Result<Vec<ModuleMetadata>, serde_json::Error> {
    let feed: CatalogFeed = serde_json::from_str(json)?;
    Ok(match feed {
        CatalogFeed::Wrapped { modules } | CatalogFeed::Bare(modules) => modules,
    })
}
