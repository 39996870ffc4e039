//! Model catalog and the single selection slot
//!
//! The catalog is a read-only payload loaded at startup. Records keep their
//! payload order in every listing. The only mutable state is the selection,
//! which holds at most one record at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::animation::Animation;

/// Catalog shipped with the application
const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.toml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Model with empty id at position {0}")]
    EmptyId(usize),
    #[error("Duplicate model id: {0}")]
    DuplicateId(String),
    #[error("Model {0} has an empty name")]
    EmptyName(String),
    #[error("Model {id} has invalid animation speed {speed}")]
    InvalidSpeed { id: String, speed: f32 },
    #[error("Model {id} references undeclared category {category}")]
    UnknownCategory { id: String, category: String },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

/// A named annotation anchored on the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Anchor in model-group space (x, y, z)
    pub position: [f32; 3],
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    /// glTF/GLB asset handed to the loader when the viewer mounts
    pub model_url: String,
    /// Image shown as the scan target
    #[serde(default)]
    pub marker_image: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Animation::is_none")]
    pub animation: Animation,
}

/// Browsable category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPayload {
    #[serde(default, rename = "category")]
    pub categories: Vec<Category>,
    #[serde(default, rename = "model")]
    pub models: Vec<ModelRecord>,
}

/// Validated catalog plus the selection slot
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    records: Vec<ModelRecord>,
    selection: Option<usize>,
}

impl Catalog {
    /// Validate a payload and build the catalog
    pub fn from_payload(payload: CatalogPayload) -> Result<Self, CatalogError> {
        let declared: HashSet<&str> = payload.categories.iter().map(|c| c.id.as_str()).collect();
        let mut seen = HashSet::new();

        for (idx, record) in payload.models.iter().enumerate() {
            if record.id.is_empty() {
                return Err(CatalogError::EmptyId(idx));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(CatalogError::DuplicateId(record.id.clone()));
            }
            if record.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(record.id.clone()));
            }
            if let Some(speed) = record.animation.speed() {
                if !speed.is_finite() || speed <= 0.0 {
                    return Err(CatalogError::InvalidSpeed {
                        id: record.id.clone(),
                        speed,
                    });
                }
            }
            if !declared.is_empty() && !declared.contains(record.category.as_str()) {
                return Err(CatalogError::UnknownCategory {
                    id: record.id.clone(),
                    category: record.category.clone(),
                });
            }
        }

        Ok(Self {
            categories: payload.categories,
            records: payload.models,
            selection: None,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let payload: CatalogPayload = toml::from_str(content)?;
        Self::from_payload(payload)
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            models = catalog.records.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&ModelRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records in `category`, in catalog order. Empty when nothing matches.
    pub fn list_by_category(&self, category: &str) -> Vec<&ModelRecord> {
        self.records.iter().filter(|r| r.category == category).collect()
    }

    /// Records matching both category and sub-category, in catalog order
    pub fn list_by_sub_category(&self, category: &str, sub_category: &str) -> Vec<&ModelRecord> {
        self.records
            .iter()
            .filter(|r| r.category == category && r.sub_category == sub_category)
            .collect()
    }

    /// Make `id` the selected record, replacing any previous selection
    pub fn select(&mut self, id: &str) -> Result<&ModelRecord, CatalogError> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CatalogError::UnknownModel(id.to_string()))?;
        debug!(model = %id, "Selected model");
        self.selection = Some(idx);
        Ok(&self.records[idx])
    }

    /// Empty the selection slot. Clearing an empty slot does nothing.
    pub fn clear_selection(&mut self) {
        if let Some(idx) = self.selection.take() {
            debug!(model = %self.records[idx].id, "Cleared selection");
        }
    }

    pub fn selected(&self) -> Option<&ModelRecord> {
        self.selection.map(|idx| &self.records[idx])
    }
}
