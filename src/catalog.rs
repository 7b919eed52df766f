//! Category catalog — maps category identifiers to named decision trees.
//!
//! The catalog is assembled from two JSON documents: an id → name map and a
//! name → tree map (the original `id.json` / `data.json` pair). It is loaded
//! once at startup and read-only for the lifetime of the process.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::tree::DecisionNode;

#[derive(Debug, Deserialize)]
struct TreeDocument {
    categories: HashMap<String, DecisionNode>,
}

/// Immutable catalog of category decision trees.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    names: HashMap<String, String>,
    trees: HashMap<String, DecisionNode>,
}

impl CategoryCatalog {
    /// Parse a catalog from the two JSON documents.
    pub fn from_json(ids_json: &str, trees_json: &str) -> Result<Self, CatalogError> {
        let names: HashMap<String, String> =
            serde_json::from_str(ids_json).map_err(|e| CatalogError::Malformed {
                path: "id document".to_string(),
                reason: e.to_string(),
            })?;
        let document: TreeDocument =
            serde_json::from_str(trees_json).map_err(|e| CatalogError::Malformed {
                path: "tree document".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            names,
            trees: document.categories,
        })
    }

    /// Load the catalog from files on disk.
    pub async fn load(ids_path: &Path, trees_path: &Path) -> Result<Self, CatalogError> {
        let ids = read_document(ids_path).await?;
        let trees = read_document(trees_path).await?;
        Self::from_json(&ids, &trees)
    }

    /// Look up the decision tree root for a category identifier.
    ///
    /// Fails with `CategoryNotFound` when the id is unknown or its name maps
    /// to no tree.
    pub fn select_category(&self, category_id: &str) -> Result<&DecisionNode, CatalogError> {
        let name = self
            .names
            .get(category_id)
            .ok_or_else(|| CatalogError::CategoryNotFound(category_id.to_string()))?;
        self.trees
            .get(name)
            .ok_or_else(|| CatalogError::CategoryNotFound(category_id.to_string()))
    }

    /// Human-readable name of a category, if known.
    pub fn category_name(&self, category_id: &str) -> Option<&str> {
        self.names.get(category_id).map(String::as_str)
    }

    /// Number of known category identifiers.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

async fn read_document(path: &Path) -> Result<String, CatalogError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
