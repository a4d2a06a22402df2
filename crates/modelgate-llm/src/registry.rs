//! Model Registry - the static catalog of callable models
//!
//! Loaded once and never mutated; share it behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::error::{LLMError, Result};
use crate::types::{ModelRole, Vendor};

/// Catalog compiled into the crate, used when no catalog path is configured
pub const BUILTIN_CATALOG: &str = include_str!("../config/model_config.json");

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique catalog key
    pub name: String,
    pub vendor: Vendor,
    /// Identifier the vendor's API expects
    pub vendor_model_id: String,
    pub role: ModelRole,
    pub price_per_input_token: f64,
    pub price_per_output_token: f64,
}

#[derive(Deserialize)]
struct CatalogDocument {
    models: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    vendor: String,
    vendor_model_id: String,
    #[serde(rename = "type")]
    role: String,
    price_per_input_tokens: f64,
    price_per_output_tokens: f64,
}

impl CatalogEntry {
    fn into_descriptor(self, name: String) -> Result<ModelDescriptor> {
        let vendor = self.vendor.parse::<Vendor>().map_err(|_| {
            LLMError::invalid_config(format!(
                "model '{}' has unknown vendor '{}'",
                name, self.vendor
            ))
        })?;
        let role = self.role.parse::<ModelRole>().map_err(|e| {
            LLMError::invalid_config(format!("model '{}': {}", name, e))
        })?;

        ModelDescriptor {
            name,
            vendor,
            vendor_model_id: self.vendor_model_id,
            role,
            price_per_input_token: self.price_per_input_tokens,
            price_per_output_token: self.price_per_output_tokens,
        }
        .checked()
    }
}

impl ModelDescriptor {
    fn checked(self) -> Result<Self> {
        if self.name.trim().is_empty() {
            return Err(LLMError::invalid_config("model name must not be empty"));
        }
        if self.vendor_model_id.trim().is_empty() {
            return Err(LLMError::invalid_config(format!(
                "model '{}' has an empty vendor_model_id",
                self.name
            )));
        }
        for price in [self.price_per_input_token, self.price_per_output_token] {
            if !price.is_finite() || price < 0.0 {
                return Err(LLMError::invalid_config(format!(
                    "model '{}' has invalid price {}",
                    self.name, price
                )));
            }
        }
        Ok(self)
    }
}

/// Read-only catalog keyed by model name, in document order
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Build from already-constructed descriptors; duplicate names are rejected.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ModelDescriptor>) -> Result<Self> {
        let mut registry = Self::default();
        for descriptor in descriptors {
            let descriptor = descriptor.checked()?;
            if registry.by_name.contains_key(&descriptor.name) {
                return Err(LLMError::invalid_config(format!(
                    "duplicate model name '{}'",
                    descriptor.name
                )));
            }
            registry
                .by_name
                .insert(descriptor.name.clone(), registry.models.len());
            registry.models.push(descriptor);
        }
        Ok(registry)
    }

    /// Parse a `{"models": {...}}` catalog document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)
            .map_err(|e| LLMError::invalid_config(format!("invalid model catalog: {}", e)))?;

        let descriptors = document
            .models
            .into_iter()
            .map(|(name, value)| {
                let entry: CatalogEntry = serde_json::from_value(value).map_err(|e| {
                    LLMError::invalid_config(format!("model '{}': {}", name, e))
                })?;
                entry.into_descriptor(name)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_descriptors(descriptors)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LLMError::invalid_config(format!(
                "cannot read model catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let registry = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), models = registry.len(), "Loaded model catalog");
        Ok(registry)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn get_by_name(&self, name: &str) -> Result<&ModelDescriptor> {
        self.by_name
            .get(name)
            .map(|&index| &self.models[index])
            .ok_or_else(|| LLMError::UnknownModel {
                model: name.to_string(),
            })
    }

    /// First model (in catalog order) with `role` for `vendor`.
    pub fn first_by_vendor_and_role(&self, vendor: Vendor, role: ModelRole) -> Result<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.vendor == vendor && m.role == role)
            .ok_or(LLMError::MissingRoleModel { vendor, role })
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    /// Vendors referenced by at least one model.
    pub fn vendors(&self) -> BTreeSet<Vendor> {
        self.models.iter().map(|m| m.vendor).collect()
    }

    pub fn grouped_by_vendor(&self) -> BTreeMap<Vendor, Vec<String>> {
        let mut grouped: BTreeMap<Vendor, Vec<String>> = BTreeMap::new();
        for model in &self.models {
            grouped
                .entry(model.vendor)
                .or_default()
                .push(model.name.clone());
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
