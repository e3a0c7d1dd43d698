//! Supplier registry.
//!
//! The registry is built once at startup, validated, and then shared
//! read-only (usually behind an `Arc`) by the classifier, the routing table
//! and the processor. Entry order is significant: it breaks ties between
//! matchers and decides which tax identifier wins when a text contains
//! several.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::models::config::ClassificationConfig;
use crate::models::supplier::{normalize_digits, DownstreamTarget, SupplierProfile};

/// Supplier table compiled into the binary.
const BUILTIN_REGISTRY: &str = include_str!("builtin.json");

/// Minimum number of digits in a tax identifier.
const MIN_TAX_ID_DIGITS: usize = 9;

/// On-disk registry layout.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    suppliers: Vec<SupplierProfile>,
}

/// Ordered, validated collection of supplier profiles.
#[derive(Debug, Clone)]
pub struct SupplierRegistry {
    suppliers: Vec<SupplierProfile>,
    index: HashMap<String, usize>,
}

impl SupplierRegistry {
    /// Registry with the built-in supplier table.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_REGISTRY)
    }

    /// Load a registry from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a registry from JSON.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::from_profiles(file.suppliers)
    }

    /// Validate a list of profiles, preserving their order.
    pub fn from_profiles(suppliers: Vec<SupplierProfile>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(suppliers.len());
        let mut tax_owners: HashMap<String, String> = HashMap::new();

        for (position, profile) in suppliers.iter().enumerate() {
            let identity = profile.identity.as_str();
            if identity.trim().is_empty() {
                return Err(RegistryError::EmptyIdentity(position));
            }
            if identity.trim() != identity {
                return Err(RegistryError::UntrimmedIdentity(identity.to_string()));
            }
            if index.insert(identity.to_string(), position).is_some() {
                return Err(RegistryError::DuplicateIdentity(identity.to_string()));
            }

            if let Some(tax_id) = profile.normalized_tax_id() {
                if profile.variant_of.is_some() {
                    return Err(RegistryError::VariantWithTaxId(identity.to_string()));
                }
                if tax_id.len() < MIN_TAX_ID_DIGITS || !tax_id.chars().all(|c| c.is_ascii_digit()) {
                    return Err(RegistryError::InvalidTaxId {
                        identity: identity.to_string(),
                        tax_id: profile.tax_id.clone().unwrap_or_default(),
                    });
                }
                if let Some(first) = tax_owners.insert(tax_id.clone(), identity.to_string()) {
                    return Err(RegistryError::DuplicateTaxId {
                        tax_id,
                        first,
                        second: identity.to_string(),
                    });
                }
            }

            if profile.tax_id.is_none() && profile.keywords.is_empty() && profile.variant_of.is_none() {
                return Err(RegistryError::NoSignal(identity.to_string()));
            }

            if let DownstreamTarget::Parseur { mailbox_id } = &profile.target {
                if mailbox_id.trim().is_empty() {
                    return Err(RegistryError::MissingMailbox(identity.to_string()));
                }
            }
        }

        // Parents are checked once every identity is known.
        for profile in &suppliers {
            if let Some(parent) = &profile.variant_of {
                let valid = index
                    .get(parent.as_str())
                    .map(|&i| suppliers[i].tax_id.is_some())
                    .unwrap_or(false);
                if !valid {
                    return Err(RegistryError::InvalidParent {
                        identity: profile.identity.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        debug!("Registry validated with {} suppliers", suppliers.len());
        Ok(Self { suppliers, index })
    }

    /// Registry named in the config (built-in when unset) with its
    /// reference templates loaded.
    pub fn from_config(config: &ClassificationConfig) -> Result<Self, RegistryError> {
        let mut registry = match &config.registry {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin()?,
        };
        registry.load_templates(&config.templates_dir);
        Ok(registry)
    }

    /// Load `{identity}_template.png` reference headers from a directory.
    ///
    /// Missing files are normal (not every supplier has a template);
    /// unreadable ones are logged and skipped. Returns the number loaded.
    pub fn load_templates(&mut self, dir: &Path) -> usize {
        if !dir.is_dir() {
            debug!("Template directory {} not found", dir.display());
            return 0;
        }

        let mut loaded = 0;
        for profile in &mut self.suppliers {
            let path = dir.join(template_file_name(&profile.identity));
            if !path.exists() {
                continue;
            }
            match image::open(&path) {
                Ok(img) => {
                    profile.template = Some(img.to_luma8());
                    loaded += 1;
                }
                Err(e) => warn!("Skipping template {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} templates from {}", loaded, dir.display());
        loaded
    }

    /// Look up a profile by identity.
    pub fn get(&self, identity: &str) -> Option<&SupplierProfile> {
        self.index.get(identity).map(|&i| &self.suppliers[i])
    }

    /// Profiles in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &SupplierProfile> {
        self.suppliers.iter()
    }

    /// Variants declared for a parent, in registry order.
    pub fn variants_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a SupplierProfile> {
        self.suppliers
            .iter()
            .filter(move |p| p.variant_of.as_deref() == Some(parent))
    }

    /// Profiles that own a tax identifier, paired with its normalised form.
    pub fn tax_ids(&self) -> impl Iterator<Item = (&SupplierProfile, String)> {
        self.suppliers
            .iter()
            .filter_map(|p| p.tax_id.as_deref().map(|t| (p, normalize_digits(t))))
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    /// Serialise the registry in its on-disk layout.
    pub fn to_json(&self) -> Result<String, RegistryError> {
        let file = RegistryFile {
            suppliers: self.suppliers.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

/// File name of a supplier's reference header.
pub fn template_file_name(identity: &str) -> String {
    format!("{}_template.png", identity)
}

/// File name of a supplier's full first page, saved next to the template.
pub fn full_page_file_name(identity: &str) -> String {
    format!("{}_full.png", identity)
}
