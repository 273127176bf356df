//! Facet Registry — the facet configuration document.
//!
//! The document is a JSON object keyed by facet name, either flat or
//! wrapped in a `facets` key next to other deployment records:
//!
//! ```json
//! {
//!   "facets": {
//!     "DiamondCutFacet":    { "required": true },
//!     "AccessControlFacet": { "required": true, "initializable": true,
//!                             "ownedSelectors": ["pause()", "unpause()"] },
//!     "RescueFacet":        { "initializable": true, "payable": true }
//!   },
//!   "BTRDiamond": { "salt": "0x01" }
//! }
//! ```
//!
//! Declaration order is significant: it is the order of every generated
//! array, so indices in the cut and address arrays follow it.

use std::fs;
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::CodegenError;
use crate::naming;

/// Per-facet configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetConfig {
    /// Ship the facet even when no compiled artifact is found.
    #[serde(default)]
    pub required: bool,

    /// Has an `initialize<Name>()` entry point to call after deployment.
    #[serde(default)]
    pub initializable: bool,

    /// Has a payable fallback; the initializer call goes through a
    /// payable address.
    #[serde(default)]
    pub payable: bool,

    /// Signatures pinned to this facet. Any other facet exposing one of
    /// these has it stripped.
    #[serde(default)]
    pub owned_selectors: Vec<String>,

    #[serde(default = "default_true")]
    pub include_in_deployer: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Precomputed deterministic deployment address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_address: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            required: false,
            initializable: false,
            payable: false,
            owned_selectors: Vec::new(),
            include_in_deployer: true,
            salt: None,
            expected_address: None,
        }
    }
}

#[derive(Debug, Clone)]
struct FacetEntry {
    config: FacetConfig,
    field_name: String,
}

/// All configured facets, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FacetRegistry {
    facets: IndexMap<String, FacetEntry>,
}

impl FacetRegistry {
    /// Build a registry from `(name, config)` pairs. Field names are
    /// derived here, once per facet.
    pub fn from_facets<I>(facets: I, suffix: &str) -> Self
    where
        I: IntoIterator<Item = (String, FacetConfig)>,
    {
        let facets = facets
            .into_iter()
            .map(|(name, config)| {
                let field_name = naming::derive_field_name(&name, suffix);
                (name, FacetEntry { config, field_name })
            })
            .collect();
        Self { facets }
    }

    /// Parse a configuration document. The error string describes what is
    /// wrong with it.
    pub fn from_json_str(content: &str, suffix: &str) -> Result<Self, String> {
        let doc: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

        let facets = match &doc {
            Value::Object(map) => match map.get("facets") {
                Some(Value::Object(wrapped)) => wrapped,
                _ => map,
            },
            _ => return Err("expected an object keyed by facet name".into()),
        };

        let mut parsed = Vec::with_capacity(facets.len());
        for (name, value) in facets {
            let config: FacetConfig = serde_json::from_value(value.clone())
                .map_err(|e| format!("facet {}: {}", name, e))?;
            parsed.push((name.clone(), config));
        }

        Ok(Self::from_facets(parsed, suffix))
    }

    /// Load the configuration file. A missing or malformed file is fatal:
    /// nothing downstream can run without it.
    pub fn load(path: &Path, suffix: &str) -> Result<Self, CodegenError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CodegenError::ConfigNotFound(path.to_path_buf()),
            _ => CodegenError::io(path, e),
        })?;

        let registry = Self::from_json_str(&content, suffix).map_err(|reason| {
            CodegenError::ConfigMalformed {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        debug!("loaded {} facets from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.facets.contains_key(name)
    }

    /// Facet names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.facets.keys().map(String::as_str)
    }

    /// `(name, config)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FacetConfig)> {
        self.facets.iter().map(|(n, e)| (n.as_str(), &e.config))
    }

    pub fn get(&self, name: &str) -> Option<&FacetConfig> {
        self.facets.get(name).map(|e| &e.config)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.required)
    }

    pub fn is_initializable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.initializable)
    }

    pub fn is_payable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.payable)
    }

    pub fn is_included(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.include_in_deployer)
    }

    pub fn owned_selectors(&self, name: &str) -> &[String] {
        self.get(name).map(|c| c.owned_selectors.as_slice()).unwrap_or(&[])
    }

    /// Cached struct field name of a facet.
    pub fn field_name(&self, name: &str) -> Option<&str> {
        self.facets.get(name).map(|e| e.field_name.as_str())
    }

    /// Facets that must ship even without artifacts, in declaration order.
    pub fn required_facets(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, c)| c.required)
            .map(|(n, _)| n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DEFAULT_FACET_SUFFIX;

    fn parse(json: &str) -> FacetRegistry {
        FacetRegistry::from_json_str(json, DEFAULT_FACET_SUFFIX).unwrap()
    }

    #[test]
    fn flat_document_keeps_declaration_order() {
        let reg = parse(
            r#"{
                "ZetaFacet": {},
                "AlphaFacet": {"required": true},
                "MidFacet": {"initializable": true}
            }"#,
        );
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["ZetaFacet", "AlphaFacet", "MidFacet"]);
    }

    #[test]
    fn wrapped_document_ignores_siblings() {
        let reg = parse(
            r#"{
                "BTR": {"salt": "0x01"},
                "facets": {
                    "DiamondCutFacet": {"required": true},
                    "AccessControlFacet": {"ownedSelectors": ["pause()"]}
                }
            }"#,
        );
        assert_eq!(reg.len(), 2);
        assert!(!reg.contains("BTR"));
        assert_eq!(reg.owned_selectors("AccessControlFacet"), &["pause()".to_string()]);
    }

    #[test]
    fn defaults_apply_to_missing_keys() {
        let reg = parse(r#"{"FacetA": {"ownedSelectors": ["pause()"]}, "FacetB": {}}"#);
        let b = reg.get("FacetB").unwrap();
        assert_eq!(b, &FacetConfig::default());
        assert!(b.include_in_deployer);
        assert!(!reg.is_required("FacetB"));
        assert!(!reg.is_initializable("FacetB"));
        assert!(!reg.is_payable("FacetB"));
        assert!(reg.owned_selectors("FacetB").is_empty());
    }

    #[test]
    fn accessors_read_flags() {
        let reg = parse(
            r#"{
                "RescueFacet": {"initializable": true, "payable": true,
                                "expectedAddress": "0x00000000000000000000000000000000000000aa",
                                "salt": "0x02", "unknownKey": 7},
                "LegacyFacet": {"includeInDeployer": false, "required": true}
            }"#,
        );
        assert!(reg.is_initializable("RescueFacet"));
        assert!(reg.is_payable("RescueFacet"));
        assert!(!reg.is_included("LegacyFacet"));
        assert_eq!(reg.get("RescueFacet").unwrap().salt.as_deref(), Some("0x02"));
        assert_eq!(reg.required_facets(), vec!["LegacyFacet"]);
        assert!(!reg.is_required("Unknown"));
        assert!(reg.owned_selectors("Unknown").is_empty());
    }

    #[test]
    fn field_names_are_cached_per_facet() {
        let reg = parse(r#"{"DEXAdapterFacet": {}, "AccessControlFacet": {}}"#);
        assert_eq!(reg.field_name("DEXAdapterFacet"), Some("dex_adapter"));
        assert_eq!(reg.field_name("AccessControlFacet"), Some("access_control"));
        assert_eq!(reg.field_name("Unknown"), None);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(FacetRegistry::from_json_str("[1, 2]", DEFAULT_FACET_SUFFIX).is_err());
        assert!(FacetRegistry::from_json_str("{ nope", DEFAULT_FACET_SUFFIX).is_err());
        let err = FacetRegistry::from_json_str(
            r#"{"FacetA": {"required": "yes"}}"#,
            DEFAULT_FACET_SUFFIX,
        )
        .unwrap_err();
        assert!(err.contains("FacetA"));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("facets.json");
        assert!(matches!(
            FacetRegistry::load(&missing, DEFAULT_FACET_SUFFIX),
            Err(CodegenError::ConfigNotFound(p)) if p == missing
        ));

        fs::write(&missing, "{\"FacetA\": 3}").unwrap();
        assert!(matches!(
            FacetRegistry::load(&missing, DEFAULT_FACET_SUFFIX),
            Err(CodegenError::ConfigMalformed { .. })
        ));
    }
}
