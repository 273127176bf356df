//! Generator conventions: which facets play special roles and how names
//! are spelled in the generated deployer.
//!
//! Every field has a default matching the stock deployer template, so a
//! settings file only lists what differs:
//!
//! ```toml
//! cut_facet = "DiamondCutFacet"
//! constructor_initialized = ["AccessControlFacet"]
//! diamond_contract = "BTRDiamond"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;
use crate::naming::DEFAULT_FACET_SUFFIX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Conventional facet-name suffix, stripped for field and initializer
    /// names.
    pub facet_suffix: String,

    /// The facet that registers cuts. It is passed to the proxy
    /// constructor and never appears in its own cut array.
    pub cut_facet: String,

    /// Initializable facets whose initializer runs inside the proxy
    /// constructor.
    pub constructor_initialized: Vec<String>,

    /// Proxy contract instantiated by `diamond_creation`.
    pub diamond_contract: String,

    /// Leading proxy constructor arguments; the cut facet address is
    /// appended.
    pub diamond_constructor_args: Vec<String>,

    /// Import path prefix for facet sources.
    pub import_prefix: String,

    /// File name of the generated deployer.
    pub output_file: String,

    /// Struct field names the template declares itself; no facet may
    /// derive one of these.
    pub reserved_fields: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            facet_suffix: DEFAULT_FACET_SUFFIX.to_string(),
            cut_facet: "DiamondCutFacet".to_string(),
            constructor_initialized: vec!["AccessControlFacet".to_string()],
            diamond_contract: "BTRDiamond".to_string(),
            diamond_constructor_args: vec!["admin".to_string(), "treasury".to_string()],
            import_prefix: "@facets/".to_string(),
            output_file: "DiamondDeployer.gen.sol".to_string(),
            reserved_fields: vec!["diamond".to_string()],
        }
    }
}

impl GeneratorSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CodegenError> {
        let content = fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        toml::from_str(&content).map_err(|e| CodegenError::SettingsMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CodegenError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn is_constructor_initialized(&self, facet: &str) -> bool {
        self.constructor_initialized.iter().any(|f| f == facet)
    }

    pub fn is_reserved_field(&self, field: &str) -> bool {
        self.reserved_fields.iter().any(|f| f == field)
    }
}
