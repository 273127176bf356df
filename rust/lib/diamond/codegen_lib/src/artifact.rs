//! Artifact Reader — locates and parses compiled facet artifacts.
//!
//! The compiler writes one JSON file per contract, usually at
//! `<build>/<Facet>.sol/<Facet>.json`. We only need the callable surface:
//! `methodIdentifiers` (signature → selector hex) or, failing that, the
//! `abi` entries from which the signatures can be rebuilt.
//!
//! A missing or unreadable artifact is never fatal. The reader logs the
//! reason and reports the facet as having no artifact; the resolver
//! decides whether that facet still ships.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ArtifactError;
use crate::selector::Selector;

/// One callable function of a facet as found in its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelector {
    pub signature: String,
    pub selector: Selector,
}

/// The subset of a compiler artifact the generator reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub method_identifiers: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub abi: Option<Vec<AbiEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiEntry {
    /// `function`, `constructor`, `event`, `error`, ... Omitted means
    /// `function`.
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub inputs: Vec<AbiParam>,
}

fn default_entry_kind() -> String {
    "function".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(rename = "type")]
    pub ty: String,

    /// Members of a `tuple` / `tuple[]` parameter.
    #[serde(default)]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    /// Canonical type as it appears in a signature: tuples expand to
    /// their parenthesized components, keeping any array suffix.
    pub fn canonical_type(&self) -> String {
        match self.ty.strip_prefix("tuple") {
            Some(array_suffix) => {
                let inner: Vec<String> = self.components.iter().map(|c| c.canonical_type()).collect();
                format!("({}){}", inner.join(","), array_suffix)
            }
            None => self.ty.clone(),
        }
    }
}

impl AbiEntry {
    /// Canonical signature, e.g. `swap((address,uint256)[],bytes)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.canonical_type()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

impl Artifact {
    /// Parse an artifact from JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, ArtifactError> {
        serde_json::from_slice(data).map_err(|e| ArtifactError::Malformed(e.to_string()))
    }

    /// Build an artifact from a `methodIdentifiers` listing.
    pub fn from_identifiers<I, S, H>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = (S, H)>,
        S: Into<String>,
        H: Into<String>,
    {
        Artifact {
            method_identifiers: Some(
                identifiers
                    .into_iter()
                    .map(|(s, h)| (s.into(), h.into()))
                    .collect(),
            ),
            abi: None,
        }
    }

    /// Callable selectors, constructors excluded, sorted by signature.
    ///
    /// `methodIdentifiers` wins when present; otherwise signatures are
    /// rebuilt from `abi` and hashed.
    pub fn selectors(&self) -> Result<Vec<RawSelector>, ArtifactError> {
        if let Some(ids) = &self.method_identifiers {
            let mut out = Vec::with_capacity(ids.len());
            for (signature, hex) in ids {
                if signature.starts_with("constructor") {
                    continue;
                }
                let selector = Selector::parse(hex).ok_or_else(|| ArtifactError::InvalidSelector {
                    signature: signature.clone(),
                    selector: hex.clone(),
                })?;
                out.push(RawSelector {
                    signature: signature.clone(),
                    selector,
                });
            }
            return Ok(out);
        }

        if let Some(abi) = &self.abi {
            let by_signature: BTreeMap<String, Selector> = abi
                .iter()
                .filter(|entry| entry.kind == "function")
                .map(|entry| {
                    let signature = entry.signature();
                    let selector = Selector::from_signature(&signature);
                    (signature, selector)
                })
                .collect();
            return Ok(by_signature
                .into_iter()
                .map(|(signature, selector)| RawSelector { signature, selector })
                .collect());
        }

        Err(ArtifactError::MissingIdentifiers)
    }
}

/// Locate the artifact JSON for `facet` under `build_dir`.
///
/// Conventional locations are tried first, then the whole tree is walked
/// (in file-name order, so the answer does not depend on the filesystem)
/// for a file named exactly `<facet>.json`.
pub fn find_artifact(facet: &str, build_dir: &Path) -> Option<PathBuf> {
    let file_name = format!("{}.json", facet);
    let source_dir = format!("{}.sol", facet);

    let direct = [
        build_dir.join(&source_dir).join(&file_name),
        build_dir.join("src").join("facets").join(&source_dir).join(&file_name),
        build_dir.join("temp_src").join("facets").join(&source_dir).join(&file_name),
    ];
    if let Some(path) = direct.into_iter().find(|p| p.is_file()) {
        return Some(path);
    }

    WalkDir::new(build_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name.as_str())
        .map(|entry| entry.into_path())
}

/// Read and parse an artifact file.
pub fn load_artifact(path: &Path) -> Result<Artifact, ArtifactError> {
    let data = fs::read(path).map_err(|e| ArtifactError::Io(e.to_string()))?;
    Artifact::from_slice(&data)
}

/// Where the resolver gets each facet's raw selector set from.
pub trait ArtifactSource {
    /// Raw selectors of `facet`, or `None` when no usable artifact exists.
    fn raw_selectors(&self, facet: &str) -> Option<Vec<RawSelector>>;
}

/// Reads artifacts from a compiler output directory.
#[derive(Debug, Clone)]
pub struct FsArtifactReader {
    build_dir: PathBuf,
}

impl FsArtifactReader {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }
}

impl ArtifactSource for FsArtifactReader {
    fn raw_selectors(&self, facet: &str) -> Option<Vec<RawSelector>> {
        let Some(path) = find_artifact(facet, &self.build_dir) else {
            debug!("no artifact for {} under {}", facet, self.build_dir.display());
            return None;
        };

        match load_artifact(&path).and_then(|a| a.selectors()) {
            Ok(selectors) => {
                debug!("{}: {} selectors from {}", facet, selectors.len(), path.display());
                Some(selectors)
            }
            Err(e) => {
                warn!("ignoring artifact {} for {}: {}", path.display(), facet, e);
                None
            }
        }
    }
}

/// In-memory artifacts keyed by facet name.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifacts {
    artifacts: BTreeMap<String, Artifact>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, facet: impl Into<String>, artifact: Artifact) {
        self.artifacts.insert(facet.into(), artifact);
    }

    /// Builder form of [`insert`](Self::insert) for a `methodIdentifiers`
    /// listing.
    pub fn with(mut self, facet: &str, identifiers: &[(&str, &str)]) -> Self {
        self.insert(facet, Artifact::from_identifiers(identifiers.iter().copied()));
        self
    }
}

impl ArtifactSource for MemoryArtifacts {
    fn raw_selectors(&self, facet: &str) -> Option<Vec<RawSelector>> {
        let artifact = self.artifacts.get(facet)?;
        match artifact.selectors() {
            Ok(selectors) => Some(selectors),
            Err(e) => {
                warn!("ignoring artifact for {}: {}", facet, e);
                None
            }
        }
    }
}
