//! End-to-end generation: config + artifacts + template -> deployer source.
//!
//! Everything is computed in memory first; the output file is only
//! written once the whole text has assembled without error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::artifact::{ArtifactSource, FsArtifactReader};
use crate::error::CodegenError;
use crate::registry::FacetRegistry;
use crate::resolver::{self, ResolvedFacet};
use crate::settings::GeneratorSettings;
use crate::synth;
use crate::template;

/// Inputs of one generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Compiler output directory searched for artifacts.
    pub build_dir: PathBuf,
    /// Facet configuration document.
    pub config_path: PathBuf,
    /// Deployer template.
    pub template_path: PathBuf,
    pub settings: GeneratorSettings,
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct Generated {
    pub content: String,
    pub facets: Vec<ResolvedFacet>,
}

impl Generated {
    /// Required facets emitted without an artifact.
    pub fn missing_artifacts(&self) -> impl Iterator<Item = &str> {
        self.facets
            .iter()
            .filter(|f| f.is_missing_artifact())
            .map(|f| f.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The file already had the generated content.
    Unchanged,
}

/// Run the whole pipeline against files on disk.
pub fn generate(request: &GenerateRequest) -> Result<Generated, CodegenError> {
    let registry = FacetRegistry::load(&request.config_path, &request.settings.facet_suffix)?;
    let template = read_template(&request.template_path)?;
    let reader = FsArtifactReader::new(&request.build_dir);

    generate_with(&registry, &reader, &template, &request.settings)
}

/// Resolve, synthesize and assemble from already loaded inputs.
pub fn generate_with<S>(
    registry: &FacetRegistry,
    artifacts: &S,
    template: &str,
    settings: &GeneratorSettings,
) -> Result<Generated, CodegenError>
where
    S: ArtifactSource + ?Sized,
{
    let facets = resolver::resolve(registry, artifacts)?;
    resolver::check_deployable(&facets, settings)?;
    info!("resolved {} of {} configured facets", facets.len(), registry.len());

    let fragments = synth::synthesize(&facets, registry, settings);
    let content = template::assemble(template, &fragments)?;

    Ok(Generated { content, facets })
}

pub fn read_template(path: &Path) -> Result<String, CodegenError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CodegenError::TemplateNotFound(path.to_path_buf()),
        _ => CodegenError::io(path, e),
    })
}

/// `<build>/../utils/generated/<output_file>`.
pub fn default_output_path(build_dir: &Path, settings: &GeneratorSettings) -> PathBuf {
    build_dir
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("utils")
        .join("generated")
        .join(&settings.output_file)
}

/// Write `content` to `path` unless it already holds exactly that.
///
/// The file is replaced through a sibling temp file and a rename, so a
/// reader never observes a half-written deployer.
pub fn write_output(path: &Path, content: &str) -> Result<WriteOutcome, CodegenError> {
    if let Ok(existing) = fs::read(path) {
        if existing == content.as_bytes() {
            debug!("{} is up to date", path.display());
            return Ok(WriteOutcome::Unchanged);
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, content).map_err(|e| CodegenError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CodegenError::io(path, e))?;

    Ok(WriteOutcome::Written)
}

/// Fail with [`CodegenError::OutOfDate`] unless `path` already holds
/// `content`.
pub fn check_output(path: &Path, content: &str) -> Result<(), CodegenError> {
    match fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => Ok(()),
        _ => Err(CodegenError::OutOfDate(path.to_path_buf())),
    }
}
