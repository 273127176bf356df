//! Diamond codegen library - facet selector resolution and deployer
//! generation.
//!
//! Data flow: facet config ([`registry`]) + compiled artifacts
//! ([`artifact`]) -> [`resolver`] -> [`synth`] -> [`template`].
//! [`pipeline`] wires the stages together for the CLI.

pub mod artifact;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod settings;
pub mod synth;
pub mod template;

pub use artifact::{Artifact, ArtifactSource, FsArtifactReader, MemoryArtifacts, RawSelector};
pub use error::{ArtifactError, CodegenError};
pub use pipeline::{GenerateRequest, Generated, WriteOutcome};
pub use registry::{FacetConfig, FacetRegistry};
pub use resolver::{OwnershipMap, ResolvedFacet, ResolvedSelector};
pub use selector::Selector;
pub use settings::GeneratorSettings;
pub use synth::Fragments;
