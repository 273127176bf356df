//! Selector Resolver — decides which facet exposes which selector.
//!
//! Facets inherit shared functionality (access control, pausing) from
//! common bases, so the same signature shows up in many artifacts. Each
//! such signature is pinned to one facet through `ownedSelectors`; the
//! resolver builds a single `signature -> owner` table and strips owned
//! signatures from every other facet.
//!
//! Output order is the registry's declaration order and selectors are
//! sorted by signature, so identical inputs always resolve identically.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::artifact::{ArtifactSource, RawSelector};
use crate::error::CodegenError;
use crate::registry::FacetRegistry;
use crate::selector::Selector;
use crate::settings::GeneratorSettings;

/// A selector assigned to a facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelector {
    pub selector: Selector,
    pub signature: String,
}

/// A facet that will be deployed, with its final selector set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFacet {
    pub name: String,
    pub field_name: String,
    /// Conflict-free, sorted ascending by signature.
    pub selectors: Vec<ResolvedSelector>,
    /// False for a required facet shipped without an artifact.
    pub artifact_found: bool,
}

impl ResolvedFacet {
    pub fn is_missing_artifact(&self) -> bool {
        !self.artifact_found
    }
}

/// `signature -> owning facet`, built once per run from every facet's
/// `ownedSelectors`.
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    owners: BTreeMap<String, String>,
}

impl OwnershipMap {
    /// Collect ownership claims in declaration order. A signature claimed
    /// by two different facets is a [`CodegenError::Conflict`]; the first
    /// declared facet is reported first.
    pub fn build(registry: &FacetRegistry) -> Result<Self, CodegenError> {
        let mut owners: BTreeMap<String, String> = BTreeMap::new();

        for (facet, config) in registry.iter() {
            for signature in &config.owned_selectors {
                match owners.get(signature) {
                    Some(owner) if owner != facet => {
                        return Err(CodegenError::Conflict {
                            signature: signature.clone(),
                            first: owner.clone(),
                            second: facet.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(signature.clone(), facet.to_string());
                    }
                }
            }
        }

        Ok(Self { owners })
    }

    pub fn owner(&self, signature: &str) -> Option<&str> {
        self.owners.get(signature).map(String::as_str)
    }

    /// Whether `facet` may expose `signature`: unowned signatures are open
    /// to everyone, owned ones only to their owner.
    pub fn allows(&self, signature: &str, facet: &str) -> bool {
        self.owner(signature).is_none_or(|owner| owner == facet)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Resolve the deployable facets and their selector sets.
///
/// A facet is a candidate when it is included in the deployer and either
/// has an artifact or is required. Required facets without an artifact
/// resolve to an empty set (and a warning).
pub fn resolve<S>(registry: &FacetRegistry, artifacts: &S) -> Result<Vec<ResolvedFacet>, CodegenError>
where
    S: ArtifactSource + ?Sized,
{
    let ownership = OwnershipMap::build(registry)?;
    if ownership.is_empty() {
        debug!("no ownedSelectors configured");
    } else {
        debug!("ownership map: {} pinned signatures", ownership.len());
    }

    let mut resolved = Vec::new();

    for (name, config) in registry.iter() {
        if !config.include_in_deployer {
            debug!("{}: excluded from deployer", name);
            continue;
        }

        let field_name = registry.field_name(name).unwrap_or_default().to_string();

        let Some(raw) = artifacts.raw_selectors(name) else {
            if config.required {
                warn!("{} is required but has no artifact; generating an empty selector set", name);
                resolved.push(ResolvedFacet {
                    name: name.to_string(),
                    field_name,
                    selectors: Vec::new(),
                    artifact_found: false,
                });
            } else {
                debug!("{}: no artifact, skipped", name);
            }
            continue;
        };

        let selectors = filter_selectors(name, raw, &ownership);

        for owned in &config.owned_selectors {
            if !selectors.iter().any(|s| &s.signature == owned) {
                warn!("{} owns {} but its artifact does not define it", name, owned);
            }
        }

        resolved.push(ResolvedFacet {
            name: name.to_string(),
            field_name,
            selectors,
            artifact_found: true,
        });
    }

    check_collisions(&resolved)?;
    Ok(resolved)
}

fn filter_selectors(facet: &str, raw: Vec<RawSelector>, ownership: &OwnershipMap) -> Vec<ResolvedSelector> {
    let total = raw.len();
    let mut kept: BTreeMap<String, Selector> = BTreeMap::new();

    for entry in raw {
        if ownership.allows(&entry.signature, facet) {
            kept.insert(entry.signature, entry.selector);
        }
    }

    debug!("{}: {} selectors kept, {} owned elsewhere", facet, kept.len(), total - kept.len());

    kept.into_iter()
        .map(|(signature, selector)| ResolvedSelector { selector, signature })
        .collect()
}

/// Every selector may be exposed by at most one facet.
fn check_collisions(facets: &[ResolvedFacet]) -> Result<(), CodegenError> {
    let mut seen: HashMap<Selector, (&str, &str)> = HashMap::new();

    for facet in facets {
        for sel in &facet.selectors {
            if let Some((first, first_signature)) = seen.insert(sel.selector, (facet.name.as_str(), sel.signature.as_str())) {
                return Err(CodegenError::SelectorCollision {
                    selector: sel.selector.to_string(),
                    first: first.to_string(),
                    first_signature: first_signature.to_string(),
                    second: facet.name.clone(),
                    second_signature: sel.signature.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Reject a resolved set whose deployer could not compile: every struct
/// field name must be unique and not declared by the template, and the
/// cut facet must be deployed since the proxy is constructed from it.
pub fn check_deployable(facets: &[ResolvedFacet], settings: &GeneratorSettings) -> Result<(), CodegenError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();

    for facet in facets {
        if settings.is_reserved_field(&facet.field_name) {
            return Err(CodegenError::ReservedFieldName {
                field: facet.field_name.clone(),
                facet: facet.name.clone(),
            });
        }
        if let Some(first) = fields.insert(facet.field_name.as_str(), facet.name.as_str()) {
            return Err(CodegenError::FieldNameClash {
                field: facet.field_name.clone(),
                first: first.to_string(),
                second: facet.name.clone(),
            });
        }
    }

    if !facets.iter().any(|f| f.name == settings.cut_facet) {
        return Err(CodegenError::MissingCutFacet(settings.cut_facet.clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use crate::artifact::MemoryArtifacts;
    use crate::naming::{self, DEFAULT_FACET_SUFFIX};

    fn registry(json: &str) -> FacetRegistry {
        FacetRegistry::from_json_str(json, DEFAULT_FACET_SUFFIX).unwrap()
    }

    fn signatures(facet: &ResolvedFacet) -> Vec<&str> {
        facet.selectors.iter().map(|s| s.signature.as_str()).collect()
    }

    #[test]
    fn owned_selector_stripped_from_other_facets() {
        let reg = registry(r#"{"FacetA": {"ownedSelectors": ["pause()"]}, "FacetB": {}}"#);
        let artifacts = MemoryArtifacts::new()
            .with("FacetA", &[("pause()", "abc12345")])
            .with("FacetB", &[("pause()", "abc12345"), ("foo()", "deadbeef")]);

        let resolved = resolve(&reg, &artifacts).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "FacetA");
        assert_eq!(signatures(&resolved[0]), vec!["pause()"]);
        assert_eq!(resolved[1].name, "FacetB");
        assert_eq!(signatures(&resolved[1]), vec!["foo()"]);
        assert_eq!(resolved[1].selectors[0].selector.to_string(), "0xdeadbeef");
    }

    #[test]
    fn double_ownership_is_a_conflict() {
        let reg = registry(
            r#"{"FacetA": {"ownedSelectors": ["admin()"]},
                "FacetB": {"ownedSelectors": ["admin()"]}}"#,
        );
        let err = resolve(&reg, &MemoryArtifacts::new()).unwrap_err();
        match err {
            CodegenError::Conflict { signature, first, second } => {
                assert_eq!(signature, "admin()");
                assert_eq!(first, "FacetA");
                assert_eq!(second, "FacetB");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn conflict_detected_even_for_excluded_facets() {
        let reg = registry(
            r#"{"FacetA": {"ownedSelectors": ["admin()"]},
                "FacetB": {"includeInDeployer": false, "ownedSelectors": ["admin()"]}}"#,
        );
        assert!(matches!(
            resolve(&reg, &MemoryArtifacts::new()),
            Err(CodegenError::Conflict { .. })
        ));
    }

    #[test]
    fn repeated_claim_by_same_facet_is_fine() {
        let reg = registry(r#"{"FacetA": {"ownedSelectors": ["admin()", "admin()"]}}"#);
        let map = OwnershipMap::build(&reg).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.owner("admin()"), Some("FacetA"));
        assert!(map.allows("admin()", "FacetA"));
        assert!(!map.allows("admin()", "FacetB"));
        assert!(map.allows("other()", "FacetB"));
    }

    #[test]
    fn required_facet_without_artifact_has_empty_set() {
        let reg = registry(r#"{"DiamondCutFacet": {"required": true}, "OptionalFacet": {}}"#);
        let resolved = resolve(&reg, &MemoryArtifacts::new()).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "DiamondCutFacet");
        assert!(resolved[0].selectors.is_empty());
        assert!(resolved[0].is_missing_artifact());
    }

    #[test]
    fn excluded_facet_is_not_a_candidate() {
        let reg = registry(r#"{"LegacyFacet": {"required": true, "includeInDeployer": false}}"#);
        let artifacts = MemoryArtifacts::new().with("LegacyFacet", &[("foo()", "deadbeef")]);
        assert!(resolve(&reg, &artifacts).unwrap().is_empty());
    }

    #[test]
    fn owned_by_excluded_facet_still_strips_others() {
        let reg = registry(
            r#"{"LegacyFacet": {"includeInDeployer": false, "ownedSelectors": ["old()"]},
                "FacetB": {}}"#,
        );
        let artifacts = MemoryArtifacts::new().with("FacetB", &[("old()", "11111111"), ("new()", "22222222")]);
        let resolved = resolve(&reg, &artifacts).unwrap();
        assert_eq!(signatures(&resolved[0]), vec!["new()"]);
    }

    #[test]
    fn facet_with_everything_stripped_is_kept() {
        let reg = registry(r#"{"FacetA": {"ownedSelectors": ["pause()"]}, "FacetB": {}}"#);
        let artifacts = MemoryArtifacts::new()
            .with("FacetA", &[("pause()", "8456cb59")])
            .with("FacetB", &[("pause()", "8456cb59")]);
        let resolved = resolve(&reg, &artifacts).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved[1].selectors.is_empty());
        assert!(!resolved[1].is_missing_artifact());
    }

    #[test]
    fn selectors_sorted_by_signature() {
        let reg = registry(r#"{"FacetA": {}}"#);
        let artifacts = MemoryArtifacts::new().with(
            "FacetA",
            &[("zeta()", "00000003"), ("alpha()", "00000002"), ("Beta()", "00000001")],
        );
        let resolved = resolve(&reg, &artifacts).unwrap();
        assert_eq!(signatures(&resolved[0]), vec!["Beta()", "alpha()", "zeta()"]);
    }

    #[test]
    fn declaration_order_is_output_order() {
        let reg = registry(r#"{"ZFacet": {}, "AFacet": {}, "MFacet": {}}"#);
        let artifacts = MemoryArtifacts::new()
            .with("AFacet", &[("a()", "0000000a")])
            .with("MFacet", &[("m()", "0000000b")])
            .with("ZFacet", &[("z()", "0000000c")]);
        let names: Vec<String> = resolve(&reg, &artifacts).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["ZFacet", "AFacet", "MFacet"]);
    }

    #[test]
    fn unowned_shared_selector_is_a_collision() {
        let reg = registry(r#"{"FacetA": {}, "FacetB": {}}"#);
        let artifacts = MemoryArtifacts::new()
            .with("FacetA", &[("owner()", "8da5cb5b")])
            .with("FacetB", &[("owner()", "8da5cb5b")]);
        match resolve(&reg, &artifacts).unwrap_err() {
            CodegenError::SelectorCollision { selector, first, second, .. } => {
                assert_eq!(selector, "0x8da5cb5b");
                assert_eq!(first, "FacetA");
                assert_eq!(second, "FacetB");
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn no_selector_appears_twice() {
        let reg = registry(
            r#"{"AccessControlFacet": {"ownedSelectors": ["pause()", "unpause()"]},
                "VaultFacet": {}, "SwapFacet": {}}"#,
        );
        let shared = [("pause()", "8456cb59"), ("unpause()", "3f4ba83a")];
        let artifacts = MemoryArtifacts::new()
            .with("AccessControlFacet", &shared)
            .with("VaultFacet", &[shared[0], shared[1], ("deposit(uint256)", "b6b55f25")])
            .with("SwapFacet", &[shared[0], ("swap(bytes)", "627dd56a")]);

        let resolved = resolve(&reg, &artifacts).unwrap();
        let mut all: Vec<Selector> = resolved
            .iter()
            .flat_map(|f| f.selectors.iter().map(|s| s.selector))
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(total, 4);
    }

    fn deployed(names: &[&str]) -> Vec<ResolvedFacet> {
        names
            .iter()
            .map(|n| ResolvedFacet {
                name: n.to_string(),
                field_name: naming::derive_field_name(n, DEFAULT_FACET_SUFFIX),
                selectors: Vec::new(),
                artifact_found: true,
            })
            .collect()
    }

    #[test]
    fn deployable_set_passes() {
        let facets = deployed(&["DiamondCutFacet", "AccessControlFacet", "DiamondLoupeFacet"]);
        assert!(check_deployable(&facets, &GeneratorSettings::default()).is_ok());
    }

    #[test]
    fn case_variants_mapping_to_one_field_are_rejected() {
        let facets = deployed(&["DiamondCutFacet", "ALMFacet", "AlmFacet"]);
        match check_deployable(&facets, &GeneratorSettings::default()).unwrap_err() {
            CodegenError::FieldNameClash { field, first, second } => {
                assert_eq!(field, "alm");
                assert_eq!(first, "ALMFacet");
                assert_eq!(second, "AlmFacet");
            }
            other => panic!("expected field clash, got {other:?}"),
        }
    }

    #[test]
    fn template_field_names_are_reserved() {
        let facets = deployed(&["DiamondCutFacet", "DiamondFacet"]);
        match check_deployable(&facets, &GeneratorSettings::default()).unwrap_err() {
            CodegenError::ReservedFieldName { field, facet } => {
                assert_eq!(field, "diamond");
                assert_eq!(facet, "DiamondFacet");
            }
            other => panic!("expected reserved field, got {other:?}"),
        }

        let settings = GeneratorSettings {
            reserved_fields: Vec::new(),
            ..GeneratorSettings::default()
        };
        assert!(check_deployable(&facets, &settings).is_ok());
    }

    #[test]
    fn cut_facet_must_be_deployed() {
        let settings = GeneratorSettings::default();
        assert!(matches!(
            check_deployable(&deployed(&["AccessControlFacet"]), &settings),
            Err(CodegenError::MissingCutFacet(name)) if name == "DiamondCutFacet"
        ));
        assert!(matches!(
            check_deployable(&[], &settings),
            Err(CodegenError::MissingCutFacet(_))
        ));
    }

    #[test]
    fn missing_required_artifact_is_warned() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let reg = registry(r#"{"DiamondCutFacet": {"required": true}, "OptionalFacet": {}}"#);
        let resolved = tracing::subscriber::with_default(subscriber, || {
            resolve(&reg, &MemoryArtifacts::new()).unwrap()
        });

        assert_eq!(resolved.len(), 1);
        let text = logs.text();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("WARN"));
        assert!(text.contains("DiamondCutFacet is required but has no artifact"));
        assert!(!text.contains("OptionalFacet"));
    }

    #[test]
    fn missing_owned_selector_is_warned() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let reg = registry(r#"{"FacetA": {"ownedSelectors": ["pause()"]}}"#);
        let artifacts = MemoryArtifacts::new().with("FacetA", &[("foo()", "deadbeef")]);
        tracing::subscriber::with_default(subscriber, || resolve(&reg, &artifacts).unwrap());

        assert!(logs.text().contains("FacetA owns pause() but its artifact does not define it"));
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
