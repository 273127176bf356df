//! Code Synthesizer — Solidity fragments for the deployer template.
//!
//! Each fragment is produced by its own pure function of the resolved
//! facets (plus registry and settings), so fragments can be generated and
//! tested independently. Facet order is always the resolved order.
//!
//! Multi-line fragments leave the first line unindented (the template
//! places it) and indent continuation lines for their slot: contract
//! members by 4 spaces, statements and struct fields by 8, struct-literal
//! fields by 12.

use std::collections::BTreeMap;

use crate::naming;
use crate::registry::FacetRegistry;
use crate::resolver::ResolvedFacet;
use crate::settings::GeneratorSettings;

/// Fragment names, i.e. the `{{ name }}` tokens a template may use.
pub mod fragment {
    pub const FACET_IMPORTS: &str = "facet_imports";
    pub const FACET_INITIALIZATIONS: &str = "facet_initializations";
    pub const DEPLOYMENT_ADDRESSES_FIELDS: &str = "deployment_addresses_fields";
    pub const SALTS_FIELDS: &str = "salts_fields";
    pub const SALTS_RETURN_FIELDS: &str = "salts_return_fields";
    pub const SELECTOR_FUNCTIONS: &str = "selector_functions";
    pub const GET_SELECTORS_FOR_FACET_CONDITIONS: &str = "get_selectors_for_facet_conditions";
    pub const DEPLOY_FACETS: &str = "deploy_facets";
    pub const FACET_CUTS: &str = "facet_cuts";
    pub const DIAMOND_CREATION: &str = "diamond_creation";
    pub const DEPLOYMENT_RETURN: &str = "deployment_return";
    pub const DETERMINISTIC_RETURN_FIELDS: &str = "deterministic_return_fields";
    pub const DETERMINISTIC_ADDRESSES_RETURN_FIELDS: &str = "deterministic_addresses_return_fields";
}

const MEMBER_INDENT: &str = "    ";
const STATEMENT_INDENT: &str = "        ";
const FIELD_INDENT: &str = "            ";

/// Named source fragments, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    map: BTreeMap<String, String>,
}

impl Fragments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, code: impl Into<String>) {
        self.map.insert(name.into(), code.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fragments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fragments = Fragments::new();
        for (k, v) in iter {
            fragments.insert(k, v);
        }
        fragments
    }
}

/// Generate every fragment.
pub fn synthesize(facets: &[ResolvedFacet], registry: &FacetRegistry, settings: &GeneratorSettings) -> Fragments {
    let deterministic = deterministic_return_fields(facets, registry);

    let mut out = Fragments::new();
    out.insert(fragment::FACET_IMPORTS, facet_imports(facets, settings));
    out.insert(fragment::FACET_INITIALIZATIONS, facet_initializations(facets, registry, settings));
    out.insert(fragment::DEPLOYMENT_ADDRESSES_FIELDS, deployment_addresses_fields(facets));
    out.insert(fragment::SALTS_FIELDS, salts_fields(facets));
    out.insert(fragment::SALTS_RETURN_FIELDS, salts_return_fields(facets, registry));
    out.insert(fragment::SELECTOR_FUNCTIONS, selector_functions(facets));
    out.insert(fragment::GET_SELECTORS_FOR_FACET_CONDITIONS, get_selectors_for_facet_conditions(facets));
    out.insert(fragment::DEPLOY_FACETS, deploy_facets(facets));
    out.insert(fragment::FACET_CUTS, facet_cuts(facets, settings));
    out.insert(fragment::DIAMOND_CREATION, diamond_creation(facets, settings));
    out.insert(fragment::DEPLOYMENT_RETURN, deployment_return(facets));
    out.insert(fragment::DETERMINISTIC_ADDRESSES_RETURN_FIELDS, deterministic.clone());
    out.insert(fragment::DETERMINISTIC_RETURN_FIELDS, deterministic);
    out
}

/// `import {F} from "@facets/F.sol";` per facet.
pub fn facet_imports(facets: &[ResolvedFacet], settings: &GeneratorSettings) -> String {
    facets
        .iter()
        .map(|f| format!("import {{{}}} from \"{}{}.sol\";", f.name, settings.import_prefix, f.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn deployment_addresses_fields(facets: &[ResolvedFacet]) -> String {
    join_indented(facets.iter().map(|f| format!("address {};", f.field_name)), STATEMENT_INDENT)
}

pub fn salts_fields(facets: &[ResolvedFacet]) -> String {
    join_indented(facets.iter().map(|f| format!("bytes32 {};", f.field_name)), STATEMENT_INDENT)
}

/// One `internal pure` accessor per facet returning its selector array.
pub fn selector_functions(facets: &[ResolvedFacet]) -> String {
    let mut lines = Vec::new();

    for (i, facet) in facets.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!(
            "function {}() internal pure returns (bytes4[] memory) {{",
            naming::accessor_name(&facet.name)
        ));
        if facet.is_missing_artifact() {
            lines.push(format!("    // no artifact found for {}", facet.name));
        }
        lines.push(format!(
            "    bytes4[] memory selectors = new bytes4[]({});",
            facet.selectors.len()
        ));
        for (j, sel) in facet.selectors.iter().enumerate() {
            lines.push(format!("    selectors[{}] = {}; // {}", j, sel.selector, sel.signature));
        }
        lines.push("    return selectors;".to_string());
        lines.push("}".to_string());
    }

    join_indented(lines, MEMBER_INDENT)
}

pub fn get_selectors_for_facet_conditions(facets: &[ResolvedFacet]) -> String {
    join_indented(
        facets.iter().map(|f| {
            format!(
                "if (nameHash == keccak256(bytes(\"{}\"))) return {}();",
                f.name,
                naming::accessor_name(&f.name)
            )
        }),
        STATEMENT_INDENT,
    )
}

/// `F _F = new F();` per facet.
pub fn deploy_facets(facets: &[ResolvedFacet]) -> String {
    join_indented(
        facets
            .iter()
            .map(|f| format!("{} {} = new {}();", f.name, naming::instance_name(&f.name), f.name)),
        STATEMENT_INDENT,
    )
}

/// The cut array. The cut facet is registered through the proxy
/// constructor, so it is left out of its own cut (matched by name).
pub fn facet_cuts(facets: &[ResolvedFacet], settings: &GeneratorSettings) -> String {
    let cut: Vec<&ResolvedFacet> = facets.iter().filter(|f| f.name != settings.cut_facet).collect();

    let mut lines = vec![format!(
        "IDiamondCut.FacetCut[] memory cuts = new IDiamondCut.FacetCut[]({});",
        cut.len()
    )];
    for (i, facet) in cut.iter().enumerate() {
        lines.push(format!(
            "cuts[{}] = IDiamondCut.FacetCut({{facetAddress: address({}), action: IDiamondCut.FacetCutAction.Add, functionSelectors: {}()}});",
            i,
            naming::instance_name(&facet.name),
            naming::accessor_name(&facet.name)
        ));
    }

    join_indented(lines, STATEMENT_INDENT)
}

/// Proxy construction, present only when the cut facet is deployed.
pub fn diamond_creation(facets: &[ResolvedFacet], settings: &GeneratorSettings) -> String {
    if !facets.iter().any(|f| f.name == settings.cut_facet) {
        return String::new();
    }

    let mut args = settings.diamond_constructor_args.clone();
    args.push(format!("address({})", naming::instance_name(&settings.cut_facet)));

    format!(
        "{} diamond = new {}({});",
        settings.diamond_contract,
        settings.diamond_contract,
        args.join(", ")
    )
}

/// Selector capture and guarded call for each initializable facet not
/// already initialized by the proxy constructor.
///
/// A failed call is captured in `successN` and otherwise ignored; deciding
/// whether that should abort is left to the deploying caller.
pub fn facet_initializations(
    facets: &[ResolvedFacet],
    registry: &FacetRegistry,
    settings: &GeneratorSettings,
) -> String {
    let mut lines = Vec::new();

    for (i, facet) in facets.iter().enumerate() {
        let name = facet.name.as_str();
        if !registry.is_initializable(name) || settings.is_constructor_initialized(name) {
            continue;
        }

        let selector_var = format!("init{}Selector", name);
        let target = if registry.is_payable(name) {
            "payable(address(this))"
        } else {
            "address(this)"
        };
        let index = i + 1;

        lines.push(format!(
            "bytes4 {} = {}.{}.selector;",
            selector_var,
            name,
            naming::init_function_name(name, &settings.facet_suffix)
        ));
        lines.push(format!(
            "(bool success{},) = {}.call(abi.encodePacked({}));",
            index, target, selector_var
        ));
        lines.push(format!("if (!success{}) {{}}", index));
    }

    join_indented(lines, STATEMENT_INDENT)
}

/// Address and name arrays returned by the deployer.
pub fn deployment_return(facets: &[ResolvedFacet]) -> String {
    let n = facets.len();
    let mut lines = vec![format!("address[] memory facets = new address[]({});", n)];
    for (i, f) in facets.iter().enumerate() {
        lines.push(format!("facets[{}] = address({});", i, naming::instance_name(&f.name)));
    }
    lines.push(format!("string[] memory facetNames = new string[]({});", n));
    for (i, f) in facets.iter().enumerate() {
        lines.push(format!("facetNames[{}] = \"{}\";", i, f.name));
    }
    join_indented(lines, STATEMENT_INDENT)
}

/// `field: <address>` entries of the deterministic-address struct literal.
/// Uses the configured `expectedAddress`, `address(0)` otherwise.
pub fn deterministic_return_fields(facets: &[ResolvedFacet], registry: &FacetRegistry) -> String {
    let last = facets.len().saturating_sub(1);
    join_indented(
        facets.iter().enumerate().map(|(i, f)| {
            let address = registry
                .get(&f.name)
                .and_then(|c| c.expected_address.as_deref())
                .unwrap_or("address(0)");
            let sep = if i < last { "," } else { "" };
            format!("{}: {}{}", f.field_name, address, sep)
        }),
        FIELD_INDENT,
    )
}

/// `field: <bytes32>` entries of the salts struct literal, from each
/// facet's configured `salt`.
///
/// A hex salt is taken as a number (`0x01` -> `bytes32(uint256(0x01))`),
/// any other string is hashed, and no salt is `bytes32(0)`.
pub fn salts_return_fields(facets: &[ResolvedFacet], registry: &FacetRegistry) -> String {
    let last = facets.len().saturating_sub(1);
    join_indented(
        facets.iter().enumerate().map(|(i, f)| {
            let salt = registry
                .get(&f.name)
                .and_then(|c| c.salt.as_deref())
                .map(salt_expression)
                .unwrap_or_else(|| "bytes32(0)".to_string());
            let sep = if i < last { "," } else { "" };
            format!("{}: {}{}", f.field_name, salt, sep)
        }),
        FIELD_INDENT,
    )
}

fn salt_expression(salt: &str) -> String {
    let is_hex = salt
        .strip_prefix("0x")
        .is_some_and(|d| !d.is_empty() && d.len() <= 64 && d.bytes().all(|b| b.is_ascii_hexdigit()));
    if is_hex {
        format!("bytes32(uint256({}))", salt)
    } else {
        format!("keccak256(bytes(\"{}\"))", salt.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Join lines with newlines, indenting every line after the first.
/// Empty lines stay empty.
fn join_indented<I>(lines: I, indent: &str) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(&line);
    }
    out
}
