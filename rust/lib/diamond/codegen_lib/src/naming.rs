//! Name derivations shared by the registry and the synthesizer.
//!
//! Facet names are CamelCase contract names that conventionally end in
//! `Facet` (`AccessControlFacet`, `DEXAdapterFacet`). Everything emitted
//! into generated code is derived from that name through the functions
//! here, so the rules live in one place.

/// Conventional suffix of every facet contract name.
pub const DEFAULT_FACET_SUFFIX: &str = "Facet";

/// Remove `suffix` from the end of `name`.
///
/// A name that *is* the suffix (or does not end with it) is returned
/// unchanged.
pub fn strip_facet_suffix<'a>(name: &'a str, suffix: &str) -> &'a str {
    match name.strip_suffix(suffix) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Struct field identifier for a facet: suffix stripped, CamelCase split
/// into lowercase words joined by `_`.
///
/// Acronyms stay together (`DEXAdapterFacet` -> `dex_adapter`) and digits
/// stick to the preceding word (`ERC1155Facet` -> `erc1155`).
pub fn derive_field_name(name: &str, suffix: &str) -> String {
    to_snake_case(strip_facet_suffix(name, suffix))
}

/// Name of the facet's post-deployment initializer, e.g.
/// `OracleFacet` -> `initializeOracle`.
pub fn init_function_name(name: &str, suffix: &str) -> String {
    format!("initialize{}", strip_facet_suffix(name, suffix))
}

/// Name of the generated selector accessor for a facet.
pub fn accessor_name(name: &str) -> String {
    format!("get{}Selectors", name)
}

/// Local variable holding the deployed facet instance.
pub fn instance_name(name: &str) -> String {
    format!("_{}", name)
}

fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            // word boundary: "aB", "1B", or the last capital of an acronym ("XAd")
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }

    result
}
