//! Template Assembler — substitutes `{{ fragment_name }}` tokens.
//!
//! A token is `{{`, optional whitespace, a name made of ASCII letters,
//! digits and `_`, optional whitespace, `}}`. Nothing else in the template
//! is special. Substituted text is never rescanned.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::CodegenError;
use crate::synth::Fragments;

/// Replace every placeholder in `template` with its fragment.
///
/// A placeholder without a fragment is [`CodegenError::UnresolvedPlaceholder`].
/// Fragments the template never mentions are ignored.
pub fn assemble(template: &str, fragments: &Fragments) -> Result<String, CodegenError> {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some((start, end, name)) = find_placeholder(rest) {
        let code = fragments
            .get(name)
            .ok_or_else(|| CodegenError::UnresolvedPlaceholder(name.to_string()))?;
        out.push_str(&rest[..start]);
        out.push_str(code);
        rest = &rest[end..];
    }
    out.push_str(rest);

    let used: BTreeSet<&str> = placeholders(template).into_iter().collect();
    for name in fragments.names().filter(|n| !used.contains(n)) {
        debug!("fragment {} not used by template", name);
    }

    Ok(out)
}

/// Placeholder names in order of first appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = template;
    while let Some((_, end, name)) = find_placeholder(rest) {
        if !names.contains(&name) {
            names.push(name);
        }
        rest = &rest[end..];
    }
    names
}

/// Next placeholder in `text`: `(start, end, name)` byte offsets of the
/// whole token.
fn find_placeholder(text: &str) -> Option<(usize, usize, &str)> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find("{{") {
        let body = offset + pos + 2;
        let len = text[body..].find("}}")?;
        let name = text[body..body + len].trim();
        if is_fragment_name(name) {
            return Some((offset + pos, body + len + 2, name));
        }
        offset = body;
    }
    None
}

fn is_fragment_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frags(pairs: &[(&str, &str)]) -> Fragments {
        pairs.iter().copied().collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = assemble(
            "a {{ x }} b {{x}} c {{  y  }}",
            &frags(&[("x", "1"), ("y", "2")]),
        )
        .unwrap();
        assert_eq!(out, "a 1 b 1 c 2");
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let err = assemble("{{ facet_imports }}\n{{ unknown_fragment }}", &frags(&[("facet_imports", "")]))
            .unwrap_err();
        match err {
            CodegenError::UnresolvedPlaceholder(name) => assert_eq!(name, "unknown_fragment"),
            other => panic!("expected unresolved placeholder, got {other:?}"),
        }
    }

    #[test]
    fn unused_fragments_are_ignored() {
        let out = assemble("no tokens here", &frags(&[("facet_imports", "import")])).unwrap();
        assert_eq!(out, "no tokens here");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let out = assemble("{{ a }}", &frags(&[("a", "{{ b }}")])).unwrap();
        assert_eq!(out, "{{ b }}");
    }

    #[test]
    fn non_identifier_braces_are_literal() {
        let template = "struct S {{ uint a; }} {{}} {{ x }} {{ not a name }}";
        let out = assemble(template, &frags(&[("x", "X")])).unwrap();
        assert_eq!(out, "struct S {{ uint a; }} {{}} X {{ not a name }}");
    }

    #[test]
    fn solidity_braces_survive() {
        let template = "contract D {\n    function f() public {\n        {{ deploy_facets }}\n    }\n}\n";
        let out = assemble(template, &frags(&[("deploy_facets", "A _A = new A();")])).unwrap();
        assert_eq!(out, "contract D {\n    function f() public {\n        A _A = new A();\n    }\n}\n");
    }

    #[test]
    fn unterminated_token_is_literal() {
        let out = assemble("tail {{ x", &frags(&[("x", "X")])).unwrap();
        assert_eq!(out, "tail {{ x");
    }

    #[test]
    fn assembly_is_idempotent() {
        let template = "{{ a }}-{{ b }}";
        let f = frags(&[("a", "1"), ("b", "2")]);
        assert_eq!(assemble(template, &f).unwrap(), assemble(template, &f).unwrap());
    }

    #[test]
    fn placeholders_listed_once_in_order() {
        assert_eq!(
            placeholders("{{ b }} {{ a }} {{b}} {{ not valid! }}"),
            vec!["b", "a"]
        );
    }
}
