//! 4-byte function selectors.

use std::fmt;

use keccak_const::Keccak256;

/// A function selector: the first four bytes of keccak-256 of the
/// canonical signature.
///
/// Artifacts spell selectors as bare hex (`"8456cb59"`) or with a prefix
/// (`"0x8456CB59"`); both parse to the same value and always print as
/// `0x` followed by eight lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector([u8; 4]);

impl Selector {
    /// Parse a hex selector, with or without a `0x` prefix.
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex
            .trim()
            .strip_prefix("0x")
            .or_else(|| hex.trim().strip_prefix("0X"))
            .unwrap_or(hex.trim());
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Selector(value.to_be_bytes()))
    }

    /// Compute the selector of a canonical signature such as
    /// `transfer(address,uint256)`.
    pub fn from_signature(signature: &str) -> Self {
        let hash = Keccak256::new().update(signature.as_bytes()).finalize();
        Selector([hash[0], hash[1], hash[2], hash[3]])
    }

    pub fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", u32::from_be_bytes(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_prefix_and_case() {
        let bare = Selector::parse("8456cb59").unwrap();
        let prefixed = Selector::parse("0x8456CB59").unwrap();
        let upper_prefix = Selector::parse("0X8456cb59").unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!(bare, upper_prefix);
        assert_eq!(bare.to_string(), "0x8456cb59");
    }

    #[test]
    fn parse_keeps_leading_zeros() {
        let sel = Selector::parse("00000001").unwrap();
        assert_eq!(sel.to_string(), "0x00000001");
        assert_eq!(sel.bytes(), [0, 0, 0, 1]);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("0x").is_none());
        assert!(Selector::parse("abc123").is_none());
        assert!(Selector::parse("8456cb5900").is_none());
        assert!(Selector::parse("zzzzzzzz").is_none());
        assert!(Selector::parse("+456cb59").is_none());
    }

    #[test]
    fn from_signature_matches_known_selectors() {
        assert_eq!(Selector::from_signature("pause()").to_string(), "0x8456cb59");
        assert_eq!(
            Selector::from_signature("transfer(address,uint256)").to_string(),
            "0xa9059cbb"
        );
        assert_eq!(
            Selector::from_signature("balanceOf(address)").to_string(),
            "0x70a08231"
        );
    }
}
