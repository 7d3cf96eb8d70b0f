//! Disambiguation suffix appended to every resource name of a run.
//!
//! Storage account names are the strictest consumer: 3-24 characters, lowercase
//! letters and digits only. A suffix therefore uses the same alphabet and
//! starts with a letter so it can also stand alone as a name.

use crate::errors::{ProvisionError, ProvisionResult};
use rand::Rng;

pub const DEFAULT_SUFFIX_LENGTH: usize = 6;
pub const MAX_SUFFIX_LENGTH: usize = 12;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Suffix(String);

impl Suffix {
    pub fn generate(length: usize) -> ProvisionResult<Self> {
        Self::generate_with(&mut rand::thread_rng(), length)
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> ProvisionResult<Self> {
        if length == 0 || length > MAX_SUFFIX_LENGTH {
            return Err(ProvisionError::InvalidSuffix {
                value: format!("<{length} characters>"),
                reason: format!("length must be between 1 and {MAX_SUFFIX_LENGTH}"),
            });
        }

        let mut value = String::with_capacity(length);
        value.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
        for _ in 1..length {
            value.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
        }
        Ok(Self(value))
    }

    /// Validates a suffix supplied by the user.
    pub fn parse(value: &str) -> ProvisionResult<Self> {
        let invalid = |reason: &str| ProvisionError::InvalidSuffix {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.is_empty() || value.len() > MAX_SUFFIX_LENGTH {
            return Err(invalid(&format!(
                "length must be between 1 and {MAX_SUFFIX_LENGTH}"
            )));
        }
        if !value.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(invalid("only lowercase letters and digits are allowed"));
        }
        if !value.as_bytes()[0].is_ascii_lowercase() {
            return Err(invalid("must start with a letter"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Suffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_suffix_is_deterministic_for_seed() {
        let a = Suffix::generate_with(&mut StdRng::seed_from_u64(7), 6).unwrap();
        let b = Suffix::generate_with(&mut StdRng::seed_from_u64(7), 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_lengths_are_rejected() {
        assert!(Suffix::generate(0).is_err());
        assert!(Suffix::generate(MAX_SUFFIX_LENGTH + 1).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Suffix::parse("").is_err());
        assert!(Suffix::parse("Abc").is_err());
        assert!(Suffix::parse("1abc").is_err());
        assert!(Suffix::parse("ab-c").is_err());
        assert_eq!(Suffix::parse("dev01").unwrap().as_str(), "dev01");
    }

    proptest! {
        #[test]
        fn test_generated_suffix_always_parses(seed in any::<u64>(), length in 1usize..=MAX_SUFFIX_LENGTH) {
            let suffix = Suffix::generate_with(&mut StdRng::seed_from_u64(seed), length).unwrap();
            prop_assert_eq!(suffix.as_str().len(), length);
            prop_assert_eq!(Suffix::parse(suffix.as_str()).unwrap(), suffix);
        }
    }
}
