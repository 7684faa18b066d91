use std::fmt;

use rand::Rng;

pub const ID_LEN: usize = 6;

/// Lowercase alphanumerics, minus the characters that are easy to misread
const ID_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyz";

/// Short identifier shared by events and threads.
///
/// Ids are drawn at random with no collision check against existing records.
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> RecordId {
        RecordId(
            (0..ID_LEN)
                .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
                .collect(),
        )
    }

    pub fn random() -> RecordId {
        Self::generate(&mut rand::thread_rng())
    }

    /// Whether `s` has the shape of a generated id
    pub fn is_well_formed(s: &str) -> bool {
        s.len() == ID_LEN
            && s.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> RecordId {
        RecordId(String::from(s))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn generated_ids_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let id = RecordId::generate(&mut rng);
            assert!(RecordId::is_well_formed(id.as_str()), "bad id {id}");
            assert!(!id.0.contains(['0', '1', 'l', 'o']), "unreadable id {id}");
        }
    }

    #[test]
    fn well_formedness() {
        assert!(RecordId::is_well_formed("abc234"));
        assert!(!RecordId::is_well_formed("ABC234"));
        assert!(!RecordId::is_well_formed("abc23"));
        assert!(!RecordId::is_well_formed("abc-34"));
    }

    #[test]
    fn serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_string(&RecordId::from("xyz789")).unwrap(),
            r#""xyz789""#
        );
    }
}
