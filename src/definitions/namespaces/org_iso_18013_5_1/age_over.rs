//! `age_over_NN` attestations of the org.iso.18013.5.1 namespace.

const PREFIX: &str = "age_over_";

/// Largest age scanned for when reading `age_over_NN` elements back.
pub const MAX_AGE: u8 = 150;

/// Element identifier attesting an age of at least `age` years.
pub fn identifier(age: u64) -> String {
    format!("{PREFIX}{age}")
}

/// The age attested by an `age_over_NN` identifier.
pub fn parse(identifier: &str) -> Option<u8> {
    let digits = identifier.strip_prefix(PREFIX)?;
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|age| *age <= MAX_AGE)
}
