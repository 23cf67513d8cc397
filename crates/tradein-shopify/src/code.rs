use rand::Rng;

/// Characters used in generated codes; omits `0`, `1`, `I` and `O`.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_SUFFIX_LEN: usize = 8;

/// Generates a discount code of the form `{prefix}-XXXXXXXX`.
#[must_use]
pub fn generate_discount_code(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect();

    if prefix.is_empty() {
        suffix
    } else {
        format!("{prefix}-{suffix}")
    }
}
