//! Short codes — the 6-letter public identifier printed on manifests
//! and embedded in receive URLs.

use rand::Rng;

use shiptrack_core::ServiceError;

/// Short code length in characters.
pub const CODE_LEN: usize = 6;

/// Draw a candidate code: `CODE_LEN` characters uniform over A–Z.
///
/// Uniqueness is NOT checked here. The caller inserts the candidate
/// under the store's unique constraint and retries on collision; the
/// 26^6 space makes collisions rare enough that bounded retry wins
/// over any check-then-insert scheme, which would itself race.
pub fn generate(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| (b'A' + rng.gen_range(0..26u8)) as char)
        .collect()
}

/// Normalize and validate a caller-supplied short code.
///
/// Lookups are case-insensitive (scanned codes arrive in either case),
/// so the code is uppercased first. Anything that is not exactly
/// `CODE_LEN` ASCII letters is rejected before the store or the state
/// machine is ever consulted.
pub fn normalize(raw: &str) -> Result<String, ServiceError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != CODE_LEN || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ServiceError::Validation(format!(
            "invalid short code '{}': expected {} ASCII letters",
            raw.trim(),
            CODE_LEN
        )));
    }
    Ok(code)
}
