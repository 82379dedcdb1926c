//! Mixin key derivation.
//!
//! The permutation table is owned by the upstream service. If it changes,
//! every signature silently becomes invalid and signed calls start failing
//! with [`crate::WbiError::UpstreamRejected`].

/// Length of the derived mixin key.
pub const MIXIN_KEY_LEN: usize = 32;

/// Published permutation applied to `img_key + sub_key`.
pub const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

/// Shuffles a 64 character seed into the 32 character mixin key.
///
/// Indices past the end of a short seed are skipped, so a malformed seed
/// yields a shorter key instead of an error. The result is never padded.
pub fn derive_mixin_key(seed: &str) -> String {
    let chars: Vec<char> = seed.chars().collect();
    MIXIN_KEY_ENC_TAB
        .iter()
        .filter_map(|&i| chars.get(i))
        .take(MIXIN_KEY_LEN)
        .collect()
}
