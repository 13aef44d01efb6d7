/// Shortest name the provider ever issued (legacy accounts)
pub const MIN_NAME_LENGTH: usize = 2;

pub const MAX_NAME_LENGTH: usize = 16;

/// Check a player name against the provider's charset and length rules.
///
/// Names failing this check can never exist upstream, so they are answered
/// without a network round-trip.
pub fn is_valid_name(name: &str) -> bool {
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.len())
        && name
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}
