//! Key derivation utilities.

use wordbank_core::UserId;

/// Mixed into every registration lock key so it cannot collide with advisory locks taken
/// by other subsystems for the same user.
const REGISTRATION_LOCK_NAMESPACE: u64 = 0x776f_7264_6261_6e6b;

/// Derive the advisory lock key that serializes registrations for a user.
///
/// The 128-bit UUID is folded to the 64-bit key space of `pg_advisory_xact_lock`. Two
/// users may share a key; that only makes them wait on each other.
#[must_use]
pub fn user_lock_key(user_id: &UserId) -> i64 {
    let (hi, lo) = user_id.as_uuid().as_u64_pair();
    i64::from_ne_bytes((hi ^ lo ^ REGISTRATION_LOCK_NAMESPACE).to_ne_bytes())
}
