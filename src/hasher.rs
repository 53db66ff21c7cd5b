//! Identity Hasher
//!
//! Maps an email-like string to the opaque token used in avatar URLs.

use md5::{Digest, Md5};

/// Length of every token produced by [`avatar_hash`].
pub const TOKEN_LENGTH: usize = 32;

/// Hashes `input` into a lowercase hexadecimal MD5 digest.
///
/// Real emails and salted fallbacks go through the same function, so the
/// token format never reveals which one was used.
pub fn avatar_hash(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
