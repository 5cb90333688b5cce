use sha2::{Digest, Sha256};

pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content key for an uploaded page photo. Identical files get identical keys.
pub fn page_hash(data: &[u8]) -> String {
    to_hex(&sha256_bytes(data))
}
