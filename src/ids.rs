// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identifier helpers: server-assigned document ids, random tokens, and the
//! reversible member id obfuscation used in shareable URLs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

const DOCUMENT_ID_LEN: usize = 20;
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
// Largest multiple of the alphabet size that fits in a byte; bytes above it
// are rejected so every character is equally likely.
const ID_REJECT_ABOVE: u8 = (256 / ID_ALPHABET.len() * ID_ALPHABET.len()) as u8;

/// Fill `len` bytes from the system CSPRNG.
pub fn random_bytes(len: usize) -> anyhow::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| anyhow::anyhow!("system RNG failure"))?;
    Ok(buf)
}

/// Random lowercase hex string encoding `byte_len` random bytes.
pub fn random_hex(byte_len: usize) -> anyhow::Result<String> {
    Ok(hex::encode(random_bytes(byte_len)?))
}

/// Generate a 20-character alphanumeric document id.
pub fn new_document_id() -> anyhow::Result<String> {
    let mut id = String::with_capacity(DOCUMENT_ID_LEN);
    while id.len() < DOCUMENT_ID_LEN {
        for byte in random_bytes(DOCUMENT_ID_LEN * 2)? {
            if byte >= ID_REJECT_ABOVE {
                continue;
            }
            id.push(ID_ALPHABET[byte as usize % ID_ALPHABET.len()] as char);
            if id.len() == DOCUMENT_ID_LEN {
                break;
            }
        }
    }
    Ok(id)
}

/// Encode an id as URL-safe base64 without padding.
pub fn obfuscate_id(id: &str) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Reverse [`obfuscate_id`].
///
/// Input that is not valid obfuscated text is returned unchanged, since it
/// may already be a raw id.
pub fn deobfuscate_id(obfuscated: &str) -> String {
    let trimmed = obfuscated.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|decoded| !decoded.is_empty())
        .unwrap_or_else(|| obfuscated.to_string())
}
