//! Credentials for the iFunny REST API
//!
//! Password grants are authorised with a Basic token derived from the app's
//! client id and secret; everything after login uses the returned Bearer
//! token.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use sha1::{Digest, Sha1};

/// Random bytes in the Basic token nonce
const NONCE_BYTES: usize = 36;

/// Generate a Basic token for the password grant
///
/// `base64("{NONCE}_{client_id}:" + sha1_hex("{NONCE}:{client_id}:{client_secret}"))`
/// where `NONCE` is 36 random bytes, hex encoded upper-case.
pub fn generate_basic_token(client_id: &str, client_secret: &str) -> String {
    let mut nonce = [0u8; NONCE_BYTES];
    rand::thread_rng().fill(&mut nonce[..]);

    basic_token_with_nonce(&hex::encode_upper(nonce), client_id, client_secret)
}

fn basic_token_with_nonce(nonce: &str, client_id: &str, client_secret: &str) -> String {
    let digest = Sha1::digest(format!("{}:{}:{}", nonce, client_id, client_secret).as_bytes());
    let plain = format!("{}_{}:{}", nonce, client_id, hex::encode(digest));

    STANDARD.encode(plain)
}

pub fn basic_header(token: &str) -> String {
    format!("Basic {}", token)
}

pub fn bearer_header(token: &str) -> String {
    format!("Bearer {}", token)
}
