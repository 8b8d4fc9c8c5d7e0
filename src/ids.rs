use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Number of random bytes behind a peer identifier or delete token (128 bits).
const TOKEN_BYTES: usize = 16;

fn random_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Mints a fresh, unguessable peer identifier. One per join/create act.
pub fn new_peer_id() -> String {
    random_token()
}

/// Mints a fresh, unguessable room delete token. Disclosed once, to the creator.
pub fn new_delete_token() -> String {
    random_token()
}
