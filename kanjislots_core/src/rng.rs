use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

// Provably-fair draw stream:
// HMAC-SHA256(key = server_seed, msg = "client_seed:nonce") gives the first
// 32 bytes, every further block is the SHA-256 of the previous one.

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

/// Deterministic random source for one spin. Publishing
/// `server_seed_hash_hex` before play and the seed afterwards lets a player
/// recompute every board.
#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret
    pub client_seed: String,
    pub nonce: u64,
    block: [u8; 32],
    cursor: usize,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let server_seed = server_seed.into();
        let client_seed = client_seed.into();
        let block = hmac_block(&server_seed, &client_seed, nonce);
        Self {
            server_seed,
            client_seed,
            nonce,
            block,
            cursor: 0,
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    /// First block of the stream.
    pub fn hmac_bytes(&self) -> [u8; 32] {
        hmac_block(&self.server_seed, &self.client_seed, self.nonce)
    }

    fn next_byte(&mut self) -> u8 {
        if self.cursor == self.block.len() {
            self.block = Sha256::digest(self.block).into();
            self.cursor = 0;
        }
        let b = self.block[self.cursor];
        self.cursor += 1;
        b
    }
}

fn hmac_block(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(server_seed.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(format!("{client_seed}:{nonce}").as_bytes());
    mac.finalize().into_bytes().into()
}

impl RngCore for ProvablyFairRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for b in dest.iter_mut() {
            *b = self.next_byte();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_determinism() {
        let mut rng1 = ProvablyFairRng::new("server", "client", 1);
        let mut rng2 = ProvablyFairRng::new("server", "client", 1);
        assert_eq!(rng1.server_seed_hash_hex(), rng2.server_seed_hash_hex());
        assert_eq!(rng1.hmac_bytes(), rng2.hmac_bytes());
        let a: Vec<u32> = (0..40).map(|_| rng1.gen_range(0..51)).collect();
        let b: Vec<u32> = (0..40).map(|_| rng2.gen_range(0..51)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stream_starts_with_hmac_and_extends() {
        let mut rng = ProvablyFairRng::new("server", "client", 7);
        let first = rng.hmac_bytes();
        let mut head = [0u8; 32];
        rng.fill_bytes(&mut head);
        assert_eq!(head, first);
        let mut next = [0u8; 32];
        rng.fill_bytes(&mut next);
        let expected: [u8; 32] = Sha256::digest(first).into();
        assert_eq!(next, expected);
    }

    #[test]
    fn test_nonce_changes_stream() {
        let a = ProvablyFairRng::new("server", "client", 1).hmac_bytes();
        let b = ProvablyFairRng::new("server", "client", 2).hmac_bytes();
        assert_ne!(a, b);
        assert_eq!(derive_hash_hex(b"server").len(), 64);
    }
}
