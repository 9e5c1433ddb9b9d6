//! Session display names
//!
//! Names only need to be unique within one swarm so that log lines can be
//! correlated; they carry no other meaning.

use rand::Rng;
use std::collections::HashSet;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated names
pub const IDENTITY_LEN: usize = 8;

/// Generate one random alphanumeric name
pub fn random_identity<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..IDENTITY_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Hands out names that are never repeated
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    issued: HashSet<String>,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused name
    pub fn next_identity(&mut self) -> String {
        let mut rng = rand::thread_rng();
        self.next_with(&mut rng)
    }

    /// Next unused name drawn from `rng`
    pub fn next_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        loop {
            let candidate = random_identity(rng);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Number of names handed out so far
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_identity_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = random_identity(&mut rng);
        assert_eq!(name.len(), IDENTITY_LEN);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generator_never_repeats() {
        let mut generator = IdentityGenerator::new();
        let names: HashSet<String> = (0..2000).map(|_| generator.next_identity()).collect();
        assert_eq!(names.len(), 2000);
        assert_eq!(generator.issued(), 2000);
    }
}
