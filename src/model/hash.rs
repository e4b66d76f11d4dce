use std::fmt;

use sha2::{Digest, Sha256};

/// Hash algorithms named by the host contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha2256,
    Sha2384,
    Sha2512,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha2256 => "sha2-256",
            HashAlgorithm::Sha2384 => "sha2-384",
            HashAlgorithm::Sha2512 => "sha2-512",
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha2256 => 32,
            HashAlgorithm::Sha2384 => 48,
            HashAlgorithm::Sha2512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
