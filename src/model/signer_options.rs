use super::HashAlgorithm;

/// Padding scheme for RSA signatures produced on the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsaPadding {
    /// PSS with a salt as long as the digest
    #[default]
    Pss,
    Pkcs1v15,
}

/// Options handed to the token with every signing request
///
/// The provider never hashes before signing; `digest` only tells the token
/// which digest the caller-supplied data is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignerOptions {
    pub digest: Option<HashAlgorithm>,
    pub rsa_padding: RsaPadding,
}

impl SignerOptions {
    /// Digest the token should assume, SHA-256 unless configured otherwise
    pub fn digest_or_default(&self) -> HashAlgorithm {
        self.digest.unwrap_or(HashAlgorithm::Sha2256)
    }
}
