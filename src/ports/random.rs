use crate::error::HsmResult;

/// Capability to produce random bytes
pub trait RandomSource: Send + Sync {
    /// Fill `buf` with random bytes, returning how many were written
    fn read(&self, buf: &mut [u8]) -> HsmResult<usize>;
}
