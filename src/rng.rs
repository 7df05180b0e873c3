//! RNG handle shared by reference with the owning context.
//!
//! The original C library consumes the TLS engine's own RNG instance
//! directly. Here that dependency is expressed as a trait so the
//! connection never assumes a concrete crypto backend; `ssl_ctx.rs`
//! (the context side, out of scope for this crate) owns the real RNG
//! and hands the connection a shared reference to it.

use rand_core::RngCore;

/// The RNG surface a connection needs: fill a buffer with randomness,
/// failing only if the underlying source is exhausted or unavailable.
pub trait ConnectionRng {
    /// Fill `dest` with random bytes. Returns `Err(())` on RNG failure;
    /// the caller maps this to [`crate::error::HeliumError::RngFailure`].
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), ()>;
}

/// Blanket impl so any `rand_core::RngCore` (e.g. `rand::rngs::StdRng`,
/// `rand::rngs::OsRng`) can be used as a [`ConnectionRng`] without a
/// wrapper type.
impl<R: RngCore> ConnectionRng for R {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), ()> {
        self.try_fill_bytes(dest).map_err(|_| ())
    }
}
