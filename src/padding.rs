//! Data-plane length-shaping policy (spec §4.7).
//!
//! Obfuscates traffic-analysis fingerprints by rounding plaintext
//! packet lengths up to a small number of fixed buckets, at the cost
//! of some bandwidth overhead.

use crate::HE_MAX_MTU;

/// How a [`crate::connection::Connection`] pads outgoing data packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingPolicy {
    /// No padding: the wire length always equals the plaintext length.
    #[default]
    None,
    /// Every data packet is padded to [`HE_MAX_MTU`], IPsec style.
    Full,
    /// Pad to one of three fixed boundaries (450 / 900 / `HE_MAX_MTU`)
    /// chosen to balance obfuscation against bandwidth overhead.
    Boundary450,
}

/// Map a plaintext data length to the padded length that should
/// actually be sent on the wire, per `policy`.
///
/// Monotonic non-decreasing in `length` for every policy.
pub fn calculate_data_packet_length(policy: PaddingPolicy, length: usize) -> usize {
    match policy {
        PaddingPolicy::None => length,
        PaddingPolicy::Full => HE_MAX_MTU,
        PaddingPolicy::Boundary450 => {
            // Distribution observed in production traffic: the bulk of
            // packets are small, a long tail is near-MTU-sized.
            if length <= 450 {
                450
            } else if length <= 900 {
                900
            } else {
                HE_MAX_MTU
            }
        }
    }
}
