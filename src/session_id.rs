//! Session-id generation and rotation (spec §4.6).
//!
//! Session ids are opaque 64-bit identifiers used for connection
//! roaming: a server generates one at connect time, may later prepare
//! a `pending` replacement, and promotes it to current only once the
//! peer has acknowledged it (the acknowledgment flow lives in the
//! outer dispatcher, out of scope here).

use crate::connection::Connection;
use crate::error::HeliumError;
use crate::rng::ConnectionRng;

/// Fill a fresh 64-bit session id from `rng`.
pub fn generate_session_id(rng: &mut dyn ConnectionRng) -> Result<u64, HeliumError> {
    let mut bytes = [0u8; 8];
    rng.fill(&mut bytes).map_err(|_| HeliumError::RngFailure)?;
    Ok(u64::from_ne_bytes(bytes))
}

impl Connection {
    /// Server only: prepare a new session id as `pending_session_id`,
    /// to be promoted to `session_id` once the peer acknowledges it
    /// (that acknowledgment flow lives outside this crate). Refuses on
    /// a client, or if a rotation is already outstanding.
    pub fn rotate_session_id(&mut self) -> Result<u64, HeliumError> {
        if !self.is_server {
            return Err(HeliumError::InvalidClientState);
        }
        if self.pending_session_id != 0 {
            return Err(HeliumError::InvalidClientState);
        }
        let rng = self.rng.clone().ok_or(HeliumError::RngFailure)?;
        let id = generate_session_id(&mut *rng.borrow_mut())?;
        self.pending_session_id = id;
        Ok(id)
    }
}
