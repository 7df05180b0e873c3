//! Renegotiation controller (spec §4.5).
//!
//! Chooses between TLS secure renegotiation and a stream-only key
//! update to refresh keying material, depending on peer capability and
//! transport mode.

use crate::callbacks::ConnectionCallbacks;
use crate::connection::{Connection, State};
use crate::error::HeliumError;
use crate::event::Event;
use crate::tls::TlsProgress;
use crate::TransportMode;

impl Connection {
    /// Defer a renegotiation: sets a flag the external dispatcher is
    /// expected to notice and act on by calling [`Self::renegotiate_ssl`]
    /// on its next processing cycle.
    pub fn schedule_renegotiation(&mut self) {
        self.renegotiation_due = true;
    }

    /// Drive a previously scheduled renegotiation.
    pub fn renegotiate_ssl(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        self.renegotiation_due = false;

        if self.renegotiation_in_progress || self.state != State::Online {
            return Ok(());
        }

        let tls = self.tls.as_deref_mut().ok_or(HeliumError::NeverConnected)?;
        let progress = if tls.supports_secure_renegotiation() {
            let progress = tls.rehandshake();
            self.renegotiation_in_progress = true;
            cb.event(Event::SecureRenegotiationStarted);
            progress
        } else if self.transport_mode == TransportMode::Stream {
            tls.update_keys()
        } else {
            // Peer supports neither secure renegotiation nor are we on
            // a stream transport where key update applies: nothing to
            // do.
            return Ok(());
        };

        match progress {
            Ok(TlsProgress::WantRead)
            | Ok(TlsProgress::WantWrite)
            | Ok(TlsProgress::AppDataReady)
            | Ok(TlsProgress::Complete) => {
                self.update_timeout(cb);
                Ok(())
            }
            Err(_) => Err(HeliumError::SslError),
        }
    }
}
