//! Timer/nudge subsystem (spec §4.4).
//!
//! Drives DTLS retransmission and renegotiation timeouts from an
//! external scheduler. Nothing here blocks or sleeps: the host decides
//! when a deadline has elapsed and calls [`Connection::nudge`].

use slog::{trace, warn};

use crate::callbacks::ConnectionCallbacks;
use crate::connection::{Connection, State};
use crate::error::HeliumError;
use crate::tls::TlsProgress;
use crate::{RENEGOTIATION_TIMEOUT_MULTIPLIER, TIMEOUT_MULTIPLIER};

impl Connection {
    /// Re-read the TLS engine's retransmit timeout and, if a deadline
    /// needs to be communicated and none is currently outstanding, fire
    /// `nudge_time` exactly once.
    pub fn update_timeout(&mut self, cb: &mut dyn ConnectionCallbacks) {
        if self.state == State::Online && !self.renegotiation_in_progress {
            return;
        }

        let multiplier = if self.renegotiation_in_progress {
            RENEGOTIATION_TIMEOUT_MULTIPLIER
        } else {
            TIMEOUT_MULTIPLIER
        };

        let base_ms = self
            .tls
            .as_deref()
            .and_then(|tls| tls.current_timeout())
            .map(|d| d.as_millis() as u32)
            .unwrap_or(0);
        let timeout = base_ms.saturating_mul(multiplier);
        self.wolf_timeout = timeout;

        if !self.is_nudge_timer_running {
            self.is_nudge_timer_running = true;
            trace!(self.log, "timer armed"; "ms" => timeout);
            cb.nudge_time(timeout);
        }
    }

    /// The deadline the host should wait for before calling `nudge`
    /// again: `0` whenever no deadline applies.
    pub fn get_nudge_time(&self) -> u32 {
        if self.state == State::Online && !self.renegotiation_in_progress {
            0
        } else {
            self.wolf_timeout
        }
    }

    /// The host's scheduled deadline has elapsed.
    pub fn nudge(&mut self, cb: &mut dyn ConnectionCallbacks) -> Result<(), HeliumError> {
        trace!(self.log, "timer disarmed"; "state" => ?self.state);
        self.is_nudge_timer_running = false;

        if self.state == State::Authenticating {
            self.send_auth(cb)?;
        } else {
            let tls = self.tls.as_deref_mut().ok_or(HeliumError::NeverConnected)?;
            match tls.on_timeout() {
                Ok(TlsProgress::WantRead) | Ok(TlsProgress::WantWrite) => {}
                Ok(TlsProgress::Complete) => {}
                Ok(TlsProgress::AppDataReady) | Err(_) => {
                    warn!(self.log, "nudge timed out the connection");
                    self.change_state(State::Disconnected, cb);
                    return Err(HeliumError::ConnectionTimedOut);
                }
            }
        }

        self.update_timeout(cb);
        Ok(())
    }
}
