//! Post-commit side effects.
//!
//! Unlock calls and notifications happen strictly after the receiving
//! (or creation) transaction commits. They are handed to a worker as
//! messages: one attempt each, failures logged, never surfaced to the
//! request and never allowed to block or roll back a confirmed write.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

/// Outbound mail boundary. Implementations are expected to be
/// best-effort and non-blocking from the core's perspective.
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), String>;
}

/// External device-management boundary: one unlock call per serial.
pub trait DeviceUnlocker: Send + Sync + 'static {
    fn unlock(&self, serial: &str) -> Result<(), String>;
}

/// Mailer that only logs. Default until a real mail relay is wired in.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &[String], subject: &str, _body: &str) -> Result<(), String> {
        info!(recipients = to.len(), subject, "mail dispatch (log only)");
        Ok(())
    }
}

/// Unlocker that only logs.
pub struct LogUnlocker;

impl DeviceUnlocker for LogUnlocker {
    fn unlock(&self, serial: &str) -> Result<(), String> {
        info!(serial, "device unlock (log only)");
        Ok(())
    }
}

/// A queued side effect.
#[derive(Debug, Clone)]
pub enum Effect {
    Notify {
        to: Vec<String>,
        subject: String,
        body: String,
    },
    Unlock {
        serial: String,
    },
}

enum Mode {
    /// Worker thread fed by a channel. Enqueue returns immediately.
    Threaded(mpsc::Sender<Effect>),
    /// Run effects on the calling thread. Used in tests, where the
    /// caller wants to observe the collaborators synchronously.
    Inline {
        mailer: Arc<dyn Mailer>,
        unlocker: Arc<dyn DeviceUnlocker>,
    },
}

/// Runs queued effects with at-most-once semantics.
pub struct EffectRunner {
    mode: Mode,
}

impl EffectRunner {
    /// Spawn a worker thread that drains the effect queue. The worker
    /// exits when the runner (and with it the sender) is dropped.
    pub fn threaded(
        mailer: Arc<dyn Mailer>,
        unlocker: Arc<dyn DeviceUnlocker>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Effect>();
        thread::Builder::new()
            .name("shipment-effects".into())
            .spawn(move || {
                while let Ok(effect) = rx.recv() {
                    run_effect(&effect, mailer.as_ref(), unlocker.as_ref());
                }
            })?;
        Ok(Self {
            mode: Mode::Threaded(tx),
        })
    }

    /// Run effects inline on the calling thread.
    pub fn inline(mailer: Arc<dyn Mailer>, unlocker: Arc<dyn DeviceUnlocker>) -> Self {
        Self {
            mode: Mode::Inline { mailer, unlocker },
        }
    }

    /// Hand off an effect. Never blocks on the effect itself and never
    /// reports its failure; a dead worker is logged and the effect
    /// dropped, which is within the at-most-once contract.
    pub fn enqueue(&self, effect: Effect) {
        match &self.mode {
            Mode::Threaded(tx) => {
                if tx.send(effect).is_err() {
                    warn!("effect worker gone; dropping effect");
                }
            }
            Mode::Inline { mailer, unlocker } => {
                run_effect(&effect, mailer.as_ref(), unlocker.as_ref());
            }
        }
    }
}

fn run_effect(effect: &Effect, mailer: &dyn Mailer, unlocker: &dyn DeviceUnlocker) {
    match effect {
        Effect::Notify { to, subject, body } => {
            if to.is_empty() {
                return;
            }
            if let Err(e) = mailer.send(to, subject, body) {
                warn!(subject, error = %e, "notification failed");
            }
        }
        Effect::Unlock { serial } => {
            if let Err(e) = unlocker.unlock(serial) {
                warn!(serial, error = %e, "device unlock failed");
            }
        }
    }
}
