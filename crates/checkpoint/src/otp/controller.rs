//! OTP confirmation flow controller.
//!
//! Wraps an [`OtpSession`] with the two things it cannot do itself: a
//! one-second countdown task and calls to the [`OtpService`]. The countdown
//! task holds only a weak reference to the flow and is aborted on dispose,
//! on verification, and when the last handle is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use checkpoint_common::{FlowEvent, OtpSnapshot};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::service::OtpService;
use super::session::{KeyOutcome, OtpSession, ResendOutcome, SubmitOutcome};
use crate::config::OtpConfig;

const TICK: Duration = Duration::from_secs(1);

/// Result of activating a flow
pub enum Activation {
    /// A recipient was present; the flow is editable
    Active(OtpFlowController),
    /// No recipient; the caller should return to the issuance step
    Redirected,
}

impl Activation {
    pub fn into_active(self) -> Option<OtpFlowController> {
        match self {
            Self::Active(controller) => Some(controller),
            Self::Redirected => None,
        }
    }
}

/// Handle to one OTP confirmation flow.
///
/// Cheap to clone; every clone drives the same session.
#[derive(Clone)]
pub struct OtpFlowController {
    inner: Arc<FlowInner>,
}

struct FlowInner {
    session: Mutex<OtpSession>,
    service: Arc<dyn OtpService>,
    role: String,
    events: mpsc::UnboundedSender<FlowEvent>,
    snapshot_tx: watch::Sender<OtpSnapshot>,
    ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl FlowInner {
    fn publish(&self, session: &OtpSession) {
        self.snapshot_tx.send_replace(session.snapshot());
    }

    fn emit(&self, event: FlowEvent) {
        // The receiver may already be gone
        let _ = self.events.send(event);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn stop_ticker(&self) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for FlowInner {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

impl OtpFlowController {
    /// Enter the confirmation step.
    ///
    /// A missing or blank recipient emits [`FlowEvent::Redirected`] and never
    /// creates a session or a countdown. Must be called inside a tokio runtime.
    pub fn activate(
        recipient: Option<&str>,
        service: Arc<dyn OtpService>,
        config: &OtpConfig,
    ) -> (Activation, mpsc::UnboundedReceiver<FlowEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();

        let recipient = match recipient.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None => {
                tracing::info!("OTP flow activated without a recipient, redirecting");
                let _ = events.send(FlowEvent::Redirected);
                return (Activation::Redirected, events_rx);
            }
        };

        let session = OtpSession::new(recipient, config);
        let (snapshot_tx, _) = watch::channel(session.snapshot());

        tracing::info!(
            recipient = %session.recipient(),
            cooldown_secs = config.resend_cooldown_secs,
            "OTP flow activated"
        );

        let inner = Arc::new(FlowInner {
            session: Mutex::new(session),
            service,
            role: config.role.clone(),
            events,
            snapshot_tx,
            ticker: std::sync::Mutex::new(None),
            disposed: AtomicBool::new(false),
        });
        start_ticker(&inner);

        (Activation::Active(Self { inner }), events_rx)
    }

    /// Current state of the session
    pub async fn snapshot(&self) -> OtpSnapshot {
        self.inner.session.lock().await.snapshot()
    }

    /// Watch the session; a new snapshot is published on every change
    pub fn subscribe(&self) -> watch::Receiver<OtpSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Type `key` into cell `index`
    pub async fn input(&self, index: usize, key: &str) -> KeyOutcome {
        let mut session = self.inner.session.lock().await;
        if self.inner.is_disposed() {
            return KeyOutcome::Rejected;
        }
        let outcome = session.input(index, key);
        if outcome != KeyOutcome::Rejected {
            self.inner.publish(&session);
        }
        outcome
    }

    /// Backspace in cell `index`
    pub async fn backspace(&self, index: usize) -> KeyOutcome {
        let mut session = self.inner.session.lock().await;
        if self.inner.is_disposed() {
            return KeyOutcome::Rejected;
        }
        let outcome = session.backspace(index);
        if outcome != KeyOutcome::Rejected {
            self.inner.publish(&session);
        }
        outcome
    }

    /// Send the entered code for verification.
    ///
    /// No-op unless every cell is filled and no verification is in flight.
    pub async fn submit(&self) -> SubmitOutcome {
        let ticket = {
            let mut session = self.inner.session.lock().await;
            if self.inner.is_disposed() {
                return SubmitOutcome::Inactive;
            }
            match session.begin_submit() {
                Ok(ticket) => {
                    self.inner.publish(&session);
                    ticket
                }
                Err(outcome) => return outcome,
            }
        };

        tracing::debug!(recipient = %ticket.recipient, "Submitting OTP");
        let result = self
            .inner
            .service
            .verify_otp(&ticket.recipient, &ticket.code)
            .await;

        // Disposal is checked under the lock; dispose may land while waiting for it
        let mut session = self.inner.session.lock().await;
        if self.inner.is_disposed() {
            tracing::debug!("OTP flow disposed during verification, discarding result");
            return SubmitOutcome::Discarded;
        }
        let outcome = session.finish_submit(ticket, result);
        self.inner.publish(&session);

        match &outcome {
            SubmitOutcome::Verified(verified) => {
                tracing::info!(recipient = %verified.recipient, "OTP verified");
                self.inner.stop_ticker();
                self.inner.emit(FlowEvent::Verified(verified.clone()));
            }
            SubmitOutcome::Rejected(message) => {
                tracing::debug!(message = %message, "OTP rejected");
            }
            _ => {}
        }

        outcome
    }

    /// Ask the service for a new code.
    ///
    /// Ignored while the cooldown is running or another resend is in flight.
    pub async fn resend(&self) -> ResendOutcome {
        let ticket = {
            let mut session = self.inner.session.lock().await;
            if self.inner.is_disposed() {
                return ResendOutcome::Inactive;
            }
            match session.begin_resend() {
                Ok(ticket) => ticket,
                Err(outcome) => return outcome,
            }
        };

        tracing::info!(recipient = %ticket.recipient, "Resending OTP");
        let result = self
            .inner
            .service
            .request_otp(&ticket.recipient, &self.inner.role)
            .await;

        let mut session = self.inner.session.lock().await;
        if self.inner.is_disposed() {
            tracing::debug!("OTP flow disposed during resend, discarding result");
            return ResendOutcome::Discarded;
        }
        let outcome = session.finish_resend(result);
        self.inner.publish(&session);

        match &outcome {
            ResendOutcome::Sent => start_ticker(&self.inner),
            ResendOutcome::Failed(message) => {
                tracing::warn!(message = %message, "OTP resend failed");
            }
            _ => {}
        }

        outcome
    }

    /// Tear the flow down.
    ///
    /// Stops the countdown; results of calls still in flight are discarded.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("OTP flow disposed");
            self.inner.stop_ticker();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

/// (Re)start the countdown task, replacing any previous one
fn start_ticker(inner: &Arc<FlowInner>) {
    let handle = tokio::spawn(run_ticker(Arc::downgrade(inner)));
    let previous = inner
        .ticker
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(handle);
    if let Some(previous) = previous {
        previous.abort();
    }
}

async fn run_ticker(flow: Weak<FlowInner>) {
    let mut interval = interval_at(Instant::now() + TICK, TICK);

    loop {
        interval.tick().await;

        let Some(inner) = flow.upgrade() else {
            break;
        };

        let mut session = inner.session.lock().await;
        if inner.is_disposed() {
            break;
        }
        let became_ready = session.tick();
        inner.publish(&session);
        let finished = session.resend_state().is_ready() || session.is_verified();

        if became_ready {
            tracing::debug!(recipient = %session.recipient(), "Resend available");
            inner.emit(FlowEvent::ResendReady);
        }
        drop(session);

        if finished {
            break;
        }
    }
}
