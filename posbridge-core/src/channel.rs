//! The single communication line to the embedding host window.
//!
//! Outbound, every step is posted to exactly one origin: the one the channel
//! was built with. Inbound, at most one reply listener exists at a time and
//! it fires once; the [`ReplySubscription`] that owns it removes it on drop.

use crate::events::{FlowEvent, FlowReporter};
use posbridge_sdk::objects::{HostReply, SetupOptions, StepMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

/// The window that opened or framed the bridge.
pub trait HostWindow: Send + Sync {
    /// Post a serialized message to the window, restricted to `target_origin`.
    fn post_message(&self, message: &str, target_origin: &str) -> Result<(), HostWindowError>;

    /// Whether the bridge runs inside a frame of the host page.
    fn is_embedded(&self) -> bool;
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HostWindowError(pub String);

/// Errors produced by the host channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid target origin: {0:?}")]
    InvalidOrigin(String),

    #[error("not embedded in a host window")]
    NotEmbedded,

    #[error("a reply listener is already active")]
    ListenerBusy,

    #[error("reply listener closed before a reply arrived")]
    ListenerClosed,

    #[error("failed to encode step: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to post step: {0}")]
    Delivery(#[from] HostWindowError),
}

/// An inbound message from the expected origin that is not a host reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed reply from {origin}: {reason}")]
pub struct ReplyParseError {
    pub origin: String,
    pub reason: String,
}

/// A cross-window message as received by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub origin: String,
    pub data: String,
}

impl InboundMessage {
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
        }
    }
}

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the listener, which is now gone.
    Delivered,
    NoListener,
    OriginMismatch,
    /// Dropped as noise; the listener stays armed.
    Malformed,
}

/// Normalize an origin to its `scheme://host[:port]` serialization.
///
/// The `*` wildcard and opaque origins are rejected: steps carry receipt
/// data and must only reach the configured host.
pub fn normalize_origin(raw: &str) -> Result<String, ChannelError> {
    let trimmed = raw.trim();
    if trimmed == "*" {
        return Err(ChannelError::InvalidOrigin(raw.to_owned()));
    }
    let url = Url::parse(trimmed).map_err(|_| ChannelError::InvalidOrigin(raw.to_owned()))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(ChannelError::InvalidOrigin(raw.to_owned()));
    }
    Ok(origin.ascii_serialization())
}

struct ListenerSlot {
    id: u64,
    origin: String,
    tx: oneshot::Sender<HostReply>,
}

struct HostChannelInner {
    window: Arc<dyn HostWindow>,
    target_origin: String,
    listener: Mutex<Option<ListenerSlot>>,
    next_listener_id: AtomicU64,
    reporter: FlowReporter,
}

impl HostChannelInner {
    fn listener(&self) -> MutexGuard<'_, Option<ListenerSlot>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_listener(&self, id: u64) {
        let mut slot = self.listener();
        if slot.as_ref().is_some_and(|s| s.id == id) {
            *slot = None;
            debug!(listener = id, "Reply listener removed");
        }
    }
}

/// Step protocol to the host window.
#[derive(Clone)]
pub struct HostChannel {
    inner: Arc<HostChannelInner>,
}

impl HostChannel {
    /// Create a channel that posts only to `target_origin`.
    pub fn new(
        window: Arc<dyn HostWindow>,
        target_origin: &str,
        reporter: FlowReporter,
    ) -> Result<Self, ChannelError> {
        let target_origin = normalize_origin(target_origin)?;
        Ok(Self {
            inner: Arc::new(HostChannelInner {
                window,
                target_origin,
                listener: Mutex::new(None),
                next_listener_id: AtomicU64::new(1),
                reporter,
            }),
        })
    }

    pub fn target_origin(&self) -> &str {
        &self.inner.target_origin
    }

    pub fn is_embedded(&self) -> bool {
        self.inner.window.is_embedded()
    }

    /// Serialize and post one step.
    pub fn send_step(&self, step: &StepMessage) -> Result<(), ChannelError> {
        let json = serde_json::to_string(step)?;
        debug!(step = step.name(), target_origin = %self.inner.target_origin, "Sending step");
        self.inner
            .window
            .post_message(&json, &self.inner.target_origin)?;
        Ok(())
    }

    /// SETUP with the close button removed, so the cashier cannot interrupt
    /// the flow without a clean exit.
    pub fn send_setup(&self) -> Result<(), ChannelError> {
        self.send_step(&StepMessage::Setup {
            setup: SetupOptions {
                enable_close: false,
            },
        })
    }

    /// SETUP with the close button restored.
    pub fn allow_close(&self) -> Result<(), ChannelError> {
        self.send_step(&StepMessage::Setup {
            setup: SetupOptions { enable_close: true },
        })
    }

    /// DATA, only when embedded; nothing is posted otherwise.
    pub fn send_data_request(&self) -> Result<(), ChannelError> {
        if !self.is_embedded() {
            return Err(ChannelError::NotEmbedded);
        }
        self.send_step(&StepMessage::Data)
    }

    pub fn send_accept(
        &self,
        receipt_html: String,
        transaction_id: Option<String>,
    ) -> Result<(), ChannelError> {
        self.send_step(&StepMessage::Accept {
            transaction_id,
            receipt_html_extra: receipt_html,
        })
    }

    pub fn send_decline(&self, receipt_html: Option<String>) -> Result<(), ChannelError> {
        self.send_step(&StepMessage::Decline {
            print: false,
            receipt_html_extra: receipt_html,
        })
    }

    pub fn send_print(&self, receipt_html: String) -> Result<(), ChannelError> {
        self.send_step(&StepMessage::Print {
            receipt_html_extra: receipt_html,
        })
    }

    pub fn send_exit(&self) -> Result<(), ChannelError> {
        self.send_step(&StepMessage::Exit)
    }

    /// Arm the single-use reply listener for messages from `origin_filter`.
    pub fn once_reply(&self, origin_filter: &str) -> Result<ReplySubscription, ChannelError> {
        let origin = normalize_origin(origin_filter)?;
        let mut slot = self.inner.listener();
        if slot.is_some() {
            return Err(ChannelError::ListenerBusy);
        }

        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        debug!(listener = id, origin = %origin, "Reply listener armed");
        *slot = Some(ListenerSlot { id, origin, tx });

        Ok(ReplySubscription {
            id,
            rx,
            channel: Arc::downgrade(&self.inner),
        })
    }

    pub fn has_listener(&self) -> bool {
        self.inner.listener().is_some()
    }

    /// Route an inbound message to the armed listener, if it matches.
    pub fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        let mut slot = self.inner.listener();
        let Some(armed) = slot.as_ref() else {
            debug!(origin = %message.origin, "Inbound message with no listener armed");
            return DispatchOutcome::NoListener;
        };

        if armed.origin != message.origin {
            debug!(
                origin = %message.origin,
                expected = %armed.origin,
                "Inbound message from unexpected origin dropped"
            );
            return DispatchOutcome::OriginMismatch;
        }

        let reply = match serde_json::from_str::<HostReply>(&message.data) {
            Ok(reply) => reply,
            Err(e) => {
                drop(slot);
                let error = ReplyParseError {
                    origin: message.origin,
                    reason: e.to_string(),
                };
                warn!(error = %error, "Malformed host reply dropped");
                self.inner.reporter.report(FlowEvent::ReplyDropped(error));
                return DispatchOutcome::Malformed;
            }
        };

        let Some(armed) = slot.take() else {
            return DispatchOutcome::NoListener;
        };
        drop(slot);

        debug!(listener = armed.id, sale_id = %reply.sale_id(), "Host reply accepted");
        match armed.tx.send(reply) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(_) => DispatchOutcome::NoListener,
        }
    }
}

/// Ownership of the armed reply listener.
///
/// Dropping the subscription disarms the listener, whichever path the
/// attempt leaves by.
pub struct ReplySubscription {
    id: u64,
    rx: oneshot::Receiver<HostReply>,
    channel: Weak<HostChannelInner>,
}

impl ReplySubscription {
    /// Wait for the host reply. Cancel-safe.
    pub async fn recv(&mut self) -> Result<HostReply, ChannelError> {
        (&mut self.rx).await.map_err(|_| ChannelError::ListenerClosed)
    }
}

impl std::fmt::Debug for ReplySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplySubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Drop for ReplySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}
