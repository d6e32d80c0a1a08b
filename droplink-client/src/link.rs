use crate::transport::{DataChannel, PeerConnection};
use droplink_core::UserId;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Negotiation progress for one remote participant.
///
/// The offerer walks `Idle -> OfferCreated -> OfferSent ->
/// RemoteDescriptionSet -> Connected`; the answerer jumps straight from
/// `Idle` to `RemoteDescriptionSet` when the remote offer lands. Candidate
/// exchange may overlap any state once a local description exists.
/// `Closed` is terminal and reachable from everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    OfferCreated,
    OfferSent,
    RemoteDescriptionSet,
    Connected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationEvent {
    LocalOfferCreated,
    OfferDispatched,
    RemoteDescriptionApplied,
    Established,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal negotiation transition: {state:?} on {event:?}")]
pub struct TransitionError {
    pub state: LinkState,
    pub event: NegotiationEvent,
}

impl LinkState {
    /// Pure transition function; illegal transitions (an answer before any
    /// offer exists, activity after teardown) are rejected, never applied.
    pub fn apply(self, event: NegotiationEvent) -> Result<LinkState, TransitionError> {
        use LinkState::*;
        use NegotiationEvent::*;

        match (self, event) {
            (_, Teardown) => Ok(Closed),
            (Closed, _) => Err(TransitionError { state: self, event }),

            (Idle, LocalOfferCreated) => Ok(OfferCreated),
            (OfferCreated, OfferDispatched) => Ok(OfferSent),

            // Offerer: the answer arrives. Answerer: the offer arrives.
            (OfferSent, RemoteDescriptionApplied) => Ok(RemoteDescriptionSet),
            (Idle, RemoteDescriptionApplied) => Ok(RemoteDescriptionSet),

            // Duplicate offers only refresh the remote description.
            (RemoteDescriptionSet, RemoteDescriptionApplied) => Ok(RemoteDescriptionSet),
            (Connected, RemoteDescriptionApplied) => Ok(Connected),

            (RemoteDescriptionSet, Established) => Ok(Connected),
            (Connected, Established) => Ok(Connected),

            (state, event) => Err(TransitionError { state, event }),
        }
    }

    /// Candidates may be sent once a local description exists.
    pub fn has_local_description(self) -> bool {
        !matches!(self, LinkState::Idle | LinkState::Closed)
    }
}

/// Client-local negotiation and transport handle for one remote
/// participant. Exactly one of these exists per (local, remote) pair; the
/// session enforces idempotent creation.
pub struct PeerLink {
    remote_id: UserId,
    remote_name: String,
    state: Arc<Mutex<LinkState>>,
    connection: Arc<dyn PeerConnection>,
    channel: Arc<Mutex<Option<Arc<dyn DataChannel>>>>,
}

impl PeerLink {
    pub fn new(remote_id: UserId, remote_name: String, connection: Arc<dyn PeerConnection>) -> Self {
        Self {
            remote_id,
            remote_name,
            state: Arc::new(Mutex::new(LinkState::Idle)),
            connection,
            channel: Arc::new(Mutex::new(None)),
        }
    }

    pub fn remote_id(&self) -> UserId {
        self.remote_id
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn connection(&self) -> &Arc<dyn PeerConnection> {
        &self.connection
    }

    pub fn transition(&self, event: NegotiationEvent) -> Result<(), TransitionError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let next = state.apply(event)?;
        debug!("link {}: {:?} -> {next:?}", self.remote_id, *state);
        *state = next;
        Ok(())
    }

    pub fn attach_channel(&self, channel: Arc<dyn DataChannel>) {
        *self.channel.lock().unwrap_or_else(|e| e.into_inner()) = Some(channel);
    }

    pub fn channel(&self) -> Option<Arc<dyn DataChannel>> {
        self.channel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn shared_parts(
        &self,
    ) -> (
        Arc<Mutex<LinkState>>,
        Arc<Mutex<Option<Arc<dyn DataChannel>>>>,
    ) {
        (self.state.clone(), self.channel.clone())
    }

    /// Tear down the link and its channel. Safe to call repeatedly.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == LinkState::Closed {
                return;
            }
            *state = LinkState::Closed;
        }
        if let Some(channel) = self.channel() {
            channel.close().await;
        }
        self.connection.close().await;
    }
}
