use async_trait::async_trait;
use bytes::Bytes;
use droplink_core::ClientEnvelope;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure inside the platform transport (peer connection, data channel,
/// or signaling socket).
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Asynchronous notifications a peer connection produces while negotiating.
pub enum LinkEvent {
    /// A locally discovered candidate that must be relayed to the remote.
    LocalCandidate(String),
    /// The remote side opened a data channel toward us (answerer path).
    ChannelOpened(Arc<dyn DataChannel>),
    /// The pair is fully connected.
    Connected,
}

/// One frame received on a data channel. Control frames travel as text,
/// file chunks as binary; the two are told apart by payload kind alone.
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    Text(String),
    Binary(Bytes),
}

/// An ordered, reliable byte-stream channel between two peers.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    fn is_open(&self) -> bool;

    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    async fn send_binary(&self, data: Bytes) -> Result<(), TransportError>;

    /// Hand out the inbound message stream. Yields `Some` exactly once.
    fn take_messages(&self) -> Option<mpsc::UnboundedReceiver<ChannelMessage>>;

    async fn close(&self);
}

/// The platform's two-party connection primitive. Offer/answer and
/// candidate machinery are a black box behind this trait.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<String, TransportError>;

    async fn create_answer(&self) -> Result<String, TransportError>;

    async fn set_local_description(&self, sdp: &str) -> Result<(), TransportError>;

    async fn set_remote_description(&self, sdp: &str) -> Result<(), TransportError>;

    async fn add_remote_candidate(&self, candidate: &str) -> Result<(), TransportError>;

    async fn create_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, TransportError>;

    /// Hand out the connection's event stream. Yields `Some` exactly once.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<LinkEvent>>;

    async fn close(&self);
}

/// Factory for peer connections, one per remote participant.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn create_link(&self) -> Result<Arc<dyn PeerConnection>, TransportError>;
}

/// Outbound half of the signaling connection.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send(&self, envelope: ClientEnvelope) -> Result<(), TransportError>;
}
