use crate::error::ClientError;
use crate::link::{NegotiationEvent, PeerLink};
use crate::transfer::{FileAssembler, ReceivedFile, send_file};
use crate::transport::{DataChannel, LinkEvent, PeerConnector, SignalSink};
use droplink_core::{ClientEnvelope, RoomId, RoomSummary, ServerEnvelope, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const FILE_CHANNEL_LABEL: &str = "File Sharing";

/// Notifications for the embedding UI.
#[derive(Debug)]
pub enum SessionEvent {
    MembersChanged(Vec<(UserId, String)>),
    ChatAppended { sender_id: UserId, msg: String },
    FileReceived { from: UserId, file: ReceivedFile },
    RoomCreated(RoomId),
    PublicRooms(Vec<RoomSummary>),
    FatalError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub sender_id: UserId,
    pub msg: String,
}

/// Per-client mesh coordinator: owns the roster, one `PeerLink` per remote
/// participant, and the chat log, and drives negotiation off the single
/// ordered signaling stream.
///
/// Initiator rule: only the members already present when a newcomer arrives
/// offer toward it; the newcomer only answers. For a pair that rules out
/// glare by construction, and an N-party room converges on a full mesh of
/// N·(N−1)/2 links.
pub struct RoomSession {
    local_name: String,
    local_id: Option<UserId>,
    connector: Arc<dyn PeerConnector>,
    signals: Arc<dyn SignalSink>,
    roster: HashMap<UserId, String>,
    links: HashMap<UserId, PeerLink>,
    chat_log: Vec<ChatEntry>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl RoomSession {
    pub fn new(
        local_name: impl Into<String>,
        connector: Arc<dyn PeerConnector>,
        signals: Arc<dyn SignalSink>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                local_name: local_name.into(),
                local_id: None,
                connector,
                signals,
                roster: HashMap::new(),
                links: HashMap::new(),
                chat_log: Vec::new(),
                events,
            },
            events_rx,
        )
    }

    pub fn local_id(&self) -> Option<UserId> {
        self.local_id
    }

    pub fn roster(&self) -> &HashMap<UserId, String> {
        &self.roster
    }

    pub fn chat_log(&self) -> &[ChatEntry] {
        &self.chat_log
    }

    pub fn link(&self, remote: &UserId) -> Option<&PeerLink> {
        self.links.get(remote)
    }

    pub async fn create_room(
        &self,
        room_name: impl Into<String>,
        genre: impl Into<String>,
        is_private: bool,
    ) -> Result<(), ClientError> {
        self.signals
            .send(ClientEnvelope::CreateRoom {
                room_name: room_name.into(),
                genre: genre.into(),
                is_private,
            })
            .await?;
        Ok(())
    }

    pub async fn join_room(&self, room_id: RoomId) -> Result<(), ClientError> {
        self.signals
            .send(ClientEnvelope::JoinRoom {
                room_id,
                user_name: self.local_name.clone(),
            })
            .await?;
        Ok(())
    }

    pub async fn list_public_rooms(&self, query: impl Into<String>) -> Result<(), ClientError> {
        self.signals
            .send(ClientEnvelope::ListPublicRooms {
                query: query.into(),
            })
            .await?;
        Ok(())
    }

    /// Feed one envelope from the signaling connection. This is the only
    /// mutation path for per-link state, so no locking is needed beyond the
    /// slots shared with the watcher tasks.
    pub async fn handle_envelope(&mut self, envelope: ServerEnvelope) -> Result<(), ClientError> {
        match envelope {
            ServerEnvelope::User { user_id } => {
                info!("joined as {user_id}");
                self.local_id = Some(user_id);
                Ok(())
            }
            ServerEnvelope::NewMember { user_id, user_name } => {
                self.on_new_member(user_id, user_name).await
            }
            ServerEnvelope::Offer {
                sdp,
                user_id,
                user_name,
            } => self.on_offer(sdp, user_id, user_name).await,
            ServerEnvelope::Answer { sdp, user_id, .. } => self.on_answer(sdp, user_id).await,
            ServerEnvelope::IceCandidate { candidate, user_id } => {
                self.on_candidate(candidate, user_id).await
            }
            ServerEnvelope::MemberLeft { user_id } => self.on_member_left(user_id).await,
            ServerEnvelope::ChatMessage { sender_id, msg } => {
                self.append_chat(sender_id, msg);
                Ok(())
            }
            ServerEnvelope::Room { room_id } => {
                self.emit(SessionEvent::RoomCreated(room_id));
                Ok(())
            }
            ServerEnvelope::PublicRoomsList { rooms } => {
                self.emit(SessionEvent::PublicRooms(rooms));
                Ok(())
            }
            ServerEnvelope::Error { message } => {
                self.emit(SessionEvent::FatalError(message));
                Ok(())
            }
        }
    }

    /// An existing member learns about a newcomer: create the link, open
    /// the transfer channel, and originate the offer. Idempotent if the
    /// link already exists.
    async fn on_new_member(&mut self, remote: UserId, remote_name: String) -> Result<(), ClientError> {
        self.roster.insert(remote, remote_name.clone());
        self.emit_roster();

        if self.links.contains_key(&remote) {
            debug!("link to {remote} already exists, ignoring duplicate new-member");
            return Ok(());
        }
        let Some(local_id) = self.local_id else {
            warn!("new-member before own join confirmation, dropping");
            return Ok(());
        };

        let connection = self.connector.create_link().await?;
        let link = PeerLink::new(remote, remote_name, connection.clone());
        self.spawn_link_watcher(&link, local_id);

        let channel = connection.create_channel(FILE_CHANNEL_LABEL).await?;
        self.spawn_channel_reader(remote, &channel);
        link.attach_channel(channel);

        let sdp = connection.create_offer().await?;
        connection.set_local_description(&sdp).await?;
        link.transition(NegotiationEvent::LocalOfferCreated)?;

        self.signals
            .send(ClientEnvelope::CreateOffer {
                sdp,
                target_user_id: remote,
                user_id: local_id,
                user_name: self.local_name.clone(),
            })
            .await?;
        link.transition(NegotiationEvent::OfferDispatched)?;
        info!("offer sent to {remote}");

        self.links.insert(remote, link);
        Ok(())
    }

    /// The newcomer side: answer the remote offer. A duplicate offer for an
    /// existing link only refreshes the remote description.
    async fn on_offer(
        &mut self,
        sdp: String,
        remote: UserId,
        remote_name: String,
    ) -> Result<(), ClientError> {
        if let Some(link) = self.links.get(&remote) {
            link.connection().set_remote_description(&sdp).await?;
            link.transition(NegotiationEvent::RemoteDescriptionApplied)?;
            debug!("duplicate offer from {remote}, remote description refreshed");
            return Ok(());
        }
        let Some(local_id) = self.local_id else {
            warn!("offer before own join confirmation, dropping");
            return Ok(());
        };

        let connection = self.connector.create_link().await?;
        let link = PeerLink::new(remote, remote_name.clone(), connection.clone());
        // The watcher accepts the transfer channel the offerer opens.
        self.spawn_link_watcher(&link, local_id);

        connection.set_remote_description(&sdp).await?;
        link.transition(NegotiationEvent::RemoteDescriptionApplied)?;

        let answer = connection.create_answer().await?;
        connection.set_local_description(&answer).await?;

        self.signals
            .send(ClientEnvelope::CreateAnswer {
                sdp: answer,
                target_user_id: remote,
                user_id: local_id,
                user_name: self.local_name.clone(),
            })
            .await?;
        info!("answered offer from {remote}");

        // The offer may overtake new-member; register the sender either way.
        self.roster.insert(remote, remote_name);
        self.emit_roster();
        self.links.insert(remote, link);
        Ok(())
    }

    /// Late or duplicate answers for an unknown link are dropped, not errors.
    async fn on_answer(&mut self, sdp: String, remote: UserId) -> Result<(), ClientError> {
        let Some(link) = self.links.get(&remote) else {
            debug!("answer from {remote} without a link, dropping");
            return Ok(());
        };
        link.connection().set_remote_description(&sdp).await?;
        link.transition(NegotiationEvent::RemoteDescriptionApplied)?;
        Ok(())
    }

    /// A candidate that beats its link is acceptable loss; negotiation
    /// retries via candidates that keep trickling in.
    async fn on_candidate(&mut self, candidate: String, remote: UserId) -> Result<(), ClientError> {
        let Some(link) = self.links.get(&remote) else {
            debug!("candidate from {remote} without a link, dropping");
            return Ok(());
        };
        link.connection().add_remote_candidate(&candidate).await?;
        Ok(())
    }

    /// Idempotent: a `member-left` for an already-removed peer is a no-op.
    async fn on_member_left(&mut self, remote: UserId) -> Result<(), ClientError> {
        if let Some(link) = self.links.remove(&remote) {
            info!("{} ({remote}) left, closing the link", link.remote_name());
            link.close().await;
        }
        if self.roster.remove(&remote).is_some() {
            self.emit_roster();
        }
        Ok(())
    }

    pub async fn send_chat(&mut self, msg: impl Into<String>) -> Result<(), ClientError> {
        let Some(local_id) = self.local_id else {
            return Err(ClientError::NotJoined);
        };
        let msg = msg.into();
        self.signals
            .send(ClientEnvelope::ChatMessage {
                sender_id: local_id,
                msg: msg.clone(),
            })
            .await?;
        // The relay never echoes to the sender; record our own line locally.
        self.append_chat(local_id, msg);
        Ok(())
    }

    /// Send a file to one room member over the direct channel. Fails
    /// locally with `ChannelNotReady` if the link or channel is not open;
    /// nothing touches the network in that case.
    pub async fn send_file(
        &self,
        target: UserId,
        file_name: &str,
        data: &[u8],
    ) -> Result<(), ClientError> {
        let channel = self
            .links
            .get(&target)
            .and_then(|link| link.channel())
            .ok_or(ClientError::ChannelNotReady)?;
        send_file(&channel, file_name, data).await
    }

    /// Release every link and channel. Safe to call repeatedly; a
    /// `member-left` arriving afterwards is a no-op.
    pub async fn leave(&mut self) {
        for (_, link) in self.links.drain() {
            link.close().await;
        }
        if !self.roster.is_empty() {
            self.roster.clear();
            self.emit_roster();
        }
    }

    fn append_chat(&mut self, sender_id: UserId, msg: String) {
        self.chat_log.push(ChatEntry {
            sender_id,
            msg: msg.clone(),
        });
        self.emit(SessionEvent::ChatAppended { sender_id, msg });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn emit_roster(&self) {
        let members = self
            .roster
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        self.emit(SessionEvent::MembersChanged(members));
    }

    /// Pump the connection's event stream: relay each locally discovered
    /// candidate to the remote, accept a remotely opened transfer channel,
    /// and mark the link connected.
    fn spawn_link_watcher(&self, link: &PeerLink, local_id: UserId) {
        let Some(mut events) = link.connection().take_events() else {
            warn!("link events for {} already taken", link.remote_id());
            return;
        };
        let (state, channel_slot) = link.shared_parts();
        let remote = link.remote_id();
        let signals = self.signals.clone();
        let session_events = self.events.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    LinkEvent::LocalCandidate(candidate) => {
                        let relayable = state
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .has_local_description();
                        if !relayable {
                            debug!("no local description for {remote}, candidate dropped");
                            continue;
                        }
                        let env = ClientEnvelope::IceCandidate {
                            candidate,
                            target_user_id: remote,
                            user_id: local_id,
                        };
                        if let Err(e) = signals.send(env).await {
                            warn!("failed to relay candidate to {remote}: {e}");
                        }
                    }
                    LinkEvent::ChannelOpened(channel) => {
                        debug!("transfer channel from {remote}: {}", channel.label());
                        spawn_channel_reader_task(remote, &channel, session_events.clone());
                        *channel_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(channel);
                    }
                    LinkEvent::Connected => {
                        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                        match state.apply(NegotiationEvent::Established) {
                            Ok(next) => *state = next,
                            Err(e) => debug!("connected event ignored: {e}"),
                        }
                    }
                }
            }
        });
    }

    fn spawn_channel_reader(&self, remote: UserId, channel: &Arc<dyn DataChannel>) {
        spawn_channel_reader_task(remote, channel, self.events.clone());
    }
}

/// Drain a transfer channel through a `FileAssembler`, surfacing each
/// completed file to the session's event stream.
fn spawn_channel_reader_task(
    remote: UserId,
    channel: &Arc<dyn DataChannel>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let Some(mut messages) = channel.take_messages() else {
        warn!("channel messages for {remote} already taken");
        return;
    };

    tokio::spawn(async move {
        let mut assembler = FileAssembler::new();
        while let Some(message) = messages.recv().await {
            if let Some(file) = assembler.on_message(message) {
                info!("received {} ({} bytes) from {remote}", file.name, file.bytes.len());
                let _ = events.send(SessionEvent::FileReceived { from: remote, file });
            }
        }
    });
}
