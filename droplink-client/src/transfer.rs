use crate::error::ClientError;
use crate::transport::{ChannelMessage, DataChannel};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const CHUNK_SIZE: usize = 16 * 1024;

pub const EOF_SENTINEL: &str = "EOF";

/// Pacing between chunks so the channel's send buffer is not overwhelmed.
/// A crude flow-control surrogate; a buffered-amount watermark would be the
/// proper mechanism once the transport exposes one.
pub const INTER_CHUNK_DELAY: Duration = Duration::from_millis(2);

/// Control frame announcing an incoming file, sent as a text frame before
/// the first chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlFrame {
    #[serde(rename_all = "camelCase")]
    Metadata { file_name: String, file_size: u64 },
}

/// A fully reassembled incoming file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Fragment a file over an open channel: one metadata frame, ordered 16 KiB
/// binary chunks, then the `EOF` sentinel. An empty file is just metadata
/// followed by `EOF`.
pub async fn send_file(
    channel: &Arc<dyn DataChannel>,
    file_name: &str,
    data: &[u8],
) -> Result<(), ClientError> {
    if !channel.is_open() {
        return Err(ClientError::ChannelNotReady);
    }

    let metadata = ControlFrame::Metadata {
        file_name: file_name.to_owned(),
        file_size: data.len() as u64,
    };
    let header = serde_json::to_string(&metadata)
        .map_err(|e| crate::transport::TransportError(e.to_string()))?;
    channel.send_text(&header).await?;

    for chunk in data.chunks(CHUNK_SIZE) {
        channel.send_binary(Bytes::copy_from_slice(chunk)).await?;
        tokio::time::sleep(INTER_CHUNK_DELAY).await;
    }

    channel.send_text(EOF_SENTINEL).await?;
    debug!("sent {file_name} ({} bytes)", data.len());
    Ok(())
}

/// Receiving half of the codec: pure state, fed one frame at a time.
///
/// Chunks arrive on a single reliable ordered channel, so arrival order is
/// send order and no resequencing happens here.
#[derive(Default)]
pub struct FileAssembler {
    pending: Option<ControlFrame>,
    chunks: Vec<Bytes>,
}

impl FileAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next frame. Returns the completed file when the `EOF`
    /// sentinel closes a transfer.
    pub fn on_message(&mut self, message: ChannelMessage) -> Option<ReceivedFile> {
        match message {
            ChannelMessage::Binary(chunk) => {
                self.chunks.push(chunk);
                None
            }
            ChannelMessage::Text(text) => self.on_text(&text),
        }
    }

    fn on_text(&mut self, text: &str) -> Option<ReceivedFile> {
        if text == EOF_SENTINEL {
            let Some(ControlFrame::Metadata { file_name, file_size }) = self.pending.take() else {
                warn!("EOF without preceding metadata, dropping accumulated chunks");
                self.chunks.clear();
                return None;
            };

            // The announced size is advisory only; a hostile peer can claim
            // u64::MAX. Allocation is sized from what actually arrived.
            let received: usize = self.chunks.iter().map(Bytes::len).sum();
            let mut bytes = Vec::with_capacity(received);
            for chunk in self.chunks.drain(..) {
                bytes.extend_from_slice(&chunk);
            }
            if bytes.len() as u64 != file_size {
                debug!(
                    "{file_name}: announced {file_size} bytes, assembled {}",
                    bytes.len()
                );
            }
            return Some(ReceivedFile {
                name: file_name,
                bytes,
            });
        }

        match serde_json::from_str::<ControlFrame>(text) {
            Ok(metadata) => {
                self.pending = Some(metadata);
                self.chunks.clear();
            }
            Err(e) => warn!("unrecognized control frame: {e}"),
        }
        None
    }
}
