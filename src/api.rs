// Client boundary: the handful of calls this tool makes into the chat
// service. The file operations only see these traits, so the Telegram
// client in `telegram.rs` can be swapped for an in-memory one in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Progress callback invoked with `(bytes_done, bytes_total)`.
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + Send + 'a;

/// Errors surfaced by the client boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service asked us to back off before retrying.
    #[error("flood wait of {}s", .0.as_secs())]
    FloodWait(Duration),
    #[error("{0}")]
    Rpc(String),
    #[error("message has no media")]
    NoMedia,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A stored message as seen by the file operations.
pub trait CloudMessage: Send + Sync {
    fn message_id(&self) -> i32;

    fn has_media(&self) -> bool;

    /// File name of the attached media, when the service knows one.
    fn file_name(&self) -> Option<String>;
}

/// The storage area (Saved Messages) reached through the external client.
#[async_trait]
pub trait CloudClient: Send + Sync {
    type Message: CloudMessage;

    /// Upload `path` and post it as a new message with `caption`.
    async fn send_file(
        &self,
        path: &Path,
        caption: &str,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Self::Message, ClientError>;

    /// Fetch a single message by id. `Ok(None)` when it does not exist.
    async fn get_message(&self, id: i32) -> Result<Option<Self::Message>, ClientError>;

    /// Write the media of `message` to `dest` and return the written path.
    async fn download_media(
        &self,
        message: &Self::Message,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> Result<PathBuf, ClientError>;

    /// Replace the media and text of message `id` with the media carried
    /// by `media_from` and `text`.
    async fn edit_message(
        &self,
        id: i32,
        media_from: &Self::Message,
        text: &str,
    ) -> Result<(), ClientError>;

    async fn delete(&self, message: &Self::Message) -> Result<(), ClientError>;

    /// Lazily walk every message in the area, newest first. Each call
    /// starts a fresh walk.
    fn iter_messages(&self) -> BoxStream<'_, Result<Self::Message, ClientError>>;
}
