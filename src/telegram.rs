// Telegram implementation of the client boundary, backed by `grammers`.
//
// The storage area is the signed-in user's own chat ("Saved Messages").
// Automatic flood sleeping is turned off in the client so flood waits
// surface as `ClientError::FloodWait` and the upload path decides.

use crate::api::{ClientError, CloudClient, CloudMessage, ProgressFn};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use grammers_client::types::{Downloadable, Media, Message};
use grammers_client::{Client, Config as ClientConfig, InitParams, InputMessage, InvocationError};
use grammers_session::{PackedChat, Session};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tracing::{debug, info};

/// Connect to Telegram using the credentials and session in `config`.
/// The returned client may still need to sign in (see `ui::handle_login`).
pub async fn connect(config: &Config) -> Result<Client> {
    let session = Session::load_file_or_create(&config.session_path)
        .with_context(|| format!("Failed to open session file {}", config.session_path.display()))?;

    info!(api_id = config.api_id, session = %config.session_path.display(), "connecting to Telegram");
    let client = Client::connect(ClientConfig {
        session,
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        params: InitParams {
            flood_sleep_threshold: 0,
            ..Default::default()
        },
    })
    .await
    .context("Failed to connect to Telegram")?;
    Ok(client)
}

/// Saved Messages of the signed-in account.
#[derive(Clone)]
pub struct TelegramCloud {
    client: Client,
    saved: PackedChat,
}

impl TelegramCloud {
    /// Resolve the signed-in user's own chat. The client must be authorized.
    pub async fn saved_messages(client: Client) -> Result<Self> {
        let me = client.get_me().await.context("Failed to fetch the signed-in user")?;
        Ok(TelegramCloud {
            saved: me.pack(),
            client,
        })
    }

    /// Persist the session so the next run skips the login.
    pub fn save_session(&self, path: &Path) -> Result<()> {
        self.client
            .session()
            .save_to_file(path)
            .with_context(|| format!("Failed to save session to {}", path.display()))
    }
}

/// RPC errors that carry a mandatory wait before retrying.
const FLOOD_ERRORS: [&str; 2] = ["FLOOD_WAIT", "FLOOD_PREMIUM_WAIT"];

/// Never retry a flood error without waiting at all.
const MIN_FLOOD_WAIT_SECS: u32 = 1;

impl From<InvocationError> for ClientError {
    fn from(err: InvocationError) -> Self {
        match &err {
            InvocationError::Rpc(rpc) if FLOOD_ERRORS.contains(&rpc.name.as_str()) => {
                let seconds = rpc.value.unwrap_or(0).max(MIN_FLOOD_WAIT_SECS);
                ClientError::FloodWait(Duration::from_secs(u64::from(seconds)))
            }
            _ => ClientError::Rpc(err.to_string()),
        }
    }
}

impl CloudMessage for Message {
    fn message_id(&self) -> i32 {
        self.id()
    }

    fn has_media(&self) -> bool {
        self.media().is_some()
    }

    fn file_name(&self) -> Option<String> {
        match self.media()? {
            Media::Document(document) if !document.name().is_empty() => Some(document.name().to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl CloudClient for TelegramCloud {
    type Message = Message;

    async fn send_file(
        &self,
        path: &Path,
        caption: &str,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Message, ClientError> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".into());

        debug!(%name, size, "uploading file");
        let mut reader = CountingReader::new(file, size, progress);
        let uploaded = self.client.upload_stream(&mut reader, size as usize, name).await?;
        let message = self
            .client
            .send_message(self.saved, InputMessage::text(caption).document(uploaded))
            .await?;
        Ok(message)
    }

    async fn get_message(&self, id: i32) -> Result<Option<Message>, ClientError> {
        debug!(id, "fetching message");
        let mut found = self.client.get_messages_by_id(self.saved, &[id]).await?;
        Ok(found.pop().flatten())
    }

    async fn download_media(
        &self,
        message: &Message,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> Result<PathBuf, ClientError> {
        let media = message.media().ok_or(ClientError::NoMedia)?;
        let total = match &media {
            Media::Document(document) => u64::try_from(document.size()).unwrap_or(0),
            _ => 0,
        };

        debug!(id = message.id(), total, dest = %dest.display(), "downloading media");
        let mut download = self.client.iter_download(&Downloadable::Media(media));
        let chunks = async_stream::try_stream! {
            while let Some(chunk) = download.next().await.map_err(ClientError::from)? {
                yield chunk;
            }
        };
        save_chunks(dest, chunks, total, progress).await
    }

    async fn edit_message(&self, id: i32, media_from: &Message, text: &str) -> Result<(), ClientError> {
        let media = media_from.media().ok_or(ClientError::NoMedia)?;
        debug!(id, media_from = media_from.id(), "editing message");
        self.client
            .edit_message(self.saved, id, InputMessage::text(text).copy_media(&media))
            .await?;
        Ok(())
    }

    async fn delete(&self, message: &Message) -> Result<(), ClientError> {
        debug!(id = message.id(), "deleting message");
        message.delete().await?;
        Ok(())
    }

    fn iter_messages(&self) -> BoxStream<'_, Result<Message, ClientError>> {
        let client = self.client.clone();
        let chat = self.saved;
        async_stream::try_stream! {
            let mut messages = client.iter_messages(chat);
            while let Some(message) = messages.next().await.map_err(ClientError::from)? {
                yield message;
            }
        }
        .boxed()
    }
}

/// Write `chunks` to `dest`, creating missing parent directories.
///
/// Data lands in a hidden `.part` sibling first and only replaces `dest`
/// once every chunk is written; on failure the partial file is removed.
async fn save_chunks<S>(
    dest: &Path,
    chunks: S,
    total: u64,
    progress: &mut ProgressFn<'_>,
) -> Result<PathBuf, ClientError>
where
    S: Stream<Item = Result<Vec<u8>, ClientError>>,
{
    if let Some(parent) = dest.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(dest);
    let mut result = write_chunks(&partial, chunks, total, progress).await;
    if result.is_ok() {
        result = tokio::fs::rename(&partial, dest).await.map_err(ClientError::from);
    }
    if let Err(err) = result {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(err);
    }
    Ok(dest.to_path_buf())
}

async fn write_chunks<S>(
    path: &Path,
    chunks: S,
    total: u64,
    progress: &mut ProgressFn<'_>,
) -> Result<(), ClientError>
where
    S: Stream<Item = Result<Vec<u8>, ClientError>>,
{
    futures::pin_mut!(chunks);
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress(written, total);
    }
    file.flush().await?;
    Ok(())
}

/// `dir/name` -> `dir/.name.part`
fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".into());
    dest.with_file_name(format!(".{name}.part"))
}

/// Reader adapter that reports how much of the file has been consumed.
struct CountingReader<'a, 'p, R> {
    inner: R,
    read: u64,
    total: u64,
    progress: &'a mut ProgressFn<'p>,
}

impl<'a, 'p, R> CountingReader<'a, 'p, R> {
    fn new(inner: R, total: u64, progress: &'a mut ProgressFn<'p>) -> Self {
        CountingReader {
            inner,
            read: 0,
            total,
            progress,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CountingReader<'_, '_, R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut TaskContext<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let fresh = buf.filled().len() - before;
            if fresh > 0 {
                this.read += fresh as u64;
                (this.progress)(this.read, this.total);
            }
        }
        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn counting_reader_reports_every_read() {
        let data = vec![1u8; 10_000];
        let mut seen = Vec::new();
        {
            let mut report = |done: u64, total: u64| seen.push((done, total));
            let mut reader = CountingReader::new(&data[..], data.len() as u64, &mut report);
            let mut sink = Vec::new();
            reader.read_to_end(&mut sink).await.unwrap();
            assert_eq!(sink.len(), data.len());
        }
        assert_eq!(seen.last(), Some(&(10_000, 10_000)));
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
    }

    fn rpc_error(code: i32, name: &str, value: Option<u32>) -> InvocationError {
        InvocationError::Rpc(grammers_mtsender::RpcError {
            code,
            name: name.into(),
            value,
            caused_by: None,
        })
    }

    #[test]
    fn flood_errors_become_waits() {
        match ClientError::from(rpc_error(420, "FLOOD_WAIT", Some(31))) {
            ClientError::FloodWait(wait) => assert_eq!(wait, Duration::from_secs(31)),
            other => panic!("unexpected {other:?}"),
        }
        match ClientError::from(rpc_error(420, "FLOOD_PREMIUM_WAIT", Some(5))) {
            ClientError::FloodWait(wait) => assert_eq!(wait, Duration::from_secs(5)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn flood_wait_without_value_still_waits() {
        match ClientError::from(rpc_error(420, "FLOOD_WAIT", None)) {
            ClientError::FloodWait(wait) => assert_eq!(wait, Duration::from_secs(1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_rpc_errors_are_reported_as_text() {
        match ClientError::from(rpc_error(400, "MESSAGE_ID_INVALID", None)) {
            ClientError::Rpc(text) => assert!(text.contains("MESSAGE_ID_INVALID")),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn chunks(items: Vec<Result<Vec<u8>, ClientError>>) -> impl Stream<Item = Result<Vec<u8>, ClientError>> {
        futures::stream::iter(items)
    }

    #[tokio::test]
    async fn saving_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out").join("nested").join("new.bin");
        let mut seen = Vec::new();
        let mut report = |done: u64, total: u64| seen.push((done, total));

        let saved = save_chunks(&dest, chunks(vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())]), 4, &mut report)
            .await
            .unwrap();

        assert_eq!(saved, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcd");
        assert_eq!(seen, vec![(2, 4), (4, 4)]);
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_download_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.pdf");
        std::fs::write(&dest, b"old contents").unwrap();
        let mut report = |_: u64, _: u64| {};

        let result = save_chunks(
            &dest,
            chunks(vec![Ok(b"new".to_vec()), Err(ClientError::Rpc("connection reset".into()))]),
            10,
            &mut report,
        )
        .await;

        assert!(matches!(result, Err(ClientError::Rpc(_))));
        assert_eq!(std::fs::read(&dest).unwrap(), b"old contents");
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn partial_file_is_a_hidden_sibling() {
        assert_eq!(partial_path(Path::new("dir/a.txt")), PathBuf::from("dir/.a.txt.part"));
    }
}
