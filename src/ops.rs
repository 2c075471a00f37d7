// File operations on the Saved Messages area.
//
// Each operation reports to `out` and absorbs every failure: callers get
// an `Option`/`bool`/count back, never an error. Only a flood wait during
// upload is retried.

use crate::api::{ClientError, CloudClient, CloudMessage};
use crate::progress::Progress;
use crossterm::style::Stylize;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Write a line to the report sink, ignoring terminal write failures.
macro_rules! say {
    ($out:expr, $($arg:tt)*) => {
        let _ = writeln!($out, $($arg)*);
    };
}

/// Placeholder shown by `list_files` for media without a file name.
pub const NO_NAME: &str = "—";

/// Returns whether `path` exists, reporting it when it does not.
pub fn file_exists<W: Write>(out: &mut W, path: &Path) -> bool {
    if !path.exists() {
        say!(out, "  {}", format!("File not found: {}", path.display()).red());
        return false;
    }
    true
}

/// Upload a local file to Saved Messages and return the new message id.
///
/// Flood waits are honoured and the upload retried with the same
/// arguments for as long as the service keeps asking.
pub async fn upload<C, W>(client: &C, out: &mut W, path: &Path, caption: &str) -> Option<i32>
where
    C: CloudClient + ?Sized,
    W: Write + Send,
{
    if !file_exists(out, path) {
        return None;
    }

    say!(out, "  Uploading  ->  {}", path.display());
    loop {
        let progress = Progress::new();
        let result = client
            .send_file(path, caption, &mut |done, total| progress.update(done, total))
            .await;
        progress.finish();

        match result {
            Ok(message) => {
                let id = message.message_id();
                debug!(id, path = %path.display(), "upload finished");
                say!(out, "  {}", format!("Done!  Message ID: {id}").green());
                return Some(id);
            }
            Err(ClientError::FloodWait(wait)) => {
                warn!(seconds = wait.as_secs(), "flood wait during upload");
                say!(out, "  FloodWait: waiting {}s ...", wait.as_secs());
                tokio::time::sleep(wait).await;
            }
            Err(err) => {
                error!(%err, path = %path.display(), "upload failed");
                say!(out, "  {}", format!("Upload failed: {err}").red());
                return None;
            }
        }
    }
}

/// Download the media of message `message_id` and return where it landed.
pub async fn download<C, W>(client: &C, out: &mut W, message_id: i32, output: &Path) -> Option<PathBuf>
where
    C: CloudClient + ?Sized,
    W: Write + Send,
{
    say!(out, "  Downloading  message {message_id} ...");

    let message = match client.get_message(message_id).await {
        Ok(Some(message)) if message.has_media() => message,
        Ok(_) => {
            say!(out, "  {}", "No media found for that ID.".red());
            return None;
        }
        Err(err) => {
            error!(%err, message_id, "fetching message failed");
            say!(out, "  {}", format!("Download failed: {err}").red());
            return None;
        }
    };

    let dest = resolve_destination(output, message.file_name().as_deref(), message_id);
    debug!(message_id, dest = %dest.display(), "downloading media");

    let progress = Progress::new();
    let result = client
        .download_media(&message, &dest, &mut |done, total| progress.update(done, total))
        .await;
    progress.finish();

    match result {
        Ok(path) => {
            say!(out, "  {}", format!("Saved to: {}", path.display()).green());
            Some(path)
        }
        Err(err) => {
            error!(%err, message_id, "download failed");
            say!(out, "  {}", format!("Download failed: {err}").red());
            None
        }
    }
}

/// Pick the file to write a download to.
///
/// An empty `output` means the attachment's own name in the working
/// directory, and an existing directory means that name inside it.
pub fn resolve_destination(output: &Path, file_name: Option<&str>, message_id: i32) -> PathBuf {
    let own_name = || {
        file_name
            .and_then(|name| Path::new(name).file_name())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("message_{message_id}")))
    };

    if output.as_os_str().is_empty() {
        own_name()
    } else if output.is_dir() {
        output.join(own_name())
    } else {
        output.to_path_buf()
    }
}

/// Replace the file carried by message `message_id` with `new_path`.
///
/// The new file goes up as a temporary message, its media is moved onto
/// the target, then the temporary message is deleted. Nothing is rolled
/// back when a later step fails.
pub async fn update<C, W>(client: &C, out: &mut W, message_id: i32, new_path: &Path) -> bool
where
    C: CloudClient + ?Sized,
    W: Write + Send,
{
    if !file_exists(out, new_path) {
        return false;
    }

    say!(out, "  Updating message {message_id} ...");
    say!(out, "  Uploading new file ...");

    let progress = Progress::new();
    let uploaded = client
        .send_file(new_path, "", &mut |done, total| progress.update(done, total))
        .await;
    progress.finish();

    let temporary = match uploaded {
        Ok(message) => message,
        Err(err) => return update_failed(out, message_id, err),
    };

    say!(out, "  Replacing message ...");
    let name = new_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Err(err) = client
        .edit_message(message_id, &temporary, &format!("Updated: {name}"))
        .await
    {
        warn!(temporary = temporary.message_id(), "temporary upload left behind");
        return update_failed(out, message_id, err);
    }

    if let Err(err) = client.delete(&temporary).await {
        warn!(temporary = temporary.message_id(), "temporary upload left behind");
        return update_failed(out, message_id, err);
    }

    say!(out, "  {}", "Update successful!".green());
    true
}

fn update_failed<W: Write>(out: &mut W, message_id: i32, err: ClientError) -> bool {
    error!(%err, message_id, "update failed");
    say!(out, "  {}", format!("Update failed: {err}").red());
    false
}

/// Print every message that carries media and return how many there were.
pub async fn list_files<C, W>(client: &C, out: &mut W) -> usize
where
    C: CloudClient + ?Sized,
    W: Write + Send,
{
    say!(out, "  Files in Saved Messages:\n");
    say!(out, "  {:>10}  File name", "ID");
    say!(out, "  {}  {}", "─".repeat(10), "─".repeat(40));

    let mut listed = 0;
    let mut messages = client.iter_messages();
    while let Some(item) = messages.next().await {
        match item {
            Ok(message) if message.has_media() => {
                let name = message.file_name().unwrap_or_else(|| NO_NAME.to_string());
                say!(out, "  {:>10}  {}", message.message_id(), name);
                listed += 1;
            }
            Ok(_) => {}
            Err(err) => {
                error!(%err, "listing stopped");
                say!(out, "  {}", format!("Error: {err}").red());
                break;
            }
        }
    }
    listed
}
