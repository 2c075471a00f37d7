// UI layer: the numbered menu, the prompt routines behind each entry and
// the first-run login, all driven through `dialoguer`.

use crate::api::CloudClient;
use crate::ops;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use grammers_client::{Client, SignInError};
use std::io;
use std::path::Path;
use tracing::info;

/// Entries of the main menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Upload,
    Download,
    Update,
    List,
    Exit,
}

impl MenuEntry {
    pub const ALL: [MenuEntry; 5] = [
        MenuEntry::Upload,
        MenuEntry::Download,
        MenuEntry::Update,
        MenuEntry::List,
        MenuEntry::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuEntry::Upload => "Upload a file",
            MenuEntry::Download => "Download a file",
            MenuEntry::Update => "Update / replace a file",
            MenuEntry::List => "List all files",
            MenuEntry::Exit => "Exit",
        }
    }
}

/// Map a typed choice (1-based) to its menu entry.
pub fn parse_choice(input: &str) -> Option<MenuEntry> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let index: usize = trimmed.parse().ok()?;
    index.checked_sub(1).and_then(|i| MenuEntry::ALL.get(i).copied())
}

fn print_banner() {
    println!("\n{}", "╔══════════════════════════════╗".cyan());
    println!("{}", "║   Telegram Cloud Storage     ║".cyan());
    println!("{}\n", "╚══════════════════════════════╝".cyan());
}

/// Main interactive menu. Runs until the user picks "Exit".
///
/// Operation failures are reported by the operations themselves; only a
/// broken terminal ends the loop with an error.
pub async fn main_menu<C: CloudClient>(client: &C) -> Result<()> {
    print_banner();
    let mut out = io::stdout();

    loop {
        for (i, entry) in MenuEntry::ALL.iter().enumerate() {
            println!("  {}.  {}", i + 1, entry.label());
        }
        println!();

        let choice: String = Input::new()
            .with_prompt("  Choice")
            .allow_empty(true)
            .interact_text()?;
        let Some(entry) = parse_choice(&choice) else {
            println!("  {}", "Invalid choice.".red());
            continue;
        };

        if entry == MenuEntry::Exit {
            println!("  Bye!");
            break;
        }

        println!();
        run_entry(client, entry, &mut out).await?;
        println!();
    }
    Ok(())
}

/// Dispatch a menu entry to its prompt routine.
async fn run_entry<C: CloudClient>(client: &C, entry: MenuEntry, out: &mut io::Stdout) -> Result<()> {
    match entry {
        MenuEntry::Upload => prompt_upload(client, out).await,
        MenuEntry::Download => prompt_download(client, out).await,
        MenuEntry::Update => prompt_update(client, out).await,
        MenuEntry::List => {
            ops::list_files(client, out).await;
            Ok(())
        }
        MenuEntry::Exit => Ok(()),
    }
}

async fn prompt_upload<C: CloudClient>(client: &C, out: &mut io::Stdout) -> Result<()> {
    let path: String = Input::new().with_prompt("  File path").interact_text()?;
    let caption: String = Input::new()
        .with_prompt("  Caption")
        .allow_empty(true)
        .interact_text()?;
    ops::upload(client, out, Path::new(path.trim()), caption.trim()).await;
    Ok(())
}

async fn prompt_download<C: CloudClient>(client: &C, out: &mut io::Stdout) -> Result<()> {
    let message_id: i32 = Input::new().with_prompt("  Message ID").interact_text()?;
    let save_as: String = Input::new()
        .with_prompt("  Save as")
        .allow_empty(true)
        .interact_text()?;
    ops::download(client, out, message_id, Path::new(save_as.trim())).await;
    Ok(())
}

async fn prompt_update<C: CloudClient>(client: &C, out: &mut io::Stdout) -> Result<()> {
    let message_id: i32 = Input::new().with_prompt("  Message ID").interact_text()?;
    let new_path: String = Input::new().with_prompt("  New file path").interact_text()?;
    ops::update(client, out, message_id, Path::new(new_path.trim())).await;
    Ok(())
}

/// Sign in when the session is not authorized yet, then persist the
/// session to `session_path`.
pub async fn handle_login(client: &Client, session_path: &Path) -> Result<()> {
    if client
        .is_authorized()
        .await
        .context("Failed to check authorization")?
    {
        return Ok(());
    }

    println!("  Signing in to Telegram.");
    let phone: String = Input::new()
        .with_prompt("  Phone number (international format)")
        .interact_text()?;
    let token = client
        .request_login_code(phone.trim())
        .await
        .context("Failed to request login code")?;
    let code: String = Input::new().with_prompt("  Login code").interact_text()?;

    match client.sign_in(&token, code.trim()).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            // `Password` hides input in terminal for passwords.
            let password: String = Password::new()
                .with_prompt(format!("  Password (hint: {hint})"))
                .interact()?;
            client
                .check_password(password_token, password.trim())
                .await
                .context("Two-step verification failed")?;
        }
        Err(err) => return Err(err).context("Sign in failed"),
    }

    info!("signed in");
    println!("  {}", "Signed in.".green());
    persist_session(client, session_path)
}

fn persist_session(client: &Client, session_path: &Path) -> Result<()> {
    if let Some(dir) = session_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    client
        .session()
        .save_to_file(session_path)
        .with_context(|| format!("Failed to save session to {}", session_path.display()))
}
