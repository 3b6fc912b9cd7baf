use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dl_core::{export_json, DiaryStore, Journal, Session, EXPORT_FILE_NAME};
use dl_fs::{resolve_data_path, set_config_path, JsonStore};

#[derive(Parser)]
#[command(name = "dl", version, about = "Daylog journaling CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register the single account.
    Register {
        /// Username for the new account.
        username: String,
        /// Optional four-digit quick code for relocking the screen.
        #[arg(long)]
        pin: Option<String>,
        /// Keep the records under this directory instead of ~/.daylog.
        #[arg(long)]
        data_dir: Option<String>,
    },
    /// Verify credentials against the stored account.
    Login {
        /// Username to log in as; defaults to the registered one.
        username: Option<String>,
    },
    /// Create an entry.
    New {
        /// Title for the entry.
        #[arg(long)]
        title: Option<String>,
        /// Body text for the entry.
        #[arg(long)]
        body: Option<String>,
    },
    /// List entries, newest first.
    List,
    /// Show a single entry by id.
    Show { id: String },
    /// Edit an entry's title or body.
    Edit {
        id: String,
        /// Replacement title.
        #[arg(long)]
        title: Option<String>,
        /// Replacement body text.
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete an entry by id.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Search entries by query.
    Search { query: String },
    /// Export all entries to a JSON document.
    Export {
        /// Destination file; defaults to diary_backup.json.
        path: Option<String>,
    },
    /// Import entries from an exported JSON document.
    Import { path: String },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(c) => c,
        None => return dl_tui::run(),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    if let Command::Register {
        username,
        pin,
        data_dir,
    } = &command
    {
        let root = match data_dir {
            Some(path) => {
                let path = PathBuf::from(path);
                set_config_path(&path)?;
                path
            }
            None => resolve_data_path()?,
        };
        return register(&JsonStore::new(root), username, pin.clone());
    }

    let store = JsonStore::new(resolve_data_path()?);
    let mut journal = Journal::open(store.clone())?;

    match command {
        Command::Login { username } => login(&store, username),
        Command::New { title, body } => new_entry(&mut journal, title, body),
        Command::List => list_entries(&journal),
        Command::Show { id } => show_entry(&journal, &id),
        Command::Edit { id, title, body } => edit_entry(&mut journal, &id, title, body),
        Command::Delete { id, yes } => delete_entry(&mut journal, &id, yes),
        Command::Search { query } => search_entries(&journal, &query),
        Command::Export { path } => export_entries(&store, &journal, path),
        Command::Import { path } => import_entries(&mut journal, &path),
        Command::Register { .. } => unreachable!("handled above"),
    }
}

fn register(store: &JsonStore, username: &str, pin: Option<String>) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(anyhow!("username must not be empty"));
    }
    // The quick code is stored as entered; four digits is a convention,
    // not a rule the gate enforces.
    let pin = pin.filter(|code| !code.is_empty());

    let passphrase =
        rpassword::prompt_password("Passphrase: ").context("failed to read passphrase")?;
    if passphrase.is_empty() {
        return Err(anyhow!("passphrase must not be empty"));
    }
    let confirmed =
        rpassword::prompt_password("Confirm passphrase: ").context("failed to read passphrase")?;
    if passphrase != confirmed {
        return Err(anyhow!("passphrases do not match"));
    }

    let mut session = Session::new(store.clone())?;
    session.register(username, &passphrase, pin)?;
    info!(username, "registered account");
    println!("Account registered for {username}.");
    Ok(())
}

fn login(store: &JsonStore, username: Option<String>) -> Result<()> {
    let mut session = Session::new(store.clone())?;
    let username = match username {
        Some(name) => name,
        None => session
            .stored_username()?
            .ok_or_else(|| anyhow!("no account is registered"))?,
    };
    let username = username.trim();
    if username.is_empty() {
        return Err(anyhow!("username must not be empty"));
    }

    let passphrase = rpassword::prompt_password(format!("Passphrase for {username}: "))
        .context("failed to read passphrase")?;
    if passphrase.is_empty() {
        return Err(anyhow!("passphrase must not be empty"));
    }
    session.login(username, &passphrase)?;
    println!("Logged in as {username}.");
    Ok(())
}

fn new_entry(
    journal: &mut Journal<JsonStore>,
    title: Option<String>,
    body: Option<String>,
) -> Result<()> {
    let entry = journal.create().context("failed to create entry")?;
    let title = title.unwrap_or_default();
    let body = body.unwrap_or_default();
    if !title.is_empty() || !body.is_empty() {
        journal
            .update(&entry.id, &title, &body)
            .context("failed to save entry")?;
    }
    info!(id = %entry.id, "created entry");
    println!("Created entry {}.", entry.id);
    Ok(())
}

fn list_entries(journal: &Journal<JsonStore>) -> Result<()> {
    for entry in journal.all() {
        println!(
            "{}\t{}\t{}",
            entry.id,
            dl_utils::list_title(&entry.title, &entry.body),
            entry.updated.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn show_entry(journal: &Journal<JsonStore>, id: &str) -> Result<()> {
    let entry = journal.find(id).ok_or_else(|| anyhow!("entry not found"))?;
    println!("{}", dl_utils::display_title(&entry.title));
    println!(
        "Created {}  Updated {}",
        entry.created.format("%Y-%m-%d %H:%M"),
        entry.updated.format("%Y-%m-%d %H:%M")
    );
    println!();
    println!("{}", entry.body);
    println!();
    println!(
        "{} words, {} characters, {} min read",
        dl_utils::word_count(&entry.body),
        dl_utils::char_count(&entry.body),
        dl_utils::reading_time_minutes(&entry.body)
    );
    Ok(())
}

fn edit_entry(
    journal: &mut Journal<JsonStore>,
    id: &str,
    title: Option<String>,
    body: Option<String>,
) -> Result<()> {
    let entry = journal.find(id).ok_or_else(|| anyhow!("entry not found"))?;
    let title = title.unwrap_or_else(|| entry.title.clone());
    let body = body.unwrap_or_else(|| entry.body.clone());
    journal
        .update(id, &title, &body)
        .context("failed to save entry")?;
    println!("Updated entry {id}.");
    Ok(())
}

fn delete_entry(journal: &mut Journal<JsonStore>, id: &str, yes: bool) -> Result<()> {
    if journal.find(id).is_none() {
        return Err(anyhow!("entry not found"));
    }
    if !yes && !confirm(&format!("Delete entry {id}?"))? {
        println!("Aborted.");
        return Ok(());
    }
    journal.delete(id).context("failed to delete entry")?;
    info!(id, "deleted entry");
    println!("Deleted entry {id}.");
    Ok(())
}

fn search_entries(journal: &Journal<JsonStore>, query: &str) -> Result<()> {
    let matches = journal.search(query);
    for entry in &matches {
        println!(
            "{}\t{}\t{}",
            entry.id,
            dl_utils::list_title(&entry.title, &entry.body),
            entry.updated.format("%Y-%m-%d %H:%M")
        );
    }
    println!("Found {} entries.", matches.len());
    Ok(())
}

fn export_entries(
    store: &JsonStore,
    journal: &Journal<JsonStore>,
    path: Option<String>,
) -> Result<()> {
    let target = PathBuf::from(path.unwrap_or_else(|| EXPORT_FILE_NAME.to_string()));
    let user = store.load_profile()?.map(|profile| profile.username);
    let document = export_json(user, journal.all())?;
    std::fs::write(&target, document).context("failed to write export file")?;
    info!(path = %target.display(), "exported entries");
    println!(
        "Exported {} entries to {}.",
        journal.all().len(),
        target.display()
    );
    Ok(())
}

fn import_entries(journal: &mut Journal<JsonStore>, path: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path).context("failed to read import file")?;
    let added = journal.import(&contents)?;
    info!(path, added, "imported entries");
    println!("Imported {added} new entries.");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_lists_every_command() {
        let mut cmd = Cli::command();
        let mut buffer = Vec::new();
        cmd.write_long_help(&mut buffer).expect("help output");
        let help = String::from_utf8(buffer).expect("utf8 help");
        for name in [
            "register", "login", "new", "list", "show", "edit", "delete", "search", "export",
            "import",
        ] {
            assert!(help.contains(name), "help is missing `{name}`");
        }
    }
}
