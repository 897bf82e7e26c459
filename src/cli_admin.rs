//! Operator CLI standing in for the external account and publishing
//! subsystems: creates users and videos, issues auth tokens, toggles
//! publish state. The server itself exposes none of these.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use clipflow_server::engagement::{AuthToken, AuthTokenValue, SqliteEngagementStore};
use clipflow_server::engagement::{CatalogStore, AuthTokenStore};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file for platform storage.
    pub db_file_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user and print its id.
    CreateUser {
        username: String,
        #[clap(long)]
        avatar: Option<String>,
    },
    /// Create a video owned by a user and print its id.
    CreateVideo {
        owner_id: usize,
        title: String,
        #[clap(long)]
        thumbnail: Option<String>,
        #[clap(long)]
        video_file: Option<String>,
        #[clap(long)]
        duration: Option<f64>,
    },
    /// Set the publish flag of a video.
    SetPublished {
        video_id: String,
        #[clap(long)]
        published: bool,
    },
    /// Issue a bearer token for a user and print it.
    IssueToken { user_id: usize },
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if !cli_args.db_file_path.exists() {
        bail!(
            "Database file {:?} does not exist; start the server once to create it.",
            cli_args.db_file_path
        );
    }
    let store = SqliteEngagementStore::new(&cli_args.db_file_path)
        .context("Failed to open platform store")?;

    match cli_args.command {
        Command::CreateUser { username, avatar } => {
            let user_id = store.create_user(&username, avatar.as_deref())?;
            println!("{}", user_id);
        }
        Command::CreateVideo {
            owner_id,
            title,
            thumbnail,
            video_file,
            duration,
        } => {
            let video_id = store.create_video(
                owner_id,
                &title,
                thumbnail.as_deref(),
                video_file.as_deref(),
                duration,
            )?;
            println!("{}", video_id);
        }
        Command::SetPublished {
            video_id,
            published,
        } => {
            store.set_video_published(&video_id, published)?;
        }
        Command::IssueToken { user_id } => {
            if !store.user_exists(user_id)? {
                bail!("User {} does not exist.", user_id);
            }
            let token = AuthToken {
                user_id,
                value: AuthTokenValue::generate(),
            };
            store.add_auth_token(token.clone())?;
            println!("{}", token.value.0);
        }
    }

    Ok(())
}
