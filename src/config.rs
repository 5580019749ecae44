use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Scribe - command line client for the Scribe blogging backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the backend API
    #[arg(
        long,
        env = "SCRIBE_API_URL",
        default_value = "http://localhost:5000/api"
    )]
    pub api_url: String,

    /// Path to the local session database
    #[arg(long, env = "SCRIBE_SESSION_FILE")]
    pub session_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SCRIBE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Quiet period before a draft autosaves, in milliseconds
    #[arg(long, env = "SCRIBE_AUTOSAVE_DELAY_MS", default_value = "2000")]
    pub autosave_delay_ms: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "SCRIBE_CONNECT_TIMEOUT", default_value = "5")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "SCRIBE_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with email and password
    Login {
        /// Email address; prompted for when omitted
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in
    Register,
    /// Forget the stored session
    Logout,
    /// Show the currently logged-in user
    Whoami,
    /// List posts
    List {
        /// Filter by status (draft, published, archived)
        #[arg(long)]
        status: Option<String>,
        /// Filter by category slug
        #[arg(long)]
        category: Option<String>,
        /// Filter by tag slug
        #[arg(long)]
        tag: Option<String>,
        /// Filter by author username
        #[arg(long)]
        author: Option<String>,
        /// Full-text search over titles, content, and excerpts
        #[arg(long)]
        search: Option<String>,
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Posts per page
        #[arg(long, default_value = "10")]
        per_page: u32,
    },
    /// Show one post by slug
    Show { slug: String },
    /// Create a draft post
    New {
        /// Post title
        #[arg(long)]
        title: String,
    },
    /// Edit a post in the autosaving line editor
    Edit {
        /// Post id
        id: i64,
    },
    /// Publish a draft
    Publish { id: i64 },
    /// Delete a post
    Delete { id: i64 },
    /// List all categories
    Categories,
    /// List all tags
    Tags,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub api_url: String,

    // Local session
    pub session_file: PathBuf,

    // Editor
    pub autosave_delay: Duration,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();

        let session_file = match args.session_file {
            Some(path) => expand_tilde(&path),
            None => default_session_file()?,
        };

        let config = Config {
            // Trailing slashes would double up when paths are appended
            api_url: args.api_url.trim_end_matches('/').to_string(),
            session_file,
            autosave_delay: Duration::from_millis(args.autosave_delay_ms),
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.request_timeout,
            log_level: args.log_level,
        };

        config.validate()?;

        Ok((config, args.command))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!(
                "SCRIBE_API_URL must start with http:// or https://: {}",
                self.api_url
            );
        }

        if self.autosave_delay.is_zero() {
            anyhow::bail!("SCRIBE_AUTOSAVE_DELAY_MS must be greater than zero");
        }

        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Default session location under the user's home directory
fn default_session_file() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".scribe").join("session.sqlite3"))
}
