use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "notekeep")]
#[command(about = "Read and edit your Notekeep notes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the configured API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Keep the API token in this file instead of the OS keychain
    #[arg(long, global = true, value_name = "PATH")]
    pub token_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes, newest first
    List {
        /// Only show notes in this category
        #[arg(long, value_name = "ID")]
        category: Option<i64>,
        /// Follow the cursor until every page is loaded
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an empty note
    New {
        /// Category for the note (defaults to the first category)
        #[arg(long, value_name = "ID")]
        category: Option<i64>,
    },
    /// Edit a note; opens $EDITOR when no field flags are given
    Edit {
        /// Note ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
        /// Move the note to this category
        #[arg(long, value_name = "ID")]
        category: Option<i64>,
        /// On conflict, adopt the server version and save again
        #[arg(long)]
        force: bool,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Sign in, register, or inspect the current session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Configure the API endpoint
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories with their note counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a category
    Create {
        /// Category name
        name: String,
        /// Hex color such as #C8CFA0 (picked from the palette when omitted)
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Exchange username and password for an API token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Store an existing API token
    Token {
        token: String,
    },
    /// Show who is signed in
    Status,
    /// Forget the stored token
    Logout,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the API base URL to the config file
    Init {
        /// API base URL, e.g. https://notes.example.com
        #[arg(long, value_name = "URL")]
        api_base_url: String,
    },
    /// Print the effective configuration
    Show,
}
