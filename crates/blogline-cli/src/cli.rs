use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line client for the blogline blogging platform.
#[derive(Parser, Debug)]
#[command(name = "blogline", version, about)]
pub struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "BLOGLINE_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login {
        /// Defaults to the last email used
        #[arg(long, short)]
        email: Option<String>,
    },
    /// Sign out and forget stored tokens
    Logout,
    /// Create an account; an OTP is emailed for verification
    Signup {
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        username: String,
        #[arg(long)]
        profession: Option<String>,
    },
    /// Verify the emailed OTP
    VerifyOtp {
        otp: String,
        /// Defaults to the email of the pending signup
        #[arg(long, short)]
        email: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// Search published blogs
    Search { query: String },
    #[command(subcommand)]
    Blogs(BlogsCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand, Debug)]
pub enum BlogsCommand {
    /// List blogs, optionally filtered by category
    List {
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, short, default_value_t = 1)]
        page: usize,
    },
    Show { id: String },
    /// Blogs written by a user (yourself by default)
    User { user_id: Option<String> },
    /// Publish a blog from a JSON draft file
    Create { draft: PathBuf },
    Update { id: String, draft: PathBuf },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        profession: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        profile_picture: Option<String>,
    },
    /// Request a presigned upload URL for a profile picture
    UploadUrl {
        #[arg(long, default_value = "image/jpeg")]
        file_type: String,
    },
}

impl Command {
    /// Commands that establish or discard a session rather than use one
    pub fn skips_hydration(&self) -> bool {
        matches!(
            self,
            Command::Login { .. }
                | Command::Logout
                | Command::Signup { .. }
                | Command::VerifyOtp { .. }
        )
    }
}
