//! Command handlers. Each one talks to the backend through the shared
//! `HttpClient` and prints a plain-text result to stdout.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use blogline_core::auth::{format_countdown, OtpCountdown};
use blogline_core::feed::{BlogFeed, Category};
use blogline_core::models::{Blog, BlogDraft, NewUser, ProfileUpdate, UserProfile};
use blogline_core::utils::{format_optional, truncate_string};
use blogline_core::{AuthApi, BlogApi, Config, HttpClient};

use crate::cli::{BlogsCommand, Command, ProfileCommand};

/// Width of the brief column in listings
const BRIEF_WIDTH: usize = 60;

pub struct App {
    pub http: HttpClient,
    pub config: Config,
    /// Background session restore, awaited only by commands that need a user
    pub hydration: Option<JoinHandle<Option<UserProfile>>>,
}

impl App {
    fn auth(&self) -> AuthApi {
        AuthApi::new(self.http.clone())
    }

    fn blogs(&self) -> BlogApi {
        BlogApi::new(self.http.clone())
    }

    fn otp_countdown(&self) -> Result<OtpCountdown> {
        Ok(OtpCountdown::new(self.config.cache_dir()?))
    }

    async fn wait_for_session(&mut self) {
        if let Some(handle) = self.hydration.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session hydration task failed");
            }
        }
    }

    async fn require_user(&mut self) -> Result<UserProfile> {
        self.wait_for_session().await;
        match self.http.session().current_user() {
            Some(user) => Ok(user),
            None => bail!("Not signed in. Run `blogline login` first."),
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => self.login(email).await,
            Command::Logout => {
                self.auth().logout();
                println!("Signed out.");
                Ok(())
            }
            Command::Signup {
                email,
                username,
                profession,
            } => self.signup(email, username, profession).await,
            Command::VerifyOtp { otp, email } => self.verify_otp(&otp, email).await,
            Command::Whoami => {
                self.wait_for_session().await;
                match self.http.session().current_user() {
                    Some(user) => print_profile(&user),
                    None => println!("Not signed in."),
                }
                Ok(())
            }
            Command::Search { query } => {
                let result = self.blogs().search(&query).await?;
                if result.blogs.is_empty() {
                    println!("No blogs match \"{}\".", query.trim());
                }
                print_blogs(result.blogs.iter());
                Ok(())
            }
            Command::Blogs(cmd) => self.run_blogs(cmd).await,
            Command::Profile(cmd) => self.run_profile(cmd).await,
        }
    }

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        let user = self.auth().login(&email, &password).await?;
        println!("Signed in as {}.", user.display_name());

        self.config.last_email = Some(email.trim().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    async fn signup(&self, email: String, username: String, profession: Option<String>) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let registered = self
            .auth()
            .signup(NewUser {
                email,
                password,
                username,
                profession,
                ..Default::default()
            })
            .await?;

        let pending = self.otp_countdown()?.start(&registered, Utc::now())?;
        println!(
            "An OTP was sent to {}. It expires in {}.",
            pending.email,
            format_countdown(pending.expires_at - Utc::now())
        );
        println!("Run `blogline verify-otp <code>` to finish.");
        Ok(())
    }

    async fn verify_otp(&self, otp: &str, email: Option<String>) -> Result<()> {
        let countdown = self.otp_countdown()?;
        let email = otp_email_in_window(&countdown, email, Utc::now())?;

        let message = self.auth().verify_otp(otp, &email).await?;
        countdown.clear()?;
        if message.is_empty() {
            println!("Email verified. You can now log in.");
        } else {
            println!("{}", message);
        }
        Ok(())
    }

    async fn run_blogs(&mut self, command: BlogsCommand) -> Result<()> {
        match command {
            BlogsCommand::List { category, page } => {
                let listing = self.blogs().list().await?;
                let mut feed = BlogFeed::new(listing.blogs);
                if let Some(ref name) = category {
                    let name = Category::from_title(name)
                        .map(|c| c.title().to_string())
                        .unwrap_or_else(|| name.clone());
                    feed.select_category(Some(&name));
                }
                feed.set_page(page);

                print_blogs(feed.page_items());
                if feed.total_pages() > 1 {
                    let pages: Vec<String> = feed
                        .page_numbers()
                        .iter()
                        .map(|n| {
                            if *n == feed.current_page() {
                                format!("[{}]", n)
                            } else {
                                n.to_string()
                            }
                        })
                        .collect();
                    println!(
                        "\nPage {} of {} ({} blogs): {}",
                        feed.current_page(),
                        feed.total_pages(),
                        feed.total_count(),
                        pages.join(" ")
                    );
                }
                Ok(())
            }
            BlogsCommand::Show { id } => {
                let blog = self.blogs().get(&id).await?;
                print_blog(&blog);
                Ok(())
            }
            BlogsCommand::User { user_id } => {
                let user_id = match user_id {
                    Some(id) => id,
                    None => self.require_user().await?.id,
                };
                let blogs = self.blogs().user_blogs(&user_id).await?;
                print_blogs(blogs.iter());
                Ok(())
            }
            BlogsCommand::Create { draft } => {
                let user = self.require_user().await?;
                let draft = read_draft(&draft, &user)?;
                let blog = self.blogs().create(&draft).await?;
                println!("Published \"{}\" ({}).", blog.title, blog.id);
                Ok(())
            }
            BlogsCommand::Update { id, draft } => {
                let user = self.require_user().await?;
                let draft = read_draft(&draft, &user)?;
                let blog = self.blogs().update(&id, &draft).await?;
                println!("Updated \"{}\".", blog.title);
                Ok(())
            }
            BlogsCommand::Delete { id } => {
                self.require_user().await?;
                self.blogs().delete(&id).await?;
                println!("Deleted {}.", id);
                Ok(())
            }
        }
    }

    async fn run_profile(&mut self, command: ProfileCommand) -> Result<()> {
        let user = self.require_user().await?;
        match command {
            ProfileCommand::Update {
                username,
                profession,
                bio,
                profile_picture,
            } => {
                let update = ProfileUpdate {
                    username,
                    profession,
                    bio,
                    profile_picture,
                };
                let updated = self.auth().update_profile(&update).await?;
                print_profile(&updated);
            }
            ProfileCommand::UploadUrl { file_type } => {
                let target = self.auth().upload_url(&user.id, &file_type).await?;
                println!("Upload URL: {}", target.upload_url);
                println!("Object URL: {}", target.object_url());
            }
        }
        Ok(())
    }
}

/// Email to verify, provided its OTP countdown is still running
fn otp_email_in_window(
    countdown: &OtpCountdown,
    email: Option<String>,
    now: DateTime<Utc>,
) -> Result<String> {
    let email = match email {
        Some(email) => email.trim().to_string(),
        None => match countdown.pending()? {
            Some(pending) => pending.email,
            None => bail!("No pending signup. Pass --email."),
        },
    };

    let left = countdown.remaining_for(&email, now)?;
    if left <= Duration::zero() {
        bail!("The OTP has expired. Sign up again to receive a new code.");
    }
    debug!(left = %format_countdown(left), "OTP countdown");
    Ok(email)
}

/// Load a draft, filling in the author from the signed-in user
fn read_draft(path: &Path, user: &UserProfile) -> Result<BlogDraft> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft {}", path.display()))?;
    let mut draft: BlogDraft =
        serde_json::from_str(&contents).context("Failed to parse blog draft")?;
    if draft.user_id.is_empty() {
        draft.user_id = user.id.clone();
    }
    if draft.author.is_empty() {
        draft.author = user.display_name().to_string();
    }
    Ok(draft)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_profile(user: &UserProfile) {
    println!("{} <{}>", user.display_name(), user.email);
    println!("  id:         {}", user.id);
    println!("  profession: {}", format_optional(user.profession.as_deref(), "-"));
    println!("  bio:        {}", format_optional(user.bio.as_deref(), "-"));
    println!("  verified:   {}", if user.is_verified { "yes" } else { "no" });
}

fn print_blogs<'a>(blogs: impl IntoIterator<Item = &'a Blog>) {
    for blog in blogs {
        println!(
            "{:<26} {:<12} {}",
            blog.id,
            blog.published_display(),
            truncate_string(&blog.title, BRIEF_WIDTH)
        );
        if !blog.brief.trim().is_empty() {
            println!("{:<39} {}", "", truncate_string(blog.brief.trim(), BRIEF_WIDTH));
        }
    }
}

fn print_blog(blog: &Blog) {
    println!("{}", blog.title);
    println!("by {} on {}", format_optional(Some(blog.author.as_str()), "unknown"), blog.published_display());
    if !blog.tags.is_empty() {
        println!("tags: {}", blog.tags.join(", "));
    }
    println!();
    if !blog.brief.trim().is_empty() {
        println!("{}\n", blog.brief.trim());
    }
    println!("{}", blog.content);
}
