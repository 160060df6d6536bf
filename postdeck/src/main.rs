//! postdeck - Review and publish social media posts
//!
//! Unix-style front end to the Postdeck post lifecycle.

use clap::{Args, Parser, Subcommand, ValueEnum};
use libpostdeck::compose::ComposeRequest;
use libpostdeck::credentials::{CredentialManager, KeySource};
use libpostdeck::error::CredentialError;
use libpostdeck::logging::LoggingConfig;
use libpostdeck::service::{PostdeckService, PublishReport, PublishRequest};
use libpostdeck::{
    Config, NewPost, Post, PostStatus, PostUpdate, PostdeckError, PublishTarget, Result,
};
use std::io::{IsTerminal, Read};

#[derive(Parser, Debug)]
#[command(name = "postdeck")]
#[command(version)]
#[command(about = "Review and publish social media posts")]
#[command(long_about = "\
postdeck - Review and publish social media posts

DESCRIPTION:
    postdeck keeps a queue of social media posts and walks each one through
    review before it goes out. A post starts as pending (or draft), must be
    approved, and is then published through Metricool or queued for the
    LinkedIn auto-poster.

USAGE EXAMPLES:
    # Create a post (body from argument or stdin)
    postdeck create \"Hello world\" --hashtag '#rust' --link https://example.com
    echo \"Hello from a pipe\" | postdeck create

    # Review
    postdeck list --status pending
    postdeck approve 3

    # Check without sending, then publish for real
    postdeck publish 3 --dry-run --target linkedin
    postdeck publish 3 --target metricool --workspace 12345

    # Retry after a failure
    postdeck publish 3 --retry

    # Store an API key (prompted when no value is given)
    postdeck keys set metricool

CONFIGURATION:
    Configuration file: ~/.config/postdeck/config.toml
    Database location: ~/.local/share/postdeck/posts.db

    Override with environment variables:
        POSTDECK_CONFIG          - Path to config file
        POSTDECK_DB_PATH         - Path to the post store
        POSTDECK_<NAME>_API_KEY  - API key override (e.g. POSTDECK_METRICOOL_API_KEY)
        POSTDECK_LOG_FORMAT      - text, json or pretty
        POSTDECK_LOG_LEVEL       - error, warn, info, debug, trace

EXIT CODES:
    0 - Success
    1 - Publish failed, or storage/network/configuration error
    2 - Missing or rejected credentials
    3 - Invalid input, unknown post, or post in the wrong status
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Content fields shared by `create` and `edit`
#[derive(Args, Debug, Default)]
struct ContentArgs {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    page_name: Option<String>,

    #[arg(long)]
    page_url: Option<String>,

    /// Hashtag, in order (repeatable)
    #[arg(short = 't', long = "hashtag")]
    hashtags: Vec<String>,

    /// Link appended below the body
    #[arg(short, long)]
    link: Option<String>,

    /// Media path or URL (repeatable)
    #[arg(short, long)]
    media: Vec<String>,

    /// Alt text for the media item at the same position (repeatable)
    #[arg(long = "alt")]
    alt_texts: Vec<String>,

    /// Metricool channel id (repeatable)
    #[arg(short, long = "channel")]
    channels: Vec<String>,

    /// Timestamp stored with the post (informational)
    #[arg(short, long)]
    schedule: Option<String>,
}

/// Fields `edit --clear` can empty
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ClearField {
    Hashtags,
    /// Media and their alt texts
    Media,
    Alt,
    Channels,
    Link,
    Schedule,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a post (pending review unless --draft)
    Create {
        /// Post body; read from stdin when omitted or "-"
        body: Option<String>,

        #[command(flatten)]
        content: ContentArgs,

        /// Keep as a draft instead of submitting for review
        #[arg(long)]
        draft: bool,

        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List posts, most recent first
    List {
        /// Only posts with this status (exact match)
        #[arg(long)]
        status: Option<String>,

        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show one post
    Show {
        id: i64,

        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Change a draft or pending post
    Edit {
        id: i64,

        /// Replacement body
        #[arg(short, long)]
        body: Option<String>,

        #[command(flatten)]
        content: ContentArgs,

        /// Empty a field (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<ClearField>,
    },

    /// Submit a draft for review
    Submit { id: i64 },

    /// Approve a pending post
    Approve { id: i64 },

    /// Reject a pending post
    Reject { id: i64 },

    /// Print the text exactly as it will be published
    Preview { id: i64 },

    /// Delete a post permanently
    Delete { id: i64 },

    /// Publish an approved post
    Publish {
        id: i64,

        /// Validate only; nothing is sent
        #[arg(long)]
        dry_run: bool,

        /// Allow publishing a post whose last attempt failed
        #[arg(long)]
        retry: bool,

        /// metricool or linkedin (defaults to [publish] default_target)
        #[arg(long)]
        target: Option<String>,

        /// Metricool workspace id for this publish
        #[arg(short, long)]
        workspace: Option<String>,

        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Draft a post with the configured language model
    Compose {
        topic: String,

        #[arg(long)]
        tone: Option<String>,

        /// Store the result as a new post
        #[arg(long)]
        save: bool,

        /// With --save, keep it as a draft
        #[arg(long, requires = "save")]
        draft: bool,
    },

    /// Manage stored API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Store a key (prompted, or read from stdin, when no value is given)
    Set { name: String, value: Option<String> },

    /// List key names and where each resolves from
    List,

    /// Remove a stored key
    Delete { name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env("error", cli.verbose).init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Returns the process exit code on success paths
async fn run(cli: Cli) -> Result<i32> {
    let config = Config::load()?;
    let service = PostdeckService::from_config(config).await?;
    let lifecycle = service.lifecycle();

    match cli.command {
        Commands::Create {
            body,
            content,
            draft,
            format,
        } => {
            let body = read_body(body)?;
            let post = lifecycle
                .create(new_post(body, content, draft))
                .await?;
            if format == "json" {
                print_json(&post)?;
            } else {
                println!("{}", post.id);
            }
        }
        Commands::List { status, format } => {
            let status = status
                .map(|s| s.parse::<PostStatus>())
                .transpose()
                .map_err(PostdeckError::Validation)?;
            let posts = lifecycle.list(status).await?;
            if format == "json" {
                print_json(&posts)?;
            } else {
                for post in &posts {
                    println!(
                        "{} | {} | {}",
                        post.id,
                        post.status,
                        truncate_content(&post.body, 50)
                    );
                }
            }
        }
        Commands::Show { id, format } => {
            let post = lifecycle.get(id).await?;
            if format == "json" {
                print_json(&post)?;
            } else {
                print_post(&post);
            }
        }
        Commands::Edit {
            id,
            body,
            content,
            clear,
        } => {
            let post = lifecycle.edit(id, post_update(body, content, &clear)).await?;
            println!("{} {}", post.id, post.status);
        }
        Commands::Submit { id } => print_status(&lifecycle.submit(id).await?),
        Commands::Approve { id } => print_status(&lifecycle.approve(id).await?),
        Commands::Reject { id } => print_status(&lifecycle.reject(id).await?),
        Commands::Preview { id } => print!("{}", lifecycle.preview(id).await?),
        Commands::Delete { id } => {
            lifecycle.delete(id).await?;
            println!("Deleted post {}", id);
        }
        Commands::Publish {
            id,
            dry_run,
            retry,
            target,
            workspace,
            format,
        } => {
            let target = target
                .map(|t| t.parse::<PublishTarget>())
                .transpose()
                .map_err(PostdeckError::Validation)?;
            let report = service
                .publish(
                    id,
                    PublishRequest {
                        dry_run,
                        retry,
                        target,
                        workspace_id: workspace,
                    },
                )
                .await?;

            if format == "json" {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
            if report.outcome.is_failure() {
                return Ok(1);
            }
        }
        Commands::Compose {
            topic,
            tone,
            save,
            draft,
        } => {
            let composed = service.compose(&ComposeRequest { topic, tone }).await?;
            if save {
                let post = lifecycle
                    .create(NewPost {
                        hashtags: composed.hashtags,
                        draft,
                        ..NewPost::with_body(composed.body)
                    })
                    .await?;
                println!("{}", post.id);
            } else {
                println!("{}", composed.body);
                if !composed.hashtags.is_empty() {
                    println!("\n{}", composed.hashtags.join(" "));
                }
            }
        }
        Commands::Keys { command } => cmd_keys(service.credentials(), command)?,
    }

    Ok(0)
}

fn cmd_keys(credentials: &CredentialManager, command: KeysCommand) -> Result<()> {
    match command {
        KeysCommand::Set { name, value } => {
            let value = match value {
                Some(value) => value,
                None => read_secret(&name)?,
            };
            credentials.set(&name, &value)?;
            println!("Stored key '{}'", name);
        }
        KeysCommand::List => {
            for key in credentials.list()? {
                let source = match key.source {
                    Some(KeySource::Env) => "env",
                    Some(KeySource::Store) => credentials.backend_name(),
                    None => "missing",
                };
                println!("{} ({})", key.name, source);
            }
        }
        KeysCommand::Delete { name } => {
            credentials.delete(&name)?;
            println!("Deleted key '{}'", name);
        }
    }
    Ok(())
}

fn new_post(body: String, content: ContentArgs, draft: bool) -> NewPost {
    NewPost {
        title: content.title,
        page_name: content.page_name,
        page_url: content.page_url,
        body,
        hashtags: content.hashtags,
        link_url: content.link,
        media_paths: content.media,
        alt_texts: content.alt_texts,
        channels: content.channels,
        scheduled_for: content.schedule,
        draft,
    }
}

/// Only flags that were given become changes; `clear` empties fields
fn post_update(body: Option<String>, content: ContentArgs, clear: &[ClearField]) -> PostUpdate {
    let list = |values: Vec<String>, fields: &[ClearField]| -> Option<Vec<String>> {
        if !values.is_empty() {
            Some(values)
        } else if fields.iter().any(|field| clear.contains(field)) {
            Some(Vec::new())
        } else {
            None
        }
    };
    // Empty text is stored as "absent"
    let text = |value: Option<String>, field: ClearField| {
        value.or_else(|| clear.contains(&field).then(String::new))
    };

    PostUpdate {
        title: content.title,
        page_name: content.page_name,
        page_url: content.page_url,
        body,
        hashtags: list(content.hashtags, &[ClearField::Hashtags]),
        link_url: text(content.link, ClearField::Link),
        media_paths: list(content.media, &[ClearField::Media]),
        alt_texts: list(content.alt_texts, &[ClearField::Alt, ClearField::Media]),
        channels: list(content.channels, &[ClearField::Channels]),
        scheduled_for: text(content.schedule, ClearField::Schedule),
    }
}

/// Body from the argument, or stdin when it is absent or "-"
fn read_body(body: Option<String>) -> Result<String> {
    match body {
        Some(body) if body != "-" => Ok(body),
        _ => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(PostdeckError::Validation(
                    "No post body given (pass it as an argument or pipe it to stdin)".to_string(),
                ));
            }
            let mut buffer = String::new();
            stdin
                .read_to_string(&mut buffer)
                .map_err(|e| PostdeckError::Validation(format!("Failed to read stdin: {}", e)))?;
            Ok(buffer.trim_end().to_string())
        }
    }
}

fn read_secret(name: &str) -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(rpassword::prompt_password(format!("Value for '{}': ", name))
            .map_err(CredentialError::Io)?);
    }

    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer).map_err(CredentialError::Io)?;
    Ok(buffer.trim_end().to_string())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PostdeckError::Validation(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_status(post: &Post) {
    println!("{} {}", post.id, post.status);
}

fn print_post(post: &Post) {
    println!("id:        {}", post.id);
    println!("status:    {}", post.status);
    if let Some(title) = &post.title {
        println!("title:     {}", title);
    }
    if !post.channels.is_empty() {
        println!("channels:  {}", post.channels.join(", "));
    }
    if let Some(scheduled) = &post.scheduled_for {
        println!("scheduled: {}", scheduled);
    }
    println!("created:   {}", format_timestamp(post.created_at));
    if let Some(published) = post.published_at {
        println!("published: {}", format_timestamp(published));
    }
    if let Some(remote) = &post.remote_ref {
        println!("remote:    {}", remote);
    }
    if let Some(error) = &post.last_error {
        println!("error:     {}", error);
    }
    println!();
    print!("{}", libpostdeck::render::render_post(post));
}

fn print_report(report: &PublishReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!(
        "{} {} via {}{}: {}",
        report.post.id,
        report.post.status,
        report.publisher,
        mode,
        report.outcome.message()
    );
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Truncate content to max chars with ellipsis, on one line
fn truncate_content(content: &str, max_len: usize) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() <= max_len {
        single_line
    } else {
        let truncated: String = single_line.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}
