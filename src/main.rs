use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

mod api;
mod auth;
mod autosave;
mod client;
mod config;
mod error;
mod store;

use api::{AutosavePayload, PostQuery, PostService, UpdatePost};
use auth::types::{LoginRequest, RegisterRequest};
use auth::AuthService;
use autosave::{AutosaveController, AutosaveStatus};
use config::{Command, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(
        api_url = %config.api_url,
        session_file = %config.session_file.display(),
        "Configuration loaded"
    );

    let store = store::SessionStore::open(&config.session_file)?;
    let auth_manager = Arc::new(auth::AuthManager::new(store.clone(), config.api_url.clone())?);
    let client = client::ScribeClient::new(
        auth_manager,
        config.api_url.clone(),
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;
    let auth_service = AuthService::new(client.clone());
    let posts = PostService::new(client);

    let result = match command {
        Command::Login { email } => cmd_login(&auth_service, email).await,
        Command::Register => cmd_register(&auth_service).await,
        Command::Logout => cmd_logout(&auth_service),
        Command::Whoami => cmd_whoami(&auth_service, &store).await,
        Command::List {
            status,
            category,
            tag,
            author,
            search,
            page,
            per_page,
        } => {
            let query = PostQuery {
                status,
                category,
                tag,
                author,
                search,
                page: Some(page),
                per_page: Some(per_page),
            };
            cmd_list(&posts, &query).await
        }
        Command::Show { slug } => cmd_show(&posts, &slug).await,
        Command::New { title } => cmd_new(&posts, title).await,
        Command::Edit { id } => cmd_edit(&posts, id, &config).await,
        Command::Publish { id } => cmd_publish(&posts, id).await,
        Command::Delete { id } => cmd_delete(&posts, id).await,
        Command::Categories => cmd_categories(&posts).await,
        Command::Tags => cmd_tags(&posts).await,
    };

    if let Err(e) = &result {
        let needs_login = e
            .downcast_ref::<error::ApiError>()
            .map(error::ApiError::requires_login)
            .unwrap_or(false);
        if needs_login {
            eprintln!("Run `scribe login` to authenticate.");
        }
    }

    result
}

async fn cmd_login(auth: &AuthService, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    let response = auth.login(&LoginRequest { email, password }).await?;
    println!("Logged in as {}", response.user.username);
    Ok(())
}

async fn cmd_register(auth: &AuthService) -> Result<()> {
    let username: String = Input::new()
        .with_prompt("Username")
        .interact_text()
        .context("Failed to read username")?;
    let email: String = Input::new()
        .with_prompt("Email")
        .interact_text()
        .context("Failed to read email")?;
    let display_name: String = Input::new()
        .with_prompt("Display name (optional)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read display name")?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .context("Failed to read password")?;

    let request = RegisterRequest {
        username,
        email,
        password,
        display_name: if display_name.is_empty() {
            None
        } else {
            Some(display_name)
        },
    };
    let response = auth.register(&request).await?;
    println!("Registered and logged in as {}", response.user.username);
    Ok(())
}

fn cmd_logout(auth: &AuthService) -> Result<()> {
    auth.logout()?;
    println!("Logged out");
    Ok(())
}

async fn cmd_whoami(auth: &AuthService, store: &store::SessionStore) -> Result<()> {
    // Token presence is checked locally, as the browser client does,
    // so a logged-out whoami needs no roundtrip.
    if store.session()?.is_none() {
        println!("Not logged in");
        return Ok(());
    }

    let user = auth.me().await?;
    println!("{} (user {})", user.username, user.id);
    if let Some(name) = &user.display_name {
        println!("  Display name: {}", name);
    }
    println!("  Email: {}", user.email);
    println!("  Role: {}", user.role);
    Ok(())
}

async fn cmd_list(posts: &PostService, query: &PostQuery) -> Result<()> {
    let page = posts.list(query).await?;

    for post in &page.posts {
        let author = post
            .author
            .as_ref()
            .map(|a| a.username.as_str())
            .unwrap_or("-");
        println!(
            "{:>5}  {:<10}  {:<32}  {:<16}  {}",
            post.id, post.status, post.slug, author, post.title
        );
    }
    println!(
        "page {} of {} ({} posts)",
        page.current_page, page.pages, page.total
    );
    Ok(())
}

async fn cmd_show(posts: &PostService, slug: &str) -> Result<()> {
    let post = posts.get(slug).await?;

    println!("# {}", post.title);
    if let Some(author) = &post.author {
        println!(
            "by {}",
            author.display_name.as_deref().unwrap_or(&author.username)
        );
    }
    print!("{}", post.status);
    if let Some(published) = post.published_at {
        print!(", published {}", published.format("%Y-%m-%d %H:%M"));
    }
    println!(" ({} views)", post.view_count);
    if !post.categories.is_empty() {
        let names: Vec<&str> = post.categories.iter().map(|c| c.name.as_str()).collect();
        println!("categories: {}", names.join(", "));
    }
    if !post.tags.is_empty() {
        let names: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
        println!("tags: {}", names.join(", "));
    }
    println!();
    println!("{}", post.content.as_deref().unwrap_or(""));
    Ok(())
}

async fn cmd_new(posts: &PostService, title: String) -> Result<()> {
    let content: String = Input::new()
        .with_prompt("Content")
        .interact_text()
        .context("Failed to read content")?;

    let post = posts.create(&api::NewPost::new(title, content)).await?;
    println!("Created draft {} ({})", post.id, post.slug);
    println!("Edit it with: scribe edit {}", post.id);
    Ok(())
}

/// Line-oriented editor with debounced draft snapshots
///
/// Every appended line feeds the autosave controller; the explicit
/// save on exit goes through the regular update endpoint.
async fn cmd_edit(posts: &PostService, id: i64, config: &Config) -> Result<()> {
    let post = posts.get_by_id(id).await?;
    let mut content = post.content.clone().unwrap_or_default();

    if let Some(draft) = posts.get_autosave(id).await? {
        let restore = Confirm::new()
            .with_prompt("Restore autosaved content?")
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
        if restore {
            content = draft.content;
        }
    }

    println!("Editing \"{}\" (post {})", post.title, id);
    println!("Type lines to append; :quit saves and exits.");
    if !content.is_empty() {
        println!("---");
        println!("{}", content);
        println!("---");
    }

    let controller = {
        let posts = posts.clone();
        let title = post.title.clone();
        AutosaveController::new(
            move |body: String| {
                let posts = posts.clone();
                let payload = AutosavePayload {
                    title: Some(title.clone()),
                    content: body,
                };
                async move { posts.autosave(id, &payload).await.map(|_| ()) }
            },
            content.clone(),
            config.autosave_delay,
        )
    };
    controller.observe(content.clone());

    let mut status_rx = controller.subscribe();
    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            match *status_rx.borrow_and_update() {
                AutosaveStatus::Saving => eprintln!("  Saving..."),
                AutosaveStatus::Saved => eprintln!("  Saved ✓"),
                AutosaveStatus::Error => eprintln!("  Save failed ✗"),
                AutosaveStatus::Idle => {}
            }
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line == ":quit" {
            break;
        }
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&line);
        controller.observe(content.clone());
    }

    controller.dispose();
    status_task.abort();
    if let Some(error) = controller.last_error() {
        tracing::warn!(error = %error, "Last draft snapshot failed");
    }

    let update = UpdatePost {
        content: Some(content),
        ..Default::default()
    };
    posts.update(id, &update).await?;
    println!("Post {} saved", id);
    Ok(())
}

async fn cmd_publish(posts: &PostService, id: i64) -> Result<()> {
    match posts.publish(id).await? {
        Some(post) => println!("Published {} ({})", post.id, post.slug),
        None => println!("Post {} was already published", id),
    }
    Ok(())
}

async fn cmd_delete(posts: &PostService, id: i64) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete post {}?", id))
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    if !confirmed {
        println!("Aborted");
        return Ok(());
    }

    posts.delete(id).await?;
    println!("Post {} deleted", id);
    Ok(())
}

async fn cmd_categories(posts: &PostService) -> Result<()> {
    for category in posts.list_categories().await? {
        println!(
            "{:>5}  {:<24}  {:>4} posts  {}",
            category.id, category.slug, category.post_count, category.name
        );
    }
    Ok(())
}

async fn cmd_tags(posts: &PostService) -> Result<()> {
    for tag in posts.list_tags().await? {
        println!(
            "{:>5}  {:<24}  {:>4} posts  {}",
            tag.id, tag.slug, tag.post_count, tag.name
        );
    }
    Ok(())
}
