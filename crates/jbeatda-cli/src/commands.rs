use std::io::{self, Write};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use tracing::{debug, warn};

use jbeatda_core::auth::jwt;
use jbeatda_core::models::Stamp;
use jbeatda_core::{AppContext, CachedData, CredentialStore, RepositoryError, Session};

/// Setting values longer than this are summarized in `settings`
const MAX_VALUE_PREVIEW: usize = 60;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        /// Account email (defaults to the last one used)
        #[arg(short, long)]
        email: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Sign out and drop the local session
    Logout,
    /// Show the signed-in user's profile
    Whoami,
    /// Show the current session state
    Session,
    /// Print every session change until interrupted
    WatchSession,
    /// List collected stamps (cached unless --refresh)
    Stamps {
        /// Fetch from the server before listing
        #[arg(long)]
        refresh: bool,
    },
    /// Show the stamp collected for a menu
    Stamp { menu_id: i64 },
    /// Delete a collected stamp
    DeleteStamp { stamp_id: i64 },
    /// List stored settings
    Settings,
}

impl Command {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        match self {
            Command::Login { email, remember } => login(ctx, email, remember).await,
            Command::Logout => {
                ctx.account.logout().await?;
                println!("Signed out.");
                Ok(())
            }
            Command::Whoami => whoami(ctx).await,
            Command::Session => {
                print_session(&ctx.account.current_session());
                Ok(())
            }
            Command::WatchSession => watch_session(ctx).await,
            Command::Stamps { refresh } => stamps(ctx, refresh).await,
            Command::Stamp { menu_id } => {
                let stamp = ctx.stamps.stamp_for_menu(menu_id).await.map_err(signed_in)?;
                print_stamps(std::slice::from_ref(&stamp));
                Ok(())
            }
            Command::DeleteStamp { stamp_id } => {
                ctx.stamps.delete_stamp(stamp_id).await.map_err(signed_in)?;
                println!("Deleted stamp {}.", stamp_id);
                Ok(())
            }
            Command::Settings => {
                settings(ctx);
                Ok(())
            }
        }
    }
}

// ===== Account =====

async fn login(ctx: &AppContext, email: Option<String>, remember: bool) -> Result<()> {
    let email = match email.or_else(|| ctx.config.last_email.clone()) {
        Some(email) => email.trim().to_string(),
        None => prompt("Email: ")?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }

    let credentials = CredentialStore::default();
    let remembered = match credentials.password(&email) {
        Ok(password) => password,
        Err(e) => {
            warn!(error = %e, "Keychain unavailable");
            None
        }
    };
    let used_remembered = remembered.is_some();
    let password = match remembered {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    println!("Signing in...");
    let account = match ctx.account.login(&email, &password).await {
        Ok(account) => account,
        Err(RepositoryError::Auth) => {
            if used_remembered {
                if let Err(e) = credentials.forget(&email) {
                    warn!(error = %e, "Failed to forget rejected password");
                }
            }
            bail!("Login rejected - check email and password");
        }
        Err(e) => return Err(e.into()),
    };

    if remember {
        if let Err(e) = credentials.store(&email, &password) {
            warn!(error = %e, "Failed to store credentials");
        }
    }

    let mut config = ctx.config.clone();
    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {}", account.profile.display_name());
    if let Some(at) = account.expires_at {
        println!("Session expires {}", local_time(at));
    }
    Ok(())
}

async fn whoami(ctx: &AppContext) -> Result<()> {
    let profile = ctx.account.profile().await.map_err(signed_in)?;
    println!("{}", profile.display_name());
    println!("  user id: {}", profile.user_id);
    if let Some(ref since) = profile.member_since {
        println!("  member since: {}", since);
    }
    if let Some(cached) = ctx.account.cached_profile() {
        debug!(age = %cached.age_display(), "Profile cache");
    }
    Ok(())
}

fn print_session(session: &Session) {
    let state = if session.is_authenticated {
        "signed in"
    } else if session.token.is_some() {
        "expired"
    } else {
        "signed out"
    };
    println!("Session: {}", state);

    if let Some(ref token) = session.token {
        println!("  token: {}", jwt::fingerprint(token));
    }
    if let Some(at) = session.expires_at {
        match session.minutes_until_expiry() {
            Some(minutes) if session.is_authenticated => {
                println!("  expires: {} ({}m left)", local_time(at), minutes)
            }
            _ => println!("  expired: {}", local_time(at)),
        }
    }
}

async fn watch_session(ctx: &AppContext) -> Result<()> {
    let mut sessions = ctx.account.session();
    println!("Watching session changes (Ctrl-C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = sessions.next() => match next {
                Some(session) => print_session(&session),
                None => break,
            },
        }
    }

    sessions.cancel();
    Ok(())
}

// ===== Stamps =====

async fn stamps(ctx: &AppContext, refresh: bool) -> Result<()> {
    let cached = ctx.stamps.cached_stamps();

    if !refresh {
        if let Some(cached) = cached {
            print_cached(&cached);
            return Ok(());
        }
    }

    match ctx.stamps.refresh_stamps().await {
        Ok(stamps) => {
            print_stamps(&stamps);
            Ok(())
        }
        // Stale data beats no data
        Err(e) if ctx.stamps.cached_stamps().is_some() && e.is_retryable() => {
            eprintln!("Could not refresh: {}", e);
            if let Some(cached) = ctx.stamps.cached_stamps() {
                print_cached(&cached);
            }
            Ok(())
        }
        Err(e) => Err(signed_in(e)),
    }
}

fn print_cached(cached: &CachedData<Vec<Stamp>>) {
    let stale = if cached.is_stale() { ", stale" } else { "" };
    println!("(cached {}{})", cached.age_display(), stale);
    print_stamps(&cached.data);
}

fn print_stamps(stamps: &[Stamp]) {
    if stamps.is_empty() {
        println!("No stamps collected yet.");
        return;
    }
    println!("{:>6}  {:>6}  {:<14}  IMAGE", "STAMP", "MENU", "COLLECTED");
    for stamp in stamps {
        println!(
            "{:>6}  {:>6}  {:<14}  {}",
            stamp.stamp_id,
            stamp.menu_id,
            stamp.created_display(),
            stamp.image.as_deref().unwrap_or("-")
        );
    }
}

// ===== Settings =====

fn settings(ctx: &AppContext) {
    let token_key = &ctx.session.keys().token;
    let keys = ctx.store.keys();
    if keys.is_empty() {
        println!("No settings stored in {}", ctx.store.dir().display());
        return;
    }

    for key in keys {
        let Some(value) = ctx.store.get(&key) else {
            continue;
        };
        let shown = if &key == token_key {
            jwt::fingerprint(&value)
        } else if value.chars().count() > MAX_VALUE_PREVIEW {
            format!("<{} bytes>", value.len())
        } else {
            value
        };
        println!("{} = {}", key, shown);
    }
}

// ===== Helpers =====

/// Turn an auth failure into a hint the user can act on
fn signed_in(err: RepositoryError) -> anyhow::Error {
    match err {
        RepositoryError::Auth => anyhow!("Not signed in or session expired. Run `jbeatda login`."),
        other => other.into(),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
