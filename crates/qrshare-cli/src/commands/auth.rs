use anyhow::{Context, Result};
use colored::Colorize;
use qrshare_core::token::TOKEN_ENV_VAR;
use qrshare_core::{EnvTokenStore, FileTokenStore, StoredCredentials, TokenStore};

use crate::auth;
use crate::cli::LoginArgs;
use crate::output::{print_error, print_success};

pub fn login(server: &str, args: &LoginArgs, profile: &str) -> Result<()> {
    let token = args
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .context("--token is required")?;

    let creds = StoredCredentials {
        server: server.to_string(),
        access_token: token.to_string(),
    };
    auth::save_credentials(profile, &creds)?;
    print_success(&format!(
        "Saved bearer token for {} (profile: {})",
        server.cyan(),
        profile.cyan()
    ));
    Ok(())
}

pub fn logout(profile: &str) -> Result<()> {
    if auth::remove_credentials(profile)? {
        print_success("Logged out (credentials removed)");
    } else {
        println!("No credentials found for profile \"{profile}\"");
    }
    Ok(())
}

/// Where the bearer token for authenticated calls comes from.
#[derive(Debug)]
enum AuthSource {
    Session(String),
    Stored(StoredCredentials),
}

/// Same tier order the client uses: session tier, then durable tier.
fn resolve_auth(session: &dyn TokenStore, durable: &FileTokenStore) -> Option<AuthSource> {
    if let Some(token) = session.get() {
        return Some(AuthSource::Session(token));
    }
    durable.get().and(durable.load()).map(AuthSource::Stored)
}

pub fn whoami(profile: &str) -> Result<()> {
    let session = EnvTokenStore::new(TOKEN_ENV_VAR);
    let durable = FileTokenStore::for_profile(profile)?;

    match resolve_auth(&session, &durable) {
        Some(AuthSource::Session(token)) => {
            println!("{}: {}", "Profile".cyan(), profile);
            println!(
                "{}: Bearer from {} (token: {})",
                "Auth".cyan(),
                TOKEN_ENV_VAR,
                auth::token_preview(&token)
            );
        }
        Some(AuthSource::Stored(creds)) => {
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "Server".cyan(), creds.server.cyan());
            println!(
                "{}: Bearer (token: {})",
                "Auth".cyan(),
                auth::token_preview(&creds.access_token)
            );
        }
        None => {
            print_error(&format!("Not logged in (profile: \"{profile}\")"));
        }
    }
    Ok(())
}
