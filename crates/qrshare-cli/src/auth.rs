use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use qrshare_core::StoredCredentials;
use qrshare_core::token::credentials_path;

pub fn save_credentials(profile: &str, creds: &StoredCredentials) -> Result<()> {
    write_credentials(&credentials_path(profile)?, creds)
}

pub fn remove_credentials(profile: &str) -> Result<bool> {
    let path = credentials_path(profile)?;
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn write_credentials(path: &Path, creds: &StoredCredentials) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string_pretty(creds)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write credentials to {}", path.display()))?;
    restrict_permissions(path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Shortened token for display, never the whole secret.
pub fn token_preview(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 20 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "*".repeat(chars.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrshare_core::{FileTokenStore, TokenStore};

    #[test]
    fn test_written_credentials_are_readable_by_core() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.default.json");
        let creds = StoredCredentials {
            server: "http://localhost:8080".to_string(),
            access_token: "abc".to_string(),
        };
        write_credentials(&path, &creds).unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get().as_deref(), Some("abc"));
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.default.json");
        let creds = StoredCredentials {
            server: "s".to_string(),
            access_token: "t".to_string(),
        };
        write_credentials(&path, &creds).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_token_preview() {
        assert_eq!(
            token_preview("eyJhbGciOiJIUzI1NiJ9.payload.signature"),
            "eyJhbGci...ignature"
        );
        assert_eq!(token_preview("short"), "*****");
    }
}
