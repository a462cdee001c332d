use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::AnalysisError;

/// A checkout on disk that is deleted when the guard goes out of scope.
///
/// Holding the guard is what keeps the clone alive: every exit path of the
/// per-repository work, early returns and errors included, releases the disk
/// space before the next repository starts.
#[derive(Debug)]
pub struct ClonedRepository {
    path: PathBuf,
}

impl ClonedRepository {
    /// Shallow-clones `url` into `<dest_root>/<owner>_<repo>`, reusing the
    /// directory when it already holds a checkout.
    pub async fn acquire(
        git: &Path,
        url: &str,
        dest_root: &Path,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let name = checkout_dir_name(url);
        let path = dest_root.join(&name);

        if is_valid_checkout(&path) {
            info!("  Repository '{}' already exists, skipping clone.", name);
            return Ok(ClonedRepository { path });
        }
        if path.exists() {
            warn!("  {} is not a git checkout, cloning again.", path.display());
            remove_repository(&path).map_err(|e| AnalysisError::CloneFailed {
                url: url.to_owned(),
                stderr: format!("could not clear {}: {}", path.display(), e),
            })?;
        }

        info!("  Cloning {} (shallow clone)...", name);
        // Released on failure as well, a killed clone leaves a partial tree behind.
        let guard = ClonedRepository { path };

        let mut cmd = Command::new(git);
        cmd.arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(&guard.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| AnalysisError::CloneFailed {
            url: url.to_owned(),
            stderr: format!("could not start {}: {}", git.display(), e),
        })?;
        let mut stderr = child.stderr.take();

        let outcome = tokio::time::timeout(timeout, async {
            let mut message = Vec::new();
            if let Some(pipe) = stderr.as_mut() {
                pipe.read_to_end(&mut message).await?;
            }
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, message))
        })
        .await;

        match outcome {
            Err(_) => {
                // Reaped before the guard removes the partial tree.
                if let Err(e) = child.kill().await {
                    warn!("  Could not stop git for {}: {}", url, e);
                }
                Err(AnalysisError::CloneTimeout {
                    url: url.to_owned(),
                    timeout,
                })
            }
            Ok(Err(e)) => Err(AnalysisError::CloneFailed {
                url: url.to_owned(),
                stderr: e.to_string(),
            }),
            Ok(Ok((status, message))) if !status.success() => Err(AnalysisError::CloneFailed {
                url: url.to_owned(),
                stderr: String::from_utf8_lossy(&message).trim().to_owned(),
            }),
            Ok(Ok(_)) => Ok(guard),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

impl Drop for ClonedRepository {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        info!("  Removing {} to free disk space...", self.name());
        if let Err(e) = remove_repository(&self.path) {
            warn!(
                "  Could not remove repository {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// `<owner>_<repo>` from the last two segments of the clone URL, without a
/// trailing `.git`. Repositories of different owners may share a name.
pub fn checkout_dir_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let mut segments = trimmed.rsplit('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(repo), Some(owner)) => format!("{owner}_{repo}"),
        (Some(repo), None) => repo.to_owned(),
        _ => trimmed.to_owned(),
    }
}

/// A completed clone. git writes `.git/index` once the work tree is checked
/// out, so an interrupted clone leaves a tree without it.
fn is_valid_checkout(path: &Path) -> bool {
    path.is_dir() && path.join(".git").join("index").is_file()
}

/// Deletes a directory tree. When the first attempt fails, write permission
/// is forced on every entry (git pack files are read-only) and it retries once.
pub fn remove_repository(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "retrying removal with write permissions");
            make_writable(path);
            fs::remove_dir_all(path)
        }
    }
}

fn make_writable(root: &Path) {
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut permissions = metadata.permissions();
        grant_owner_write(&mut permissions, metadata.is_dir());
        if let Err(e) = fs::set_permissions(entry.path(), permissions) {
            debug!(path = %entry.path().display(), error = %e, "chmod failed");
        }
    }
}

#[cfg(unix)]
fn grant_owner_write(permissions: &mut fs::Permissions, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;
    let extra = if is_dir { 0o700 } else { 0o600 };
    permissions.set_mode(permissions.mode() | extra);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn grant_owner_write(permissions: &mut fs::Permissions, _is_dir: bool) {
    permissions.set_readonly(false);
}
