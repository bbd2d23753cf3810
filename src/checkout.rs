use anyhow::{Context, Result, bail};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// `https://github.com/org/fastapi-nano.git/` -> `fastapi-nano`.
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// A shallow clone on local disk, removed when dropped.
pub struct RepoCheckout {
    name: String,
    path: PathBuf,
    removed: bool,
}

impl RepoCheckout {
    /// Clone `url` into `<workdir>/<repo name>`, replacing any stale copy.
    pub fn clone(url: &str, workdir: &Path) -> Result<Self> {
        let name = repo_name_from_url(url);
        if name.is_empty() {
            bail!("cannot derive a repository name from {url}");
        }
        fs::create_dir_all(workdir)
            .with_context(|| format!("create dir {}", workdir.display()))?;
        let path = workdir.join(&name);
        if path.exists() {
            remove_tree(&path).with_context(|| format!("remove stale {}", path.display()))?;
        }

        info!(repo = %name, url = %url, "cloning");
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(&path)
            .output()
            .context("run git clone")?;
        if !output.status.success() {
            if let Err(err) = remove_tree(&path) {
                warn!(path = %path.display(), error = %err, "failed to remove partial clone");
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git clone {url} failed: {}", stderr.trim());
        }
        Ok(Self {
            name,
            path,
            removed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cleanup(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        if !self.path.exists() {
            return Ok(());
        }
        info!(path = %self.path.display(), "removing checkout");
        remove_tree(&self.path).with_context(|| format!("remove {}", self.path.display()))
    }
}

impl Drop for RepoCheckout {
    fn drop(&mut self) {
        if let Err(err) = self.cleanup() {
            warn!(error = %err, "checkout cleanup failed");
        }
    }
}

/// Recursive delete; on a permission error, clear read-only bits and retry once.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            make_writable(path)?;
            fs::remove_dir_all(path)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_from_urls() {
        assert_eq!(
            repo_name_from_url("https://github.com/rednafi/fastapi-nano"),
            "fastapi-nano"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/nsidnev/fastapi-realworld-example-app.git/"),
            "fastapi-realworld-example-app"
        );
        assert_eq!(repo_name_from_url("git@github.com:org/tool.git"), "tool");
    }

    #[test]
    fn remove_tree_handles_read_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("checkout");
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        let file = root.join("pkg").join("locked.py");
        std::fs::write(&file, "x = 1\n").unwrap();
        let mut perms = std::fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&file, perms).unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
        remove_tree(&root).unwrap();
    }

    #[test]
    fn failed_clone_leaves_no_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("no-such-repo");
        let workdir = dir.path().join("work");

        let result = RepoCheckout::clone(&source.to_string_lossy(), &workdir);
        assert!(result.is_err());
        assert!(workdir.is_dir());
        assert!(!workdir.join("no-such-repo").exists());
    }
}
