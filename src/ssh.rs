use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const KNOWN_HOSTS: &str = "known_hosts";

pub fn ssh_dir(home: &Path) -> PathBuf {
    home.join(".ssh")
}

pub fn key_path(home: &Path, key_name: &str) -> PathBuf {
    ssh_dir(home).join(key_name)
}

/// Create `dir` (and parents) if it is missing. New directories get 0700 on unix.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).with_context(|| format!("failed to create {}", dir.display()))
}

/// Create an empty 0600 file if `path` does not exist. Existing content is untouched.
pub fn ensure_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let mut opts = OpenOptions::new();
    opts.write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(())
}

/// Write the private key verbatim and leave it owner read/write only.
/// ssh refuses identity files that group or others can read.
pub fn write_private_key(path: &Path, key: &str) -> Result<()> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut f =
        opts.open(path).with_context(|| format!("failed to open key file {}", path.display()))?;
    // `mode` above only applies on creation; tighten a pre-existing file
    // before any key material lands in it
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        f.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to chmod key file {}", path.display()))?;
    }
    f.write_all(key.as_bytes())
        .with_context(|| format!("failed to write key file {}", path.display()))?;
    Ok(())
}

/// Materialize `~/.ssh`, `~/.ssh/known_hosts` and `~/.ssh/<key_name>`.
/// Safe to run repeatedly; returns the key file path.
pub fn provision(home: &Path, key: &str, key_name: &str) -> Result<PathBuf> {
    let dir = ssh_dir(home);
    ensure_dir(&dir)?;
    ensure_file(&dir.join(KNOWN_HOSTS))?;
    let path = key_path(home, key_name);
    write_private_key(&path, key)?;
    tracing::debug!("[deploy] identity written to {}", path.display());
    Ok(path)
}
