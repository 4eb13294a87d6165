use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;

/// Patterns excluded from every deploy. They always lead the merged list.
pub const ALWAYS_EXCLUDE: &[&str] = &[".git", ".github", "node_modules"];

/// Parse an rsync `--exclude-from` style file: one pattern per line, blank
/// lines and `#` comments dropped.
pub fn parse_exclude_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Split a comma separated pattern list, dropping empty segments.
pub fn split_inline(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// builtins ++ file patterns ++ inline patterns. Duplicates are kept; rsync
/// resolves precedence itself.
pub fn build<S: AsRef<str>>(
    builtins: &[S],
    file_content: Option<&str>,
    inline: Option<&str>,
) -> Vec<String> {
    let mut out: Vec<String> = builtins.iter().map(|s| s.as_ref().to_string()).collect();
    if let Some(text) = file_content {
        out.extend(parse_exclude_lines(text));
    }
    if let Some(list) = inline {
        out.extend(split_inline(list));
    }
    out
}

pub fn resolve_exclude_path(workspace: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() { p.to_path_buf() } else { workspace.join(p) }
}

/// Read the exclude file if it exists. A missing file is not an error.
pub fn read_exclude_file(workspace: &Path, rel: &str) -> Result<Option<String>> {
    let path = resolve_exclude_path(workspace, rel);
    if !path.exists() {
        tracing::warn!("[deploy] exclude file not found, ignoring: {}", path.display());
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read exclude file {}", path.display()))?;
    Ok(Some(text))
}

/// Merge the built-in, file and inline exclusions for a resolved config.
pub fn collect(workspace: &Path, cfg: &Config) -> Result<Vec<String>> {
    let file_content = match cfg.exclude_file.as_deref() {
        Some(rel) => read_exclude_file(workspace, rel)?,
        None => None,
    };
    let merged = build(ALWAYS_EXCLUDE, file_content.as_deref(), cfg.extra_exclude.as_deref());
    tracing::debug!("[deploy] excludes: {:?}", merged);
    Ok(merged)
}
