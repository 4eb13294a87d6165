use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::DeployError;

pub const DEFAULT_ARGS: &str =
    "-azvr --inplace --exclude='.*' --no-perms --no-times --delete-after";
pub const DEFAULT_SOURCE: &str = "public/";
pub const DEFAULT_PORT: &str = "22";
pub const DEFAULT_KEY_NAME: &str = "deploy_key";

/// Prefix of the secondary name each input is looked up under when the bare
/// name is not set at all (e.g. `INPUT_REMOTE_HOST`).
pub const INPUT_PREFIX: &str = "INPUT_";

/// A source of named configuration values.
///
/// `lookup` returns the raw value if the key is present, even when empty; the
/// resolver decides what empty means.
pub trait ConfigSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn lookup(&self, key: &str) -> Option<String> {
        // a set but non-UTF-8 value still counts as present
        std::env::var_os(key)
            .map(|v| v.into_string().unwrap_or_else(|raw| raw.to_string_lossy().into_owned()))
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolved deploy configuration. Built once by [`resolve`], never mutated.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub user: String,
    pub port: String,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub key_name: String,
    pub remote_path: String,
    pub source: String,
    pub rsync_args: String,
    pub exclude_file: Option<String>,
    pub extra_exclude: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("port", &self.port)
            .field("private_key", &"<redacted>")
            .field("key_name", &self.key_name)
            .field("remote_path", &self.remote_path)
            .field("source", &self.source)
            .field("rsync_args", &self.rsync_args)
            .field("exclude_file", &self.exclude_file)
            .field("extra_exclude", &self.extra_exclude)
            .finish()
    }
}

impl Config {
    /// Remote path with a guaranteed trailing slash.
    pub fn remote_dest(&self) -> String {
        ensure_slash(&self.remote_path)
    }

    /// `user@host:/remote/path/` as handed to rsync.
    pub fn destination(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.remote_dest())
    }
}

pub fn ensure_slash(p: &str) -> String {
    if p.ends_with('/') { p.to_string() } else { format!("{}/", p) }
}

/// Look up `key`, falling back to `INPUT_<key>` only when `key` is not set at
/// all. Empty values count as absent.
pub fn from_source<S: ConfigSource + ?Sized>(source: &S, key: &str) -> Option<String> {
    let raw = match source.lookup(key) {
        Some(v) => Some(v),
        None => source.lookup(&format!("{}{}", INPUT_PREFIX, key)),
    };
    raw.filter(|v| !v.is_empty())
}

/// Build a [`Config`] from named values, reporting every missing required
/// input at once.
pub fn resolve<S: ConfigSource + ?Sized>(source: &S) -> Result<Config, DeployError> {
    let host = from_source(source, "REMOTE_HOST");
    let user = from_source(source, "REMOTE_USER");
    let private_key = from_source(source, "SSH_PRIVATE_KEY");
    let remote_path = from_source(source, "REMOTE_PATH");

    let mut missing = Vec::new();
    for (name, value) in [
        ("REMOTE_HOST", &host),
        ("REMOTE_USER", &user),
        ("SSH_PRIVATE_KEY", &private_key),
        ("REMOTE_PATH", &remote_path),
    ] {
        if value.is_none() {
            missing.push(name.to_string());
        }
    }
    let (Some(host), Some(user), Some(private_key), Some(remote_path)) =
        (host, user, private_key, remote_path)
    else {
        return Err(DeployError::MissingInputs(missing));
    };

    let rsync_args = from_source(source, "ARGS")
        .or_else(|| from_source(source, "RSYNC_ARGS"))
        .unwrap_or_else(|| DEFAULT_ARGS.to_string());

    Ok(Config {
        host,
        user,
        port: from_source(source, "REMOTE_PORT").unwrap_or_else(|| DEFAULT_PORT.to_string()),
        private_key,
        key_name: from_source(source, "DEPLOY_KEY_NAME")
            .unwrap_or_else(|| DEFAULT_KEY_NAME.to_string()),
        remote_path,
        source: from_source(source, "SOURCE").unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        rsync_args,
        exclude_file: from_source(source, "EXCLUDE_FILE"),
        extra_exclude: from_source(source, "EXTRA_EXCLUDE"),
    })
}
