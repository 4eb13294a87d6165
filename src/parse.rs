use std::sync::LazyLock;

use regex::Regex;

// A token is a run of plain characters, complete quoted sections (which may
// hold whitespace) and stray quote characters with no partner.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:[^\s'"]+|'[^']*'|"[^"]*"|['"])+"#).expect("valid token regex")
});

static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']*)'|"([^"]*)"|([^\s'"]+)|(['"])"#).expect("valid segment regex")
});

/// Split an rsync flags string into argv tokens without going through a shell.
///
/// Quoted sections keep embedded whitespace and lose their quotes:
/// `--filter="- .env"` becomes `--filter=- .env`. A quote with no closing
/// partner is kept as a literal character. Escapes and nested quotes are not
/// understood.
pub fn split_args_preserve_quotes(raw: &str) -> Vec<String> {
    TOKEN_RE.find_iter(raw).map(|m| unquote_token(m.as_str())).collect()
}

fn unquote_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for caps in SEGMENT_RE.captures_iter(token) {
        if let Some(seg) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) {
            out.push_str(seg.as_str());
        } else if let Some(stray) = caps.get(4) {
            out.push_str(stray.as_str());
        }
    }
    out
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_=+./:@,%^".contains(c)
}

/// Quote `token` for a POSIX shell, leaving it bare when that is safe.
pub fn shell_quote(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_shell_safe) {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', r"'\''"))
}

/// Render `program args...` as a single copy-pasteable command line.
pub fn render_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut parts = vec![shell_quote(program)];
    parts.extend(args.iter().map(|a| shell_quote(a.as_ref())));
    parts.join(" ")
}
