use std::env;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{LookoutError, Result};

/// Environment variable naming the config file read by [`load`]
pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";

/// Load the file named by `CONFIG_FILE`
pub fn load<T: DeserializeOwned>() -> Result<T> {
    match env::var(CONFIG_FILE_ENV) {
        Ok(path) if !path.is_empty() => load_from_path(path),
        _ => Err(LookoutError::Config(format!("{CONFIG_FILE_ENV} env var not set"))),
    }
}

/// Read `p`, expand `$VAR`/`${VAR}` references against the process
/// environment, then parse the result as YAML into `T`.
pub fn load_from_path<T: DeserializeOwned, P: AsRef<Path>>(p: P) -> Result<T> {
    let path = p.as_ref();
    let txt = fs::read_to_string(path).map_err(|e| {
        LookoutError::Config(format!(
            "couldn't read config file from path: {}: {e}",
            path.display()
        ))
    })?;
    let expanded = expand_env(&txt);

    serde_norway::from_str(&expanded).map_err(|e| {
        LookoutError::Config(format!(
            "couldn't unmarshal config file at path: {}: {e}",
            path.display()
        ))
    })
}

/// Substitute `$VAR` and `${VAR}` references in `text`.
///
/// Unset variables become the empty string. Unlike Go's `os.ExpandEnv`:
/// `$$` is a literal `$`, an unterminated `${NAME` is kept as written, and a
/// name is the whole run of `[A-Za-z0-9_]`, so `$1x` looks up `1x`.
pub fn expand_env(text: &str) -> String {
    expand_with(text, |name| env::var(name).ok())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn expand_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    let name = &braced[..end];
                    if !name.is_empty() {
                        out.push_str(&lookup(name).unwrap_or_default());
                    }
                    rest = &braced[end + 1..];
                }
                // unterminated, left as written
                None => {
                    out.push('$');
                    rest = after;
                }
            }
            continue;
        }

        let len = after.find(|c: char| !is_name_char(c)).unwrap_or(after.len());
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..len]).unwrap_or_default());
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    out
}
