//! `key=value` documents with nested blocks
//!
//! ```text
//! players=2
//! player0 {
//!     name=Ann
//!     level=3
//! }
//! ```
//!
//! Nested keys are flattened with dots (`player0.name`). Lookup is by full
//! key and ignores order; the first occurrence wins. Values are trimmed;
//! ones with surrounding whitespace are written in double quotes.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use super::PersistError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvDoc {
    entries: Vec<(String, String)>,
}

impl KvDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse text; lines that are neither entries nor block markers are
    /// skipped
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::new();
        let mut prefix: Vec<String> = Vec::new();
        for line in text.lines() {
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let full = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{}.{}", prefix.join("."), key)
                };
                doc.entries.push((full, unquote(value.trim()).to_string()));
            } else if let Some((name, _)) = line.split_once('{') {
                prefix.push(name.trim().to_string());
            } else if line.contains('}') {
                prefix.pop();
            }
        }
        doc
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Typed lookup; `Ok(None)` if missing, an error if present but
    /// malformed
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Result<Option<T>, PersistError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| PersistError::Corrupted(format!("bad value '{v}' for {key}"))),
        }
    }

    /// Typed lookup that keeps `current` when the key is missing or bad
    pub fn read_into<T: FromStr>(&self, key: &str, current: &mut T) {
        match self.parse_value(key) {
            Ok(Some(v)) => *current = v,
            Ok(None) => {}
            Err(e) => log::error!("{e}"),
        }
    }

    /// Replace or append
    pub fn set(&mut self, key: &str, value: impl Display) {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render with dotted keys folded back into blocks
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut open: Vec<&str> = Vec::new();
        for (key, value) in &self.entries {
            let parts: Vec<&str> = key.split('.').collect();
            let (leaf, path) = match parts.split_last() {
                Some((leaf, path)) => (*leaf, path),
                None => continue,
            };
            let common = open
                .iter()
                .zip(path.iter())
                .take_while(|(a, b)| a == b)
                .count();
            while open.len() > common {
                open.pop();
                push_line(&mut out, open.len(), "}");
            }
            for name in &path[common..] {
                push_line(&mut out, open.len(), &format!("{name} {{"));
                open.push(name);
            }
            push_line(&mut out, open.len(), &format!("{leaf}={}", quote(value)));
        }
        while !open.is_empty() {
            open.pop();
            push_line(&mut out, open.len(), "}");
        }
        out
    }
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push('\t');
    }
    out.push_str(line);
    out.push('\n');
}

fn is_quoted(v: &str) -> bool {
    v.len() >= 2 && v.starts_with('"') && v.ends_with('"')
}

fn quote(v: &str) -> std::borrow::Cow<'_, str> {
    if v.trim() != v || is_quoted(v) {
        format!("\"{v}\"").into()
    } else {
        v.into()
    }
}

fn unquote(v: &str) -> &str {
    if is_quoted(v) { &v[1..v.len() - 1] } else { v }
}
