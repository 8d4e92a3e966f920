//! File-backed allow/deny pattern lists.
//!
//! Each kind lives in its own newline-delimited file,
//! `<dir>/<prefix>-allow.txt` and `<dir>/<prefix>-deny.txt`. Every mutation
//! rewrites both files in full; there is no locking, so two writers racing on
//! [`ListStore::add_pattern`] can lose updates.

use crate::config::{DEFAULT_FILE_PREFIX, PanelConfig};
use crate::error::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which of the two pattern lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Domains exempt from blocking.
    Allow,
    /// Domains subject to blocking.
    Deny,
}

impl ListKind {
    /// Both kinds, in file-write order.
    pub const ALL: [Self; 2] = [Self::Allow, Self::Deny];

    /// Lowercase name used in file names and JSON keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(PanelError::UnknownListKind(other.to_string())),
        }
    }
}

/// Both pattern lists, in file order.
///
/// This is also the JSON body of `GET`/`PUT /api/list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lists {
    /// Patterns exempt from blocking.
    pub allow: Vec<String>,
    /// Patterns subject to blocking.
    pub deny: Vec<String>,
}

impl Lists {
    /// Returns the patterns of one kind.
    #[must_use]
    pub fn get(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Allow => &self.allow,
            ListKind::Deny => &self.deny,
        }
    }

    fn get_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Allow => &mut self.allow,
            ListKind::Deny => &mut self.deny,
        }
    }

    /// Appends `pattern` to `kind` unless an identical string is present.
    ///
    /// Blank patterns are ignored, since they would not survive a reread.
    /// Returns `true` if the list changed.
    pub fn insert(&mut self, kind: ListKind, pattern: &str) -> bool {
        if pattern.trim().is_empty() {
            return false;
        }
        let list = self.get_mut(kind);
        if list.iter().any(|p| p == pattern) {
            return false;
        }
        list.push(pattern.to_string());
        true
    }
}

/// Reads and rewrites the two list files in a directory.
///
/// # Example
///
/// ```rust,ignore
/// use blockinho::{ListKind, ListStore};
///
/// let store = ListStore::with_dir("/etc/blocky/lists");
/// let lists = store.add_pattern(ListKind::Deny, "*.ads.example.com")?;
/// assert!(lists.deny.contains(&"*.ads.example.com".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct ListStore {
    dir: PathBuf,
    prefix: String,
}

impl ListStore {
    /// Creates a store over `dir` with the default file prefix.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }

    /// Creates a store from the panel configuration.
    #[must_use]
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            dir: config.config_dir.clone(),
            prefix: config.file_prefix.clone(),
        }
    }

    /// Returns the backing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file backing `kind`.
    #[must_use]
    pub fn path(&self, kind: ListKind) -> PathBuf {
        self.dir.join(format!("{}-{kind}.txt", self.prefix))
    }

    /// Reads both lists. A missing file reads as an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Io`] if a file exists but cannot be read.
    pub fn get_lists(&self) -> Result<Lists> {
        Ok(Lists {
            allow: self.read(ListKind::Allow)?,
            deny: self.read(ListKind::Deny)?,
        })
    }

    /// Overwrites both files with the given lists, newline-joined.
    ///
    /// An empty list truncates its file. Both writes are attempted even if
    /// the first fails; nothing is rolled back.
    ///
    /// # Errors
    ///
    /// Returns the first [`PanelError::Io`] encountered.
    pub fn replace_lists(&self, lists: &Lists) -> Result<()> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }

        let mut first_err = None;
        for kind in ListKind::ALL {
            if let Err(e) = self.write(kind, lists.get(kind)) {
                tracing::warn!(kind = %kind, error = %e, "Failed to write list file");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Appends `pattern` to `kind` if absent and rewrites both files.
    ///
    /// Always performs the full read-modify-write, even when the pattern is
    /// already present. Returns the lists as written.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Io`] if reading or writing fails.
    pub fn add_pattern(&self, kind: ListKind, pattern: &str) -> Result<Lists> {
        let mut lists = self.get_lists()?;
        if lists.insert(kind, pattern) {
            tracing::info!(kind = %kind, pattern = %pattern, "Added pattern");
        } else {
            tracing::debug!(kind = %kind, pattern = %pattern, "Pattern already present");
        }
        self.replace_lists(&lists)?;
        Ok(lists)
    }

    fn read(&self, kind: ListKind) -> Result<Vec<String>> {
        let path = self.path(kind);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "List file does not exist, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(parse_list(&contents))
    }

    fn write(&self, kind: ListKind, patterns: &[String]) -> Result<()> {
        let path = self.path(kind);
        std::fs::write(&path, patterns.join("\n"))?;
        tracing::info!(
            kind = %kind,
            count = patterns.len(),
            path = %path.display(),
            "Wrote list file"
        );
        Ok(())
    }
}

/// Splits file contents into patterns, dropping blank lines.
fn parse_list(contents: &str) -> Vec<String> {
    contents
        .trim()
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parse_drops_blank_lines() {
        assert_eq!(
            parse_list("\na.com\n\nb.com\n\n"),
            strings(&["a.com", "b.com"])
        );
        assert!(parse_list("").is_empty());
        assert!(parse_list("\n\n").is_empty());
    }

    #[test]
    fn kind_parses_and_displays() {
        assert_eq!("allow".parse::<ListKind>().unwrap(), ListKind::Allow);
        assert_eq!("deny".parse::<ListKind>().unwrap(), ListKind::Deny);
        assert!(matches!(
            "block".parse::<ListKind>(),
            Err(PanelError::UnknownListKind(kind)) if kind == "block"
        ));
        assert_eq!(ListKind::Deny.to_string(), "deny");
    }

    #[test]
    fn insert_is_exact_match_dedup() {
        let mut lists = Lists::default();
        assert!(lists.insert(ListKind::Allow, "example.com"));
        assert!(!lists.insert(ListKind::Allow, "example.com"));
        assert!(lists.insert(ListKind::Allow, "Example.com"));
        assert!(lists.insert(ListKind::Deny, "example.com"));
        assert_eq!(lists.allow.len(), 2);
        assert_eq!(lists.deny.len(), 1);
    }

    #[test]
    fn insert_ignores_blank_patterns() {
        let mut lists = Lists::default();
        assert!(!lists.insert(ListKind::Deny, ""));
        assert!(!lists.insert(ListKind::Deny, "  \n"));
        assert!(lists.deny.is_empty());
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        assert_eq!(store.get_lists().unwrap(), Lists::default());
    }

    #[test]
    fn file_names_use_prefix_and_kind() {
        let store = ListStore::from_config(
            &PanelConfig::new("/data", "http://localhost:4000").with_file_prefix("panel"),
        );
        assert_eq!(store.path(ListKind::Allow), Path::new("/data/panel-allow.txt"));
        assert_eq!(store.path(ListKind::Deny), Path::new("/data/panel-deny.txt"));
    }

    #[test]
    fn replace_then_get_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        let lists = Lists {
            allow: strings(&["z.com", "a.com", "/^ads?\\./i"]),
            deny: strings(&["*.tracker.net", "b.org"]),
        };

        store.replace_lists(&lists).unwrap();
        assert_eq!(store.get_lists().unwrap(), lists);

        let raw = std::fs::read_to_string(dir.path().join("blockinho-allow.txt")).unwrap();
        assert_eq!(raw, "z.com\na.com\n/^ads?\\./i");
    }

    #[test]
    fn replace_drops_blank_entries_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        store
            .replace_lists(&Lists {
                allow: strings(&["a.com", "", "b.com"]),
                deny: Vec::new(),
            })
            .unwrap();
        assert_eq!(store.get_lists().unwrap().allow, strings(&["a.com", "b.com"]));
    }

    #[test]
    fn empty_list_truncates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        std::fs::write(store.path(ListKind::Deny), "old.com\nstale.net\n").unwrap();

        store.replace_lists(&Lists::default()).unwrap();

        assert_eq!(std::fs::read_to_string(store.path(ListKind::Deny)).unwrap(), "");
        assert!(store.path(ListKind::Allow).exists());
    }

    #[test]
    fn replace_writes_second_file_when_first_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        std::fs::create_dir(store.path(ListKind::Allow)).unwrap();

        let result = store.replace_lists(&Lists {
            allow: strings(&["a.com"]),
            deny: strings(&["b.com"]),
        });

        assert!(matches!(result, Err(PanelError::Io(_))));
        assert_eq!(std::fs::read_to_string(store.path(ListKind::Deny)).unwrap(), "b.com");
    }

    #[test]
    fn replace_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path().join("nested/lists"));
        store
            .replace_lists(&Lists {
                allow: strings(&["a.com"]),
                deny: Vec::new(),
            })
            .unwrap();
        assert_eq!(store.get_lists().unwrap().allow, strings(&["a.com"]));
    }

    #[test]
    fn add_pattern_writes_exact_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());

        let lists = store.add_pattern(ListKind::Deny, "*.ads.example.com").unwrap();
        assert_eq!(lists.deny, strings(&["*.ads.example.com"]));
        assert!(lists.allow.is_empty());

        let deny = store.path(ListKind::Deny);
        assert_eq!(std::fs::read_to_string(&deny).unwrap(), "*.ads.example.com");
        assert_eq!(std::fs::read_to_string(store.path(ListKind::Allow)).unwrap(), "");
    }

    #[test]
    fn add_pattern_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());

        store.add_pattern(ListKind::Deny, "*.ads.example.com").unwrap();
        let once = std::fs::read_to_string(store.path(ListKind::Deny)).unwrap();
        store.add_pattern(ListKind::Deny, "*.ads.example.com").unwrap();
        let twice = std::fs::read_to_string(store.path(ListKind::Deny)).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn add_pattern_keeps_other_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        store.add_pattern(ListKind::Allow, "good.com").unwrap();
        store.add_pattern(ListKind::Deny, "bad.com").unwrap();
        store.add_pattern(ListKind::Allow, "also-good.com").unwrap();

        let lists = store.get_lists().unwrap();
        assert_eq!(lists.allow, strings(&["good.com", "also-good.com"]));
        assert_eq!(lists.deny, strings(&["bad.com"]));
    }

    #[test]
    fn add_blank_pattern_matches_reread() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        store.add_pattern(ListKind::Deny, "bad.com").unwrap();

        let lists = store.add_pattern(ListKind::Deny, "").unwrap();
        assert_eq!(lists.deny, strings(&["bad.com"]));
        assert_eq!(store.get_lists().unwrap(), lists);
    }

    #[test]
    fn store_accepts_malformed_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let store = ListStore::with_dir(dir.path());
        let lists = store.add_pattern(ListKind::Allow, "not a domain!").unwrap();
        assert_eq!(lists.allow, strings(&["not a domain!"]));
    }
}
