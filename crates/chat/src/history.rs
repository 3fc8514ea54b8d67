//! Bounded input history with shell-style Up/Down browsing.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Past user inputs, oldest first, with a browsing cursor.
///
/// Consecutive duplicates are collapsed and the oldest entry is evicted once
/// `max_entries` is exceeded. When a backing file is attached and
/// `persist` is on, every accepted push rewrites the whole file.
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    max_entries: usize,
    /// `None` means at rest; otherwise an index into `entries`.
    cursor: Option<usize>,
    path: Option<PathBuf>,
    persist: bool,
}

impl HistoryBuffer {
    /// Creates an in-memory buffer with no backing file.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            cursor: None,
            path: None,
            persist: false,
        }
    }

    /// Creates a buffer backed by `path`, replaying any lines already stored there.
    ///
    /// A missing or unreadable file yields an empty buffer.
    pub fn load(path: impl Into<PathBuf>, max_entries: usize, persist: bool) -> Self {
        let path = path.into();
        let mut history = Self::new(max_entries);

        match std::fs::File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    match line {
                        Ok(line) => history.push(line),
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "History read stopped early");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "History file not loaded");
            }
        }

        history.path = Some(path);
        history.persist = persist;
        history
    }

    /// Appends `line` unless it repeats the newest entry. Always resets the cursor.
    ///
    /// Embedded line breaks are folded into single spaces so every entry
    /// occupies one line of the backing file.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = single_line(line.into());
        self.cursor = None;

        if self.entries.back() == Some(&line) {
            return;
        }

        self.entries.push_back(line);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }

        if self.persist {
            self.save();
        }
    }

    /// Moves the cursor one step older and returns that entry.
    ///
    /// From rest this jumps to the newest entry. At the oldest entry it
    /// returns an empty string and stays put.
    pub fn previous_line(&mut self) -> String {
        let next = match self.cursor {
            None if self.entries.is_empty() => return String::new(),
            None => self.entries.len() - 1,
            Some(0) => return String::new(),
            Some(idx) => idx - 1,
        };

        self.cursor = Some(next);
        self.entries[next].clone()
    }

    /// Moves the cursor one step newer and returns that entry.
    ///
    /// Stepping past the newest entry puts the cursor back at rest and
    /// returns an empty string.
    pub fn next_line(&mut self) -> String {
        match self.cursor {
            None => String::new(),
            Some(idx) if idx + 1 >= self.entries.len() => {
                self.cursor = None;
                String::new()
            }
            Some(idx) => {
                self.cursor = Some(idx + 1);
                self.entries[idx + 1].clone()
            }
        }
    }

    /// Turns rewrite-on-push on or off.
    pub fn set_persist(&mut self, persist: bool) {
        self.persist = persist;
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_browsing(&self) -> bool {
        self.cursor.is_some()
    }

    fn save(&self) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(e) = self.write_to(path) {
            debug!(path = %path.display(), error = %e, "History not persisted");
        }
    }

    fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        for entry in &self.entries {
            writeln!(writer, "{entry}")?;
        }
        writer.flush()
    }
}

fn single_line(line: String) -> String {
    if !line.contains(['\n', '\r']) {
        return line;
    }
    line.split(['\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
