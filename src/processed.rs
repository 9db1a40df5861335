//! "Already processed" filtering
//!
//! Before a batch is validated, files the downstream store has already
//! ingested are dropped. The store itself sits behind [`ProcessedLedger`];
//! names are compared on their upper-cased base name.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, ValidatorError};

/// Source of truth for which files have been processed
pub trait ProcessedLedger {
    /// Given upper-cased base names, return the subset already processed
    fn processed_names(&self, names: &[String]) -> Result<HashSet<String>>;
}

/// Ledger held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    names: HashSet<String>,
}

impl InMemoryLedger {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn mark(&mut self, name: &str) {
        self.names.insert(name.trim().to_uppercase());
    }
}

impl ProcessedLedger for InMemoryLedger {
    fn processed_names(&self, names: &[String]) -> Result<HashSet<String>> {
        Ok(names
            .iter()
            .filter(|name| self.names.contains(*name))
            .cloned()
            .collect())
    }
}

/// Ledger backed by a text file with one processed file name per line
///
/// Blank lines and lines starting with `#` are ignored. The file is read on
/// every lookup so a long-running caller sees updates.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<InMemoryLedger> {
        let content = fs::read_to_string(&self.path).map_err(|source| ValidatorError::Read {
            path: self.path.clone(),
            source,
        })?;

        Ok(InMemoryLedger::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        ))
    }
}

impl ProcessedLedger for FileLedger {
    fn processed_names(&self, names: &[String]) -> Result<HashSet<String>> {
        self.load()?.processed_names(names)
    }
}

fn ledger_key(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// Keep only the paths the ledger has not seen, in their original order
pub fn filter_unprocessed<L>(paths: &[PathBuf], ledger: &L) -> Result<Vec<PathBuf>>
where
    L: ProcessedLedger + ?Sized,
{
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<String> = paths.iter().map(|p| ledger_key(p)).collect();
    let processed = ledger.processed_names(&keys)?;
    debug!(
        candidates = paths.len(),
        processed = processed.len(),
        "checked processed ledger"
    );

    Ok(paths
        .iter()
        .zip(&keys)
        .filter(|(_, key)| !processed.contains(*key))
        .map(|(path, _)| path.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    struct CountingLedger {
        calls: Cell<usize>,
    }

    impl ProcessedLedger for CountingLedger {
        fn processed_names(&self, _names: &[String]) -> Result<HashSet<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(HashSet::new())
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_and_ordered() {
        let ledger = InMemoryLedger::new(["Sales_01.csv"]);
        let paths = vec![
            PathBuf::from("/in/report_02.csv"),
            PathBuf::from("/in/SALES_01.CSV"),
            PathBuf::from("/other/report_01.csv"),
        ];

        let remaining = filter_unprocessed(&paths, &ledger).unwrap();
        assert_eq!(
            remaining,
            vec![
                PathBuf::from("/in/report_02.csv"),
                PathBuf::from("/other/report_01.csv"),
            ]
        );
    }

    #[test]
    fn test_empty_input_skips_ledger() {
        let ledger = CountingLedger {
            calls: Cell::new(0),
        };
        assert!(filter_unprocessed(&[], &ledger).unwrap().is_empty());
        assert_eq!(ledger.calls.get(), 0);
    }

    #[test]
    fn test_file_ledger() {
        let dir = tempdir().unwrap();
        let ledger_path = dir.path().join("processed.txt");
        fs::write(&ledger_path, "# processed files\nmembers_1.csv\n\n  members_2.csv  \n").unwrap();

        let ledger = FileLedger::new(&ledger_path);
        let paths = vec![
            PathBuf::from("members_1.csv"),
            PathBuf::from("members_2.csv"),
            PathBuf::from("members_3.csv"),
        ];
        assert_eq!(
            filter_unprocessed(&paths, &ledger).unwrap(),
            vec![PathBuf::from("members_3.csv")]
        );
    }

    #[test]
    fn test_missing_ledger_file_is_error() {
        let dir = tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("absent.txt"));
        let err = filter_unprocessed(&[PathBuf::from("a.csv")], &ledger).unwrap_err();
        assert!(err.is_io());
    }
}
