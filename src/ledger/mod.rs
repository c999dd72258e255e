//! Persistent set of published fingerprints.
//!
//! The ledger is loaded once at startup, mutated in memory during a run and
//! written back as a whole after the run. Loading never fails: a missing
//! snapshot is an empty ledger and a corrupt one is set aside and replaced.

pub mod snapshot;

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::Fingerprint;
use snapshot::{Entries, Loaded};

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Entries,
}

impl Ledger {
    /// Load the snapshot at `path`, or start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match snapshot::read_snapshot(&path) {
            Ok(Loaded::Entries(entries)) => {
                info!(path = %path.display(), entries = entries.len(), "ledger loaded");
                entries
            }
            Ok(Loaded::Missing) => {
                info!(path = %path.display(), "no ledger snapshot, starting empty");
                Entries::new()
            }
            Ok(Loaded::Corrupt(e)) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "ledger snapshot corrupt, starting empty"
                );
                match snapshot::quarantine(&path) {
                    Ok(moved) => warn!(to = %moved.display(), "corrupt snapshot moved aside"),
                    Err(e) => warn!(error = %e, "could not move corrupt snapshot aside"),
                }
                Entries::new()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "ledger snapshot unreadable, starting empty"
                );
                Entries::new()
            }
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn seen(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Record `fingerprint` as published at `at` (unix seconds).
    /// An existing entry keeps its original first-seen time.
    pub fn mark(&mut self, fingerprint: Fingerprint, at: i64) {
        self.entries.entry(fingerprint).or_insert(at);
    }

    pub fn first_seen(&self, fingerprint: &Fingerprint) -> Option<i64> {
        self.entries.get(fingerprint).copied()
    }

    /// Write the whole ledger to disk atomically.
    pub fn persist(&self) -> io::Result<()> {
        snapshot::write_snapshot_atomic(&self.path, &self.entries)
    }

    /// Drop entries first seen before `cutoff`. Returns how many were removed.
    pub fn prune_older_than(&mut self, cutoff: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, first_seen| *first_seen >= cutoff);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
