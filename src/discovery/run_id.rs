// src/discovery/run_id.rs

use anyhow::{Context, Result};
use regex::Regex;

/// MiSeq run IDs, e.g. `240115_M01234_0123_000000000-ABCDE`:
/// date, `M` + 5-digit instrument, run counter, 9-digit flowcell prefix and a
/// 5-character flowcell suffix.
pub const MISEQ_RUN_ID_PATTERN: &str = r"^\d{6}_M\d{5}_\d+_\d{9}-[A-Z0-9]{5}";

/// NextSeq 2000 run IDs, e.g. `240115_VH00123_45_AAAAAAAM5`:
/// date, `VH` + 5-digit instrument, run counter, 9-character flowcell.
pub const NEXTSEQ_RUN_ID_PATTERN: &str = r"^\d{6}_VH\d{5}_\d+_[A-Z0-9]{9}";

/// Matches directory names against the accepted run-ID patterns.
///
/// Patterns are anchored at the start only, so trailing suffixes on a valid
/// run ID are accepted.
#[derive(Debug, Clone)]
pub struct RunIdMatcher {
    patterns: Vec<Regex>,
}

impl RunIdMatcher {
    pub fn new() -> Result<Self> {
        Self::from_patterns(&[MISEQ_RUN_ID_PATTERN, NEXTSEQ_RUN_ID_PATTERN])
    }

    pub fn from_patterns(patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("compiling run-ID pattern {p:?}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}
