use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// How discovery treats a run whose analysis output directory already exists.
///
/// - `PerPipeline` (default): the run is always yielded and every pipeline
///   gates itself on its own completion marker. This allows a run to be
///   revisited later to launch pipelines that were added or were waiting on
///   dependencies.
/// - `SkipExistingRun`: a run is only yielded while its analysis output
///   directory does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDirPolicy {
    PerPipeline,
    SkipExistingRun,
}

impl Default for OutputDirPolicy {
    fn default() -> Self {
        OutputDirPolicy::PerPipeline
    }
}

/// Order in which run directories are visited during one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    /// Whatever order the filesystem enumerates entries in.
    Filesystem,
    /// Reverse lexical order of directory names (newest run IDs first).
    ReverseLexical,
}

impl ScanOrder {
    pub fn from_reverse_flag(reverse: bool) -> Self {
        if reverse {
            ScanOrder::ReverseLexical
        } else {
            ScanOrder::Filesystem
        }
    }
}

/// Named post-analysis behaviour selectable per pipeline in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostAnalysisKind {
    None,
    TransferResults,
}

impl Default for PostAnalysisKind {
    fn default() -> Self {
        PostAnalysisKind::None
    }
}

/// Ordered set of named predicate results behind one decision.
///
/// Serialized as a JSON object so it can be attached to a log event as the
/// `conditions_checked` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    checks: Vec<(&'static str, bool)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: bool) -> Self {
        self.checks.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.checks
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn all_met(&self) -> bool {
        self.checks.iter().all(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.checks.iter().copied()
    }

    /// Compact JSON rendering for log fields.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for Conditions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.checks.len()))?;
        for (name, value) in &self.checks {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_serialize_in_insertion_order() {
        let c = Conditions::new()
            .with("is_directory", true)
            .with("ready_to_analyze", false);
        assert_eq!(c.to_json(), r#"{"is_directory":true,"ready_to_analyze":false}"#);
        assert!(!c.all_met());
        assert_eq!(c.get("ready_to_analyze"), Some(false));
        assert_eq!(c.get("missing"), None);
    }

    #[test]
    fn reverse_flag_selects_lexical_order() {
        assert_eq!(ScanOrder::from_reverse_flag(true), ScanOrder::ReverseLexical);
        assert_eq!(ScanOrder::from_reverse_flag(false), ScanOrder::Filesystem);
    }
}
