// src/metrics.rs
//
// Window performance metrics and the field-wise metric differencer.
//
// WindowMetrics is the fixed-schema record of one measurement window,
// parsed from the simulator's JSON statistics artifact. The differencer
// computes standalone - checkpoint deltas over an identical field set;
// differing field sets are a contract violation, never silently ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Performance numbers for one measurement window. All fields numeric;
/// immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub instructions: f64,
    pub cycles: f64,
    pub ipc: f64,
    pub llc_misses: f64,
    pub branch_mispredictions: f64,
}

impl WindowMetrics {
    /// The metrics as a field-name -> value map, for delta computation and
    /// the persisted summary record.
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("instructions".to_string(), self.instructions);
        map.insert("cycles".to_string(), self.cycles);
        map.insert("ipc".to_string(), self.ipc);
        map.insert("llc_misses".to_string(), self.llc_misses);
        map.insert(
            "branch_mispredictions".to_string(),
            self.branch_mispredictions,
        );
        map
    }
}

/// Parse a simulator statistics artifact into WindowMetrics.
///
/// The artifact is a flat JSON object of numeric fields. `ipc` is derived
/// as instructions/cycles when the simulator omits it.
pub fn parse_stats_file(path: &Path) -> Result<WindowMetrics, StatsError> {
    let contents = fs::read_to_string(path).map_err(|e| StatsError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| StatsError::Parse {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
    let obj = value.as_object().ok_or_else(|| StatsError::NotAnObject {
        path: path.display().to_string(),
    })?;

    let field = |name: &str| -> Result<f64, StatsError> {
        let v = obj.get(name).ok_or_else(|| StatsError::MissingField {
            field: name.to_string(),
            path: path.display().to_string(),
        })?;
        v.as_f64().ok_or_else(|| StatsError::NotNumeric {
            field: name.to_string(),
            path: path.display().to_string(),
        })
    };

    let instructions = field("instructions")?;
    let cycles = field("cycles")?;
    let ipc = match obj.get("ipc") {
        Some(v) => v.as_f64().ok_or_else(|| StatsError::NotNumeric {
            field: "ipc".to_string(),
            path: path.display().to_string(),
        })?,
        None if cycles > 0.0 => instructions / cycles,
        None => {
            return Err(StatsError::MissingField {
                field: "ipc".to_string(),
                path: path.display().to_string(),
            })
        }
    };

    Ok(WindowMetrics {
        instructions,
        cycles,
        ipc,
        llc_misses: field("llc_misses")?,
        branch_mispredictions: field("branch_mispredictions")?,
    })
}

/// Field-wise delta between two metric maps sharing an identical field set:
/// `standalone_value - checkpoint_value` per field.
pub fn metric_delta(
    standalone: &BTreeMap<String, f64>,
    checkpoint: &BTreeMap<String, f64>,
) -> Result<BTreeMap<String, f64>, StatsError> {
    let missing: Vec<String> = checkpoint
        .keys()
        .filter(|k| !standalone.contains_key(*k))
        .cloned()
        .collect();
    let unexpected: Vec<String> = standalone
        .keys()
        .filter(|k| !checkpoint.contains_key(*k))
        .cloned()
        .collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(StatsError::FieldSetMismatch {
            missing,
            unexpected,
        });
    }

    let delta = checkpoint
        .iter()
        .map(|(key, ckpt)| (key.clone(), standalone[key] - ckpt))
        .collect();
    Ok(delta)
}

/// Errors from statistics parsing and delta computation.
#[derive(Debug, Clone)]
pub enum StatsError {
    Io {
        path: String,
        source: String,
    },
    Parse {
        path: String,
        source: String,
    },
    NotAnObject {
        path: String,
    },
    MissingField {
        field: String,
        path: String,
    },
    NotNumeric {
        field: String,
        path: String,
    },
    /// Checkpoint and standalone metric field sets differ. Internal
    /// inconsistency given the driver's protocol.
    FieldSetMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::Io { path, source } => {
                write!(f, "Failed to read stats file '{}': {}", path, source)
            }
            StatsError::Parse { path, source } => {
                write!(f, "Failed to parse stats file '{}': {}", path, source)
            }
            StatsError::NotAnObject { path } => {
                write!(f, "Stats file '{}' is not a JSON object", path)
            }
            StatsError::MissingField { field, path } => {
                write!(f, "Stats file '{}' is missing field '{}'", path, field)
            }
            StatsError::NotNumeric { field, path } => {
                write!(f, "Stats file '{}' field '{}' is not numeric", path, field)
            }
            StatsError::FieldSetMismatch {
                missing,
                unexpected,
            } => {
                write!(
                    f,
                    "Metric field sets differ (missing from standalone: [{}], unexpected in standalone: [{}])",
                    missing.join(", "),
                    unexpected.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for StatsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_stats(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_stats_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stats(
            dir.path(),
            "stats.json",
            r#"{"instructions": 1000000.0, "cycles": 800000.0, "ipc": 1.25,
                "llc_misses": 1200.0, "branch_mispredictions": 340.0}"#,
        );
        let metrics = parse_stats_file(&path).unwrap();
        assert_eq!(metrics.instructions, 1_000_000.0);
        assert_eq!(metrics.cycles, 800_000.0);
        assert_eq!(metrics.ipc, 1.25);
        assert_eq!(metrics.llc_misses, 1200.0);
        assert_eq!(metrics.branch_mispredictions, 340.0);
    }

    #[test]
    fn test_parse_stats_derives_ipc() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stats(
            dir.path(),
            "stats.json",
            r#"{"instructions": 1000.0, "cycles": 500.0,
                "llc_misses": 0.0, "branch_mispredictions": 0.0}"#,
        );
        let metrics = parse_stats_file(&path).unwrap();
        assert_eq!(metrics.ipc, 2.0);
    }

    #[test]
    fn test_parse_stats_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stats(
            dir.path(),
            "stats.json",
            r#"{"instructions": 1000.0, "cycles": 500.0, "llc_misses": 0.0}"#,
        );
        let err = parse_stats_file(&path).unwrap_err();
        assert!(err.to_string().contains("branch_mispredictions"));
    }

    #[test]
    fn test_parse_stats_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_stats_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StatsError::Io { .. }));
    }

    #[test]
    fn test_parse_stats_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stats(dir.path(), "stats.json", "not json at all");
        let err = parse_stats_file(&path).unwrap_err();
        assert!(matches!(err, StatsError::Parse { .. }));
    }

    #[test]
    fn test_metric_delta_exact() {
        let mut checkpoint = BTreeMap::new();
        checkpoint.insert("ipc".to_string(), 1.0);
        checkpoint.insert("misses".to_string(), 10.0);

        let mut standalone = BTreeMap::new();
        standalone.insert("ipc".to_string(), 1.2);
        standalone.insert("misses".to_string(), 8.0);

        let delta = metric_delta(&standalone, &checkpoint).unwrap();
        assert_eq!(delta["ipc"], 1.2 - 1.0);
        assert_eq!(delta["misses"], -2.0);
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn test_metric_delta_field_set_mismatch() {
        let mut checkpoint = BTreeMap::new();
        checkpoint.insert("ipc".to_string(), 1.0);
        checkpoint.insert("misses".to_string(), 10.0);

        let mut standalone = BTreeMap::new();
        standalone.insert("ipc".to_string(), 1.2);
        standalone.insert("cycles".to_string(), 100.0);

        let err = metric_delta(&standalone, &checkpoint).unwrap_err();
        match err {
            StatsError::FieldSetMismatch {
                missing,
                unexpected,
            } => {
                assert_eq!(missing, vec!["misses".to_string()]);
                assert_eq!(unexpected, vec!["cycles".to_string()]);
            }
            other => panic!("expected FieldSetMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_as_map_covers_every_field() {
        let metrics = WindowMetrics {
            instructions: 1.0,
            cycles: 2.0,
            ipc: 0.5,
            llc_misses: 3.0,
            branch_mispredictions: 4.0,
        };
        let map = metrics.as_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map["ipc"], 0.5);
        // Delta of a map against itself is all zeros, never an error.
        let delta = metric_delta(&map, &map).unwrap();
        assert!(delta.values().all(|v| *v == 0.0));
    }
}
