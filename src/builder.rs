// src/builder.rs
//
// Simulator build collaborator.
//
// The harness may request the same configuration many times; ensure_binary
// is idempotent. The subprocess-backed implementation keys compiled
// binaries by a sha256 signature of the configuration overrides, so
// repeated requests for one configuration never force a rebuild, within a
// run (in-memory cache) or across runs (on-disk binary reuse).

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

/// Outcome of compiling a simulator binary for one configuration.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub binary_path: PathBuf,
}

/// Capability to produce a compiled simulator binary for a set of
/// build-configuration overrides.
pub trait BuildManager {
    fn ensure_binary(&self, updates: &BTreeMap<String, String>) -> Result<BuildResult, BuildError>;
}

/// Subprocess-backed build manager.
///
/// Builds live under `<sim_root>/build/<signature>/`: the merged
/// configuration is written to `config.json`, then `./config.sh
/// build/<signature>/config.json` and `make` run in the simulator root.
/// The resulting binary is `build/<signature>/sim`.
pub struct MakeBuildManager {
    sim_root: PathBuf,
    /// Build-template configuration the overrides are merged into.
    template: serde_json::Value,
    /// In-memory cache, signature -> binary path. Mutex so ensure_binary
    /// works through a shared reference; execution itself is sequential.
    built: Mutex<BTreeMap<String, PathBuf>>,
}

impl MakeBuildManager {
    pub fn new(sim_root: PathBuf, template: serde_json::Value) -> Self {
        Self {
            sim_root,
            template,
            built: Mutex::new(BTreeMap::new()),
        }
    }

    /// Stable hex signature of a configuration-override set.
    pub fn config_signature(updates: &BTreeMap<String, String>) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in updates {
            hasher.update(key.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.as_bytes());
            hasher.update([b'\n']);
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..12].to_string()
    }

    /// Merge the override values into the build template. Values that parse
    /// as numbers are inserted as JSON numbers, everything else as strings.
    fn merged_config(
        &self,
        updates: &BTreeMap<String, String>,
    ) -> Result<serde_json::Value, BuildError> {
        let mut config = match &self.template {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        let obj = config.as_object_mut().ok_or(BuildError::TemplateNotAnObject)?;
        for (key, value) in updates {
            obj.insert(key.clone(), json_scalar(value));
        }
        Ok(config)
    }

    fn run_step(&self, step: &str, program: &str, args: &[&str]) -> Result<(), BuildError> {
        let status = Command::new(program)
            .args(args)
            .current_dir(&self.sim_root)
            .status()
            .map_err(|e| BuildError::Spawn {
                step: step.to_string(),
                program: program.to_string(),
                source: e.to_string(),
            })?;
        if !status.success() {
            return Err(BuildError::CommandFailed {
                step: step.to_string(),
                program: program.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Interpret an override value as the closest JSON scalar.
fn json_scalar(value: &str) -> serde_json::Value {
    if let Ok(n) = value.parse::<i64>() {
        return serde_json::Value::from(n);
    }
    if let Ok(n) = value.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return serde_json::Value::Number(num);
        }
    }
    serde_json::Value::String(value.to_string())
}

impl BuildManager for MakeBuildManager {
    fn ensure_binary(&self, updates: &BTreeMap<String, String>) -> Result<BuildResult, BuildError> {
        let signature = Self::config_signature(updates);

        let mut built = self.built.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(binary_path) = built.get(&signature) {
            return Ok(BuildResult {
                binary_path: binary_path.clone(),
            });
        }

        let build_dir = self.sim_root.join("build").join(&signature);
        let binary_path = build_dir.join("sim");

        // A binary left by a previous run is reused as-is.
        if !binary_path.exists() {
            fs::create_dir_all(&build_dir).map_err(|e| BuildError::Io {
                path: build_dir.display().to_string(),
                source: e.to_string(),
            })?;

            let config = self.merged_config(updates)?;
            let config_path = build_dir.join("config.json");
            let contents =
                serde_json::to_string_pretty(&config).map_err(|e| BuildError::Io {
                    path: config_path.display().to_string(),
                    source: e.to_string(),
                })?;
            fs::write(&config_path, contents).map_err(|e| BuildError::Io {
                path: config_path.display().to_string(),
                source: e.to_string(),
            })?;

            let config_arg = format!("build/{}/config.json", signature);
            self.run_step("configure", "./config.sh", &[&config_arg])?;
            let make_dir = format!("build/{}", signature);
            self.run_step("make", "make", &["-C", &make_dir])?;
        }

        built.insert(signature, binary_path.clone());
        Ok(BuildResult { binary_path })
    }
}

/// Errors from the build collaborator.
#[derive(Debug, Clone)]
pub enum BuildError {
    Io {
        path: String,
        source: String,
    },
    TemplateNotAnObject,
    Spawn {
        step: String,
        program: String,
        source: String,
    },
    CommandFailed {
        step: String,
        program: String,
        status: String,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Io { path, source } => {
                write!(f, "Build I/O error at '{}': {}", path, source)
            }
            BuildError::TemplateNotAnObject => {
                write!(f, "Build template configuration is not a JSON object")
            }
            BuildError::Spawn {
                step,
                program,
                source,
            } => {
                write!(
                    f,
                    "Failed to spawn '{}' during build step '{}': {}",
                    program, step, source
                )
            }
            BuildError::CommandFailed {
                step,
                program,
                status,
            } => {
                write!(
                    f,
                    "Build step '{}' ('{}') failed: {}",
                    step, program, status
                )
            }
        }
    }
}

impl std::error::Error for BuildError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_signature_stable_and_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("btb_sets".to_string(), "2048".to_string());
        a.insert("btb_ways".to_string(), "8".to_string());

        let mut b = BTreeMap::new();
        b.insert("btb_ways".to_string(), "8".to_string());
        b.insert("btb_sets".to_string(), "2048".to_string());

        assert_eq!(
            MakeBuildManager::config_signature(&a),
            MakeBuildManager::config_signature(&b)
        );
        assert_eq!(MakeBuildManager::config_signature(&a).len(), 12);
    }

    #[test]
    fn test_config_signature_differs_for_different_values() {
        let mut a = BTreeMap::new();
        a.insert("btb_sets".to_string(), "2048".to_string());
        let mut b = BTreeMap::new();
        b.insert("btb_sets".to_string(), "1024".to_string());
        assert_ne!(
            MakeBuildManager::config_signature(&a),
            MakeBuildManager::config_signature(&b)
        );
    }

    #[test]
    fn test_merged_config_applies_overrides_as_scalars() {
        let template = serde_json::json!({"block_size": 64, "name": "sim"});
        let mgr = MakeBuildManager::new(PathBuf::from("."), template);

        let mut updates = BTreeMap::new();
        updates.insert("btb_sets".to_string(), "2048".to_string());
        updates.insert("scale".to_string(), "0.5".to_string());
        updates.insert("variant".to_string(), "perceptron".to_string());

        let merged = mgr.merged_config(&updates).unwrap();
        assert_eq!(merged["block_size"], 64);
        assert_eq!(merged["btb_sets"], 2048);
        assert_eq!(merged["scale"], 0.5);
        assert_eq!(merged["variant"], "perceptron");
    }

    #[test]
    fn test_merged_config_rejects_non_object_template() {
        let mgr = MakeBuildManager::new(PathBuf::from("."), serde_json::json!([1, 2]));
        let err = mgr.merged_config(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, BuildError::TemplateNotAnObject));
    }

    #[test]
    fn test_null_template_becomes_empty_object() {
        let mgr = MakeBuildManager::new(PathBuf::from("."), serde_json::Value::Null);
        let mut updates = BTreeMap::new();
        updates.insert("btb_sets".to_string(), "512".to_string());
        let merged = mgr.merged_config(&updates).unwrap();
        assert_eq!(merged["btb_sets"], 512);
    }
}
