// src/action.rs
//
// Action space for the checkpoint fidelity harness.
//
// An Action is one point in the simulated hardware's configurable parameter
// space, expressed as head -> value assignments. The ActionSpace is loaded
// once per run from a declarative JSON definition and is read-only
// afterwards; it knows which heads exist, their base values, and how each
// head maps onto a simulator build-configuration key.
//
// Design principles:
// - Actions are immutable once constructed and compare by their (head,
//   value) pairs independent of construction order (BTreeMap equality).
// - Deduplication is stable: first occurrence wins, so downstream step
//   indices (used for artifact naming) are deterministic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// One point in the architectural configuration space.
///
/// Equality is defined over the (head, value) pairs as a set; two actions
/// built from the same assignments in different orders are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Head -> value assignments. BTreeMap for stable, sorted iteration.
    pub values: BTreeMap<String, String>,
}

impl Action {
    /// Map this action's head values onto simulator build-configuration
    /// override keys, per the action space's head definitions.
    pub fn as_config_updates(&self, space: &ActionSpace) -> BTreeMap<String, String> {
        let mut updates = BTreeMap::new();
        for (head, value) in &self.values {
            if let Some(spec) = space.heads().get(head) {
                updates.insert(spec.config_key.clone(), value.clone());
            }
        }
        updates
    }

    /// Sorted (head, value) pair sequence used as the deduplication key.
    fn signature(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments: Vec<String> = self
            .values
            .iter()
            .map(|(head, value)| format!("{}={}", head, value))
            .collect();
        write!(f, "{{{}}}", assignments.join(", "))
    }
}

/// Declared definition of a single head in the action space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadSpec {
    /// Value this head takes in the base configuration.
    pub base: String,
    /// Build-configuration key this head maps onto.
    pub config_key: String,
    /// Allowed values. Empty means any value is accepted.
    #[serde(default)]
    pub choices: Vec<String>,
}

/// The set of recognized heads plus validation/construction rules.
#[derive(Debug, Clone)]
pub struct ActionSpace {
    heads: BTreeMap<String, HeadSpec>,
}

impl ActionSpace {
    pub fn new(heads: BTreeMap<String, HeadSpec>) -> Self {
        Self { heads }
    }

    /// Declared heads, keyed by name.
    pub fn heads(&self) -> &BTreeMap<String, HeadSpec> {
        &self.heads
    }

    /// The action where every head takes its declared base value.
    pub fn base_action(&self) -> Action {
        let values = self
            .heads
            .iter()
            .map(|(head, spec)| (head.clone(), spec.base.clone()))
            .collect();
        Action { values }
    }

    /// Materialize an Action from a partial or complete mapping, filling
    /// unspecified heads from the base configuration.
    ///
    /// Fails if the mapping references a head the space does not declare,
    /// or assigns a value outside a head's declared choices.
    pub fn from_dict(
        &self,
        mapping: &BTreeMap<String, String>,
    ) -> Result<Action, ActionSpaceError> {
        for (head, value) in mapping {
            let spec = self
                .heads
                .get(head)
                .ok_or_else(|| ActionSpaceError::UnknownHead {
                    head: head.clone(),
                    known: self.heads.keys().cloned().collect(),
                })?;
            if !spec.choices.is_empty() && !spec.choices.contains(value) {
                return Err(ActionSpaceError::ValueNotAllowed {
                    head: head.clone(),
                    value: value.clone(),
                    choices: spec.choices.clone(),
                });
            }
        }

        let values = self
            .heads
            .iter()
            .map(|(head, spec)| {
                let value = mapping.get(head).unwrap_or(&spec.base).clone();
                (head.clone(), value)
            })
            .collect();
        Ok(Action { values })
    }
}

/// On-disk shape of the action-space definition.
#[derive(Debug, Deserialize)]
struct ActionSpaceFile {
    heads: BTreeMap<String, HeadSpec>,
    /// Build-configuration template the head overrides are merged into.
    #[serde(default)]
    build_template: serde_json::Value,
}

/// Load the action-space definition from a JSON file.
///
/// Returns the space, its base action, and the build-template
/// configuration that head overrides are applied on top of.
pub fn load_action_space(
    path: &Path,
) -> Result<(ActionSpace, Action, serde_json::Value), ActionSpaceError> {
    let contents = fs::read_to_string(path).map_err(|e| ActionSpaceError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    let file: ActionSpaceFile =
        serde_json::from_str(&contents).map_err(|e| ActionSpaceError::Parse {
            path: path.display().to_string(),
            source: e.to_string(),
        })?;
    let space = ActionSpace::new(file.heads);
    let base = space.base_action();
    Ok((space, base, file.build_template))
}

/// Parse an action spec string of the form `head1=value1,head2=value2`.
///
/// Whitespace around commas and `=` is insignificant. Empty segments (from
/// trailing or duplicate commas) are skipped. Duplicate heads: later
/// assignment wins.
pub fn parse_action_spec(text: &str) -> Result<BTreeMap<String, String>, ActionSpecError> {
    let mut mapping = BTreeMap::new();
    for segment in text.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (head, value) = segment
            .split_once('=')
            .ok_or_else(|| ActionSpecError::MissingAssignment {
                segment: segment.to_string(),
                spec: text.to_string(),
            })?;
        mapping.insert(head.trim().to_string(), value.trim().to_string());
    }
    if mapping.is_empty() {
        return Err(ActionSpecError::Empty {
            spec: text.to_string(),
        });
    }
    Ok(mapping)
}

/// Collapse a requested sequence of actions into a set of unique actions,
/// in order of first occurrence.
pub fn dedupe_actions(actions: Vec<Action>) -> Vec<Action> {
    let mut seen: HashSet<Vec<(String, String)>> = HashSet::new();
    let mut unique = Vec::new();
    for action in actions {
        if seen.insert(action.signature()) {
            unique.push(action);
        }
    }
    unique
}

/// Malformed `--action` spec string.
#[derive(Debug, Clone)]
pub enum ActionSpecError {
    /// A segment lacked an `=` assignment.
    MissingAssignment { segment: String, spec: String },
    /// The spec produced zero assignments.
    Empty { spec: String },
}

impl fmt::Display for ActionSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSpecError::MissingAssignment { segment, spec } => {
                write!(
                    f,
                    "Invalid action spec segment '{}' in '{}': expected head=value",
                    segment, spec
                )
            }
            ActionSpecError::Empty { spec } => {
                write!(f, "Action spec '{}' did not contain any assignments", spec)
            }
        }
    }
}

impl std::error::Error for ActionSpecError {}

/// Errors from loading or validating against the action space.
#[derive(Debug, Clone)]
pub enum ActionSpaceError {
    Io {
        path: String,
        source: String,
    },
    Parse {
        path: String,
        source: String,
    },
    UnknownHead {
        head: String,
        known: Vec<String>,
    },
    ValueNotAllowed {
        head: String,
        value: String,
        choices: Vec<String>,
    },
}

impl fmt::Display for ActionSpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSpaceError::Io { path, source } => {
                write!(f, "Failed to read action space '{}': {}", path, source)
            }
            ActionSpaceError::Parse { path, source } => {
                write!(f, "Failed to parse action space '{}': {}", path, source)
            }
            ActionSpaceError::UnknownHead { head, known } => {
                write!(
                    f,
                    "Unknown head '{}' (known heads: {})",
                    head,
                    known.join(", ")
                )
            }
            ActionSpaceError::ValueNotAllowed {
                head,
                value,
                choices,
            } => {
                write!(
                    f,
                    "Value '{}' not allowed for head '{}' (choices: {})",
                    value,
                    head,
                    choices.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ActionSpaceError {}
