#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Builds the check pipeline from a configuration document.

use std::{
    collections::BTreeMap,
    path::Path,
    sync::Arc,
};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    checks::{
        Check, CheckArgs, CoverageCheck, PylintCheck, RequirementsCheck, StructureCheck,
        TypeHintsCheck,
    },
    error::GraderError,
    process::CommandRunner,
};

/// Signature every registered check constructor has.
pub type CheckConstructor = fn(CheckArgs) -> Result<Box<dyn Check>, GraderError>;

/// Keys the factory consumes itself; everything else is forwarded.
const RESERVED_KEYS: &[&str] = &["name", "max_points", "is_venv_required"];

/// One item of the `checks` list.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfigEntry {
    /// Registered check identifier.
    pub name:             String,
    /// Maximum points for the check.
    pub max_points:       u32,
    /// Whether the check needs the isolated environment.
    #[serde(default)]
    pub is_venv_required: bool,
    /// Every other key, forwarded to the check constructor.
    #[serde(flatten)]
    pub options:          Map<String, Value>,
}

/// The checks to run, split by phase. Order within each phase follows the
/// configuration.
#[derive(Default)]
pub struct CheckPlan {
    /// Checks that run directly against the project directory.
    pub non_isolated: Vec<Box<dyn Check>>,
    /// Checks that run inside the isolated environment.
    pub isolated:     Vec<Box<dyn Check>>,
}

impl CheckPlan {
    /// Total number of checks in both phases.
    pub fn len(&self) -> usize {
        self.non_isolated.len() + self.isolated.len()
    }

    /// True when no checks were configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Name → constructor map. Adding a check variant means adding one entry.
#[derive(Clone)]
pub struct CheckRegistry {
    /// Registered constructors by check name.
    constructors: BTreeMap<String, CheckConstructor>,
}

impl Default for CheckRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("coverage", |args| Ok(Box::new(CoverageCheck::new(args)?)));
        registry.register("pylint", |args| Ok(Box::new(PylintCheck::new(args)?)));
        registry.register("requirements", |args| {
            Ok(Box::new(RequirementsCheck::new(args)?))
        });
        registry.register("type-hints", |args| Ok(Box::new(TypeHintsCheck::new(args)?)));
        registry.register("structure", |args| Ok(Box::new(StructureCheck::new(args)?)));
        registry
    }
}

impl CheckRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the constructor for `name`.
    pub fn register(&mut self, name: impl Into<String>, constructor: CheckConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Looks up the constructor for `name`.
    pub fn get(&self, name: &str) -> Option<CheckConstructor> {
        self.constructors.get(name).copied()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Validates `config` and constructs every check it lists.
    ///
    /// Faults, in the order they are detected: no `checks` list, an entry
    /// without `name` or `max_points`, an unregistered name, and finally any
    /// error a constructor raises for its own options.
    pub fn create_checks(
        &self,
        config: &Value,
        project_root: &Path,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<CheckPlan, GraderError> {
        let entries = config
            .get("checks")
            .ok_or_else(|| GraderError::Config("No checks found in the configuration file".into()))?
            .as_array()
            .ok_or_else(|| GraderError::Config("`checks` must be a list".into()))?;

        let mut plan = CheckPlan::default();
        for (idx, raw) in entries.iter().enumerate() {
            let entry = parse_entry(idx, raw)?;
            let constructor = self
                .get(&entry.name)
                .ok_or_else(|| GraderError::UnknownCheck(entry.name.clone()))?;

            let is_venv_required = entry.is_venv_required;
            let check = constructor(CheckArgs {
                name: entry.name,
                project_root: project_root.to_path_buf(),
                max_points: entry.max_points,
                is_venv_required,
                options: entry.options,
                runner: Arc::clone(&runner),
            })?;

            tracing::debug!(
                "Created check {} (max {}, isolated: {is_venv_required})",
                check.name(),
                check.max_points()
            );
            if is_venv_required {
                plan.isolated.push(check);
            } else {
                plan.non_isolated.push(check);
            }
        }

        Ok(plan)
    }
}

/// Validates one raw entry into a [`CheckConfigEntry`].
fn parse_entry(idx: usize, raw: &Value) -> Result<CheckConfigEntry, GraderError> {
    let object = raw
        .as_object()
        .ok_or_else(|| GraderError::Config(format!("Check #{idx} is not a mapping")))?;
    if !object.contains_key("name") || !object.contains_key("max_points") {
        return Err(GraderError::Config(format!(
            "Invalid check configuration: check #{idx} needs both `name` and `max_points`"
        )));
    }

    let mut entry: CheckConfigEntry = serde_json::from_value(raw.clone())
        .map_err(|err| GraderError::Config(format!("Invalid check configuration #{idx}: {err}")))?;
    entry.options.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
    Ok(entry)
}

/// Builds checks with the default registry.
pub fn create_checks(
    config: &Value,
    project_root: &Path,
    runner: Arc<dyn CommandRunner>,
) -> Result<CheckPlan, GraderError> {
    CheckRegistry::default().create_checks(config, project_root, runner)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{checks::testing::ScriptedRunner, process::CommandOutput};

    fn runner() -> Arc<dyn CommandRunner> {
        ScriptedRunner::new(|_| CommandOutput::ok(""))
    }

    fn names(checks: &[Box<dyn Check>]) -> Vec<&str> {
        checks.iter().map(|c| c.name()).collect()
    }

    #[test]
    fn missing_checks_key_is_a_config_fault() {
        let result = create_checks(&json!({"other": []}), Path::new("."), runner());
        assert!(matches!(result, Err(GraderError::Config(_))));
    }

    #[test]
    fn entries_need_name_and_max_points() {
        for entry in [json!({"name": "pylint"}), json!({"max_points": 3})] {
            let result = create_checks(&json!({"checks": [entry]}), Path::new("."), runner());
            assert!(matches!(result, Err(GraderError::Config(_))));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let config = json!({"checks": [{"name": "black", "max_points": 3}]});
        let result = create_checks(&config, Path::new("."), runner());
        assert!(matches!(result, Err(GraderError::UnknownCheck(name)) if name == "black"));
    }

    #[test]
    fn negative_max_points_is_a_config_fault() {
        let config = json!({"checks": [{"name": "pylint", "max_points": -1}]});
        let result = create_checks(&config, Path::new("."), runner());
        assert!(matches!(result, Err(GraderError::Config(_))));
    }

    #[test]
    fn checks_are_routed_by_isolation_in_config_order() {
        let config = json!({"checks": [
            {"name": "requirements", "max_points": 10},
            {"name": "coverage", "max_points": 8, "is_venv_required": true},
            {"name": "type-hints", "max_points": 8, "is_venv_required": false},
            {"name": "pylint", "max_points": 10, "is_venv_required": true},
        ]});
        let plan = create_checks(&config, Path::new("."), runner()).expect("plan");

        assert_eq!(names(&plan.non_isolated), ["requirements", "type-hints"]);
        assert_eq!(names(&plan.isolated), ["coverage", "pylint"]);
        assert!(plan.isolated.iter().all(|c| c.is_isolated()));
        assert_eq!(plan.isolated[0].max_points(), 8);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn extra_keys_reach_the_constructor() {
        let config = json!({"checks": [
            {"name": "requirements", "max_points": 1, "unexpected": 1},
        ]});
        let result = create_checks(&config, Path::new("."), runner());
        assert!(matches!(result, Err(GraderError::InvalidCheckOptions { check, .. }) if check == "requirements"));
    }

    #[test]
    fn new_variants_only_need_a_registration() {
        let mut registry = CheckRegistry::empty();
        registry.register("alias", |args| Ok(Box::new(PylintCheck::new(args)?)));
        let config = json!({"checks": [{"name": "alias", "max_points": 2}]});
        let plan = registry
            .create_checks(&config, Path::new("."), runner())
            .expect("plan");
        assert_eq!(names(&plan.non_isolated), ["alias"]);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["alias"]);
    }
}
