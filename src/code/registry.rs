// src/code/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::code::{ShellCode, SimulationCode};
use crate::errors::{Result, SimonError};
use crate::tree::TaskNode;
use crate::types::Probe;

/// Constructor for a simulation code, used by [`CodeRegistry::register_with`].
pub type CodeConstructor = fn() -> Box<dyn SimulationCode>;

/// Explicit mapping from `code_name` to the implementation handling it.
#[derive(Debug, Default, Clone)]
pub struct CodeRegistry {
    codes: BTreeMap<String, Arc<dyn SimulationCode>>,
}

impl CodeRegistry {
    /// An empty registry: every node is undispatchable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all codes shipped with SiMon.
    pub fn with_builtin_codes() -> Self {
        let mut registry = Self::new();
        registry.register_with(ShellCode::boxed);
        registry
    }

    /// Register an implementation under its own [`SimulationCode::name`].
    ///
    /// A later registration with the same name replaces the earlier one.
    pub fn register<C: SimulationCode + 'static>(&mut self, code: C) {
        self.insert(Arc::new(code));
    }

    pub fn register_with(&mut self, constructor: CodeConstructor) {
        self.insert(Arc::from(constructor()));
    }

    fn insert(&mut self, code: Arc<dyn SimulationCode>) {
        debug!(code = code.name(), "registering simulation code");
        self.codes.insert(code.name().to_string(), code);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SimulationCode>> {
        self.codes.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    /// Implementation responsible for `task`.
    pub fn resolve(&self, task: &TaskNode) -> Result<Arc<dyn SimulationCode>> {
        let code = task.code_name().ok_or(SimonError::NoProvider(task.id))?;
        self.get(code).ok_or_else(|| SimonError::UnknownCode {
            code: code.to_string(),
            dir: task.dir.clone(),
        })
    }

    /// Probe `task` through its simulation code.
    pub fn probe(&self, task: &TaskNode) -> Result<Probe> {
        let code = self.resolve(task)?;
        code.probe_status(task).map_err(|source| SimonError::Action {
            action: "probe",
            dir: task.dir.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_simulation_config;

    fn node_with_code(code: &str) -> TaskNode {
        let mut node = TaskNode::new(1, "run".into(), "/sims/run".into(), Some(0), 1);
        node.config = Some(
            parse_simulation_config(&format!("[simulation]\ncode_name = \"{code}\"\n")).unwrap(),
        );
        node
    }

    #[test]
    fn builtin_registry_knows_shell() {
        let registry = CodeRegistry::with_builtin_codes();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["shell"]);
        assert!(registry.resolve(&node_with_code("shell")).is_ok());
    }

    #[test]
    fn unknown_and_missing_codes_are_reported() {
        let registry = CodeRegistry::with_builtin_codes();

        let err = registry.resolve(&node_with_code("gadget")).unwrap_err();
        assert!(matches!(err, SimonError::UnknownCode { ref code, .. } if code == "gadget"));

        let bare = TaskNode::new(2, "bare".into(), "/sims/bare".into(), Some(0), 1);
        assert!(matches!(registry.probe(&bare), Err(SimonError::NoProvider(2))));
    }
}
