//! Gated enterprise plugins and the host-side registry of running plugins.
//!
//! The core decides which plugins a deployment may run; the host drives
//! their lifecycle. Plugins whose flag is off are never instantiated.

use crate::error::{PluginError, PluginResult};
use crate::flags::FeatureFlags;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Lifecycle contract for enterprise plugins.
pub trait Plugin: Send {
    /// Unique plugin name, matching an entry in `FeatureFlags::enabled_plugins`.
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    /// Called once when the host server starts.
    fn on_startup(&mut self) -> PluginResult<()>;

    /// Called once when the host server shuts down.
    fn on_shutdown(&mut self) -> PluginResult<()>;

    /// Called before a workflow executes.
    fn on_workflow_start(&mut self, _workflow_id: &str, _context: &Value) -> PluginResult<()> {
        Ok(())
    }

    /// Called after a workflow completes.
    fn on_workflow_complete(&mut self, _workflow_id: &str, _result: &Value) -> PluginResult<()> {
        Ok(())
    }
}

/// Read access to the set of plugins currently running.
pub trait PluginRegistry: Send + Sync {
    fn running_plugins(&self) -> BTreeSet<String>;
}

/// RBAC/ABAC policy enforcement for workflow execution.
#[derive(Debug, Default)]
pub struct PolicyPlugin {
    checked: u64,
}

impl Plugin for PolicyPlugin {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn on_startup(&mut self) -> PluginResult<()> {
        debug!("Policy engine ready");
        Ok(())
    }

    fn on_shutdown(&mut self) -> PluginResult<()> {
        debug!(checked = self.checked, "Policy engine stopped");
        Ok(())
    }

    fn on_workflow_start(&mut self, workflow_id: &str, _context: &Value) -> PluginResult<()> {
        self.checked += 1;
        debug!(workflow_id, "Policy check");
        Ok(())
    }

    fn on_workflow_complete(&mut self, workflow_id: &str, _result: &Value) -> PluginResult<()> {
        debug!(workflow_id, "Policy audit recorded");
        Ok(())
    }
}

/// Workflow execution pattern mining.
#[derive(Debug, Default)]
pub struct PatternsPlugin {
    observed: u64,
}

impl Plugin for PatternsPlugin {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn on_startup(&mut self) -> PluginResult<()> {
        debug!("Pattern miner ready");
        Ok(())
    }

    fn on_shutdown(&mut self) -> PluginResult<()> {
        debug!(observed = self.observed, "Pattern miner stopped");
        Ok(())
    }

    fn on_workflow_complete(&mut self, workflow_id: &str, _result: &Value) -> PluginResult<()> {
        self.observed += 1;
        debug!(workflow_id, "Workflow queued for pattern analysis");
        Ok(())
    }
}

/// Workflow synthesis from natural language.
#[derive(Debug, Default)]
pub struct SynthesisPlugin;

impl Plugin for SynthesisPlugin {
    fn name(&self) -> &'static str {
        "synthesis"
    }

    fn on_startup(&mut self) -> PluginResult<()> {
        debug!("Synthesis engine ready");
        Ok(())
    }

    fn on_shutdown(&mut self) -> PluginResult<()> {
        debug!("Synthesis engine stopped");
        Ok(())
    }
}

/// Instantiates a built-in gated plugin by name.
fn builtin(name: &str) -> Option<Box<dyn Plugin>> {
    match name {
        "policy" => Some(Box::new(PolicyPlugin::default())),
        "patterns" => Some(Box::new(PatternsPlugin::default())),
        "synthesis" => Some(Box::new(SynthesisPlugin)),
        _ => None,
    }
}

struct Slot {
    plugin: Box<dyn Plugin>,
    running: bool,
}

/// Owns the gated plugins selected for this deployment.
///
/// Hooks run under the slot lock. The running set is tracked separately so
/// registry readers never wait on a hook.
pub struct PluginHost {
    entitled: BTreeSet<String>,
    slots: Mutex<Vec<Slot>>,
    running: RwLock<BTreeSet<String>>,
}

impl PluginHost {
    /// Instantiates every built-in plugin the flags entitle. Nothing is started yet.
    #[must_use]
    pub fn assemble(flags: &FeatureFlags) -> Self {
        let slots = flags
            .enabled_plugins
            .iter()
            .filter_map(|name| builtin(name))
            .map(|plugin| Slot {
                plugin,
                running: false,
            })
            .collect();

        Self {
            entitled: flags.enabled_plugins.iter().cloned().collect(),
            slots: Mutex::new(slots),
            running: RwLock::new(BTreeSet::new()),
        }
    }

    /// Adds a host-provided plugin. Fails if its name is not entitled or already present.
    pub fn register(&self, plugin: Box<dyn Plugin>) -> PluginResult<()> {
        let name = plugin.name();
        if !self.entitled.contains(name) {
            return Err(PluginError::NotEntitled(name.to_string()));
        }
        let mut slots = self.lock();
        if slots.iter().any(|s| s.plugin.name() == name) {
            return Err(PluginError::AlreadyRunning(name.to_string()));
        }
        slots.push(Slot {
            plugin,
            running: false,
        });
        Ok(())
    }

    /// Names of all instantiated plugins, running or not.
    #[must_use]
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.lock().iter().map(|s| s.plugin.name().to_string()).collect()
    }

    /// Starts every plugin that is not running yet, in registration order.
    pub fn start_all(&self) -> PluginResult<()> {
        for slot in self.lock().iter_mut().filter(|s| !s.running) {
            let name = slot.plugin.name();
            slot.plugin.on_startup().map_err(|e| PluginError::Startup {
                plugin: name.to_string(),
                reason: e.to_string(),
            })?;
            slot.running = true;
            self.running
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name.to_string());
            info!(plugin = name, version = slot.plugin.version(), "Plugin started");
        }
        Ok(())
    }

    /// Stops running plugins in reverse order. Failures are logged, not propagated.
    pub fn shutdown_all(&self) {
        for slot in self.lock().iter_mut().rev().filter(|s| s.running) {
            if let Err(e) = slot.plugin.on_shutdown() {
                warn!(plugin = slot.plugin.name(), "Plugin shutdown failed: {}", e);
            }
            slot.running = false;
            self.running
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(slot.plugin.name());
        }
    }

    /// Dispatches `on_workflow_start` to running plugins; the first failure aborts.
    pub fn notify_workflow_start(&self, workflow_id: &str, context: &Value) -> PluginResult<()> {
        for slot in self.lock().iter_mut().filter(|s| s.running) {
            slot.plugin.on_workflow_start(workflow_id, context)?;
        }
        Ok(())
    }

    /// Dispatches `on_workflow_complete` to running plugins. Failures are logged.
    pub fn notify_workflow_complete(&self, workflow_id: &str, result: &Value) {
        for slot in self.lock().iter_mut().filter(|s| s.running) {
            if let Err(e) = slot.plugin.on_workflow_complete(workflow_id, result) {
                warn!(plugin = slot.plugin.name(), workflow_id, "Workflow completion hook failed: {}", e);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PluginRegistry for PluginHost {
    fn running_plugins(&self) -> BTreeSet<String> {
        self.running.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
