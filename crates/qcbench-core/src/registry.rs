//! Provider registry.
//!
//! The [`RegistryBuilder`] collects providers at startup and rejects
//! duplicate `(kind, id)` keys. [`RegistryBuilder::freeze`] turns it into an
//! immutable [`Registry`] that is shared read-only by every task.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::devices::{TargetDevice, builtin_devices};
use crate::error::{RegistryError, RegistryResult};
use crate::provider::{Compiler, CompilerFactory, Observable, OutputMetric};
use crate::{compilers, metrics, observables};

/// The kinds of things a registry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// [`Compiler`] factories.
    Compiler,
    /// [`Observable`] operators.
    Observable,
    /// [`OutputMetric`] functions.
    OutputMetric,
    /// [`TargetDevice`] descriptions.
    TargetDevice,
}

impl ProviderKind {
    /// All kinds, in display order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Compiler,
        ProviderKind::Observable,
        ProviderKind::OutputMetric,
        ProviderKind::TargetDevice,
    ];
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Compiler => write!(f, "compiler"),
            ProviderKind::Observable => write!(f, "observable"),
            ProviderKind::OutputMetric => write!(f, "output_metric"),
            ProviderKind::TargetDevice => write!(f, "target_device"),
        }
    }
}

fn insert_unique<T>(
    map: &mut FxHashMap<String, T>,
    kind: ProviderKind,
    id: String,
    value: T,
) -> RegistryResult<()> {
    if map.contains_key(&id) {
        return Err(RegistryError::Duplicate { kind, id });
    }
    debug!("Registering {}: {}", kind, id);
    map.insert(id, value);
    Ok(())
}

/// Mutable registry used during startup.
#[derive(Default)]
pub struct RegistryBuilder {
    compilers: FxHashMap<String, CompilerFactory>,
    observables: FxHashMap<String, Arc<dyn Observable>>,
    output_metrics: FxHashMap<String, Arc<dyn OutputMetric>>,
    target_devices: FxHashMap<String, Arc<TargetDevice>>,
}

impl RegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder pre-populated with every built-in provider.
    pub fn with_builtins() -> RegistryResult<Self> {
        let mut builder = Self::new();
        compilers::register_builtins(&mut builder)?;
        observables::register_builtins(&mut builder)?;
        metrics::register_builtins(&mut builder)?;
        for device in builtin_devices() {
            builder.register_target_device(device)?;
        }
        Ok(builder)
    }

    /// Register a compiler factory.
    pub fn register_compiler<F>(&mut self, id: impl Into<String>, factory: F) -> RegistryResult<&mut Self>
    where
        F: Fn() -> Box<dyn Compiler> + Send + Sync + 'static,
    {
        insert_unique(
            &mut self.compilers,
            ProviderKind::Compiler,
            id.into(),
            Arc::new(factory),
        )?;
        Ok(self)
    }

    /// Register an observable.
    pub fn register_observable(
        &mut self,
        id: impl Into<String>,
        observable: impl Observable + 'static,
    ) -> RegistryResult<&mut Self> {
        insert_unique(
            &mut self.observables,
            ProviderKind::Observable,
            id.into(),
            Arc::new(observable),
        )?;
        Ok(self)
    }

    /// Register an output metric.
    pub fn register_output_metric(
        &mut self,
        id: impl Into<String>,
        metric: impl OutputMetric + 'static,
    ) -> RegistryResult<&mut Self> {
        insert_unique(
            &mut self.output_metrics,
            ProviderKind::OutputMetric,
            id.into(),
            Arc::new(metric),
        )?;
        Ok(self)
    }

    /// Register a target device under its own id.
    pub fn register_target_device(&mut self, device: TargetDevice) -> RegistryResult<&mut Self> {
        insert_unique(
            &mut self.target_devices,
            ProviderKind::TargetDevice,
            device.id.clone(),
            Arc::new(device),
        )?;
        Ok(self)
    }

    /// Freeze into a read-only registry.
    pub fn freeze(self) -> Arc<Registry> {
        Arc::new(Registry {
            compilers: self.compilers,
            observables: self.observables,
            output_metrics: self.output_metrics,
            target_devices: self.target_devices,
        })
    }
}

/// Read-only provider catalog.
pub struct Registry {
    compilers: FxHashMap<String, CompilerFactory>,
    observables: FxHashMap<String, Arc<dyn Observable>>,
    output_metrics: FxHashMap<String, Arc<dyn OutputMetric>>,
    target_devices: FxHashMap<String, Arc<TargetDevice>>,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    /// A registry holding every built-in provider.
    pub fn builtin() -> RegistryResult<Arc<Self>> {
        Ok(RegistryBuilder::with_builtins()?.freeze())
    }

    /// The process-wide built-in registry, built on first use.
    pub fn global() -> RegistryResult<Arc<Self>> {
        if let Some(registry) = GLOBAL.get() {
            return Ok(Arc::clone(registry));
        }
        let registry = Self::builtin()?;
        Ok(Arc::clone(GLOBAL.get_or_init(|| registry)))
    }

    /// A fresh compiler instance.
    pub fn compiler(&self, id: &str) -> RegistryResult<Box<dyn Compiler>> {
        self.compilers
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| not_registered(ProviderKind::Compiler, id))
    }

    /// A shared observable.
    pub fn observable(&self, id: &str) -> RegistryResult<Arc<dyn Observable>> {
        self.observables
            .get(id)
            .cloned()
            .ok_or_else(|| not_registered(ProviderKind::Observable, id))
    }

    /// A shared output metric.
    pub fn output_metric(&self, id: &str) -> RegistryResult<Arc<dyn OutputMetric>> {
        self.output_metrics
            .get(id)
            .cloned()
            .ok_or_else(|| not_registered(ProviderKind::OutputMetric, id))
    }

    /// A target device description.
    pub fn target_device(&self, id: &str) -> RegistryResult<Arc<TargetDevice>> {
        self.target_devices
            .get(id)
            .cloned()
            .ok_or_else(|| not_registered(ProviderKind::TargetDevice, id))
    }

    /// Whether `(kind, id)` is registered.
    pub fn contains(&self, kind: ProviderKind, id: &str) -> bool {
        match kind {
            ProviderKind::Compiler => self.compilers.contains_key(id),
            ProviderKind::Observable => self.observables.contains_key(id),
            ProviderKind::OutputMetric => self.output_metrics.contains_key(id),
            ProviderKind::TargetDevice => self.target_devices.contains_key(id),
        }
    }

    /// Fail with [`RegistryError::NotRegistered`] unless `(kind, id)` exists.
    pub fn require(&self, kind: ProviderKind, id: &str) -> RegistryResult<()> {
        if self.contains(kind, id) {
            Ok(())
        } else {
            Err(not_registered(kind, id))
        }
    }

    /// Sorted ids of one kind.
    pub fn ids(&self, kind: ProviderKind) -> Vec<&str> {
        let mut ids: Vec<&str> = match kind {
            ProviderKind::Compiler => self.compilers.keys().map(String::as_str).collect(),
            ProviderKind::Observable => self.observables.keys().map(String::as_str).collect(),
            ProviderKind::OutputMetric => self.output_metrics.keys().map(String::as_str).collect(),
            ProviderKind::TargetDevice => self.target_devices.keys().map(String::as_str).collect(),
        };
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("compilers", &self.ids(ProviderKind::Compiler))
            .field("observables", &self.ids(ProviderKind::Observable))
            .field("output_metrics", &self.ids(ProviderKind::OutputMetric))
            .field("target_devices", &self.ids(ProviderKind::TargetDevice))
            .finish()
    }
}

fn not_registered(kind: ProviderKind, id: &str) -> RegistryError {
    RegistryError::NotRegistered {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilers::TranslateCompiler;
    use qcbench_ir::Circuit;

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_compiler("translate", || Box::new(TranslateCompiler))
            .unwrap();
        let err = builder
            .register_compiler("translate", || Box::new(TranslateCompiler))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RegistryError::Duplicate { kind: ProviderKind::Compiler, ref id } if id == "translate"
        ));
    }

    #[test]
    fn test_same_id_different_kind_is_allowed() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_output_metric("depth", |c: &Circuit, _: &Circuit| c.depth() as f64)
            .unwrap();
        builder
            .register_compiler("depth", || Box::new(TranslateCompiler))
            .unwrap();
        let registry = builder.freeze();
        assert!(registry.contains(ProviderKind::Compiler, "depth"));
        assert!(registry.contains(ProviderKind::OutputMetric, "depth"));
    }

    #[test]
    fn test_lookup_missing() {
        let registry = RegistryBuilder::new().freeze();
        let err = registry.observable("qaoa").err().unwrap();
        assert_eq!(err.to_string(), "No observable registered with id 'qaoa'");
        assert!(registry.require(ProviderKind::TargetDevice, "x").is_err());
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(
            registry.ids(ProviderKind::Compiler),
            vec!["fixpoint", "peephole", "translate"]
        );
        assert_eq!(
            registry.ids(ProviderKind::TargetDevice),
            vec!["grid_5x5", "heavy_hex_27", "linear_20"]
        );
        assert_eq!(registry.ids(ProviderKind::Observable).len(), 7);
        assert_eq!(registry.ids(ProviderKind::OutputMetric).len(), 5);
    }

    #[test]
    fn test_compiler_factory_gives_fresh_instances() {
        let registry = Registry::builtin().unwrap();
        let a = registry.compiler("peephole").unwrap();
        let b = registry.compiler("peephole").unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_global_is_cached() {
        let a = Registry::global().unwrap();
        let b = Registry::global().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
