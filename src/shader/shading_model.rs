//! Shading-model registry.
//!
//! Shaders may contribute a BRDF to the shared lighting shader. The registry
//! collects contributions by ID and tracks whether the shared lighting source
//! is stale. Registration and regeneration are mutually exclusive:
//!
//! ```text
//! Idle --begin_registration--> Registering --end_registration--> Idle
//! Idle --begin_regeneration--> Regenerating --finish/abort--> Idle
//! ```

use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};
use crate::shader::definition::ShadingModelDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryState {
    #[default]
    Idle,
    /// A batch of shaders is being parsed and registered
    Registering,
    /// Lighting passes are being regenerated from the current model set
    Regenerating,
}

/// Models registered for the process lifetime, keyed by ID.
#[derive(Debug, Default)]
pub struct ShadingModelRegistry {
    models: BTreeMap<u32, ShadingModelDefinition>,
    dirty: bool,
    state: RegistryState,
}

impl ShadingModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Whether lighting sources were generated before the latest registration.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.models.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&ShadingModelDefinition> {
        self.models.get(&id)
    }

    /// Registered models in ascending ID order.
    pub fn models(&self) -> Vec<ShadingModelDefinition> {
        self.models.values().cloned().collect()
    }

    pub fn begin_registration(&mut self) -> Result<()> {
        match self.state {
            RegistryState::Idle => {
                self.state = RegistryState::Registering;
                Ok(())
            }
            RegistryState::Registering => {
                Err(PipelineError::RegistryBusy("registration already in progress"))
            }
            RegistryState::Regenerating => Err(PipelineError::RegistryBusy(
                "cannot register while regenerating",
            )),
        }
    }

    pub fn end_registration(&mut self) {
        if self.state == RegistryState::Registering {
            self.state = RegistryState::Idle;
        }
    }

    /// Register a model. Returns `true` when the ID was new.
    ///
    /// A known ID is left untouched and does not mark the registry dirty.
    pub fn register(&mut self, model: ShadingModelDefinition) -> Result<bool> {
        if self.state == RegistryState::Regenerating {
            return Err(PipelineError::RegistryBusy(
                "cannot register while regenerating",
            ));
        }
        if let Some(existing) = self.models.get(&model.id) {
            if *existing != model {
                log::warn!(
                    "shading model {} already registered as {:?}; ignoring {:?}",
                    model.id,
                    existing.call,
                    model.call
                );
            }
            return Ok(false);
        }
        log::info!("registered shading model {} ({})", model.id, model.call);
        self.models.insert(model.id, model);
        self.dirty = true;
        Ok(true)
    }

    /// Enter regeneration. Fails if registration is open or regeneration is
    /// already running.
    pub fn begin_regeneration(&mut self) -> Result<()> {
        match self.state {
            RegistryState::Idle => {
                self.state = RegistryState::Regenerating;
                Ok(())
            }
            RegistryState::Registering => Err(PipelineError::RegistryBusy(
                "cannot regenerate while registration is open",
            )),
            RegistryState::Regenerating => {
                Err(PipelineError::RegistryBusy("regeneration already in progress"))
            }
        }
    }

    /// Leave regeneration with every lighting source up to date.
    pub fn finish_regeneration(&mut self) {
        if self.state == RegistryState::Regenerating {
            self.dirty = false;
            self.state = RegistryState::Idle;
        }
    }

    /// Leave regeneration after a failure; the registry stays dirty.
    pub fn abort_regeneration(&mut self) {
        if self.state == RegistryState::Regenerating {
            self.state = RegistryState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: u32, call: &str) -> ShadingModelDefinition {
        ShadingModelDefinition {
            id,
            call: call.into(),
            body: format!("float3 {call} {{ return 0; }}"),
        }
    }

    #[test]
    fn test_register_marks_dirty() {
        let mut registry = ShadingModelRegistry::new();
        assert!(!registry.is_dirty());
        assert!(registry.register(model(7, "MyBRDF(input)")).unwrap());
        assert!(registry.is_dirty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_does_not_redirty() {
        let mut registry = ShadingModelRegistry::new();
        registry.register(model(7, "MyBRDF(input)")).unwrap();
        registry.begin_regeneration().unwrap();
        registry.finish_regeneration();
        assert!(!registry.is_dirty());

        assert!(!registry.register(model(7, "Other(input)")).unwrap());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_dirty());
        assert_eq!(registry.get(7).unwrap().call, "MyBRDF(input)");
    }

    #[test]
    fn test_register_rejected_while_regenerating() {
        let mut registry = ShadingModelRegistry::new();
        registry.begin_regeneration().unwrap();
        assert!(matches!(
            registry.register(model(1, "A(input)")),
            Err(PipelineError::RegistryBusy(_))
        ));
        assert!(registry.begin_regeneration().is_err());
        registry.finish_regeneration();
        assert_eq!(registry.state(), RegistryState::Idle);
    }

    #[test]
    fn test_regeneration_blocked_during_registration() {
        let mut registry = ShadingModelRegistry::new();
        registry.begin_registration().unwrap();
        registry.register(model(2, "B(input)")).unwrap();
        assert!(registry.begin_regeneration().is_err());
        registry.end_registration();
        registry.begin_regeneration().unwrap();
        registry.abort_regeneration();
        assert!(registry.is_dirty());
    }

    #[test]
    fn test_models_sorted_by_id() {
        let mut registry = ShadingModelRegistry::new();
        registry.register(model(9, "C(input)")).unwrap();
        registry.register(model(3, "A(input)")).unwrap();
        let ids: Vec<u32> = registry.models().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 9]);
    }
}
