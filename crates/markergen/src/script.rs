//! User-scripted conditions
//!
//! Condition graphs can defer to named user scripts. Scripts implement
//! [`RuleScript`]; the processor resolves names through a
//! [`ScriptInstanceCache`] that keeps one instance per script class for the
//! duration of a build batch and is released explicitly afterwards.

use glam::{IVec2, Mat4, Vec3};
use gridscene::CellKind;
use std::any::Any;
use std::collections::HashMap;

/// Spatial context handed to a scripted condition
pub struct ScriptContext<'a> {
    /// World-space position of the evaluated cell slot
    pub position: Vec3,

    /// Grid coordinate of the evaluated cell
    pub coord: IVec2,

    /// Slot kind being evaluated
    pub kind: CellKind,

    /// Grid-to-world transform of the generated level
    pub level_transform: Mat4,

    /// Caller-supplied collaborators, passed through uninterpreted
    pub user_data: Option<&'a dyn Any>,
}

/// A user-extensible condition hook
pub trait RuleScript {
    /// Evaluate the condition at the given spatial context
    fn validate(&mut self, context: &ScriptContext) -> bool;
}

/// Factory producing script instances by class name
pub type ScriptFactory = Box<dyn Fn() -> Box<dyn RuleScript>>;

/// One script instance per class name, living for one build batch.
#[derive(Default)]
pub struct ScriptInstanceCache {
    factories: HashMap<String, ScriptFactory>,
    instances: HashMap<String, Box<dyn RuleScript>>,
}

impl ScriptInstanceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        ScriptInstanceCache::default()
    }

    /// Register a factory for a script class name
    pub fn register(
        &mut self,
        class_name: impl Into<String>,
        factory: impl Fn() -> Box<dyn RuleScript> + 'static,
    ) {
        self.factories.insert(class_name.into(), Box::new(factory));
    }

    /// Resolve a script instance by class name, instantiating on first use.
    /// Unknown names resolve to `None`.
    pub fn get(&mut self, class_name: &str) -> Option<&mut Box<dyn RuleScript>> {
        if !self.instances.contains_key(class_name) {
            let factory = self.factories.get(class_name)?;
            self.instances
                .insert(class_name.to_string(), factory());
        }
        self.instances.get_mut(class_name)
    }

    /// Drop all cached instances. Called once at the end of a build batch.
    pub fn release(&mut self) {
        self.instances.clear();
    }
}
