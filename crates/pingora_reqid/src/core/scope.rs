use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable, type-keyed bag of request-lifetime values.
///
/// A scope is never changed in place: [`Scope::with`] hands back a derived
/// scope and leaves the parent as it was, so one parent can be shared by many
/// concurrent children. Cloning is an `Arc` bump.
#[derive(Clone, Default)]
pub struct Scope {
    values: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("values", &self.values.len())
            .finish()
    }
}

impl Scope {
    /// An empty root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a scope that also carries `value`, replacing any previous value
    /// of the same type in the derived copy.
    pub fn with<T: Send + Sync + 'static>(&self, value: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value) as Arc<dyn Any + Send + Sync>);
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
