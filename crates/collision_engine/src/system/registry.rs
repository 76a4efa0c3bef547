//! Caller-side handle registry
//!
//! Shape handles are minted when a shape is submitted, before the worker has
//! seen it, so the caller can use the handle right away. The worker retires
//! handles when it removes shapes; slot versions guarantee a retired handle
//! never matches a later shape.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::collision::shape::ShapeKey;
use crate::collision::{ShapeId, ShapeType};
use crate::foundation::collections::SlotMap;

/// Shared table of live shape handles
#[derive(Debug, Clone, Default)]
pub(crate) struct ShapeRegistry {
    keys: Arc<Mutex<SlotMap<ShapeKey, ShapeType>>>,
}

impl ShapeRegistry {
    pub(crate) fn mint(&self, shape_type: ShapeType) -> ShapeId {
        ShapeId::from_key(self.lock().insert(shape_type))
    }

    /// Forget a handle; false if it was not live
    pub(crate) fn retire(&self, shape_id: ShapeId) -> bool {
        self.lock().remove(shape_id.key()).is_some()
    }

    pub(crate) fn shape_type(&self, shape_id: ShapeId) -> Option<ShapeType> {
        self.lock().get(shape_id.key()).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, SlotMap<ShapeKey, ShapeType>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retired_handles_stay_dead() {
        let registry = ShapeRegistry::default();
        let first = registry.mint(ShapeType::Box);
        assert_eq!(registry.shape_type(first), Some(ShapeType::Box));

        assert!(registry.retire(first));
        assert!(!registry.retire(first));

        // The slot is reused with a new version
        let second = registry.mint(ShapeType::Sphere);
        assert_ne!(first, second);
        assert_eq!(registry.shape_type(first), None);
        assert_eq!(registry.shape_type(second), Some(ShapeType::Sphere));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_none_handle_is_never_live() {
        let registry = ShapeRegistry::default();
        registry.mint(ShapeType::Capsule);
        assert_eq!(registry.shape_type(ShapeId::none()), None);
        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
