//! Named instance container
//!
//! Providers publish shared services here under string names; consumers
//! fetch them back with their concrete type.

use crate::{Result, TetherError};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Type-checked registry of shared instances.
#[derive(Default)]
pub struct Container {
    instances: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container").field("names", &self.names()).finish()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, replacing any previous instance.
    pub fn instance<T>(&mut self, name: impl Into<String>, value: Arc<T>) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        self.instances.insert(name.into(), value);
        self
    }

    /// Fetches the instance stored under `name`.
    ///
    /// Fails when the name is unknown or the stored value has another type.
    pub fn make<T>(&self, name: &str) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self
            .instances
            .get(name)
            .cloned()
            .ok_or_else(|| TetherError::container(format!("no instance registered as {:?}", name)))?;

        value.downcast::<T>().map_err(|_| {
            TetherError::container(format!(
                "instance {:?} is not a {}",
                name,
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.instances.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TetherErrorKind;

    #[test]
    fn test_instance_and_make() {
        let mut container = Container::new();
        container.instance("answer", Arc::new(42u32));
        let value = container.make::<u32>("answer").unwrap();
        assert_eq!(*value, 42);
        assert!(container.has("answer"));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_make_unknown() {
        let container = Container::new();
        let err = container.make::<u32>("missing").unwrap_err();
        assert_eq!(err.kind(), TetherErrorKind::Container);
    }

    #[test]
    fn test_make_wrong_type() {
        let mut container = Container::new();
        container.instance("answer", Arc::new(42u32));
        let err = container.make::<String>("answer").unwrap_err();
        assert!(err.to_string().contains("is not a"));
    }

    #[test]
    fn test_names_sorted() {
        let mut container = Container::new();
        container
            .instance("redis", Arc::new(1u8))
            .instance("config", Arc::new(2u8));
        assert_eq!(container.names(), vec!["config", "redis"]);
    }
}
