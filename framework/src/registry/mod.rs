//! Type-keyed registry of contextual services
//!
//! The registry is the lookup structure handlers use to fetch their
//! dependencies by type during a dispatch:
//! - Concrete values: registered with `add`, resolved with `get`
//! - Trait objects: bound with `bind`, resolved with `make`
//! - Hierarchies: `join` layers one registry over another, checking the
//!   child first and falling back to the parent on miss
//!
//! A registry is immutable once built. Deriving a registry with extra
//! bindings (`with`, `join`) always produces a new value, so registries
//! and their ancestors can be shared read-only across concurrently
//! running dispatches.
//!
//! # Example
//!
//! ```rust,ignore
//! use cascade_rs::Registry;
//!
//! let base = Registry::builder()
//!     .add(AppName("cascade".into()))
//!     .bind::<dyn UserRepo>(Arc::new(PgUserRepo::connect(&url)))
//!     .build();
//!
//! let name: AppName = base.get()?;
//! let repo: Arc<dyn UserRepo> = base.make()?;
//! ```

use crate::error::NotInRegistry;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// One binding: a declared type and the value registered under it
#[derive(Clone)]
struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Entry {
    fn of<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Binding for a trait object, stored under `TypeId::of::<Arc<T>>()`
    /// so it can be resolved via `make::<dyn Trait>()`.
    fn of_binding<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<Arc<T>>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(instance),
        }
    }
}

/// Immutable, type-keyed lookup of contextual services with parent fallback
///
/// Lookups are by the *declared* registration type, never a dynamic
/// subtype. Within one registry level the most-recently-added matching
/// binding wins for single-value lookups; `get_all` returns every match in
/// registration order. Lookups are side-effect-free and repeatable.
pub struct Registry {
    entries: Vec<Entry>,
    parent: Option<Arc<Registry>>,
}

impl Registry {
    /// Create a registry with no bindings
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            parent: None,
        }
    }

    /// Create a registry holding a single concrete binding
    pub fn single<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            entries: vec![Entry::of(value)],
            parent: None,
        }
    }

    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            entries: Vec::new(),
        }
    }

    /// Resolve a concrete type (requires Clone)
    ///
    /// The most-recently-added binding at the nearest level wins. Fails
    /// with [`NotInRegistry`] when no binding for the type is reachable at
    /// any level - a binding can never resolve to an absent value.
    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Result<T, NotInRegistry> {
        self.lookup(TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>().cloned())
            .ok_or_else(NotInRegistry::of::<T>)
    }

    /// Borrow a concrete binding without cloning
    pub fn get_ref<T: Any + Send + Sync>(&self) -> Result<&T, NotInRegistry> {
        self.lookup(TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or_else(NotInRegistry::of::<T>)
    }

    /// Resolve a trait binding - returns `Arc<T>`
    ///
    /// # Example
    /// ```rust,ignore
    /// let repo: Arc<dyn UserRepo> = registry.make()?;
    /// ```
    pub fn make<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, NotInRegistry> {
        self.lookup(TypeId::of::<Arc<T>>())
            .and_then(|value| value.downcast_ref::<Arc<T>>().cloned())
            .ok_or_else(NotInRegistry::of::<T>)
    }

    /// All bindings for a type, in registration order
    ///
    /// The current level's matches come first, then each parent level's,
    /// consistent with the child-first resolution of `join`.
    pub fn get_all<T: Any + Send + Sync + Clone>(&self) -> Vec<T> {
        let wanted = TypeId::of::<T>();
        let mut values: Vec<T> = self
            .entries
            .iter()
            .filter(|entry| entry.type_id == wanted)
            .filter_map(|entry| entry.value.downcast_ref::<T>().cloned())
            .collect();
        if let Some(parent) = &self.parent {
            values.extend(parent.get_all::<T>());
        }
        values
    }

    /// Check if a concrete type is registered at any level
    pub fn has<T: Any>(&self) -> bool {
        self.lookup(TypeId::of::<T>()).is_some()
    }

    /// Check if a trait binding is registered at any level
    pub fn has_binding<T: ?Sized + 'static>(&self) -> bool {
        self.lookup(TypeId::of::<Arc<T>>()).is_some()
    }

    /// Layer this registry over a parent
    ///
    /// The result checks this registry's bindings first and falls back to
    /// the parent on miss, recursively through the parent's own ancestry.
    /// Neither input is mutated; ancestors are shared by reference.
    pub fn join(&self, parent: Arc<Registry>) -> Registry {
        let parent = match &self.parent {
            Some(existing) => Arc::new(existing.join(parent)),
            None => parent,
        };
        Registry {
            entries: self.entries.clone(),
            parent: Some(parent),
        }
    }

    /// Derive a child registry layering one more concrete binding
    pub fn with<T: Any + Send + Sync>(self: Arc<Self>, value: T) -> Registry {
        Registry {
            entries: vec![Entry::of(value)],
            parent: Some(self),
        }
    }

    /// Type names of the bindings at this level, for diagnostics
    pub fn binding_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.type_name).collect()
    }

    fn lookup(&self, wanted: TypeId) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.type_id == wanted)
            .map(|entry| &entry.value)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.lookup(wanted)))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for an immutable [`Registry`]
///
/// Bindings are recorded in the order they are added; for single-value
/// lookups the last matching binding wins.
pub struct RegistryBuilder {
    entries: Vec<Entry>,
}

impl RegistryBuilder {
    /// Register a concrete value under its declared type
    pub fn add<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.entries.push(Entry::of(value));
        self
    }

    /// Bind a trait object to an implementation
    ///
    /// # Example
    /// ```rust,ignore
    /// Registry::builder().bind::<dyn Clock>(Arc::new(SystemClock)).build()
    /// ```
    pub fn bind<T: ?Sized + Send + Sync + 'static>(mut self, instance: Arc<T>) -> Self {
        self.entries.push(Entry::of_binding(instance));
        self
    }

    /// Finish building; the resulting registry is immutable
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            parent: None,
        }
    }
}
