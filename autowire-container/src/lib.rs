//! Autowire runtime container.
//!
//! A small map-of-factories resolver: the analyzer does all the graph
//! work at build time, so the container only looks up a factory by
//! token, memoizes singletons, and hands out instances. It can be
//! populated by hand with [`Container::register`] or from a generated
//! [`ConfigArtifact`] via [`Container::load_configuration`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use autowire_core::{ConfigArtifact, DependencySlot, FactoryEntry, Scope};

/// Type-erased service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A factory closure over the container. Factories may resolve their
/// own dependencies reentrantly; the cycle guard turns loops into
/// errors instead of unbounded recursion.
pub type FactoryFn = Arc<dyn Fn(&Container) -> Result<Instance, ContainerError> + Send + Sync>;

/// Errors produced at resolution time.
#[derive(Debug, Clone)]
pub enum ContainerError {
    /// No factory is registered under the requested token.
    NotRegistered { token: String },
    /// A dependency loop was hit while resolving.
    CircularResolution { stack: Vec<String> },
    /// The instance under this token is not of the requested type.
    TypeMismatch { token: String },
    /// The artifact references a class no constructor was provided for.
    MissingConstructor { class: String, token: String },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::NotRegistered { token } => {
                write!(f, "Service not registered: {token}")
            }
            ContainerError::CircularResolution { stack } => {
                write!(
                    f,
                    "Circular resolution detected: {}",
                    stack.join(" -> ")
                )
            }
            ContainerError::TypeMismatch { token } => {
                write!(f, "Service '{token}' is not of the requested type")
            }
            ContainerError::MissingConstructor { class, token } => {
                write!(
                    f,
                    "No constructor registered for class '{class}' (token '{token}')"
                )
            }
        }
    }
}

impl std::error::Error for ContainerError {}

struct Registration {
    factory: FactoryFn,
    scope: Scope,
    /// Interface symbol this token was generated from, for by-interface
    /// lookups.
    interface_name: Option<String>,
}

thread_local! {
    /// Tokens currently being resolved on this thread.
    static RESOLUTION_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// The runtime container.
///
/// Cloning via [`create_scope`](Container::create_scope) shares the
/// registrations and the singleton map but gives the scope its own
/// cache for `Scope::Scoped` services. The instance maps are
/// append-only; a singleton is written once and lives as long as the
/// container.
pub struct Container {
    registrations: Arc<DashMap<String, Registration>>,
    singletons: Arc<DashMap<String, Instance>>,
    scoped: Arc<DashMap<String, Instance>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self {
            registrations: Arc::new(DashMap::new()),
            singletons: Arc::new(DashMap::new()),
            scoped: Arc::new(DashMap::new()),
        }
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Register a factory under a token.
    pub fn register(&self, token: impl Into<String>, factory: FactoryFn, scope: Scope) {
        self.register_with_interface(token, factory, scope, None);
    }

    fn register_with_interface(
        &self,
        token: impl Into<String>,
        factory: FactoryFn,
        scope: Scope,
        interface_name: Option<String>,
    ) {
        let token = token.into();
        debug!(token, scope = scope.as_str(), "factory registered");
        self.registrations.insert(
            token,
            Registration {
                factory,
                scope,
                interface_name,
            },
        );
    }

    /// Register an already-built instance as a singleton.
    pub fn register_instance<T: Send + Sync + 'static>(&self, token: impl Into<String>, value: T) {
        let token = token.into();
        let instance: Instance = Arc::new(value);
        self.singletons.insert(token.clone(), instance.clone());
        self.register(
            token,
            Arc::new(move |_| Ok(instance.clone())),
            Scope::Singleton,
        );
    }

    pub fn has(&self, token: &str) -> bool {
        self.registrations.contains_key(token)
    }

    /// All registered tokens, sorted.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> =
            self.registrations.iter().map(|e| e.key().clone()).collect();
        tokens.sort();
        tokens
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve a token to a typed instance.
    pub fn resolve<T: Send + Sync + 'static>(&self, token: &str) -> Result<Arc<T>, ContainerError> {
        self.resolve_any(token)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                token: token.to_string(),
            })
    }

    /// Resolve a token to a type-erased instance.
    pub fn resolve_any(&self, token: &str) -> Result<Instance, ContainerError> {
        let (scope, factory) = {
            let reg = self
                .registrations
                .get(token)
                .ok_or_else(|| ContainerError::NotRegistered {
                    token: token.to_string(),
                })?;
            (reg.scope, reg.factory.clone())
        };

        match scope {
            Scope::Singleton => self.memoized(&self.singletons, token, factory),
            Scope::Scoped => self.memoized(&self.scoped, token, factory),
            Scope::Transient => self.build(token, factory),
        }
    }

    /// Resolve a token declared by a [`DependencySlot`]: the qualified
    /// alias is preferred, optional misses become `None`.
    pub fn resolve_slot(&self, slot: &DependencySlot) -> Result<Option<Instance>, ContainerError> {
        let qualified = slot
            .qualifier
            .as_ref()
            .map(|q| format!("{}:{q}", slot.token));
        let attempt = match &qualified {
            Some(alias) if self.has(alias) => self.resolve_any(alias),
            _ => self.resolve_any(&slot.token),
        };
        match attempt {
            Ok(instance) => Ok(Some(instance)),
            Err(ContainerError::NotRegistered { .. }) if slot.optional => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Memoize construction in the given instance map. The instance is
    /// built outside the map entry so factories can resolve reentrantly;
    /// when two threads race, the first insert wins and the losers adopt
    /// the stored instance.
    fn memoized(
        &self,
        cache: &DashMap<String, Instance>,
        token: &str,
        factory: FactoryFn,
    ) -> Result<Instance, ContainerError> {
        if let Some(existing) = cache.get(token) {
            return Ok(existing.clone());
        }
        let built = self.build(token, factory)?;
        let stored = cache
            .entry(token.to_string())
            .or_insert(built)
            .value()
            .clone();
        Ok(stored)
    }

    /// Run a factory with the cycle guard engaged.
    fn build(&self, token: &str, factory: FactoryFn) -> Result<Instance, ContainerError> {
        let entered = RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|t| t == token) {
                let mut cycle = stack.clone();
                cycle.push(token.to_string());
                return Err(ContainerError::CircularResolution { stack: cycle });
            }
            stack.push(token.to_string());
            Ok(())
        });
        entered?;

        let result = factory(self);
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
        result
    }

    // ── By-interface variants ───────────────────────────────────────────

    /// Tokens whose entries were generated from the given interface
    /// symbol (the token itself always counts).
    pub fn tokens_for_interface(&self, interface: &str) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .registrations
            .iter()
            .filter(|e| {
                e.key() == interface || e.value().interface_name.as_deref() == Some(interface)
            })
            .map(|e| e.key().clone())
            .collect();
        tokens.sort();
        tokens
    }

    /// Resolve the first token registered for an interface symbol.
    pub fn resolve_by_interface<T: Send + Sync + 'static>(
        &self,
        interface: &str,
    ) -> Result<Arc<T>, ContainerError> {
        let token = self
            .tokens_for_interface(interface)
            .into_iter()
            .next()
            .ok_or_else(|| ContainerError::NotRegistered {
                token: interface.to_string(),
            })?;
        self.resolve::<T>(&token)
    }

    // ── Scopes ──────────────────────────────────────────────────────────

    /// A child container sharing registrations and singletons, with a
    /// fresh cache for scoped services.
    pub fn create_scope(&self) -> Container {
        Container {
            registrations: self.registrations.clone(),
            singletons: self.singletons.clone(),
            scoped: Arc::new(DashMap::new()),
        }
    }

    // ── Artifact loading ────────────────────────────────────────────────

    /// Wire every artifact entry to a factory. Class entries call the
    /// matching constructor from `constructors`; `@Bean` entries look up
    /// `Config::method`. Entries without a constructor are registered
    /// with an erroring factory so `has` still reflects the artifact.
    pub fn load_configuration(&self, artifact: &ConfigArtifact, constructors: &ConstructorRegistry) {
        for (token, entry) in &artifact.entries {
            let key = constructor_key(entry);
            let factory: FactoryFn = match constructors.get(&key) {
                Some(ctor) => {
                    let ctor = ctor.clone();
                    let slots = entry.dependencies.clone();
                    Arc::new(move |container: &Container| {
                        let mut deps = ResolvedDeps::with_capacity(slots.len());
                        for slot in &slots {
                            deps.push(slot.token.clone(), container.resolve_slot(slot)?);
                        }
                        ctor(&deps)
                    })
                }
                None => {
                    warn!(token, class = key, "no constructor for artifact entry");
                    let class = key.clone();
                    let token_owned = token.clone();
                    Arc::new(move |_| {
                        Err(ContainerError::MissingConstructor {
                            class: class.clone(),
                            token: token_owned.clone(),
                        })
                    })
                }
            };
            self.register_with_interface(
                token.clone(),
                factory,
                entry.scope,
                Some(entry.interface_name.clone()),
            );
        }
    }
}

/// Key a [`FactoryEntry`] resolves its constructor under.
fn constructor_key(entry: &FactoryEntry) -> String {
    match (&entry.configuration_class, &entry.bean_method_name) {
        (Some(config), Some(method)) if entry.is_bean => format!("{config}::{method}"),
        _ => entry.implementation_class.clone(),
    }
}

// ── Constructor registry ────────────────────────────────────────────────────

/// Dependencies resolved for one constructor invocation, in the
/// artifact entry's declaration order.
pub struct ResolvedDeps {
    tokens: Vec<String>,
    values: Vec<Option<Instance>>,
}

impl ResolvedDeps {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, token: String, value: Option<Instance>) {
        self.tokens.push(token);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed access by position; `None` for an optional miss.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.values
            .get(index)?
            .as_ref()
            .and_then(|v| v.clone().downcast::<T>().ok())
    }

    /// Typed access by position for required dependencies.
    pub fn required<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, ContainerError> {
        let token = self
            .tokens
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}"));
        self.get::<T>(index)
            .ok_or(ContainerError::TypeMismatch { token })
    }
}

/// One constructor closure: takes resolved dependencies, returns the
/// built instance.
pub type ConstructorFn = Arc<dyn Fn(&ResolvedDeps) -> Result<Instance, ContainerError> + Send + Sync>;

/// User-provided constructors for the classes an artifact references,
/// keyed by class name (or `Config::method` for bean providers).
#[derive(Default)]
pub struct ConstructorRegistry {
    map: HashMap<String, ConstructorFn>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor producing `T`.
    pub fn provide<T, F>(&mut self, key: impl Into<String>, ctor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolvedDeps) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.map.insert(
            key.into(),
            Arc::new(move |deps| Ok(Arc::new(ctor(deps)?) as Instance)),
        );
        self
    }

    fn get(&self, key: &str) -> Option<&ConstructorFn> {
        self.map.get(key)
    }
}
