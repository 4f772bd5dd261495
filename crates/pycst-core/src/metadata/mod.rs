//! Derived per-node metadata
//!
//! A [`MetadataProvider`] computes a value for some or all nodes of a module.
//! Traversals declare the providers they read through [`MetadataDependent`];
//! a [`MetadataWrapper`] computes each declared provider at most once, hands
//! the results to the traversal for the duration of one walk and takes them
//! back afterwards.
//!
//! Values can be deferred: a [`MetadataCell`] runs its computation the first
//! time the value is read and caches it for later reads.

mod providers;
mod wrapper;

pub use providers::{
    ExpressionContext, ExpressionContextProvider, ParentNodeProvider, PositionProvider,
};
pub use wrapper::MetadataWrapper;

use crate::error::MetadataErrorKind;
use crate::nodes::Module;
use crate::visit::NodeId;
use crate::{CstError, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A computation of per-node values over a whole module.
pub trait MetadataProvider: 'static {
    type Value: Clone + 'static;

    /// Name used in logs and error messages.
    const NAME: &'static str;

    /// Providers whose values [`MetadataProvider::compute`] reads.
    fn dependencies() -> Dependencies {
        Dependencies::new()
    }

    /// Compute values for `module`. `metadata` holds the resolved
    /// dependencies.
    fn compute(module: &Module, metadata: &MetadataScope) -> Result<ProviderData<Self::Value>>;
}

type ErasedCompute = fn(&Module, &MetadataScope) -> Result<Rc<dyn Any>>;

/// Type-erased handle on a provider.
#[derive(Clone, Copy)]
pub struct ProviderKey {
    type_id: TypeId,
    name: &'static str,
    dependencies: fn() -> Dependencies,
    compute: ErasedCompute,
}

impl ProviderKey {
    pub fn of<P: MetadataProvider>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: P::NAME,
            dependencies: P::dependencies,
            compute: compute_erased::<P>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn dependencies(&self) -> Dependencies {
        (self.dependencies)()
    }

    pub(crate) fn compute(&self, module: &Module, metadata: &MetadataScope) -> Result<Rc<dyn Any>> {
        (self.compute)(module, metadata)
    }
}

fn compute_erased<P: MetadataProvider>(
    module: &Module,
    metadata: &MetadataScope,
) -> Result<Rc<dyn Any>> {
    Ok(Rc::new(P::compute(module, metadata)?))
}

impl PartialEq for ProviderKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ProviderKey {}

impl Hash for ProviderKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An ordered set of providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    keys: Vec<ProviderKey>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<P: MetadataProvider>(mut self) -> Self {
        self.insert(ProviderKey::of::<P>());
        self
    }

    /// Everything in `self` plus everything in `other`.
    pub fn union(mut self, other: &Dependencies) -> Self {
        for key in &other.keys {
            self.insert(*key);
        }
        self
    }

    pub fn insert(&mut self, key: ProviderKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn contains(&self, key: &ProviderKey) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderKey> {
        self.keys.iter()
    }
}

/// A traversal that reads metadata.
///
/// Reusing another traversal's declarations is done by union:
///
/// ```ignore
/// fn dependencies() -> Dependencies {
///     Base::dependencies().with::<ParentNodeProvider>()
/// }
/// ```
pub trait MetadataDependent {
    fn dependencies() -> Dependencies
    where
        Self: Sized;

    /// Where resolved metadata is placed for the duration of a walk.
    fn metadata_mut(&mut self) -> &mut MetadataScope;

    fn metadata(&self) -> &MetadataScope;
}

static DECLARED: Lazy<DashMap<TypeId, Dependencies>> = Lazy::new(DashMap::new);

/// The declarations of `T`, computed once per type.
pub fn declared_dependencies<T: MetadataDependent + 'static>() -> Dependencies {
    DECLARED
        .entry(TypeId::of::<T>())
        .or_insert_with(T::dependencies)
        .clone()
}

/// Resolution state of a deferred value.
enum CellState<V> {
    Pending(Box<dyn FnOnce() -> V>),
    Evaluating,
    Cached(V),
}

/// A value computed on first read.
pub struct MetadataCell<V> {
    state: RefCell<CellState<V>>,
}

impl<V: Clone> MetadataCell<V> {
    pub fn ready(value: V) -> Self {
        Self {
            state: RefCell::new(CellState::Cached(value)),
        }
    }

    pub fn deferred(compute: impl FnOnce() -> V + 'static) -> Self {
        Self {
            state: RefCell::new(CellState::Pending(Box::new(compute))),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(&*self.state.borrow(), CellState::Cached(_))
    }

    /// The value, computing it if this is the first read.
    pub fn get(&self) -> Result<V> {
        if let CellState::Cached(value) = &*self.state.borrow() {
            return Ok(value.clone());
        }
        let pending = std::mem::replace(&mut *self.state.borrow_mut(), CellState::Evaluating);
        let value = match pending {
            CellState::Pending(compute) => compute(),
            CellState::Cached(value) => value,
            CellState::Evaluating => {
                return Err(CstError::metadata(
                    MetadataErrorKind::CyclicDependency,
                    "deferred metadata value reads itself",
                ));
            }
        };
        *self.state.borrow_mut() = CellState::Cached(value.clone());
        Ok(value)
    }
}

impl<V> fmt::Debug for MetadataCell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            CellState::Pending(_) => "pending",
            CellState::Evaluating => "evaluating",
            CellState::Cached(_) => "cached",
        };
        f.debug_struct("MetadataCell").field("state", &state).finish()
    }
}

/// One provider's values, keyed by node.
#[derive(Debug)]
pub struct ProviderData<V> {
    values: HashMap<NodeId, MetadataCell<V>>,
}

impl<V: Clone> ProviderData<V> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, node: NodeId, value: V) {
        self.values.insert(node, MetadataCell::ready(value));
    }

    pub fn insert_deferred(&mut self, node: NodeId, compute: impl FnOnce() -> V + 'static) {
        self.values.insert(node, MetadataCell::deferred(compute));
    }

    pub fn cell(&self, node: NodeId) -> Option<&MetadataCell<V>> {
        self.values.get(&node)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V: Clone> Default for ProviderData<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> FromIterator<(NodeId, V)> for ProviderData<V> {
    fn from_iter<I: IntoIterator<Item = (NodeId, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (node, value) in iter {
            data.insert(node, value);
        }
        data
    }
}

/// The metadata a traversal may read: what it declared, and what a wrapper
/// resolved for it.
#[derive(Default)]
pub struct MetadataScope {
    declared: Dependencies,
    resolved: HashMap<TypeId, Rc<dyn Any>>,
}

impl MetadataScope {
    /// A scope with declarations but no values yet.
    pub fn unresolved(declared: Dependencies) -> Self {
        Self {
            declared,
            resolved: HashMap::new(),
        }
    }

    pub fn declared(&self) -> &Dependencies {
        &self.declared
    }

    pub fn is_resolved(&self) -> bool {
        !self.resolved.is_empty()
    }

    pub(crate) fn fill(&mut self, key: ProviderKey, data: Rc<dyn Any>) {
        self.resolved.insert(key.type_id(), data);
    }

    /// Drop every resolved value, keeping the declarations.
    pub(crate) fn clear(&mut self) {
        self.resolved.clear();
    }

    /// All values of provider `P`.
    pub fn data<P: MetadataProvider>(&self) -> Result<Rc<ProviderData<P::Value>>> {
        let key = ProviderKey::of::<P>();
        if !self.declared.contains(&key) {
            return Err(CstError::metadata(
                MetadataErrorKind::UndeclaredDependency,
                format!("{} is not declared as a dependency", P::NAME),
            ));
        }
        let Some(data) = self.resolved.get(&key.type_id()) else {
            return Err(CstError::metadata(
                MetadataErrorKind::Unresolved,
                format!(
                    "{} is declared but was not resolved; run the traversal through a MetadataWrapper",
                    P::NAME
                ),
            ));
        };
        Rc::clone(data)
            .downcast::<ProviderData<P::Value>>()
            .map_err(|_| {
                CstError::metadata(
                    MetadataErrorKind::Unresolved,
                    format!("{} resolved to values of another type", P::NAME),
                )
            })
    }

    /// Provider `P`'s value for `node`.
    pub fn get<P: MetadataProvider>(&self, node: NodeId) -> Result<P::Value> {
        let data = self.data::<P>()?;
        match data.cell(node) {
            Some(cell) => cell.get(),
            None => Err(CstError::metadata(
                MetadataErrorKind::MissingValue,
                format!("{} has no value for {:?}", P::NAME, node.kind),
            )),
        }
    }

    /// Like [`MetadataScope::get`], but a node without a value yields `None`.
    pub fn get_optional<P: MetadataProvider>(&self, node: NodeId) -> Result<Option<P::Value>> {
        let data = self.data::<P>()?;
        data.cell(node).map(MetadataCell::get).transpose()
    }
}

impl fmt::Debug for MetadataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataScope")
            .field("declared", &self.declared)
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
