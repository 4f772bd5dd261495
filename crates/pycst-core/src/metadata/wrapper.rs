//! Metadata resolution over one module

use super::{
    Dependencies, MetadataDependent, MetadataProvider, MetadataScope, ProviderData, ProviderKey,
    declared_dependencies,
};
use crate::error::MetadataErrorKind;
use crate::nodes::Module;
use crate::visit::{CstNode, Transformer, Visitor};
use crate::{CstError, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Rebuilds every node, so that no two positions in the tree share one.
struct DeepCopy;

impl Transformer for DeepCopy {}

/// A module together with the provider results computed for it.
///
/// Node identities are addresses, so the module is boxed and never handed
/// out by value: every cached result stays valid for the wrapper's lifetime.
pub struct MetadataWrapper {
    module: Box<Module>,
    cache: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl MetadataWrapper {
    /// Wrap a deep copy of `module`.
    ///
    /// A tree built by hand may hold the same node in two places; after the
    /// copy each position has its own node and its own metadata.
    pub fn new(module: &Module) -> Result<Self> {
        let copy = CstNode::transform(module, &mut DeepCopy)?;
        Ok(Self::new_unchecked(copy))
    }

    /// Wrap `module` as is.
    pub fn new_unchecked(module: Module) -> Self {
        Self {
            module: Box::new(module),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Values of provider `P`, computed on first request.
    pub fn resolve<P: MetadataProvider>(&self) -> Result<Rc<ProviderData<P::Value>>> {
        self.resolve_many(Dependencies::new().with::<P>())?.data::<P>()
    }

    /// A scope holding every provider in `declared`.
    pub fn resolve_many(&self, declared: Dependencies) -> Result<MetadataScope> {
        for key in self.order(&declared)? {
            self.compute(key)?;
        }
        Ok(self.scope(declared))
    }

    /// Walk the module with `visitor`, its declared metadata in place.
    pub fn visit<V: Visitor + MetadataDependent + 'static>(&self, visitor: &mut V) -> Result<()> {
        *visitor.metadata_mut() = self.resolve_many(declared_dependencies::<V>())?;
        CstNode::visit(&*self.module, visitor);
        visitor.metadata_mut().clear();
        Ok(())
    }

    /// Transform the module with `transformer`, its declared metadata in
    /// place.
    pub fn transform<T: Transformer + MetadataDependent + 'static>(
        &self,
        transformer: &mut T,
    ) -> Result<Module> {
        *transformer.metadata_mut() = self.resolve_many(declared_dependencies::<T>())?;
        let result = CstNode::transform(&*self.module, transformer);
        transformer.metadata_mut().clear();
        result
    }

    /// A scope over the cached results of `declared`.
    fn scope(&self, declared: Dependencies) -> MetadataScope {
        let cache = self.cache.borrow();
        let mut scope = MetadataScope::unresolved(declared);
        let keys: Vec<ProviderKey> = scope.declared().iter().copied().collect();
        for key in keys {
            if let Some(data) = cache.get(&key.type_id()) {
                scope.fill(key, Rc::clone(data));
            }
        }
        scope
    }

    fn compute(&self, key: ProviderKey) -> Result<()> {
        if self.cache.borrow().contains_key(&key.type_id()) {
            trace!(provider = key.name(), "metadata cache hit");
            return Ok(());
        }
        let inputs = self.scope(key.dependencies());
        let data = key.compute(&self.module, &inputs)?;
        debug!(provider = key.name(), "computed metadata");
        self.cache.borrow_mut().insert(key.type_id(), data);
        Ok(())
    }

    /// Every provider `declared` needs, dependencies before dependents.
    fn order(&self, declared: &Dependencies) -> Result<Vec<ProviderKey>> {
        let mut graph = DiGraph::<ProviderKey, ()>::new();
        let mut indices: HashMap<ProviderKey, NodeIndex> = HashMap::new();
        let mut pending: Vec<ProviderKey> = declared.iter().copied().collect();
        for key in &pending {
            indices.entry(*key).or_insert_with(|| graph.add_node(*key));
        }
        while let Some(key) = pending.pop() {
            let index = indices[&key];
            for dependency in key.dependencies().iter() {
                let dependency_index = match indices.get(dependency) {
                    Some(index) => *index,
                    None => {
                        let index = graph.add_node(*dependency);
                        indices.insert(*dependency, index);
                        pending.push(*dependency);
                        index
                    }
                };
                graph.update_edge(dependency_index, index, ());
            }
        }
        toposort(&graph, None)
            .map(|order| order.into_iter().map(|index| graph[index]).collect())
            .map_err(|cycle| {
                CstError::metadata(
                    MetadataErrorKind::CyclicDependency,
                    format!(
                        "{} depends on itself through its dependencies",
                        graph[cycle.node_id()].name()
                    ),
                )
            })
    }
}
