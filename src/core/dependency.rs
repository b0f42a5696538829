//! Dependency edges between modules of a stack.
//!
//! Edges are derived from descriptors on demand and never stored. The graph is
//! used to verify that the stack order is a valid build order and to compute
//! the set of modules a build depends on.

use std::collections::HashSet;

use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::{Dfs, EdgeFiltered, EdgeRef};
use petgraph::Direction;

use crate::core::error::InstallError;
use crate::core::module_id::ModuleId;
use crate::core::stack::Stack;

/// Kind of dependency between two modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Required,
    Optional,
    /// Optional and discoverable by the CMake backend
    BuildWith,
}

/// A consumer -> provider relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub consumer: ModuleId,
    pub provider: ModuleId,
    pub kind: DependencyKind,
}

/// Dependency graph over the modules present in a stack.
pub struct DependencyGraph {
    graph: DiGraph<ModuleId, DependencyKind>,
    nodes: Vec<(ModuleId, NodeIndex)>,
    /// Edges whose provider is not part of the stack
    dangling: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Derive the graph from the stack's current module state.
    pub fn from_stack(stack: &Stack) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<(ModuleId, NodeIndex)> = stack
            .iter()
            .map(|m| (m.id(), graph.add_node(m.id())))
            .collect();
        let node_of = |id: ModuleId| nodes.iter().find(|(n, _)| *n == id).map(|(_, idx)| *idx);

        let mut dangling = Vec::new();
        for module in stack.iter() {
            let consumer = module.id();
            let edges = module
                .required
                .iter()
                .map(|&p| (p, DependencyKind::Required))
                .chain(module.descriptor.optional.iter().map(|&p| {
                    let kind = if module.descriptor.is_build_with(p) {
                        DependencyKind::BuildWith
                    } else {
                        DependencyKind::Optional
                    };
                    (p, kind)
                }));

            for (provider, kind) in edges {
                match (node_of(consumer), node_of(provider)) {
                    (Some(from), Some(to)) => {
                        graph.add_edge(from, to, kind);
                    }
                    _ => dangling.push(DependencyEdge {
                        consumer,
                        provider,
                        kind,
                    }),
                }
            }
        }

        DependencyGraph {
            graph,
            nodes,
            dangling,
        }
    }

    fn node(&self, id: ModuleId) -> Option<NodeIndex> {
        self.nodes.iter().find(|(n, _)| *n == id).map(|(_, idx)| *idx)
    }

    /// All edges between present modules.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.graph
            .edge_references()
            .map(|e| DependencyEdge {
                consumer: self.graph[e.source()],
                provider: self.graph[e.target()],
                kind: *e.weight(),
            })
            .collect()
    }

    /// Edges whose provider is absent from the stack.
    pub fn dangling(&self) -> &[DependencyEdge] {
        &self.dangling
    }

    /// Direct providers of `id` with the given kind.
    pub fn providers(&self, id: ModuleId, kind: DependencyKind) -> Vec<ModuleId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut providers: Vec<ModuleId> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter(|e| *e.weight() == kind)
            .map(|e| self.graph[e.target()])
            .collect();
        providers.reverse();
        providers
    }

    /// Check that every required provider is listed before its consumer.
    pub fn check_order(&self, stack: &Stack) -> Result<(), InstallError> {
        for edge in self.edges() {
            if edge.kind != DependencyKind::Required {
                continue;
            }
            if stack.position(edge.provider) > stack.position(edge.consumer) {
                return Err(InstallError::OrderViolation {
                    module: edge.consumer.to_string(),
                    dependency: edge.provider.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Modules `root` builds against: its required modules, the optional ones
    /// in `included`, and transitively everything those require.
    ///
    /// The result is in stack order and excludes `root`.
    pub fn closure(&self, stack: &Stack, root: ModuleId, included: &[ModuleId]) -> Vec<ModuleId> {
        let Some(start) = self.node(root) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let direct: Vec<NodeIndex> = self
            .graph
            .edges_directed(start, Direction::Outgoing)
            .filter(|e| {
                *e.weight() == DependencyKind::Required || included.contains(&self.graph[e.target()])
            })
            .map(|e| e.target())
            .collect();

        let required_only = EdgeFiltered::from_fn(&self.graph, |e: EdgeReference<'_, DependencyKind>| {
            *e.weight() == DependencyKind::Required
        });
        for node in direct {
            let mut dfs = Dfs::new(&required_only, node);
            while let Some(visited) = dfs.next(&required_only) {
                seen.insert(self.graph[visited]);
            }
        }
        seen.remove(&root);

        stack.in_stack_order(seen)
    }
}
