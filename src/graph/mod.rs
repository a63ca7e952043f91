//! Reference Graph
//!
//! Directed graph where an edge A -> B means A's definition structurally
//! mentions B. Roots are the resources plus their ARM spec and status
//! counterparts; everything not reachable from a root is pruned from output.

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::NamingConfig;
use crate::error::{CounterpartRole, GeneratorError, Result};
use crate::model::names::arm_type_name;
use crate::model::{Definitions, TypeName};

// =============================================================================
// Root Collection
// =============================================================================

/// Names of all resource definitions
pub fn collect_resource_definitions(definitions: &Definitions) -> BTreeSet<TypeName> {
    definitions
        .iter()
        .filter(|d| d.is_resource())
        .map(|d| d.name.clone())
        .collect()
}

/// ARM spec and status counterparts of every non-storage resource.
///
/// A missing counterpart means an earlier generation stage failed to produce
/// it; that is a generator defect, reported as an error naming the resource.
pub fn collect_arm_spec_and_status_definitions(
    definitions: &Definitions,
    naming: &NamingConfig,
) -> Result<BTreeSet<TypeName>> {
    let find_arm_type = |resource: &TypeName, name: &TypeName, role: CounterpartRole| {
        let arm_name = arm_type_name(name, &naming.arm_suffix);
        if definitions.contains(&arm_name) {
            Ok(arm_name)
        } else {
            Err(GeneratorError::MissingArmCounterpart {
                resource: resource.clone(),
                role,
                arm_name,
            })
        }
    };

    let mut result = BTreeSet::new();
    for definition in definitions {
        // Storage packages never have ARM counterparts
        if definition.name.package.is_storage() {
            continue;
        }

        let Some(resource) = definitions.resolve_resource_type(&definition.definition_type) else {
            continue;
        };

        result.insert(find_arm_type(&definition.name, &resource.spec, CounterpartRole::Spec)?);
        if let Some(status) = &resource.status {
            result.insert(find_arm_type(&definition.name, status, CounterpartRole::Status)?);
        }
    }

    Ok(result)
}

// =============================================================================
// Reachable Types
// =============================================================================

/// Reachable definitions with their minimum depth from any root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachableTypes {
    depths: BTreeMap<TypeName, usize>,
}

impl ReachableTypes {
    pub fn contains(&self, name: &TypeName) -> bool {
        self.depths.contains_key(name)
    }

    pub fn depth(&self, name: &TypeName) -> Option<usize> {
        self.depths.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeName, usize)> {
        self.depths.iter().map(|(name, depth)| (name, *depth))
    }

    /// The subset of `definitions` that is reachable
    pub fn retain_reachable(&self, definitions: &Definitions) -> Definitions {
        definitions.filter(|d| self.contains(&d.name))
    }
}

#[derive(Serialize)]
struct ReachableEntry<'a> {
    name: &'a TypeName,
    depth: usize,
}

impl Serialize for ReachableTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.depths.len()))?;
        for (name, depth) in self.iter() {
            seq.serialize_element(&ReachableEntry { name, depth })?;
        }
        seq.end()
    }
}

// =============================================================================
// Reference Graph
// =============================================================================

/// Graph of references between definitions
pub struct ReferenceGraph {
    roots: BTreeSet<TypeName>,
    graph: DiGraph<TypeName, ()>,
    node_indices: HashMap<TypeName, NodeIndex>,
}

impl ReferenceGraph {
    /// Build a graph from explicit roots and adjacency
    pub fn new(
        roots: BTreeSet<TypeName>,
        references: BTreeMap<TypeName, BTreeSet<TypeName>>,
    ) -> Self {
        let mut graph = Self {
            roots,
            graph: DiGraph::with_capacity(references.len(), references.len() * 2),
            node_indices: HashMap::with_capacity(references.len()),
        };

        for (from, targets) in &references {
            let from_idx = graph.node(from);
            for to in targets {
                let to_idx = graph.node(to);
                graph.graph.add_edge(from_idx, to_idx, ());
            }
        }
        for root in graph.roots.clone() {
            graph.node(&root);
        }

        graph
    }

    /// Graph whose roots are the resources and their ARM spec/status types
    pub fn with_resources_as_roots(
        definitions: &Definitions,
        naming: &NamingConfig,
    ) -> Result<Self> {
        let resources = collect_resource_definitions(definitions);
        let arm_spec_and_status = collect_arm_spec_and_status_definitions(definitions, naming)?;

        let roots: BTreeSet<TypeName> = resources.union(&arm_spec_and_status).cloned().collect();
        let references = definitions
            .iter()
            .map(|d| (d.name.clone(), d.references()))
            .collect();

        Ok(Self::new(roots, references))
    }

    fn node(&mut self, name: &TypeName) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_indices.insert(name.clone(), idx);
        idx
    }

    pub fn roots(&self) -> &BTreeSet<TypeName> {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Immediate outgoing references of a node
    pub fn references_of(&self, name: &TypeName) -> BTreeSet<&TypeName> {
        let Some(&idx) = self.node_indices.get(name) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors(idx)
            .filter_map(|n| self.graph.node_weight(n))
            .collect()
    }

    /// Everything reachable from the roots, with minimum depth.
    ///
    /// A node already recorded is revisited only when reached at a strictly
    /// lower depth; its children are then re-walked so their depths drop too.
    pub fn connected(&self) -> ReachableTypes {
        let mut depths: BTreeMap<TypeName, usize> = BTreeMap::new();

        for root in &self.roots {
            let Some(&root_idx) = self.node_indices.get(root) else {
                continue;
            };

            let mut stack = vec![(root_idx, 0usize)];
            while let Some((idx, depth)) = stack.pop() {
                let name = &self.graph[idx];
                if let Some(&current) = depths.get(name) {
                    if depth >= current {
                        continue;
                    }
                }

                depths.insert(name.clone(), depth);
                for child in self.graph.neighbors(idx) {
                    stack.push((child, depth + 1));
                }
            }
        }

        ReachableTypes { depths }
    }

    /// Graphviz rendering of the graph
    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(|_, name| name.to_string(), |_, _| ());
        format!("{:?}", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Definition, ObjectType, PackageReference, ResourceType, Type};

    fn pkg() -> PackageReference {
        PackageReference::local("microsoft.storage", "v20190401")
    }

    fn tn(name: &str) -> TypeName {
        TypeName::new(pkg(), name)
    }

    fn edges(pairs: &[(&str, &str)]) -> BTreeMap<TypeName, BTreeSet<TypeName>> {
        let mut result: BTreeMap<TypeName, BTreeSet<TypeName>> = BTreeMap::new();
        for (from, to) in pairs {
            result.entry(tn(from)).or_default().insert(tn(to));
        }
        result
    }

    #[test]
    fn test_connected_records_minimum_depth() {
        // R1 -> A -> B -> C, and R2 -> C directly
        let roots = [tn("R1"), tn("R2")].into_iter().collect();
        let graph = ReferenceGraph::new(
            roots,
            edges(&[("R1", "A"), ("A", "B"), ("B", "C"), ("R2", "C"), ("C", "D")]),
        );

        let reachable = graph.connected();
        assert_eq!(reachable.depth(&tn("R1")), Some(0));
        assert_eq!(reachable.depth(&tn("B")), Some(2));
        assert_eq!(reachable.depth(&tn("C")), Some(1));
        assert_eq!(reachable.depth(&tn("D")), Some(2));
    }

    #[test]
    fn test_connected_improves_depth_found_later() {
        // A is first seen deep via the long path, then at depth 1
        let roots = [tn("R")].into_iter().collect();
        let graph = ReferenceGraph::new(
            roots,
            edges(&[("R", "X"), ("X", "Y"), ("Y", "A"), ("R", "A"), ("A", "B")]),
        );

        let reachable = graph.connected();
        assert_eq!(reachable.depth(&tn("A")), Some(1));
        assert_eq!(reachable.depth(&tn("B")), Some(2));
    }

    #[test]
    fn test_connected_handles_cycles() {
        let roots = [tn("R")].into_iter().collect();
        let graph =
            ReferenceGraph::new(roots, edges(&[("R", "A"), ("A", "B"), ("B", "A"), ("B", "B")]));

        let reachable = graph.connected();
        assert_eq!(reachable.len(), 3);
        assert_eq!(reachable.depth(&tn("B")), Some(2));
    }

    #[test]
    fn test_unreachable_definitions_are_excluded() {
        let roots = [tn("R")].into_iter().collect();
        let graph = ReferenceGraph::new(roots, edges(&[("R", "A"), ("Orphan", "A")]));

        let reachable = graph.connected();
        assert!(reachable.contains(&tn("A")));
        assert!(!reachable.contains(&tn("Orphan")));
    }

    fn resource_defs(with_status_arm: bool) -> Definitions {
        let mut defs = vec![
            Definition::new(
                tn("Account"),
                Type::Resource(ResourceType {
                    spec: tn("AccountSpec"),
                    status: Some(tn("AccountStatus")),
                }),
            ),
            Definition::new(tn("AccountSpec"), Type::Object(ObjectType::default())),
            Definition::new(tn("AccountSpecArm"), Type::Object(ObjectType::default())),
            Definition::new(tn("AccountStatus"), Type::Object(ObjectType::default())),
        ];
        if with_status_arm {
            defs.push(Definition::new(tn("AccountStatusArm"), Type::Object(ObjectType::default())));
        }
        defs.into()
    }

    #[test]
    fn test_roots_include_arm_counterparts() {
        let graph =
            ReferenceGraph::with_resources_as_roots(&resource_defs(true), &NamingConfig::default())
                .unwrap();
        let roots: Vec<_> = graph.roots().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(roots, vec!["Account", "AccountSpecArm", "AccountStatusArm"]);

        let reachable = graph.connected();
        assert!(reachable.contains(&tn("AccountSpec")));
        assert!(reachable.contains(&tn("AccountStatus")));
    }

    #[test]
    fn test_missing_status_counterpart_is_fatal() {
        let err =
            ReferenceGraph::with_resources_as_roots(&resource_defs(false), &NamingConfig::default())
                .err()
                .unwrap();
        match err {
            GeneratorError::MissingArmCounterpart { resource, role, arm_name } => {
                assert_eq!(resource.name, "Account");
                assert_eq!(role, CounterpartRole::Status);
                assert_eq!(arm_name.name, "AccountStatusArm");
            }
            other => panic!("Expected MissingArmCounterpart, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_resources_need_no_counterpart() {
        let storage = PackageReference::storage("microsoft.storage", "v20190401");
        let defs: Definitions = vec![
            Definition::new(
                TypeName::new(storage.clone(), "Account"),
                Type::Resource(ResourceType {
                    spec: TypeName::new(storage.clone(), "AccountSpec"),
                    status: None,
                }),
            ),
            Definition::new(
                TypeName::new(storage, "AccountSpec"),
                Type::Object(ObjectType::default()),
            ),
        ]
        .into();

        let graph =
            ReferenceGraph::with_resources_as_roots(&defs, &NamingConfig::default()).unwrap();
        assert_eq!(graph.connected().len(), 2);
    }

    #[test]
    fn test_references_of() {
        let roots = [tn("R")].into_iter().collect();
        let graph = ReferenceGraph::new(roots, edges(&[("R", "A"), ("R", "B"), ("A", "B")]));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.references_of(&tn("R")).len(), 2);
        assert!(graph.references_of(&tn("Missing")).is_empty());
    }

    #[test]
    fn test_to_dot() {
        let roots = [tn("R")].into_iter().collect();
        let graph = ReferenceGraph::new(roots, edges(&[("R", "A")]));
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("->"));
    }
}
