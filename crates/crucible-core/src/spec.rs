//! The concrete, fully-resolved build request the engine operates on.
//!
//! A [`Spec`] is produced by an external solver; this crate never mutates one, only reads it.
//! `Spec` also implements the preorder dependency-DAG traversal used by the dependency walker
//!: a shared visited-set keyed by package name, children visited in name-ascending order,
//! virtual dependencies skipped unless explicitly requested.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Real,
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub name: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    pub name: String,
    pub version: Version,
    pub compiler: Option<String>,
    pub variants: BTreeMap<String, String>,
    pub dependencies: Vec<DependencyEdge>,
    pub dag_hash: String,
    /// Set by the external solver when this spec is satisfied by a system-provided package
    /// rather than one this engine should build.
    pub external: bool,
}

impl Spec {
    pub fn new(name: impl Into<String>, version: impl Into<Version>, dag_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            compiler: None,
            variants: BTreeMap::new(),
            dependencies: Vec::new(),
            dag_hash: dag_hash.into(),
            external: false,
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, kind: DependencyKind) -> Self {
        self.dependencies.push(DependencyEdge {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn with_external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    /// Every attribute of a concrete spec has a single chosen value; this crate takes
    /// "concrete" to mean a non-empty name, a non-empty dag hash, and a version that isn't
    /// the empty string. The actual constraint-satisfaction that produces concreteness lives
    /// in the (out-of-scope) solver.
    pub fn is_concrete(&self) -> bool {
        !self.name.is_empty() && !self.dag_hash.is_empty() && !self.version.as_str().is_empty()
    }

    pub fn direct_dependency_names(&self, include_virtual: bool) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .dependencies
            .iter()
            .filter(|e| include_virtual || e.kind == DependencyKind::Real)
            .map(|e| e.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Resolves a dependency name to the [`Spec`] node it refers to (spec's "repository" external
/// collaborator, narrowed to just the lookup the walker needs).
pub trait SpecResolver {
    fn resolve(&self, name: &str) -> Option<Spec>;
}

/// Preorder dependency-DAG traversal: visits a node before its dependencies are visited
/// again via another path, skips already-visited names, skips virtual dependencies unless
/// `include_virtual` is set, and visits children in name-ascending order.
pub fn preorder_traversal<'r, R: SpecResolver>(
    root: &Spec,
    resolver: &'r R,
    include_virtual: bool,
) -> Vec<Spec> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    visit(root, resolver, include_virtual, &mut visited, &mut out);
    out
}

fn visit<R: SpecResolver>(
    node: &Spec,
    resolver: &R,
    include_virtual: bool,
    visited: &mut HashSet<String>,
    out: &mut Vec<Spec>,
) {
    if !visited.insert(node.name.clone()) {
        return;
    }
    out.push(node.clone());
    for name in node.direct_dependency_names(include_virtual) {
        if let Some(child) = resolver.resolve(name) {
            visit(&child, resolver, include_virtual, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeResolver(HashMap<String, Spec>);

    impl SpecResolver for FakeResolver {
        fn resolve(&self, name: &str) -> Option<Spec> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn traversal_visits_each_name_once() {
        let b = Spec::new("b", "1.0", "hash-b");
        let c = Spec::new("c", "1.0", "hash-c");
        let a = Spec::new("a", "1.0", "hash-a")
            .with_dependency("b", DependencyKind::Real)
            .with_dependency("c", DependencyKind::Real);
        // b also (redundantly) depends on c, to exercise the visited-set.
        let b_with_dep = b.clone().with_dependency("c", DependencyKind::Real);

        let mut map = HashMap::new();
        map.insert("a".to_string(), a.clone());
        map.insert("b".to_string(), b_with_dep);
        map.insert("c".to_string(), c);
        let resolver = FakeResolver(map);

        let visited = preorder_traversal(&a, &resolver, false);
        let names: Vec<&str> = visited.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn virtual_dependencies_are_skipped_by_default() {
        let real = Spec::new("real-dep", "1.0", "hash-real");
        let root = Spec::new("root", "1.0", "hash-root")
            .with_dependency("real-dep", DependencyKind::Real)
            .with_dependency("virtual-dep", DependencyKind::Virtual);
        let mut map = HashMap::new();
        map.insert("real-dep".to_string(), real);
        let resolver = FakeResolver(map);

        let visited = preorder_traversal(&root, &resolver, false);
        assert_eq!(visited.len(), 2);
    }
}
