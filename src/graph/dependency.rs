//! Dependency graph for service ordering.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{ForgeError, Result};

/// The `requires` relationships between services.
///
/// Services keep the order they were added in; that order breaks ties in
/// [`DependencyGraph::topological_order`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Service names in insertion order.
    services: Vec<String>,
    /// Map of service name to its position in `services`.
    positions: HashMap<String, usize>,
    /// Map of service name to its direct dependencies.
    dependencies: HashMap<String, HashSet<String>>,
    /// Map of service name to services that depend on it.
    dependents: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    /// Create a new dependency graph builder.
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new()
    }

    /// Get the direct dependencies of a service.
    pub fn dependencies_of(&self, service: &str) -> Option<&HashSet<String>> {
        self.dependencies.get(service)
    }

    /// Get services that depend on the given service.
    pub fn dependents_of(&self, service: &str) -> Option<&HashSet<String>> {
        self.dependents.get(service)
    }

    pub fn contains(&self, service: &str) -> bool {
        self.positions.contains_key(service)
    }

    /// Service names in insertion order.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns services in topological order (dependencies before
    /// dependents). Among services that are ready at the same time, the one
    /// added first comes first.
    ///
    /// Returns an error naming the cycle if one exists.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: Vec<usize> = self
            .services
            .iter()
            .map(|s| self.dependencies.get(s).map_or(0, HashSet::len))
            .collect();

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(i, _)| i)
            .collect();

        let mut result = Vec::with_capacity(self.services.len());

        while let Some(next) = ready.pop_first() {
            let service = &self.services[next];
            result.push(service.clone());

            if let Some(dependents) = self.dependents.get(service) {
                for dependent in dependents {
                    let i = self.positions[dependent];
                    in_degree[i] -= 1;
                    if in_degree[i] == 0 {
                        ready.insert(i);
                    }
                }
            }
        }

        if result.len() != self.services.len() {
            let cycle = self.find_cycle().unwrap_or_else(|| {
                self.services
                    .iter()
                    .filter(|s| !result.contains(s))
                    .cloned()
                    .collect()
            });
            return Err(ForgeError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }

        Ok(result)
    }

    /// Find a cycle in the graph, returning the path if one exists.
    ///
    /// The path starts and ends with the same service.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &DependencyGraph,
            state: &mut [State],
            path: &mut Vec<usize>,
        ) -> Option<Vec<String>> {
            state[node] = State::Visiting;
            path.push(node);

            for dep in graph.sorted_dependencies(node) {
                match state[dep] {
                    State::Visiting => {
                        let start = path.iter().position(|&p| p == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = path[start..]
                            .iter()
                            .map(|&i| graph.services[i].clone())
                            .collect();
                        cycle.push(graph.services[dep].clone());
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.services.len()];
        let mut path = Vec::new();

        for i in 0..self.services.len() {
            if state[i] == State::Unvisited {
                if let Some(cycle) = dfs(i, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    /// Every service the given one depends on, directly or indirectly.
    pub fn transitive_dependencies(&self, service: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let mut to_visit = vec![service.to_string()];

        while let Some(current) = to_visit.pop() {
            if let Some(deps) = self.dependencies.get(&current) {
                for dep in deps {
                    if result.insert(dep.clone()) {
                        to_visit.push(dep.clone());
                    }
                }
            }
        }

        result
    }

    fn sorted_dependencies(&self, node: usize) -> Vec<usize> {
        let mut deps: Vec<usize> = self
            .dependencies
            .get(&self.services[node])
            .into_iter()
            .flatten()
            .filter_map(|d| self.positions.get(d).copied())
            .collect();
        deps.sort_unstable();
        deps
    }
}

/// Builder for constructing a DependencyGraph.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    services: Vec<String>,
    dependencies: HashMap<String, HashSet<String>>,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service with its dependencies. Adding a name twice merges the
    /// dependency lists and keeps the first position.
    pub fn add_service(mut self, name: impl Into<String>, requires: Vec<String>) -> Self {
        let name = name.into();
        if !self.dependencies.contains_key(&name) {
            self.services.push(name.clone());
        }
        self.dependencies.entry(name).or_default().extend(requires);
        self
    }

    /// Build the dependency graph.
    ///
    /// Returns an error listing every dependency that names a service not in
    /// the graph.
    pub fn build(self) -> Result<DependencyGraph> {
        let positions: HashMap<String, usize> = self
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();

        let mut missing: Vec<String> = Vec::new();
        for service in &self.services {
            let mut deps: Vec<&String> = self.dependencies[service].iter().collect();
            deps.sort();
            for dep in deps {
                if !positions.contains_key(dep) && !missing.contains(dep) {
                    missing.push(dep.clone());
                }
            }
        }
        if !missing.is_empty() {
            return Err(ForgeError::MissingDependency {
                names: missing.join(", "),
            });
        }

        let mut dependents: HashMap<String, HashSet<String>> = self
            .services
            .iter()
            .map(|s| (s.clone(), HashSet::new()))
            .collect();
        for (service, deps) in &self.dependencies {
            for dep in deps {
                if let Some(set) = dependents.get_mut(dep) {
                    set.insert(service.clone());
                }
            }
        }

        Ok(DependencyGraph {
            services: self.services,
            positions,
            dependencies: self.dependencies,
            dependents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn index(order: &[String], name: &str) -> usize {
        order.iter().position(|s| s == name).unwrap()
    }

    #[test]
    fn builder_creates_empty_graph() {
        let graph = DependencyGraph::builder().build().unwrap();
        assert!(graph.is_empty());
        assert!(graph.topological_order().unwrap().is_empty());
    }

    #[test]
    fn builder_tracks_dependents() {
        let graph = DependencyGraph::builder()
            .add_service("db", vec![])
            .add_service("api", deps(&["db"]))
            .add_service("worker", deps(&["db"]))
            .build()
            .unwrap();

        let dependents = graph.dependents_of("db").unwrap();
        assert!(dependents.contains("api"));
        assert!(dependents.contains("worker"));
        assert!(graph.dependencies_of("api").unwrap().contains("db"));
    }

    #[test]
    fn builder_reports_every_missing_dependency() {
        let err = DependencyGraph::builder()
            .add_service("api", deps(&["db", "cache"]))
            .add_service("web", deps(&["api", "cdn"]))
            .build()
            .unwrap_err();

        match err {
            ForgeError::MissingDependency { names } => {
                assert_eq!(names, "cache, db, cdn");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn dependency_precedes_dependent() {
        let graph = DependencyGraph::builder()
            .add_service("a", deps(&["b"]))
            .add_service("b", vec![])
            .build()
            .unwrap();

        assert_eq!(graph.topological_order().unwrap(), deps(&["b", "a"]));
    }

    #[test]
    fn ties_follow_insertion_order() {
        let graph = DependencyGraph::builder()
            .add_service("zeta", vec![])
            .add_service("alpha", vec![])
            .add_service("mid", vec![])
            .build()
            .unwrap();

        assert_eq!(
            graph.topological_order().unwrap(),
            deps(&["zeta", "alpha", "mid"])
        );
    }

    #[test]
    fn diamond_dependency() {
        let graph = DependencyGraph::builder()
            .add_service("web", deps(&["api", "auth"]))
            .add_service("api", deps(&["db"]))
            .add_service("auth", deps(&["db"]))
            .add_service("db", vec![])
            .build()
            .unwrap();

        let order = graph.topological_order().unwrap();
        assert_eq!(order, deps(&["db", "api", "auth", "web"]));
    }

    #[test]
    fn every_edge_points_forward() {
        let graph = DependencyGraph::builder()
            .add_service("e", deps(&["c", "d"]))
            .add_service("d", deps(&["b"]))
            .add_service("c", deps(&["a", "b"]))
            .add_service("b", deps(&["a"]))
            .add_service("a", vec![])
            .add_service("f", vec![])
            .build()
            .unwrap();

        let order = graph.topological_order().unwrap();
        assert_eq!(order.len(), graph.len());
        for service in graph.services() {
            for dep in graph.dependencies_of(service).unwrap() {
                assert!(
                    index(&order, dep) < index(&order, service),
                    "{} should come before {} in {:?}",
                    dep,
                    service,
                    order
                );
            }
        }
    }

    #[test]
    fn cycle_is_rejected_with_path() {
        let graph = DependencyGraph::builder()
            .add_service("a", deps(&["b"]))
            .add_service("b", deps(&["a"]))
            .build()
            .unwrap();

        let err = graph.topological_order().unwrap_err();
        match err {
            ForgeError::CircularDependency { cycle } => assert_eq!(cycle, "a -> b -> a"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = DependencyGraph::builder()
            .add_service("a", deps(&["a"]))
            .build()
            .unwrap();

        assert_eq!(graph.find_cycle(), Some(deps(&["a", "a"])));
    }

    #[test]
    fn find_cycle_none_for_dag() {
        let graph = DependencyGraph::builder()
            .add_service("a", vec![])
            .add_service("b", deps(&["a"]))
            .build()
            .unwrap();

        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn transitive_dependencies_follow_chain() {
        let graph = DependencyGraph::builder()
            .add_service("a", deps(&["b"]))
            .add_service("b", deps(&["c"]))
            .add_service("c", vec![])
            .build()
            .unwrap();

        let all = graph.transitive_dependencies("a");
        assert!(all.contains("b"));
        assert!(all.contains("c"));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn adding_twice_merges_dependencies() {
        let graph = DependencyGraph::builder()
            .add_service("a", deps(&["b"]))
            .add_service("b", vec![])
            .add_service("a", deps(&["c"]))
            .add_service("c", vec![])
            .build()
            .unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.services()[0], "a");
        assert_eq!(graph.dependencies_of("a").unwrap().len(), 2);
    }
}
