use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};

use yama_model::SELF_DEP_NAME;

use crate::parcel::{Parcel, ParcelMetadata};
use crate::signal::Signal;

/// For one installed parcel: the immutable mapping `{dep-name, self} →
/// install-name`. Frozen once install succeeds.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    map: HashMap<String, String>,
}

impl Environment {
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }
}

struct InstalledParcel {
    parcel: Arc<dyn Parcel>,
    environment: Environment,
}

/// A set of parcels to install in one atomic batch, plus the dep-mappings
/// that resolve each parcel's dep-names.
#[derive(Default)]
pub struct InstallBatch {
    entries: Vec<(String, Arc<dyn Parcel>)>,
    dep_mappings: HashMap<(String, String), String>,
}

impl InstallBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parcel(mut self, install_name: impl Into<String>, parcel: Arc<dyn Parcel>) -> Self {
        self.entries.push((install_name.into(), parcel));
        self
    }

    pub fn map_dep(
        mut self,
        installer_name: impl Into<String>,
        dep_name: impl Into<String>,
        target_install_name: impl Into<String>,
    ) -> Self {
        self.dep_mappings.insert(
            (installer_name.into(), dep_name.into()),
            target_install_name.into(),
        );
        self
    }
}

/// Holds every installed parcel, its frozen environment, and the union
/// dependency graph, and validates new batches against five rules:
/// self-consistency, name uniqueness, dep-mapping completeness, dep-mapping
/// validity, and acyclicity.
#[derive(Default)]
pub struct InstallRegistry {
    parcels: HashMap<String, InstalledParcel>,
}

impl InstallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self, install_name: &str) -> bool {
        self.parcels.contains_key(install_name)
    }

    pub fn parcel(&self, install_name: &str) -> Option<Arc<dyn Parcel>> {
        self.parcels.get(install_name).map(|p| p.parcel.clone())
    }

    pub fn environment(&self, install_name: &str) -> Option<&Environment> {
        self.parcels.get(install_name).map(|p| &p.environment)
    }

    /// Validates and (on success) appends `batch`. On any failure, `self` is
    /// left completely unchanged — rejected atomically.
    pub fn install(&mut self, batch: InstallBatch) -> Result<Vec<String>, Signal> {
        // 1. Each parcel's metadata must be self-consistent.
        for (name, parcel) in &batch.entries {
            if !parcel.metadata().is_self_consistent() {
                return Err(Signal::InstallInvalidParcel(name.clone()));
            }
        }

        // 2. Install-name uniqueness, against both the existing registry and
        //    duplicates within the batch itself.
        let mut seen_in_batch = HashSet::new();
        for (name, _) in &batch.entries {
            if self.parcels.contains_key(name) || !seen_in_batch.insert(name.clone()) {
                return Err(Signal::InstallInstallNameConflict(name.clone()));
            }
        }

        // 3. Dep-mapping completeness and target validity.
        let batch_names: HashSet<&str> = batch.entries.iter().map(|(n, _)| n.as_str()).collect();
        for (name, parcel) in &batch.entries {
            for dep in parcel.metadata().dep_names() {
                let target = batch
                    .dep_mappings
                    .get(&(name.clone(), dep.clone()))
                    .ok_or_else(|| Signal::InstallMissingDepMapping(name.clone(), dep.clone()))?;
                if !(self.parcels.contains_key(target.as_str()) || batch_names.contains(target.as_str()))
                {
                    return Err(Signal::InstallInvalidDepMapping(name.clone(), dep.clone()));
                }
            }
        }

        // 4. Acyclicity of the union graph (existing installs + batch).
        self.check_acyclic(&batch)?;

        // 5. Success: append new installs and freeze their environments.
        let mut installed_names = Vec::with_capacity(batch.entries.len());
        for (name, parcel) in batch.entries {
            let meta = parcel.metadata();
            let mut map = HashMap::with_capacity(meta.dep_names().len() + 1);
            map.insert(SELF_DEP_NAME.to_string(), name.clone());
            for dep in meta.dep_names() {
                let target = batch
                    .dep_mappings
                    .get(&(name.clone(), dep.clone()))
                    .expect("validated above")
                    .clone();
                map.insert(dep.clone(), target);
            }
            self.parcels.insert(
                name.clone(),
                InstalledParcel {
                    parcel,
                    environment: Environment { map },
                },
            );
            installed_names.push(name);
        }
        Ok(installed_names)
    }

    /// DFS with explicit gray/black colouring over the union graph, rather
    /// than `petgraph::algo::is_cyclic_directed` — kept explicit so a cycle
    /// is reported as its own distinguishable failure reason rather than
    /// folded into a generic bool, matching every other validation step in
    /// `install` being its own named check.
    fn check_acyclic(&self, batch: &InstallBatch) -> Result<(), Signal> {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();

        for (name, installed) in &self.parcels {
            let from = node_index(&mut graph, &mut index_of, name);
            for (dep_name, target) in &installed.environment.map {
                if dep_name == SELF_DEP_NAME {
                    continue;
                }
                let to = node_index(&mut graph, &mut index_of, target);
                graph.add_edge(from, to, ());
            }
        }
        for (name, parcel) in &batch.entries {
            let from = node_index(&mut graph, &mut index_of, name);
            for dep in parcel.metadata().dep_names() {
                let target = batch
                    .dep_mappings
                    .get(&(name.clone(), dep.clone()))
                    .expect("validated above");
                let to = node_index(&mut graph, &mut index_of, target);
                graph.add_edge(from, to, ());
            }
        }

        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color = vec![Color::White; graph.node_count()];

        fn visit(n: NodeIndex, graph: &DiGraph<String, ()>, color: &mut [Color]) -> bool {
            color[n.index()] = Color::Gray;
            for neighbor in graph.neighbors(n) {
                match color[neighbor.index()] {
                    Color::Gray => return true,
                    Color::White => {
                        if visit(neighbor, graph, color) {
                            return true;
                        }
                    }
                    Color::Black => {}
                }
            }
            color[n.index()] = Color::Black;
            false
        }

        for n in graph.node_indices() {
            if color[n.index()] == Color::White && visit(n, &graph, &mut color) {
                return Err(Signal::InstallDepGraphCycle);
            }
        }
        Ok(())
    }
}

fn node_index(
    graph: &mut DiGraph<String, ()>,
    index_of: &mut HashMap<String, NodeIndex>,
    name: &str,
) -> NodeIndex {
    if let Some(&i) = index_of.get(name) {
        return i;
    }
    let i = graph.add_node(name.to_string());
    index_of.insert(name.to_string(), i);
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::ImportOutcome;

    struct StubParcel(ParcelMetadata);
    impl Parcel for StubParcel {
        fn metadata(&self) -> ParcelMetadata {
            self.0.clone()
        }
        fn import(&self, _relative_path: &str) -> ImportOutcome {
            ImportOutcome::NotFound
        }
    }

    fn stub(self_name: &str, deps: &[&str]) -> Arc<dyn Parcel> {
        Arc::new(StubParcel(ParcelMetadata::new(
            self_name,
            deps.iter().map(|s| s.to_string()).collect(),
        )))
    }

    #[test]
    fn rejects_duplicate_install_name() {
        let mut reg = InstallRegistry::new();
        reg.install(InstallBatch::new().add_parcel("a", stub("a", &[])))
            .unwrap();
        let err = reg
            .install(InstallBatch::new().add_parcel("a", stub("a", &[])))
            .unwrap_err();
        assert_eq!(err, Signal::InstallInstallNameConflict("a".to_string()));
    }

    #[test]
    fn rejects_missing_dep_mapping() {
        let mut reg = InstallRegistry::new();
        let err = reg
            .install(InstallBatch::new().add_parcel("a", stub("a", &["yama"])))
            .unwrap_err();
        assert_eq!(
            err,
            Signal::InstallMissingDepMapping("a".to_string(), "yama".to_string())
        );
    }

    #[test]
    fn rejects_invalid_dep_mapping_target() {
        let mut reg = InstallRegistry::new();
        let err = reg
            .install(
                InstallBatch::new()
                    .add_parcel("a", stub("a", &["yama"]))
                    .map_dep("a", "yama", "nonexistent"),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Signal::InstallInvalidDepMapping("a".to_string(), "yama".to_string())
        );
    }

    #[test]
    fn allows_diamond_but_rejects_cycle() {
        let mut reg = InstallRegistry::new();
        reg.install(InstallBatch::new().add_parcel("base", stub("base", &[])))
            .unwrap();
        reg.install(
            InstallBatch::new()
                .add_parcel("a", stub("a", &["base"]))
                .map_dep("a", "base", "base"),
        )
        .unwrap();
        reg.install(
            InstallBatch::new()
                .add_parcel("b", stub("b", &["base"]))
                .map_dep("b", "base", "base"),
        )
        .unwrap();

        let err = reg
            .install(
                InstallBatch::new()
                    .add_parcel("c", stub("c", &["a", "b"]))
                    .map_dep("c", "a", "a")
                    .map_dep("c", "b", "b"),
            )
            .unwrap();
        assert_eq!(err, vec!["c".to_string()]);
    }

    #[test]
    fn failed_batch_leaves_registry_unchanged() {
        let mut reg = InstallRegistry::new();
        reg.install(InstallBatch::new().add_parcel("a", stub("a", &[])))
            .unwrap();
        let before = reg.parcels.len();
        let _ = reg.install(
            InstallBatch::new()
                .add_parcel("b", stub("b", &["missing"]))
                .add_parcel("c", stub("c", &[])),
        );
        assert_eq!(reg.parcels.len(), before);
        assert!(!reg.is_installed("b"));
        assert!(!reg.is_installed("c"));
    }
}
