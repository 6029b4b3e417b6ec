//! Service discovery by walking a source tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::dependency::DependencyGraph;
use super::manifest::{parse_descriptor, SERVICE_FILE};
use super::target::Target;
use crate::error::{ForgeError, Result};
use crate::template::{Bindings, Interpolator, TemplateEngine};

const IGNORE_FILES: [&str; 2] = [".gitignore", ".forgeignore"];
const DOCKERFILE: &str = "Dockerfile";

/// The set of services found so far in this invocation.
///
/// Targets keep first-discovery order, which is the tie-break for
/// [`Discovery::order`].
pub struct Discovery {
    targets: Vec<Target>,
    index: HashMap<String, usize>,
    engine: Box<dyn TemplateEngine>,
    bindings: Bindings,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// Discovery that renders descriptors with the process environment.
    pub fn new() -> Self {
        Self::with_bindings(Bindings::new().with_process_env())
    }

    pub fn with_bindings(bindings: Bindings) -> Self {
        Self {
            targets: Vec::new(),
            index: HashMap::new(),
            engine: Box::new(Interpolator),
            bindings,
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.index.get(name).map(|&i| &self.targets[i])
    }

    /// All targets in discovery order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Scan `root` for services, returning the names found in this scan.
    ///
    /// A descriptor that was already discovered is not added again. A
    /// different descriptor declaring a known name is an error.
    pub fn search(&mut self, root: &Path) -> Result<Vec<String>> {
        if !root.is_dir() {
            return Err(ForgeError::NoSuchDirectory {
                path: root.to_path_buf(),
            });
        }
        let root = root.canonicalize()?;

        let mut ignores = IgnoreRules::base();
        let git_root = find_parent_containing(&root, ".git").unwrap_or_else(|| root.clone());
        let mut ancestors: Vec<&Path> = root
            .ancestors()
            .skip(1)
            .take_while(|a| a.starts_with(&git_root))
            .collect();
        ancestors.reverse();
        for dir in ancestors {
            ignores.load(dir)?;
        }

        let mut scan = Vec::new();
        self.descend(&root, None, &ignores, &mut scan)?;

        let mut found = Vec::with_capacity(scan.len());
        for target in scan {
            found.push(target.name.clone());
            match self.index.get(&target.name) {
                Some(&i) if self.targets[i].descriptor == target.descriptor => {}
                Some(&i) => {
                    return Err(ForgeError::DuplicateTarget {
                        name: target.name.clone(),
                        first: self.targets[i].descriptor.clone(),
                        second: target.descriptor,
                    });
                }
                None => {
                    debug!(
                        "discovered service {} at {}",
                        target.name,
                        target.descriptor.display()
                    );
                    self.index.insert(target.name.clone(), self.targets.len());
                    self.targets.push(target);
                }
            }
        }
        Ok(found)
    }

    fn descend(
        &self,
        path: &Path,
        parent: Option<usize>,
        ignores: &IgnoreRules,
        scan: &mut Vec<Target>,
    ) -> Result<()> {
        let mut ignores = ignores.clone();
        ignores.load(path)?;

        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let full = entry.path();
            if !ignores.is_ignored(&full, &name) {
                entries.push((name, full));
            }
        }
        entries.sort();

        let mut parent = parent;
        if let Some((_, descriptor)) = entries
            .iter()
            .find(|(name, full)| name == SERVICE_FILE && full.is_file())
        {
            let source = fs::read_to_string(descriptor)?;
            let parsed =
                parse_descriptor(descriptor, &source, self.engine.as_ref(), &self.bindings)?;
            scan.push(Target::new(descriptor.clone(), parsed.manifest, parsed.raw));
            parent = Some(scan.len() - 1);
        }

        if let Some(owner) = parent {
            if let Some((_, dockerfile)) = entries
                .iter()
                .find(|(name, full)| name == DOCKERFILE && full.is_file())
            {
                let rel = relative(dockerfile, scan[owner].root());
                scan[owner].dockerfiles.push(rel);
            }
        }

        for (_, full) in &entries {
            if full.is_dir() {
                self.descend(full, parent, &ignores, scan)?;
            } else if let Some(owner) = parent {
                let rel = relative(full, scan[owner].root());
                scan[owner].files.push(rel);
            }
        }
        Ok(())
    }

    /// Names required by `names`, directly or transitively, that are not in
    /// `names` themselves, in the order they are first encountered.
    ///
    /// Every required name that was never discovered is reported in one
    /// error.
    pub fn dependencies(&self, names: &[String]) -> Result<Vec<String>> {
        let mut todo: Vec<&str> = names.iter().map(String::as_str).collect();
        todo.reverse();
        let mut visited: Vec<&str> = Vec::new();
        let mut added: Vec<String> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        while let Some(name) = todo.pop() {
            if visited.contains(&name) {
                continue;
            }
            visited.push(name);
            let Some(target) = self.get(name) else {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                continue;
            };
            for required in target.manifest.requires.names() {
                if !names.contains(&required) && !added.contains(&required) {
                    added.push(required.clone());
                }
                if let Some(dep) = self.get(&required) {
                    todo.push(dep.name());
                } else if !missing.contains(&required) {
                    missing.push(required);
                }
            }
        }

        if missing.is_empty() {
            Ok(added)
        } else {
            Err(ForgeError::MissingDependency {
                names: missing.join(", "),
            })
        }
    }

    /// `names` plus every transitive dependency, each after all of the
    /// services it requires. Ties follow discovery order.
    pub fn order(&self, names: &[String]) -> Result<Vec<String>> {
        let mut closure: Vec<&Target> = Vec::new();
        let added = self.dependencies(names)?;
        for target in &self.targets {
            if names.contains(&target.name) || added.contains(&target.name) {
                closure.push(target);
            }
        }

        let graph = closure
            .into_iter()
            .fold(DependencyGraph::builder(), |builder, target| {
                builder.add_service(target.name.clone(), target.requires())
            })
            .build()?;
        graph.topological_order()
    }
}

/// Walk up from `start` looking for a directory that contains `name`.
pub fn find_parent_containing(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(name).exists())
        .map(Path::to_path_buf)
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Ignore patterns in effect for a directory.
#[derive(Debug, Clone)]
struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

#[derive(Debug, Clone)]
struct IgnorePattern {
    glob: String,
    /// A leading `/` only matches from `base`.
    anchored: bool,
    /// Directory of the ignore file; `None` for the built-in rules.
    base: Option<PathBuf>,
}

impl IgnoreRules {
    fn base() -> Self {
        let mut rules = Self {
            patterns: Vec::new(),
        };
        rules.add(".git", None);
        rules.add(".forge", None);
        rules
    }

    fn add(&mut self, line: &str, base: Option<&Path>) {
        let line = line.trim();
        // Negation is not supported.
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            return;
        }
        let anchored = line.starts_with('/');
        let glob = line.trim_start_matches('/').trim_end_matches('/');
        if !glob.is_empty() {
            self.patterns.push(IgnorePattern {
                glob: glob.to_string(),
                anchored,
                base: base.map(Path::to_path_buf),
            });
        }
    }

    fn load(&mut self, dir: &Path) -> Result<()> {
        for file in IGNORE_FILES {
            let path = dir.join(file);
            if path.is_file() {
                for line in fs::read_to_string(&path)?.lines() {
                    self.add(line, Some(dir));
                }
            }
        }
        Ok(())
    }

    /// Patterns match against `path` relative to the directory of the
    /// ignore file that declared them.
    fn is_ignored(&self, path: &Path, name: &str) -> bool {
        self.patterns.iter().any(|p| {
            let rel = match &p.base {
                Some(base) => match path.strip_prefix(base) {
                    Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                    Err(_) => return false,
                },
                None => name.to_string(),
            };
            if p.anchored {
                glob_match::glob_match(&p.glob, &rel)
            } else {
                glob_match::glob_match(&p.glob, name)
                    || glob_match::glob_match(&p.glob, &rel)
                    || glob_match::glob_match(&format!("**/{}", p.glob), &rel)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn discovery() -> Discovery {
        let mut bindings = Bindings::new();
        bindings.insert("env.SUFFIX", "prod");
        Discovery::with_bindings(bindings)
    }

    #[test]
    fn finds_services_dockerfiles_and_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "api/service.yaml", "name: api\n");
        write(temp.path(), "api/Dockerfile", "FROM alpine\n");
        write(temp.path(), "api/src/main.py", "print()\n");
        write(temp.path(), "api/worker/Dockerfile", "FROM alpine\n");
        write(temp.path(), "README.md", "not owned\n");

        let mut d = discovery();
        let found = d.search(temp.path()).unwrap();
        assert_eq!(found, names(&["api"]));

        let api = d.get("api").unwrap();
        assert_eq!(api.dockerfiles(), &["Dockerfile", "worker/Dockerfile"]);
        assert!(api.files().contains(&"src/main.py".to_string()));
        assert!(api.files().contains(&"service.yaml".to_string()));
        assert!(!api.files().iter().any(|f| f.contains("README")));
    }

    #[test]
    fn nested_service_owns_its_subtree() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "outer/service.yaml", "name: outer\n");
        write(temp.path(), "outer/Dockerfile", "FROM a\n");
        write(temp.path(), "outer/inner/service.yaml", "name: inner\n");
        write(temp.path(), "outer/inner/Dockerfile", "FROM b\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        assert_eq!(d.get("outer").unwrap().dockerfiles(), &["Dockerfile"]);
        assert_eq!(d.get("inner").unwrap().dockerfiles(), &["Dockerfile"]);
        assert!(!d
            .get("outer")
            .unwrap()
            .files()
            .iter()
            .any(|f| f.starts_with("inner/")));
    }

    #[test]
    fn anchored_patterns_are_relative_to_their_ignore_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "api/service.yaml", "name: api\n");
        write(temp.path(), "api/.gitignore", "/dist\n");
        write(temp.path(), "api/dist/bundle.js", "x\n");
        write(temp.path(), "api/src/dist/keep.js", "x\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        let files = d.get("api").unwrap().files();
        assert!(!files.iter().any(|f| f.starts_with("dist/")));
        assert!(files.contains(&"src/dist/keep.js".to_string()));
    }

    #[test]
    fn honors_ignore_files_and_skips_forge_dir() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), ".gitignore", "build/\n*.log\n");
        write(temp.path(), "api/service.yaml", "name: api\n");
        write(temp.path(), "api/.forgeignore", "secret.txt\n");
        write(temp.path(), "api/app.log", "noise\n");
        write(temp.path(), "api/secret.txt", "x\n");
        write(temp.path(), "api/build/out.bin", "x\n");
        write(temp.path(), "api/.forge/k8s/api/deploy.yaml", "x\n");
        write(temp.path(), "ignored/build/service.yaml", "name: hidden\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        assert!(d.get("hidden").is_none());
        let files = d.get("api").unwrap().files();
        assert!(files.contains(&".forgeignore".to_string()));
        assert!(!files.iter().any(|f| f.ends_with(".log")));
        assert!(!files.iter().any(|f| f == "secret.txt"));
        assert!(!files.iter().any(|f| f.starts_with("build/")));
        assert!(!files.iter().any(|f| f.starts_with(".forge/")));
    }

    #[test]
    fn name_defaults_to_directory_and_renders_env() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "billing/service.yaml", "requires: []\n");
        write(temp.path(), "web/service.yaml", "name: web-${env.SUFFIX}\n");

        let mut d = discovery();
        let found = d.search(temp.path()).unwrap();
        assert_eq!(found, names(&["billing", "web-prod"]));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "one/service.yaml", "name: api\n");
        write(temp.path(), "two/service.yaml", "name: api\n");

        let err = discovery().search(temp.path()).unwrap_err();
        assert!(matches!(err, ForgeError::DuplicateTarget { ref name, .. } if name == "api"));
    }

    #[test]
    fn rescanning_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "api/service.yaml", "name: api\n");
        write(temp.path(), "api/Dockerfile", "FROM a\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        let again = d.search(&temp.path().join("api")).unwrap();
        assert_eq!(again, names(&["api"]));
        assert_eq!(d.len(), 1);
        assert_eq!(d.get("api").unwrap().dockerfiles().len(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = discovery().search(&temp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ForgeError::NoSuchDirectory { .. }));
    }

    #[test]
    fn order_puts_dependencies_first() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/service.yaml", "name: a\nrequires: b\n");
        write(temp.path(), "b/service.yaml", "name: b\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        assert_eq!(d.order(&names(&["a"])).unwrap(), names(&["b", "a"]));
    }

    #[test]
    fn order_includes_only_the_closure() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/service.yaml", "name: a\nrequires: [b]\n");
        write(temp.path(), "b/service.yaml", "name: b\nrequires: c\n");
        write(temp.path(), "c/service.yaml", "name: c\n");
        write(temp.path(), "d/service.yaml", "name: d\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        assert_eq!(d.dependencies(&names(&["a"])).unwrap(), names(&["b", "c"]));
        assert_eq!(d.order(&names(&["a"])).unwrap(), names(&["c", "b", "a"]));
    }

    #[test]
    fn missing_requirements_are_listed() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/service.yaml", "name: a\nrequires: [db, cache]\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        let err = d.order(&names(&["a"])).unwrap_err();
        match err {
            ForgeError::MissingDependency { names } => assert_eq!(names, "db, cache"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn cycle_is_a_hard_failure() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/service.yaml", "name: a\nrequires: b\n");
        write(temp.path(), "b/service.yaml", "name: b\nrequires: a\n");

        let mut d = discovery();
        d.search(temp.path()).unwrap();
        let err = d.order(&names(&["a", "b"])).unwrap_err();
        assert!(matches!(err, ForgeError::CircularDependency { .. }));
        assert!(err.is_fatal());
    }
}
