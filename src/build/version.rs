//! Content-derived versions.
//!
//! A version is a SHA-256 digest over a container's build inputs, so an
//! unchanged source tree always maps to the same image tag.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::graph::{Container, Target};

const SUFFIX: &str = ".sha";

/// Version of one container: its dockerfile, build args and every service
/// file inside its build context.
pub fn content_version(target: &Target, container: &Container) -> Result<String> {
    let root = target.root();
    let mut hasher = Sha256::new();

    hasher.update(format!("dockerfile {}\0", container.dockerfile).as_bytes());
    hash_file(&mut hasher, &container.abs_dockerfile(root))?;

    // BTreeMap iteration is already sorted by key.
    hasher.update(format!("args {}\0", container.args.len()).as_bytes());
    for (key, value) in &container.args {
        hasher.update(format!("arg {}={}\0", key, value).as_bytes());
    }

    let context = normalize_context(&container.context);
    let mut files: Vec<&String> = target
        .files()
        .iter()
        .filter(|f| in_context(f, &context))
        .collect();
    files.sort();
    hash_files(&mut hasher, root, files)?;

    Ok(format!("{}{}", hex::encode(hasher.finalize()), SUFFIX))
}

/// Version of a whole service: every file below its root.
pub fn service_version(target: &Target) -> Result<String> {
    let mut files: Vec<&String> = target.files().iter().collect();
    files.sort();

    let mut hasher = Sha256::new();
    hash_files(&mut hasher, target.root(), files)?;
    Ok(format!("{}{}", hex::encode(hasher.finalize()), SUFFIX))
}

fn hash_files(hasher: &mut Sha256, root: &Path, files: Vec<&String>) -> Result<()> {
    hasher.update(format!("files {}\0", files.len()).as_bytes());
    for name in files {
        hasher.update(format!("file {}\0", name).as_bytes());
        hash_file(hasher, &root.join(name))?;
    }
    Ok(())
}

/// Hash a file's content. A file that vanished since discovery hashes as
/// empty.
fn hash_file(hasher: &mut Sha256, path: &Path) -> Result<()> {
    match fs::read(path) {
        Ok(content) => {
            hasher.update(&content);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn normalize_context(context: &str) -> String {
    let trimmed = context.trim_start_matches("./").trim_end_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn in_context(file: &str, context: &str) -> bool {
    context.is_empty()
        || file
            .strip_prefix(context)
            .is_some_and(|rest| rest.starts_with('/'))
}
