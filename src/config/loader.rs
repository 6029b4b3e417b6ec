//! Configuration file discovery and loading.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

use super::schema::{ConfigFile, ForgeConfig, CONFIG_FILE};
use crate::error::{ForgeError, Result};
use crate::secrets::Sensitive;

/// Find `forge.yaml` by walking up from `start`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load the configuration from `explicit` if given, otherwise from the
/// nearest `forge.yaml` at or above `start`.
///
/// # Errors
///
/// Returns `ConfigNotFound` if there is no config file.
/// Returns `ConfigParseError` if the YAML is invalid.
/// Returns `MissingProperty` / `ConfigValidationError` for bad values.
pub fn load_config(explicit: Option<&Path>, start: &Path) -> Result<ForgeConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config(start).ok_or_else(|| ForgeError::ConfigNotFound {
            name: CONFIG_FILE.to_string(),
        })?,
    };
    load_config_file(&path)
}

/// Load and validate a single config file.
pub fn load_config_file(path: &Path) -> Result<ForgeConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ForgeError::ConfigNotFound {
                name: path.display().to_string(),
            }
        } else {
            ForgeError::Io(e)
        }
    })?;

    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let file = parse_config(&content, &path)?;
    validate(file, path)
}

/// Parse YAML content into a [`ConfigFile`].
pub fn parse_config(content: &str, source_path: &Path) -> Result<ConfigFile> {
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(content).map_err(|e| ForgeError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Check every required key and decode the password.
pub fn validate(file: ConfigFile, path: PathBuf) -> Result<ForgeConfig> {
    let repo = file
        .docker_repo
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ForgeError::MissingProperty {
            key: "docker-repo".to_string(),
        })?;
    let (registry, namespace) = repo
        .trim()
        .split_once('/')
        .filter(|(r, n)| !r.is_empty() && !n.is_empty())
        .ok_or_else(|| ForgeError::ConfigValidationError {
            message: "docker-repo must be in the form <registry-url>/<namespace>".to_string(),
        })?;

    let user = file.user.ok_or_else(|| ForgeError::MissingProperty {
        key: "user".to_string(),
    })?;

    let encoded = file
        .password
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ForgeError::MissingProperty {
            key: "password".to_string(),
        })?;
    let password = decode_password(&encoded)?;

    Ok(ForgeConfig {
        path,
        registry: registry.to_string(),
        namespace: namespace.to_string(),
        user,
        password,
    })
}

/// Decode a base64 password, ignoring the line breaks YAML folding adds.
pub fn decode_password(encoded: &str) -> Result<Sensitive<String>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let invalid = || ForgeError::ConfigValidationError {
        message: "password must be base64 encoded".to_string(),
    };
    let bytes = STANDARD.decode(compact.as_bytes()).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    Ok(Sensitive::new(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = "docker-repo: registry.example.com/team\nuser: deployer\npassword: >\n  aHVudGVy\n  Mg==\n";

    #[test]
    fn loads_valid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, VALID).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.registry, "registry.example.com");
        assert_eq!(config.namespace, "team");
        assert_eq!(config.user, "deployer");
        config.password.use_for(|p| assert_eq!(p, "hunter2"));
        assert_eq!(config.docker_repo(), "registry.example.com/team");
    }

    #[test]
    fn finds_config_in_ancestor() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), VALID).unwrap();
        let nested = temp.path().join("services/api");
        fs::create_dir_all(&nested).unwrap();

        let config = load_config(None, &nested).unwrap();
        assert_eq!(
            config.base_dir(),
            temp.path().canonicalize().unwrap().as_path()
        );
    }

    #[test]
    fn missing_config_points_to_setup() {
        let temp = TempDir::new().unwrap();
        let err = load_config(None, temp.path()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "unable to find forge.yaml, try running `stackforge setup`"
        );
    }

    #[test]
    fn explicit_path_is_used() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.yaml");
        fs::write(&path, VALID).unwrap();
        assert!(load_config(Some(&path), Path::new("/")).is_ok());
    }

    #[test]
    fn rejects_repo_without_namespace() {
        let file = ConfigFile {
            docker_repo: Some("registry.example.com".into()),
            user: Some("u".into()),
            password: Some("cA==".into()),
        };
        let err = validate(file, PathBuf::from("forge.yaml")).unwrap_err();
        assert!(err.to_string().contains("<registry-url>/<namespace>"));
    }

    #[test]
    fn reports_missing_properties() {
        let err = validate(ConfigFile::default(), PathBuf::from("forge.yaml")).unwrap_err();
        assert_eq!(err.to_string(), "missing config property: docker-repo");

        let file = ConfigFile {
            docker_repo: Some("r/n".into()),
            user: None,
            password: Some("cA==".into()),
        };
        let err = validate(file, PathBuf::from("forge.yaml")).unwrap_err();
        assert_eq!(err.to_string(), "missing config property: user");

        let file = ConfigFile {
            docker_repo: Some("r/n".into()),
            user: Some("u".into()),
            password: None,
        };
        let err = validate(file, PathBuf::from("forge.yaml")).unwrap_err();
        assert_eq!(err.to_string(), "missing config property: password");
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(decode_password("not base64!!").is_err());
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let err = parse_config("docker-repo: [unclosed", Path::new("forge.yaml")).unwrap_err();
        assert!(matches!(err, ForgeError::ConfigParseError { .. }));
    }
}
