//! Configuration loading and generation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery, parsing and validation in [`loader`]
//! - `forge.yaml` generation for `stackforge setup` in [`writer`]
//!
//! # Example
//!
//! ```
//! use stackforge::config::load_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(
//!     temp.path().join("forge.yaml"),
//!     "docker-repo: registry.example.com/team\nuser: deployer\npassword: aHVudGVyMg==\n",
//! )
//! .unwrap();
//!
//! let config = load_config(None, temp.path()).unwrap();
//! assert_eq!(config.namespace, "team");
//! assert_eq!(format!("{}", config.password), "********");
//! ```

pub mod loader;
pub mod schema;
pub mod writer;

pub use loader::{decode_password, find_config, load_config, load_config_file, parse_config};
pub use schema::{ConfigFile, ForgeConfig, CONFIG_FILE};
pub use writer::{render_config, write_config};
