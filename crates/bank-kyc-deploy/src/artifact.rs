//! Lookup of compiled contract artifacts.
//!
//! Artifacts are laid out the way the Hardhat toolchain writes them:
//! `<root>/<sourceName>/<contractName>.json`, next to `*.dbg.json` files and
//! a `build-info` directory that are not artifacts themselves.

use {
    alloy::{
        json_abi::JsonAbi,
        primitives::{Bytes, hex::FromHexError},
    },
    serde::Deserialize,
    std::{
        collections::BTreeMap,
        fs,
        path::{Path, PathBuf},
    },
};

const BUILD_INFO_DIR: &str = "build-info";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact for contract \"{name}\" not found in {}", .dir.display())]
    NotFound { name: String, dir: PathBuf },
    #[error(
        "there are multiple artifacts for contract \"{name}\", use one of these fully qualified \
         names instead: {}",
        .candidates.join(", ")
    )]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
    #[error("contract \"{0}\" is abstract and can't be deployed")]
    Abstract(String),
    #[error(
        "contract \"{name}\" must be linked against {} before it can be deployed",
        .libraries.join(", ")
    )]
    Unlinked {
        name: String,
        libraries: Vec<String>,
    },
    #[error("contract \"{name}\" has invalid bytecode")]
    InvalidBytecode {
        name: String,
        #[source]
        source: FromHexError,
    },
    #[error("failed to read artifact {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed artifact {}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A compiled contract as found on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode. Kept as text because unlinked bytecode contains
    /// library placeholders that are not valid hex.
    pub bytecode: String,
    #[serde(default)]
    pub link_references: BTreeMap<String, BTreeMap<String, Vec<LinkReference>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkReference {
    pub start: usize,
    pub length: usize,
}

impl Artifact {
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Returns the creation bytecode if the contract can be deployed as is.
    pub fn deployable(&self) -> Result<Bytes, ArtifactError> {
        if !self.link_references.is_empty() {
            let libraries = self
                .link_references
                .iter()
                .flat_map(|(source, libraries)| {
                    libraries
                        .keys()
                        .map(move |library| format!("{source}:{library}"))
                })
                .collect();
            return Err(ArtifactError::Unlinked {
                name: self.contract_name.clone(),
                libraries,
            });
        }

        let bytecode: Bytes =
            self.bytecode
                .parse()
                .map_err(|source| ArtifactError::InvalidBytecode {
                    name: self.contract_name.clone(),
                    source,
                })?;
        if bytecode.is_empty() {
            return Err(ArtifactError::Abstract(self.contract_name.clone()));
        }
        Ok(bytecode)
    }
}

/// Resolves contract names to artifacts below a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Finds the artifact for either a bare contract name (`Token`) or a
    /// fully qualified one (`contracts/Token.sol:Token`).
    pub fn find(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let path = match name.rsplit_once(':') {
            Some((source, contract)) => {
                let path = self.root.join(source).join(format!("{contract}.json"));
                if !path.is_file() {
                    return Err(self.not_found(name));
                }
                path
            }
            None => {
                let mut candidates = Vec::new();
                self.collect(&self.root, &format!("{name}.json"), &mut candidates)?;
                candidates.sort();
                match candidates.len() {
                    0 => return Err(self.not_found(name)),
                    1 => candidates.remove(0),
                    _ => {
                        return Err(ArtifactError::Ambiguous {
                            name: name.to_owned(),
                            candidates: candidates
                                .iter()
                                .map(|path| self.fully_qualified_name(path, name))
                                .collect(),
                        });
                    }
                }
            }
        };

        tracing::debug!(path = %path.display(), "reading artifact");
        read(&path)
    }

    fn collect(
        &self,
        dir: &Path,
        file_name: &str,
        found: &mut Vec<PathBuf>,
    ) -> Result<(), ArtifactError> {
        if !dir.is_dir() {
            return Ok(());
        }
        let io = |source| ArtifactError::Io {
            path: dir.to_owned(),
            source,
        };
        for entry in fs::read_dir(dir).map_err(io)? {
            let entry = entry.map_err(io)?;
            let path = entry.path();
            // Symlinked directories are not followed, they may form cycles.
            if entry.file_type().map_err(io)?.is_dir() {
                if dir == self.root && path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                    continue;
                }
                self.collect(&path, file_name, found)?;
            } else if path.file_name().is_some_and(|n| n == file_name) {
                found.push(path);
            }
        }
        Ok(())
    }

    fn fully_qualified_name(&self, path: &Path, contract: &str) -> String {
        let source = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .unwrap_or(path);
        format!("{}:{contract}", source.display())
    }

    fn not_found(&self, name: &str) -> ArtifactError {
        ArtifactError::NotFound {
            name: name.to_owned(),
            dir: self.root.clone(),
        }
    }
}

fn read(path: &Path) -> Result<Artifact, ArtifactError> {
    let contents = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ArtifactError::Malformed {
        path: path.to_owned(),
        source,
    })
}
