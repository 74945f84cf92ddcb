use crate::error::{DeployError, Result};
use ethers::{abi::Abi, types::Bytes};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Compiler debug sidecars and the build-info directory never hold deployable
/// artifacts.
const BUILD_INFO_DIR: &str = "build-info";
const DEBUG_SUFFIX: &str = ".dbg.json";

/// Compiled contract as written by Hardhat under `artifacts/`.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: String,
    #[serde(default)]
    source_name: String,
    abi: Abi,
    bytecode: String,
}

impl Artifact {
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |message: String| DeployError::InvalidArtifact {
            path: path.to_path_buf(),
            message,
        };

        let contents = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let raw: RawArtifact =
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;

        let code = raw.bytecode.trim();
        let code = code.strip_prefix("0x").unwrap_or(code);
        if code.is_empty() {
            return Err(invalid(format!(
                "{} has no bytecode, it is abstract or an interface",
                raw.contract_name
            )));
        }
        let bytecode = hex::decode(code).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            contract_name: raw.contract_name,
            source_name: raw.source_name,
            abi: raw.abi,
            bytecode: Bytes::from(bytecode),
        })
    }

    /// `source:Name`, the form accepted by [`find_artifact`] to disambiguate.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// Resolves a contract name to its artifact file.
///
/// `contracts/Lock.sol:Lock` maps directly to
/// `<artifacts_dir>/contracts/Lock.sol/Lock.json`. A bare `Lock` is searched for
/// anywhere below `artifacts_dir` and must match exactly one file.
pub fn find_artifact(artifacts_dir: &Path, name: &str) -> Result<PathBuf> {
    if let Some((source, contract)) = name.rsplit_once(':') {
        let path = artifacts_dir.join(source).join(format!("{}.json", contract));
        return if path.is_file() {
            Ok(path)
        } else {
            Err(DeployError::ArtifactNotFound(name.to_string()))
        };
    }

    let file_name = format!("{}.json", name);
    let mut matches = Vec::new();
    collect_matches(artifacts_dir, &file_name, &mut matches)?;
    debug!(name, dir = %artifacts_dir.display(), found = matches.len(), "artifact lookup");

    match matches.len() {
        0 => Err(DeployError::ArtifactNotFound(name.to_string())),
        1 => Ok(matches.remove(0)),
        _ => {
            let mut candidates: Vec<String> = matches
                .iter()
                .map(|path| qualified_name(artifacts_dir, path, name))
                .collect();
            candidates.sort();
            Err(DeployError::AmbiguousArtifact {
                name: name.to_string(),
                candidates,
            })
        }
    }
}

pub fn load_artifact(artifacts_dir: &Path, name: &str) -> Result<Artifact> {
    let path = find_artifact(artifacts_dir, name)?;
    Artifact::load(&path)
}

/// Symlinks are not followed, so a link back up the tree cannot loop.
fn collect_matches(dir: &Path, file_name: &str, matches: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == BUILD_INFO_DIR));
    for entry in walker {
        let entry = entry?;
        let entry_name = entry.file_name().to_str().unwrap_or_default();
        if entry.file_type().is_file()
            && entry_name == file_name
            && !entry_name.ends_with(DEBUG_SUFFIX)
        {
            matches.push(entry.into_path());
        }
    }
    Ok(())
}

fn qualified_name(artifacts_dir: &Path, path: &Path, name: &str) -> String {
    let source = path
        .parent()
        .and_then(|p| p.strip_prefix(artifacts_dir).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    format!("{}:{}", source, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCK_ABI: &str = r#"[
        {"type":"constructor","stateMutability":"payable","inputs":[{"name":"_owner","type":"address","internalType":"address"}]}
    ]"#;

    fn write_artifact(root: &Path, source: &str, name: &str, bytecode: &str) -> PathBuf {
        let dir = root.join(source);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.json", name));
        let json = format!(
            r#"{{"_format":"hh-sol-artifact-1","contractName":"{}","sourceName":"{}","abi":{},"bytecode":"{}","deployedBytecode":"0x"}}"#,
            name, source, LOCK_ABI, bytecode
        );
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_finds_bare_name() {
        let root = TempDir::new().unwrap();
        let expected = write_artifact(root.path(), "contracts/Lock.sol", "Lock", "0x6080");
        fs::write(
            root.path().join("contracts/Lock.sol/Lock.dbg.json"),
            r#"{"buildInfo":"../../build-info/x.json"}"#,
        )
        .unwrap();

        assert_eq!(find_artifact(root.path(), "Lock").unwrap(), expected);
    }

    #[test]
    fn test_finds_fully_qualified_name() {
        let root = TempDir::new().unwrap();
        write_artifact(root.path(), "contracts/Lock.sol", "Lock", "0x6080");
        let expected = write_artifact(root.path(), "contracts/legacy/Lock.sol", "Lock", "0x6080");

        let path = find_artifact(root.path(), "contracts/legacy/Lock.sol:Lock").unwrap();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_ambiguous_name_lists_candidates() {
        let root = TempDir::new().unwrap();
        write_artifact(root.path(), "contracts/Lock.sol", "Lock", "0x6080");
        write_artifact(root.path(), "contracts/legacy/Lock.sol", "Lock", "0x6080");

        match find_artifact(root.path(), "Lock") {
            Err(DeployError::AmbiguousArtifact { candidates, .. }) => assert_eq!(
                candidates,
                vec![
                    "contracts/Lock.sol:Lock".to_string(),
                    "contracts/legacy/Lock.sol:Lock".to_string(),
                ]
            ),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_artifact() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("build-info")).unwrap();
        fs::write(root.path().join("build-info/Lock.json"), "{}").unwrap();

        assert!(matches!(
            find_artifact(root.path(), "Lock"),
            Err(DeployError::ArtifactNotFound(name)) if name == "Lock"
        ));
        assert!(matches!(
            find_artifact(&root.path().join("nope"), "Lock"),
            Err(DeployError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_load_parses_abi_and_bytecode() {
        let root = TempDir::new().unwrap();
        write_artifact(root.path(), "contracts/Lock.sol", "Lock", "0x60806040");

        let artifact = load_artifact(root.path(), "Lock").unwrap();
        assert_eq!(artifact.contract_name, "Lock");
        assert_eq!(artifact.fully_qualified_name(), "contracts/Lock.sol:Lock");
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80, 0x60, 0x40]);
        assert_eq!(artifact.abi.constructor().map(|c| c.inputs.len()), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_not_followed() {
        let root = TempDir::new().unwrap();
        let expected = write_artifact(root.path(), "contracts/Lock.sol", "Lock", "0x6080");
        std::os::unix::fs::symlink(root.path(), root.path().join("contracts/loop")).unwrap();

        assert_eq!(find_artifact(root.path(), "Lock").unwrap(), expected);
        assert!(matches!(
            find_artifact(root.path(), "Missing"),
            Err(DeployError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_unreadable_artifact_keeps_its_path() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("contracts/Lock.sol/Lock.json");

        match Artifact::load(&missing) {
            Err(DeployError::InvalidArtifact { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected invalid artifact, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_empty_bytecode() {
        let root = TempDir::new().unwrap();
        let path = write_artifact(root.path(), "contracts/ILock.sol", "ILock", "0x");

        assert!(matches!(
            Artifact::load(&path),
            Err(DeployError::InvalidArtifact { .. })
        ));
    }
}
