//! Data-driven group and object definitions.
//!
//! Group files hold `{ "code": "...", "members": ["...", ...] }`, either as a single
//! document or an array of them. Codes without a domain take the domain of the file
//! they were read from: its subdirectory name, or the caller's default at the top level.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::code::{AssetCode, GroupCode, ModeCode};
use crate::errors::ToolModeError;
use crate::object::ObjectDefinition;
use crate::registry::ModeRegistry;

/// A group as it appears in a group file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeed {
    pub code: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum GroupFile {
    Many(Vec<GroupSeed>),
    One(GroupSeed),
}

/// A parsed group, ready to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDefinition {
    pub code: GroupCode,
    pub members: Vec<ModeCode>,
}

impl GroupSeed {
    fn resolve(self, default_domain: &str) -> Result<GroupDefinition, ToolModeError> {
        let code = AssetCode::parse_with_domain(&self.code, default_domain)?;
        let members = self
            .members
            .iter()
            .map(|m| AssetCode::parse_with_domain(m, default_domain))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GroupDefinition { code, members })
    }
}

/// Load the groups in one JSON file.
pub fn load_groups_from_json<P: AsRef<Path>>(
    path: P,
    default_domain: &str,
) -> Result<Vec<GroupDefinition>, ToolModeError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let file: GroupFile = serde_json::from_str(&contents).map_err(|e| {
        ToolModeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to parse {}: {}", path.display(), e),
        ))
    })?;
    let seeds = match file {
        GroupFile::Many(seeds) => seeds,
        GroupFile::One(seed) => vec![seed],
    };
    seeds
        .into_iter()
        .map(|seed| seed.resolve(default_domain))
        .collect()
}

/// Load every `*.json` file in `dir`, in file name order.
///
/// Files directly in `dir` resolve bare codes against `default_domain`. Files in a
/// subdirectory resolve them against the subdirectory's name, so `dir/farming/x.json`
/// belongs to the `farming` domain. Subdirectories are visited after top-level files,
/// in name order.
pub fn load_groups_from_dir<P: AsRef<Path>>(
    dir: P,
    default_domain: &str,
) -> Result<Vec<GroupDefinition>, ToolModeError> {
    let mut groups = load_groups_in(dir.as_ref(), default_domain)?;

    let mut domains: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    domains.sort();
    for sub in domains {
        let Some(domain) = sub.file_name().and_then(|n| n.to_str()) else {
            log::warn!("skipping group directory with non UTF-8 name: {}", sub.display());
            continue;
        };
        groups.extend(load_groups_in(&sub, domain)?);
    }
    Ok(groups)
}

fn load_groups_in(dir: &Path, domain: &str) -> Result<Vec<GroupDefinition>, ToolModeError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut groups = Vec::new();
    for path in paths {
        let loaded = load_groups_from_json(&path, domain)?;
        log::debug!("loaded {} tool mode groups from {} ({})", loaded.len(), path.display(), domain);
        groups.extend(loaded);
    }
    Ok(groups)
}

/// Append each group's members to the registry. Returns the number of groups registered.
pub fn register_groups(registry: &mut ModeRegistry, groups: Vec<GroupDefinition>) -> usize {
    let count = groups.len();
    for group in groups {
        registry.register_group(group.code, group.members);
    }
    count
}

/// Load object definitions from a JSON array.
pub fn load_objects_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<ObjectDefinition>, ToolModeError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let objects: Vec<ObjectDefinition> = serde_json::from_str(&contents)?;
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn single_document_and_array_forms() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("a.json");
        let many = dir.path().join("b.json");
        std::fs::write(&one, r#"{"code": "item-scythe", "members": ["scythe-trim", "farming:scythe-remove"]}"#)
            .unwrap();
        let mut f = std::fs::File::create(&many).unwrap();
        writeln!(f, r#"[{{"code": "item-hoe", "members": ["hoe-till"]}}, {{"code": "empty"}}]"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let groups = load_groups_from_dir(dir.path(), "survival").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].code.to_string(), "survival:item-scythe");
        assert_eq!(groups[0].members[1].to_string(), "farming:scythe-remove");
        assert!(groups[2].members.is_empty());

        let mut reg = ModeRegistry::new();
        assert_eq!(register_groups(&mut reg, groups), 3);
        let code = AssetCode::parse("survival:item-hoe").unwrap();
        assert_eq!(reg.group_members(&code).map(|m| m.len()), Some(1));
    }

    #[test]
    fn subdirectory_names_the_domain() {
        let dir = tempfile::tempdir().unwrap();
        let farming = dir.path().join("farming");
        std::fs::create_dir(&farming).unwrap();
        std::fs::write(
            farming.join("scythe.json"),
            r#"{"code": "item-scythe", "members": ["scythe-trim", "game:scythe-remove"]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("hoe.json"), r#"{"code": "item-hoe", "members": ["hoe-till"]}"#).unwrap();

        let groups = load_groups_from_dir(dir.path(), "game").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].code.to_string(), "game:item-hoe");
        assert_eq!(groups[0].members[0].to_string(), "game:hoe-till");
        assert_eq!(groups[1].code.to_string(), "farming:item-scythe");
        assert_eq!(groups[1].members[0].to_string(), "farming:scythe-trim");
        assert_eq!(groups[1].members[1].to_string(), "game:scythe-remove");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_groups_from_json(&path, "game").is_err());
    }
}
