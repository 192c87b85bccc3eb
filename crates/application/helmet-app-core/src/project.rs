//! Scenario configurations kept as `*.json` files in the project folder.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use helmet_core::ScenarioDescriptor;

/// Scenario files in `project`, sorted by name.
pub fn list_scenarios(project: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let entries = project
        .read_dir_utf8()
        .with_context(|| format!("cannot read project folder {project}"))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension() == Some("json") && entry.file_type()?.is_file() {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// The scenario's name is the file stem; its content is passed to the engine untouched.
pub fn load_scenario(path: &Utf8Path) -> anyhow::Result<ScenarioDescriptor> {
    let name = path
        .file_stem()
        .with_context(|| format!("{path} has no file name"))?;
    let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
    let config: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{path} is not valid JSON"))?;
    Ok(ScenarioDescriptor::new(name, config))
}

/// Loads the named scenarios in the order given, or every scenario when `names` is empty.
pub fn resolve_scenarios(
    project: &Utf8Path,
    names: &[String],
) -> anyhow::Result<Vec<ScenarioDescriptor>> {
    if names.is_empty() {
        return list_scenarios(project)?
            .iter()
            .map(|p| load_scenario(p))
            .collect();
    }

    names
        .iter()
        .map(|name| {
            let path = project.join(format!("{name}.json"));
            if !path.is_file() {
                anyhow::bail!("no scenario named '{name}' in {project}");
            }
            load_scenario(&path)
        })
        .collect()
}
