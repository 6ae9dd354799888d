use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use yaml_rust2::{Yaml, YamlLoader};

/// Resolve `!include <relative-path>` lines in a YAML file and merge the
/// included documents under the including one. Later keys win.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, Box<dyn Error + Send + Sync>> {
    process_includes_recursive(&path.to_path_buf())
}

fn process_includes_recursive(path: &PathBuf) -> Result<Yaml, Box<dyn Error + Send + Sync>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {:?}: {}", path, e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|&line| line.trim().starts_with("!include"));

    let mut processed_includes = Vec::with_capacity(includes.len());
    for line in &includes {
        let include_path = line
            .trim()
            .strip_prefix("!include")
            .ok_or("Malformed include directive")?
            .trim();
        let full_path = base_path.join(include_path);
        processed_includes.push(process_includes_recursive(&full_path)?);
    }

    let rest_yamls = YamlLoader::load_from_str(&rest.join("\n"))?;

    let merged_rest = rest_yamls
        .into_iter()
        .reduce(|acc: Yaml, doc: Yaml| merge_yaml(&doc, &acc))
        .ok_or_else(|| format!("Empty config file: {:?}", path))?;

    match processed_includes
        .into_iter()
        .reduce(|acc: Yaml, include: Yaml| merge_yaml(&acc, &include))
    {
        Some(merged_includes) => Ok(merge_yaml(&merged_includes, &merged_rest)),
        None => Ok(merged_rest),
    }
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                match base_hash.get(key) {
                    Some(base_value) => {
                        result.insert(key.clone(), merge_yaml(base_value, value));
                    }
                    None => {
                        result.insert(key.clone(), value.clone());
                    }
                }
            }
            Yaml::Hash(result)
        }
        (_, override_value) => override_value.clone(),
    }
}

/// Serialize a resolved YAML tree back to a string so serde can parse it.
pub fn yaml_to_string(yaml: &Yaml) -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = String::new();
    {
        let mut emitter = yaml_rust2::YamlEmitter::new(&mut out);
        emitter.dump(yaml)?;
    }
    Ok(out)
}
