//! Layered build configuration.
//! Every directory from the working directory up to the user's home directory may hold a
//! `.fsbuild.yml`. Files closer to the working directory override the ones further up;
//! nested mappings are merged key by key.

use crate::constants::CONFIG_FILE;
use crate::error::{Error, Result};
use crate::templates::TemplateSet;
use indexmap::IndexMap;
use log::{debug, error};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Resolved configuration: the merge of every config layer, immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfig {
    data: Mapping,
}

impl BuildConfig {
    pub fn new(data: Mapping) -> Self {
        Self { data }
    }

    /// Loads the configuration for the current working directory and user home.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let home = dirs::home_dir().unwrap_or_else(|| cwd.clone());
        Ok(Self::load_from(&cwd, &home))
    }

    /// Loads every config layer between `cwd` and `home`.
    ///
    /// Malformed layers are logged and skipped; they never abort the load.
    pub fn load_from(cwd: &Path, home: &Path) -> Self {
        let mut data = Value::Mapping(Mapping::new());

        for dir in config_dirs(cwd, home) {
            let path = dir.join(CONFIG_FILE);
            if !path.is_file() {
                continue;
            }

            match read_layer(&path) {
                Ok(mut layer) => {
                    debug!("Loaded config layer {}", path.display());
                    merge_defaults(&mut layer, &data);
                    data = layer;
                }
                Err(e) => error!("{}", e),
            }
        }

        match data {
            Value::Mapping(data) => Self { data },
            _ => Self::default(),
        }
    }

    pub fn data(&self) -> &Mapping {
        &self.data
    }

    /// Looks up a value by dotted path, e.g. `templates.debug`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Sets a value by dotted path, creating intermediate mappings.
    pub fn set(&mut self, path: &str, value: Value) {
        set_path(&mut self.data, path, value);
    }

    pub fn unset(&mut self, path: &str) -> Option<Value> {
        unset_path(&mut self.data, path)
    }

    /// Template values shared by every project below this configuration.
    pub fn templates(&self) -> TemplateSet {
        match self.get("templates").and_then(Value::as_mapping) {
            Some(mapping) => TemplateSet::from_mapping(mapping),
            None => TemplateSet::default(),
        }
    }

    /// Named game installations (`installations: {name: path}`).
    pub fn installations(&self) -> IndexMap<String, PathBuf> {
        self.get("installations")
            .and_then(Value::as_mapping)
            .map(|mapping| {
                mapping
                    .iter()
                    .filter_map(|(name, path)| {
                        Some((name.as_str()?.to_string(), PathBuf::from(path.as_str()?)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The game's user folder, which contains the `mods` directory.
    pub fn fs_folder(&self) -> Option<PathBuf> {
        self.get("fs_folder").and_then(Value::as_str).map(PathBuf::from)
    }
}

/// Returns the directories whose config files apply to `cwd`, most distant first.
///
/// The chain runs from `cwd` upwards and stops at `home` or at the filesystem root.
/// `home` is always part of the chain, even when `cwd` is not below it.
pub fn config_dirs(cwd: &Path, home: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = cwd.to_path_buf();

    loop {
        if current == home {
            break;
        }
        dirs.push(current.clone());
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }
    }
    dirs.push(home.to_path_buf());

    dirs.reverse();
    dirs
}

fn read_layer(path: &Path) -> Result<Value> {
    let load_error = |message: String| Error::ConfigLoadError { path: path.to_path_buf(), message };

    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string()))?;

    match value {
        Value::Mapping(_) => Ok(value),
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        _ => Err(load_error("top level must be a mapping".to_string())),
    }
}

/// Fills keys missing from `target` with the ones from `defaults`, recursing into mappings
/// present on both sides. Values already in `target` always win.
pub fn merge_defaults(target: &mut Value, defaults: &Value) {
    let (Value::Mapping(target), Value::Mapping(defaults)) = (target, defaults) else {
        return;
    };

    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(existing) => merge_defaults(existing, default),
            None => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

fn set_path(data: &mut Mapping, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            data.insert(Value::from(path), value);
        }
        Some((head, rest)) => {
            let key = Value::from(head);
            let child = data.entry(key).or_insert_with(|| Value::Mapping(Mapping::new()));
            if !child.is_mapping() {
                *child = Value::Mapping(Mapping::new());
            }
            if let Value::Mapping(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

fn unset_path(data: &mut Mapping, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => data.remove(path),
        Some((head, rest)) => match data.get_mut(head)? {
            Value::Mapping(child) => unset_path(child, rest),
            _ => None,
        },
    }
}

/// Parses a value typed on the command line: `true`/`false` become booleans,
/// integers become numbers, anything else stays a string.
pub fn parse_cli_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else if let Ok(number) = raw.parse::<i64>() {
        Value::from(number)
    } else {
        Value::from(raw)
    }
}

/// Applies `effect` to the `.fsbuild.yml` of `dir` and writes it back.
pub fn update_local_config<F>(dir: &Path, effect: F) -> Result<()>
where
    F: FnOnce(&mut BuildConfig),
{
    let path = dir.join(CONFIG_FILE);
    let mut local = if path.exists() {
        let value = read_layer(&path)?;
        BuildConfig::new(value.as_mapping().cloned().unwrap_or_default())
    } else {
        BuildConfig::default()
    };

    effect(&mut local);

    let content =
        serde_yaml::to_string(&local.data).map_err(|e| Error::ConfigError(e.to_string()))?;
    std::fs::write(&path, content)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
