//! Local config-file loading.
//!
//! A thin collaborator of the mirror: it parses INI/JSON/YAML files into the
//! same nested [`ConfigValue`] model. Format selection is a tagged-variant
//! dispatch keyed on a normalized type tag, guessed from the file extension
//! when no tag is given; when the guess fails (or lies) every parser is
//! tried until one accepts the file.


use std::collections::BTreeMap;
use std::path::Path;

use config::Source;
use config::ValueKind;
use tracing::debug;

use crate::ConfigValue;
use crate::Error;
use crate::Result;

/// Supported config-file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Ini,
    Json,
    Yaml,
}

impl FileFormat {
    pub const ALL: [FileFormat; 3] = [FileFormat::Ini, FileFormat::Json, FileFormat::Yaml];

    /// Normalize a type tag: `yml`/`yaml`, `json`, `ini`, case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "ini" => Some(FileFormat::Ini),
            "json" => Some(FileFormat::Json),
            "yml" | "yaml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    /// Guess the format from the file extension, if it matches a known tag.
    pub fn guess(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| ext.to_str()).and_then(Self::from_tag)
    }

    fn as_config_format(self) -> config::FileFormat {
        match self {
            FileFormat::Ini => config::FileFormat::Ini,
            FileFormat::Json => config::FileFormat::Json,
            FileFormat::Yaml => config::FileFormat::Yaml,
        }
    }
}

/// Parse `text` in the given format into a nested value tree.
pub fn parse_str(
    text: &str,
    format: FileFormat,
) -> Result<ConfigValue> {
    let map = config::File::from_str(text, format.as_config_format()).collect()?;
    Ok(ConfigValue::Tree(
        map.into_iter().map(|(key, value)| (key, convert_value(value))).collect(),
    ))
}

/// Parse a config file. With no explicit format the extension is used as the
/// tag; if that yields nothing (or the preferred parser rejects the file)
/// every parser is tried in turn.
///
/// # Errors
/// - [`Error::BadConfigFile`] if the file is unreadable or no parser
///   accepts it
pub fn parse_file(
    path: impl AsRef<Path>,
    file_type: Option<FileFormat>,
) -> Result<ConfigValue> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|error| Error::BadConfigFile(format!("{}: {error}", path.display())))?;

    let preferred = file_type.or_else(|| FileFormat::guess(path));
    let mut candidates = Vec::new();
    if let Some(format) = preferred {
        candidates.push(format);
    }
    for format in FileFormat::ALL {
        if Some(format) != preferred {
            candidates.push(format);
        }
    }

    for format in candidates {
        match parse_str(&text, format) {
            Ok(value) => return Ok(value),
            Err(error) => debug!(path = %path.display(), ?format, %error, "parser rejected file"),
        }
    }
    Err(Error::BadConfigFile(path.display().to_string()))
}

/// Leaves are kept as strings like the mirror's; arrays become trees keyed
/// by element index.
fn convert_value(value: config::Value) -> ConfigValue {
    match value.kind {
        ValueKind::Table(table) => ConfigValue::Tree(
            table.into_iter().map(|(key, value)| (key, convert_value(value))).collect(),
        ),
        ValueKind::Array(items) => ConfigValue::Tree(
            items
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), convert_value(value)))
                .collect(),
        ),
        ValueKind::String(s) => ConfigValue::Leaf(s),
        ValueKind::Boolean(b) => ConfigValue::Leaf(b.to_string()),
        ValueKind::I64(i) => ConfigValue::Leaf(i.to_string()),
        ValueKind::I128(i) => ConfigValue::Leaf(i.to_string()),
        ValueKind::U64(u) => ConfigValue::Leaf(u.to_string()),
        ValueKind::U128(u) => ConfigValue::Leaf(u.to_string()),
        ValueKind::Float(f) => ConfigValue::Leaf(f.to_string()),
        ValueKind::Nil => ConfigValue::Leaf(String::new()),
    }
}

/// Layered file-backed configuration: each added file updates the top-level
/// keys of the previous ones, optionally overridden by environment
/// variables with dotted names.
#[derive(Debug, Default)]
pub struct FileConfig {
    conf: BTreeMap<String, ConfigValue>,
    environment_override: bool,
}

impl FileConfig {
    /// `environment_override` lets environment variables with dotted names
    /// (e.g. `db.host`) replace leaves that already exist in the loaded
    /// configuration.
    pub fn new(environment_override: bool) -> Self {
        Self {
            conf: BTreeMap::new(),
            environment_override,
        }
    }

    /// Parse a file and merge its top-level keys over the current state.
    pub fn add_file(
        &mut self,
        path: impl AsRef<Path>,
        file_type: Option<FileFormat>,
    ) -> Result<()> {
        let parsed = parse_file(path, file_type)?;
        if let ConfigValue::Tree(map) = parsed {
            for (key, value) in map {
                self.conf.insert(key, value);
            }
        }
        if self.environment_override {
            self.apply_environment();
        }
        Ok(())
    }

    /// Like [`add_file`](FileConfig::add_file), but the filename itself can
    /// be overridden through `env_variable`.
    pub fn add_file_from_env(
        &mut self,
        path: &str,
        env_variable: &str,
        file_type: Option<FileFormat>,
    ) -> Result<()> {
        let path = std::env::var(env_variable).unwrap_or_else(|_| path.to_string());
        self.add_file(&path, file_type)
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&ConfigValue> {
        self.conf.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.conf.contains_key(key)
    }

    /// Resolve a dotted path against the loaded configuration.
    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<&ConfigValue> {
        let (root, rest) = path.split_once('.').unwrap_or((path, ""));
        self.conf.get(root)?.lookup(rest)
    }

    fn apply_environment(&mut self) {
        for (name, value) in std::env::vars() {
            let segments: Vec<&str> = name.split('.').collect();
            if override_leaf(&mut self.conf, &segments, &value) {
                debug!(name = %name, "environment variable overrode configured value");
            }
        }
    }
}

/// Replace the leaf at `segments` with `value`. Only paths that already end
/// in a leaf are overridden; unknown paths and tree nodes are left alone.
fn override_leaf(
    map: &mut BTreeMap<String, ConfigValue>,
    segments: &[&str],
    value: &str,
) -> bool {
    match segments {
        [] => false,
        [last] => {
            if let Some(slot) = map.get_mut(*last) {
                if matches!(slot, ConfigValue::Leaf(_)) {
                    *slot = ConfigValue::leaf(value);
                    return true;
                }
            }
            false
        }
        [head, rest @ ..] => match map.get_mut(*head) {
            Some(ConfigValue::Tree(inner)) => override_leaf(inner, rest, value),
            _ => false,
        },
    }
}
