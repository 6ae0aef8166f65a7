//! Identification of a parameter file by database, level and architecture.

use std::fmt;
use std::path::PathBuf;

/// File extension of trained parameter files
pub const WEIGHTS_EXTENSION: &str = "pth";

/// Key of a parameter file: which orthology database, which taxonomic level,
/// which network architecture.
///
/// Each field is a single path component, so the descriptor always maps to a
/// location inside the data home.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeightsDescriptor {
    database: String,
    level: String,
    architecture: String,
}

impl WeightsDescriptor {
    pub fn new(
        database: impl Into<String>,
        level: impl Into<String>,
        architecture: impl Into<String>,
    ) -> crate::Result<Self> {
        let descriptor = Self {
            database: database.into(),
            level: level.into(),
            architecture: architecture.into(),
        };

        validate_component("database", &descriptor.database)?;
        validate_component("level", &descriptor.level)?;
        validate_component("architecture", &descriptor.architecture)?;

        Ok(descriptor)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    fn file_name(&self) -> String {
        format!("{}.{}", self.architecture, WEIGHTS_EXTENSION)
    }

    /// Location relative to the data home: `<database>/<level>/<architecture>.pth`
    pub fn relative_path(&self) -> PathBuf {
        let file_name = self.file_name();
        [self.database.as_str(), self.level.as_str(), file_name.as_str()]
            .iter()
            .collect()
    }

    /// Location relative to the remote store, always `/`-separated
    pub fn remote_path(&self) -> String {
        format!("{}/{}/{}", self.database, self.level, self.file_name())
    }
}

impl fmt::Display for WeightsDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.database, self.level, self.architecture)
    }
}

fn validate_component(field: &str, value: &str) -> crate::Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.chars().any(char::is_control);

    if invalid {
        return Err(crate::DeepnogError::InvalidArgument(format!(
            "Invalid {} {:?}: must be a non-empty name without path separators",
            field, value
        )));
    }
    Ok(())
}
