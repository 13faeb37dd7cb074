//! Action log storage - XML (default) or JSON files in one directory

use anyhow::{bail, Context, Result};
use keytrail_core::ActionLog;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk encoding, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Xml,
    Json,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("xml") => Ok(Format::Xml),
            Some("json") => Ok(Format::Json),
            _ => bail!("Unknown action log format: {}", path.display()),
        }
    }

    pub fn encode(&self, log: &ActionLog) -> Result<String> {
        Ok(match self {
            Format::Xml => log.to_xml()?,
            Format::Json => log.to_json()?,
        })
    }

    pub fn decode(&self, data: &str) -> Result<ActionLog> {
        Ok(match self {
            Format::Xml => ActionLog::from_xml(data)?,
            Format::Json => ActionLog::from_json(data)?,
        })
    }
}

/// Write a log to an explicit path, format from the extension
pub fn save_to(path: &Path, log: &ActionLog) -> Result<()> {
    let data = Format::from_path(path)?.encode(log)?;
    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

/// Read and fully validate a log from an explicit path
pub fn load_from(path: &Path) -> Result<ActionLog> {
    let format = Format::from_path(path)?;
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    format
        .decode(&data)
        .with_context(|| format!("Invalid action log {}", path.display()))
}

pub struct LogStorage {
    dir: PathBuf,
    format: Format,
}

impl LogStorage {
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME not set")?;
        Self::with_dir(PathBuf::from(home).join(".keytrail"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self {
            dir,
            format: Format::default(),
        })
    }

    /// Encoding for newly saved logs
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Save under a timestamped file name, returns the full path
    pub fn save(&self, name: &str, log: &ActionLog) -> Result<PathBuf> {
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.{}", sanitize(name), ts, self.format.extension());
        let path = self.dir.join(filename);
        save_to(&path, log)?;
        Ok(path)
    }

    /// Load by file name (relative to the storage directory) or by path
    pub fn load(&self, file: &str) -> Result<ActionLog> {
        load_from(&self.resolve(file))
    }

    /// All saved logs, sorted by name
    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(s) = name.to_str() {
                if s.ends_with(".xml") || s.ends_with(".json") {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, file: &str) -> Result<()> {
        let path = self.resolve(file);
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let candidate = Path::new(file);
        if candidate.is_absolute() || candidate.exists() {
            candidate.to_path_buf()
        } else {
            self.dir.join(file)
        }
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
