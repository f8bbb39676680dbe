//! Fortran-namelist style optimizer input file.
//!
//! Parsing keeps the group order, every key (recognized or not) and all
//! comment lines verbatim, so re-serialization round-trips the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::CaseError;

/// The namelist groups the optimizer understands.
pub const KNOWN_GROUPS: [&str; 12] = [
    "optimization_options",
    "operating_conditions",
    "geometry_targets",
    "curvature",
    "constraints",
    "paneling_options",
    "particle_swarm_options",
    "xfoil_run_options",
    "hicks_henne_options",
    "bezier_options",
    "camb_thick_options",
    "info",
];

/// One line inside a namelist group.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `key = value`; the value text stays verbatim (may hold arrays).
    Pair { key: String, value: String },
    /// Comment or anything else, preserved as-is.
    Raw(String),
}

/// One `&name .. /` group.
#[derive(Debug, Clone, PartialEq)]
pub struct Namelist {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Namelist {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            Entry::Pair { key: k, value } if k.eq_ignore_ascii_case(key) => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        for entry in &mut self.entries {
            if let Entry::Pair { key: k, value: v } = entry {
                if k.eq_ignore_ascii_case(key) {
                    *v = value;
                    return;
                }
            }
        }
        self.entries.push(Entry::Pair {
            key: key.to_string(),
            value,
        });
    }
}

/// The optimizer input file with round-trip preserving (de)serialization.
#[derive(Debug, Clone)]
pub struct InputFile {
    path: PathBuf,
    /// Lines before the first group (usually comments).
    preamble: Vec<String>,
    groups: Vec<Namelist>,
}

impl InputFile {
    /// Parse from disk.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CaseError> {
        let path: PathBuf = path.into();
        let text = fs::read_to_string(&path)?;
        let mut me = Self::parse(&text);
        me.path = path;
        Ok(me)
    }

    /// Empty file bound to a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preamble: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut preamble = Vec::new();
        let mut groups: Vec<Namelist> = Vec::new();
        let mut current: Option<Namelist> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if let Some(name) = line.strip_prefix('&') {
                if let Some(done) = current.take() {
                    groups.push(done);
                }
                current = Some(Namelist {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
            } else if line == "/" {
                if let Some(done) = current.take() {
                    groups.push(done);
                }
            } else {
                match current.as_mut() {
                    Some(group) => {
                        // a pair line has an '=' outside a comment
                        let is_comment = line.starts_with('!');
                        if let (false, Some(eq)) = (is_comment, line.find('=')) {
                            group.entries.push(Entry::Pair {
                                key: line[..eq].trim().to_string(),
                                value: line[eq + 1..].trim().to_string(),
                            });
                        } else if !line.is_empty() {
                            group.entries.push(Entry::Raw(raw.to_string()));
                        }
                    }
                    None => {
                        if !line.is_empty() {
                            preamble.push(raw.to_string());
                        }
                    }
                }
            }
        }
        if let Some(done) = current.take() {
            groups.push(done);
        }

        Self {
            path: PathBuf::new(),
            preamble,
            groups,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("case")
            .to_string()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn groups(&self) -> &[Namelist] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Namelist> {
        self.groups
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(name))
    }

    /// Group access, creating an empty one on demand.
    pub fn group_mut(&mut self, name: &str) -> &mut Namelist {
        if let Some(i) = self
            .groups
            .iter()
            .position(|g| g.name.eq_ignore_ascii_case(name))
        {
            return &mut self.groups[i];
        }
        self.groups.push(Namelist {
            name: name.to_string(),
            entries: Vec::new(),
        });
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.group(group)?.get(key)
    }

    pub fn set(&mut self, group: &str, key: &str, value: impl Into<String>) {
        self.group_mut(group).set(key, value);
    }

    /// Serialize back to text; unrecognized keys and comments come out
    /// verbatim.
    pub fn as_text(&self) -> String {
        let mut text = String::new();
        for line in &self.preamble {
            text.push_str(line);
            text.push('\n');
        }
        for group in &self.groups {
            text.push_str(&format!("&{}\n", group.name));
            for entry in &group.entries {
                match entry {
                    Entry::Pair { key, value } => {
                        text.push_str(&format!("  {key} = {value}\n"));
                    }
                    Entry::Raw(raw) => {
                        text.push_str(raw);
                        text.push('\n');
                    }
                }
            }
            text.push_str("/\n");
        }
        text
    }

    pub fn save(&self) -> Result<(), CaseError> {
        fs::write(&self.path, self.as_text())?;
        debug!(path = %self.path.display(), "input file saved");
        Ok(())
    }

    /// Let the optimizer validate the content (`--check-input` mode).
    /// Reports the offending namelist group when the check fails.
    pub fn check_content(&self, optimizer_exe: &Path) -> Result<(), CaseError> {
        let output = Command::new(optimizer_exe)
            .arg("--check-input")
            .arg("-i")
            .arg(&self.path)
            .output()
            .map_err(|e| CaseError::ParseError {
                namelist: String::new(),
                reason: format!("could not run input check: {e}"),
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let namelist = KNOWN_GROUPS
            .iter()
            .find(|g| stderr.contains(*g))
            .map(|g| g.to_string())
            .unwrap_or_default();
        Err(CaseError::ParseError {
            namelist,
            reason: stderr.trim().to_string(),
        })
    }
}
