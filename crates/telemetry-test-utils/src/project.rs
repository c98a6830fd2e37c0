//! [`TestProject`] builder for context-file test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

/// A temporary project directory holding context documents.
///
/// # Example
///
/// ```rust,no_run
/// use telemetry_test_utils::{TestProject, sample_document};
///
/// let project = TestProject::new();
/// let path = project.write_json("cdk.json", &sample_document());
/// assert!(path.exists());
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a project with the sample document written to `cdk.json`.
    pub fn with_sample() -> Self {
        let project = Self::new();
        project.write_json("cdk.json", &crate::sample_document());
        project
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `name` inside the project.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Write `value` as pretty JSON to `name`, returning the full path.
    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let content = serde_json::to_string_pretty(value).unwrap();
        self.write(name, &content)
    }

    /// Write raw `content` to `name`, returning the full path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}
