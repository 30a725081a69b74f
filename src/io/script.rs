// src/io/script.rs

use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, TempPath};

const SCRIPT_PREFIX: &str = "dagnode_script-";

/// Inline script body written to a temporary file for the process to read.
///
/// The file handle is closed right after writing; only the path is kept.
/// Dropping a `ScriptFile` without calling [`ScriptFile::remove`] still
/// deletes the file.
#[derive(Debug)]
pub(crate) struct ScriptFile {
    path: TempPath,
}

impl ScriptFile {
    /// Create the script in `dir`, or in the system temp dir when `dir` is
    /// unset.
    pub(crate) fn create(dir: Option<&Path>, body: &str) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(SCRIPT_PREFIX);
        let mut file = match dir {
            Some(d) if !d.as_os_str().is_empty() => builder.tempfile_in(d)?,
            _ => builder.tempfile()?,
        };
        file.write_all(body.as_bytes())?;
        file.as_file().sync_all()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_body_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = ScriptFile::create(Some(dir.path()), "echo hi\n").unwrap();
        let path = script.path().to_path_buf();

        assert!(path.starts_with(dir.path()));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(SCRIPT_PREFIX)
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "echo hi\n");

        script.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(ScriptFile::create(Some(&missing), "true").is_err());
    }
}
