use anyhow::{Context, Result};
use std::path::Path;

/// Reads a source file of the given `kind` ("project", ...) into a string.
/// The error names the kind and the path, so the top-level report says which
/// input was unreadable.
pub fn read_source(path: &Path, kind: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Reading {} file `{}`", kind, path.display()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("blog.yaml");
        std::fs::write(&path, "title: T\n")?;
        assert_eq!("title: T\n", read_source(&path, "project")?);
        Ok(())
    }

    #[test]
    fn test_read_source_missing_names_kind() {
        let err = read_source(Path::new("/no/such/blog.yaml"), "project").unwrap_err();
        assert_eq!(
            "Reading project file `/no/such/blog.yaml`",
            err.to_string()
        );
    }
}
