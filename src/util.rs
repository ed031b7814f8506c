/// Shared filesystem helpers.
pub mod fs {
    use std::fs;
    use std::io;
    use std::path::Path;

    /// Ensure a directory exists, creating it recursively if needed.
    ///
    /// Returns `true` when the directory had to be created. A non-directory
    /// entry at `path` surfaces as the error from `create_dir_all`.
    pub fn ensure_dir(path: &Path) -> io::Result<bool> {
        if path.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(path)?;
        Ok(true)
    }
}
