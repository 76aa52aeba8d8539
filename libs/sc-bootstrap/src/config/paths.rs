use std::env;
use std::path::{Path, PathBuf};

/// Errors for resolving the user's home directory
#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a tilde prefix are returned unchanged. `~user` forms are
/// not expanded.
///
/// # Errors
/// Returns [`HomeDirError::HomeMissing`] when the path needs `HOME` and it is unset.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    let home = || {
        #[cfg(target_os = "windows")]
        let var = env::var("USERPROFILE").or_else(|_| env::var("HOME"));
        #[cfg(not(target_os = "windows"))]
        let var = env::var("HOME");
        var.map_err(|_| HomeDirError::HomeMissing)
    };

    if raw == "~" {
        Ok(PathBuf::from(home()?))
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Ok(Path::new(&home()?).join(rest))
    } else {
        Ok(PathBuf::from(raw))
    }
}
