use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

/// Identity of a document or folder.
///
/// Cloning is cheap, the parsed URL is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(Arc<Url>);

fn normalize(relative: &str) -> String {
    relative.replace('\\', "/")
}

impl Uri {
    pub fn parse(text: &str) -> Result<Uri, url::ParseError> {
        Url::parse(text).map(Uri::from)
    }

    /// URI of an absolute file path.
    pub fn from_file_path(path: impl AsRef<Path>) -> Option<Uri> {
        Url::from_file_path(path).ok().map(Uri::from)
    }

    /// URI of an absolute folder path, always ending in a slash.
    pub fn from_folder_path(path: impl AsRef<Path>) -> Option<Uri> {
        Url::from_directory_path(path).ok().map(Uri::from)
    }

    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.0.to_file_path().ok()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_folder(&self) -> bool {
        self.0.path().ends_with('/')
    }

    /// Folder containing the document. A folder URI is its own folder.
    pub fn folder(&self) -> Uri {
        if self.is_folder() {
            return self.clone();
        }
        match self.0.join(".") {
            Ok(folder) => Uri::from(folder),
            Err(_) => self.clone(),
        }
    }

    /// Resolve a file name relative to this URI's folder. Backslash separators are accepted.
    pub fn join(&self, relative: &str) -> Option<Uri> {
        self.folder().0.join(&normalize(relative)).ok().map(Uri::from)
    }

    /// Resolve a folder name relative to this URI's folder. The result ends in a slash.
    pub fn join_folder(&self, relative: &str) -> Option<Uri> {
        let mut relative = normalize(relative);
        if !relative.ends_with('/') {
            relative.push('/');
        }
        self.join(&relative)
    }

    /// Last non-empty path segment, for display.
    pub fn file_name(&self) -> &str {
        self.0
            .path_segments()
            .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
            .unwrap_or_else(|| self.as_str())
    }
}

impl From<Url> for Uri {
    fn from(url: Url) -> Self {
        Uri(Arc::new(url))
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn uri(text: &str) -> Uri {
        Uri::parse(text).unwrap()
    }

    #[test]
    fn test_folder() {
        assert_eq!(uri("file:///project/main.asm").folder(), uri("file:///project/"));
        assert_eq!(uri("file:///project/").folder(), uri("file:///project/"));
    }

    #[test]
    fn test_join() {
        let main = uri("file:///project/src/main.asm");
        let tests = vec![
            ("vcs.h", "file:///project/src/vcs.h"),
            ("inc\\macro.h", "file:///project/src/inc/macro.h"),
            ("../data/level.bin", "file:///project/data/level.bin"),
            ("/abs/file.asm", "file:///abs/file.asm"),
        ];
        for (input, expected) in tests {
            assert_eq!(main.join(input), Some(uri(expected)), "{}", input);
        }
    }

    #[test]
    fn test_join_folder() {
        let main = uri("file:///project/main.asm");
        assert_eq!(main.join_folder("lib"), Some(uri("file:///project/lib/")));
        assert_eq!(main.join_folder("lib/"), Some(uri("file:///project/lib/")));
        let lib = uri("file:///project/lib/");
        assert_eq!(lib.join("vcs.h"), Some(uri("file:///project/lib/vcs.h")));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(uri("file:///project/main.asm").file_name(), "main.asm");
        assert_eq!(uri("file:///project/lib/").file_name(), "lib");
    }
}
