use std::collections::{HashMap, HashSet};
use std::fs;

use super::Uri;

/// Access to the documents a program may include.
///
/// A missing or unreadable file is never fatal. It is reported where it is referenced.
pub trait FileProvider {
    fn read_file(&self, uri: &Uri) -> Option<String>;

    fn file_exists(&self, uri: &Uri) -> bool;

    fn folder_exists(&self, uri: &Uri) -> bool;
}

/// Files on the local disk, addressed by `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileProvider;

impl FileProvider for FsFileProvider {
    fn read_file(&self, uri: &Uri) -> Option<String> {
        let path = uri.to_file_path()?;
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "unreadable file");
                None
            }
        }
    }

    fn file_exists(&self, uri: &Uri) -> bool {
        uri.to_file_path().map_or(false, |path| path.is_file())
    }

    fn folder_exists(&self, uri: &Uri) -> bool {
        uri.to_file_path().map_or(false, |path| path.is_dir())
    }
}

/// Files held in memory, for embedders and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileProvider {
    files: HashMap<Uri, String>,
    folders: HashSet<Uri>,
}

impl MemoryFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, uri: Uri, text: &str) -> Self {
        self.insert_file(uri, text);
        self
    }

    pub fn with_folder(mut self, uri: Uri) -> Self {
        self.folders.insert(uri);
        self
    }

    pub fn insert_file(&mut self, uri: Uri, text: &str) {
        self.files.insert(uri, text.to_string());
    }
}

impl FileProvider for MemoryFileProvider {
    fn read_file(&self, uri: &Uri) -> Option<String> {
        self.files.get(uri).cloned()
    }

    fn file_exists(&self, uri: &Uri) -> bool {
        self.files.contains_key(uri)
    }

    /// A folder exists when it was added or when it holds a file.
    fn folder_exists(&self, uri: &Uri) -> bool {
        self.folders.contains(uri)
            || self
                .files
                .keys()
                .any(|file| file.as_str().starts_with(uri.as_str()) && uri.is_folder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(text: &str) -> Uri {
        Uri::parse(text).unwrap()
    }

    #[test]
    fn test_memory_provider() {
        let provider = MemoryFileProvider::new()
            .with_file(uri("file:///project/inc/vcs.h"), "VSYNC = $00")
            .with_folder(uri("file:///empty/"));

        assert_eq!(
            provider.read_file(&uri("file:///project/inc/vcs.h")),
            Some("VSYNC = $00".to_string())
        );
        assert_eq!(provider.read_file(&uri("file:///project/vcs.h")), None);

        let tests = vec![
            ("file:///project/inc/", true),
            ("file:///project/", true),
            ("file:///empty/", true),
            ("file:///other/", false),
            ("file:///project/inc/vcs.h", false),
        ];
        for (folder, expected) in tests {
            assert_eq!(provider.folder_exists(&uri(folder)), expected, "{}", folder);
        }
        assert!(provider.file_exists(&uri("file:///project/inc/vcs.h")));
    }

    #[test]
    fn test_fs_provider() {
        let directory = std::env::temp_dir();
        let path = directory.join(format!("dasm-analyzer-{}.asm", std::process::id()));
        fs::write(&path, "  NOP\n").unwrap();

        let provider = FsFileProvider;
        let file = Uri::from_file_path(&path).unwrap();
        assert!(provider.file_exists(&file));
        assert_eq!(provider.read_file(&file), Some("  NOP\n".to_string()));
        assert!(provider.folder_exists(&Uri::from_folder_path(&directory).unwrap()));
        assert!(!provider.folder_exists(&file));

        fs::remove_file(&path).unwrap();
        assert!(!provider.file_exists(&file));
        assert_eq!(provider.read_file(&file), None);
    }
}
