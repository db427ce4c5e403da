use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::AnalyzerConfig;
use crate::diagnostics::Diagnostic;
use crate::program::{resolve, DocumentCache, FileProvider, Program, Uri};
use crate::syntax::{parse_document, Document};
use crate::validation::validate;

/// Result of analyzing the program rooted at one document.
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    /// Every finding of the program, the included documents included
    pub diagnostics: Vec<Diagnostic>,
}

/// Open documents and the analyses built from them.
///
/// Every entry is an `Arc` that is replaced whole, so a reader never sees a half built result.
/// Changing a document drops each analysis that read it.
pub struct Workspace<F: FileProvider> {
    config: AnalyzerConfig,
    provider: F,
    documents: DocumentCache,
    analyses: RwLock<HashMap<Uri, Arc<Analysis>>>,
    /// Bumped on every change. An analysis started before a change is not published.
    generation: AtomicU64,
}

impl<F: FileProvider> Workspace<F> {
    pub fn new(config: AnalyzerConfig, provider: F) -> Self {
        Self {
            config,
            provider,
            documents: DocumentCache::new(),
            analyses: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Parse `text` as the current content of `uri`.
    pub fn open(&self, uri: &Uri, text: &str) -> Arc<Document> {
        let document = Arc::new(parse_document(text, uri));
        self.documents.insert(document.clone());
        self.invalidate(uri);
        document
    }

    pub fn update(&self, uri: &Uri, text: &str) -> Arc<Document> {
        self.open(uri, text)
    }

    pub fn close(&self, uri: &Uri) {
        self.documents.remove(uri);
        self.invalidate(uri);
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.documents.clear();
        self.analyses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The parsed document, read through the file provider when it is not open.
    pub fn document(&self, uri: &Uri) -> Option<Arc<Document>> {
        if let Some(document) = self.documents.get(uri) {
            return Some(document);
        }
        let text = self.provider.read_file(uri)?;
        let document = Arc::new(parse_document(&text, uri));
        self.documents.insert(document.clone());
        Some(document)
    }

    /// Drop every analysis that depends on `uri`.
    pub fn invalidate(&self, uri: &Uri) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut analyses = self
            .analyses
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = analyses.len();
        analyses.retain(|root, analysis| {
            root != uri
                && !analysis.program.used_files.contains(uri)
                && !analysis.program.watched_files.contains(uri)
        });
        tracing::debug!(uri = %uri, dropped = before - analyses.len(), "invalidated");
    }

    /// Resolve and validate the program rooted at `uri`, reusing a cached analysis.
    #[tracing::instrument(skip(self), fields(uri = %uri))]
    pub fn analyze(&self, uri: &Uri) -> Option<Arc<Analysis>> {
        if let Some(analysis) = self
            .analyses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
        {
            return Some(analysis.clone());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let document = self.document(uri)?;
        let program = resolve(document, &self.config, &self.provider, &self.documents);
        let diagnostics = validate(&program);
        let analysis = Arc::new(Analysis {
            program,
            diagnostics,
        });

        let mut analyses = self
            .analyses
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) == generation {
            analyses.insert(uri.clone(), analysis.clone());
        } else {
            tracing::debug!("workspace changed during analysis, result not cached");
        }
        Some(analysis)
    }

    /// Findings located in `uri` for the program rooted at it.
    pub fn diagnostics(&self, uri: &Uri) -> Vec<Diagnostic> {
        self.analyze(uri)
            .map(|analysis| {
                analysis
                    .diagnostics
                    .iter()
                    .filter(|diagnostic| &diagnostic.location.uri == uri)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Message;
    use crate::program::MemoryFileProvider;

    use pretty_assertions::assert_eq;

    fn uri(name: &str) -> Uri {
        Uri::parse(&format!("file:///work/{}", name)).unwrap()
    }

    fn messages(diagnostics: Vec<Diagnostic>) -> Vec<Message> {
        diagnostics
            .into_iter()
            .map(|diagnostic| diagnostic.message)
            .collect()
    }

    #[test]
    fn test_analysis_is_cached_until_change() {
        let workspace = Workspace::new(AnalyzerConfig::default(), MemoryFileProvider::new());
        workspace.open(&uri("main.asm"), "  JMP START\n");

        let first = workspace.analyze(&uri("main.asm")).unwrap();
        let second = workspace.analyze(&uri("main.asm")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            messages(first.diagnostics.clone()),
            vec![Message::LabelNotDefined("START".to_string())]
        );

        workspace.update(&uri("main.asm"), "START\n  JMP START\n");
        let third = workspace.analyze(&uri("main.asm")).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.diagnostics, vec![]);
    }

    #[test]
    fn test_included_change_invalidates_includer() {
        let provider = MemoryFileProvider::new().with_file(uri("defs.h"), "");
        let workspace = Workspace::new(AnalyzerConfig::default(), provider);
        workspace.open(&uri("main.asm"), "  INCLUDE \"defs.h\"\n  LDA VALUE\n");
        assert_eq!(
            messages(workspace.diagnostics(&uri("main.asm"))),
            vec![Message::LabelNotDefined("VALUE".to_string())]
        );

        workspace.open(&uri("defs.h"), "VALUE = $10\n");
        assert_eq!(workspace.diagnostics(&uri("main.asm")), vec![]);
    }

    #[test]
    fn test_opening_missing_include_invalidates_includer() {
        let workspace = Workspace::new(AnalyzerConfig::default(), MemoryFileProvider::new());
        workspace.open(&uri("main.asm"), "  INCLUDE \"defs.h\"\n  LDA VALUE\n");
        assert_eq!(
            messages(workspace.diagnostics(&uri("main.asm"))),
            vec![
                Message::FileNotResolvable("defs.h".to_string()),
                Message::LabelNotDefined("VALUE".to_string())
            ]
        );

        workspace.open(&uri("defs.h"), "VALUE = $10\n");
        assert_eq!(workspace.diagnostics(&uri("main.asm")), vec![]);
        let analysis = workspace.analyze(&uri("main.asm")).unwrap();
        assert!(analysis.program.used_files.contains(&uri("defs.h")));

        workspace.close(&uri("defs.h"));
        assert_eq!(
            messages(workspace.diagnostics(&uri("main.asm"))),
            vec![
                Message::FileNotResolvable("defs.h".to_string()),
                Message::LabelNotDefined("VALUE".to_string())
            ]
        );
    }

    #[test]
    fn test_diagnostics_filtered_by_document() {
        let provider = MemoryFileProvider::new().with_file(uri("bad.h"), "  FOO\n");
        let workspace = Workspace::new(AnalyzerConfig::default(), provider);
        workspace.open(&uri("main.asm"), "  INCLUDE \"bad.h\"\n");

        assert_eq!(workspace.diagnostics(&uri("main.asm")), vec![]);
        let analysis = workspace.analyze(&uri("main.asm")).unwrap();
        assert_eq!(
            messages(analysis.diagnostics.clone()),
            vec![Message::UnknownOpcode("FOO".to_string())]
        );
    }

    #[test]
    fn test_close_and_unknown_documents() {
        let workspace = Workspace::new(AnalyzerConfig::default(), MemoryFileProvider::new());
        assert!(workspace.analyze(&uri("missing.asm")).is_none());
        assert_eq!(workspace.diagnostics(&uri("missing.asm")), vec![]);

        workspace.open(&uri("main.asm"), "  NOP\n");
        assert!(workspace.analyze(&uri("main.asm")).is_some());
        workspace.close(&uri("main.asm"));
        assert!(workspace.document(&uri("main.asm")).is_none());
        assert!(workspace.analyze(&uri("main.asm")).is_none());
    }

    #[test]
    fn test_concurrent_analysis() {
        let workspace = Workspace::new(AnalyzerConfig::default(), MemoryFileProvider::new());
        let names: Vec<Uri> = (0..8).map(|n| uri(&format!("file{}.asm", n))).collect();
        for name in &names {
            workspace.open(name, "START\n  LDA #1\n  JMP START\n  FOO\n");
        }

        std::thread::scope(|scope| {
            for name in &names {
                let workspace = &workspace;
                scope.spawn(move || {
                    for _ in 0..4 {
                        let diagnostics = workspace.diagnostics(name);
                        assert_eq!(
                            messages(diagnostics),
                            vec![Message::UnknownOpcode("FOO".to_string())]
                        );
                    }
                });
            }
        });
    }
}
