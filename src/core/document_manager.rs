use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cosmic_core::{Diagnostic, Location};
use cosmic_registry::Registry;
use cosmic_semantic::{SemanticAnalyzer, SemanticInfo};
use cosmic_syntax::{Ast, Parser};
use cosmic_token::tokenize;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::*;

/// Output of one pass over a document's text.
#[derive(Debug, Default)]
pub struct Analysis {
    /// Missing when the text could not be tokenized.
    pub ast: Option<Ast>,
    /// Missing when lexing failed, or when a syntax error stopped a fail-fast parse.
    pub semantic_info: Option<SemanticInfo>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the whole pipeline over `content`. Lexical errors, and syntax errors when
/// not recovering, end the pass and are its only diagnostic.
pub fn analyze_content(content: &str, registry: &Registry, recover_from_errors: bool) -> Analysis {
    let tokens = match tokenize(content) {
        Ok(tokens) => tokens,
        Err(error) => {
            return Analysis {
                ast: None,
                semantic_info: None,
                diagnostics: vec![error.to_diagnostic()],
            };
        }
    };

    let parse = Parser::new(tokens, content)
        .recover_from_errors(recover_from_errors)
        .parse();

    if let Some(error) = parse.error.as_ref()
        && !recover_from_errors
    {
        return Analysis {
            diagnostics: vec![error.to_diagnostic()],
            ast: Some(parse.ast),
            semantic_info: None,
        };
    }

    let document = Location::new(0, content.len());
    let semantic_info = SemanticAnalyzer::new(content, registry).analyze(&parse.ast, document);

    let diagnostics = parse
        .error
        .iter()
        .map(|error| error.to_diagnostic())
        .chain(semantic_info.diagnostics.iter().cloned())
        .collect();

    Analysis {
        ast: Some(parse.ast),
        semantic_info: Some(semantic_info),
        diagnostics,
    }
}

/// Like [`analyze_content`], but a panic anywhere in the pipeline is logged and
/// reported as `None` so the caller can keep its previous results.
fn analyze_guarded(
    uri: &Url,
    content: &str,
    registry: &Registry,
    recover_from_errors: bool,
) -> Option<Analysis> {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        analyze_content(content, registry, recover_from_errors)
    }));

    match result {
        Ok(analysis) => Some(analysis),
        Err(_) => {
            tracing::error!(%uri, "analysis failed, keeping the previous results");
            None
        }
    }
}

#[derive(Debug)]
pub struct FileInfo {
    pub content: String,
    pub analysis: Analysis,
    pub version: i32,
}

impl FileInfo {
    pub fn new(content: String, analysis: Analysis, version: i32) -> Self {
        Self {
            content,
            analysis,
            version,
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentManager {
    files: Arc<RwLock<HashMap<Url, FileInfo>>>,
}

impl DocumentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &Arc<RwLock<HashMap<Url, FileInfo>>> {
        &self.files
    }

    pub async fn did_open(
        &self,
        params: DidOpenTextDocumentParams,
        registry: &Registry,
        recover_from_errors: bool,
    ) {
        let uri = params.text_document.uri;
        let content = params.text_document.text;
        let version = params.text_document.version;

        let mut files = self.files.write().await;
        let analysis = analyze_guarded(&uri, &content, registry, recover_from_errors)
            .unwrap_or_default();

        tracing::debug!(%uri, version, "opened document");
        files.insert(uri, FileInfo::new(content, analysis, version));
    }

    /// Applies the edits and re-analyzes. The write lock is held for the whole
    /// update, so a document is never analyzed concurrently with itself.
    pub async fn did_change(
        &self,
        params: DidChangeTextDocumentParams,
        registry: &Registry,
        recover_from_errors: bool,
    ) {
        let uri = params.text_document.uri;
        let mut files = self.files.write().await;
        let Some(file) = files.get_mut(&uri) else {
            tracing::warn!(%uri, "change for a document that was never opened");
            return;
        };

        for change in params.content_changes {
            match change.range {
                Some(range) => {
                    let start = Self::position_to_byte_offset(&file.content, range.start);
                    let end = Self::position_to_byte_offset(&file.content, range.end);
                    file.content.replace_range(start..end.max(start), &change.text);
                }
                None => file.content = change.text,
            }
        }

        file.version = params.text_document.version;
        if let Some(analysis) = analyze_guarded(&uri, &file.content, registry, recover_from_errors)
        {
            let errors = analysis.diagnostics.iter().filter(|d| d.is_error()).count();
            tracing::debug!(%uri, version = file.version, errors, "re-analyzed document");
            file.analysis = analysis;
        }
    }

    pub async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.files.write().await.remove(&params.text_document.uri);
    }

    /// Re-analyzes every open document, e.g. after the settings changed.
    pub async fn reanalyze_all(&self, registry: &Registry, recover_from_errors: bool) -> Vec<Url> {
        let mut files = self.files.write().await;
        let mut uris = Vec::with_capacity(files.len());

        for (uri, file) in files.iter_mut() {
            if let Some(analysis) = analyze_guarded(uri, &file.content, registry, recover_from_errors)
            {
                file.analysis = analysis;
            }
            uris.push(uri.clone());
        }

        uris
    }

    /// Maps an LSP position, counted in UTF-16 code units, to a byte offset. Positions
    /// past the end of a line clamp to the line's end.
    pub fn position_to_byte_offset(content: &str, position: Position) -> usize {
        let mut line = 0;
        let mut character = 0;

        for (offset, ch) in content.char_indices() {
            if line == position.line && (character >= position.character || ch == '\n') {
                return offset;
            }

            if ch == '\n' {
                line += 1;
                character = 0;
            } else {
                character += ch.len_utf16() as u32;
            }
        }

        content.len()
    }

    pub fn byte_offset_to_position(content: &str, byte_offset: usize) -> Position {
        let mut line = 0;
        let mut character = 0;

        for (offset, ch) in content.char_indices() {
            if offset >= byte_offset {
                break;
            }

            if ch == '\n' {
                line += 1;
                character = 0;
            } else {
                character += ch.len_utf16() as u32;
            }
        }

        Position { line, character }
    }

    pub fn location_to_range(content: &str, location: Location) -> Range {
        Range {
            start: Self::byte_offset_to_position(content, location.start_byte),
            end: Self::byte_offset_to_position(content, location.end_byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use cosmic_core::Severity;

    use super::*;

    fn uri() -> Url {
        Url::parse("file:///project/main.cosmic").unwrap()
    }

    fn open(content: &str, version: i32) -> DidOpenTextDocumentParams {
        DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri(),
                language_id: "cosmic".into(),
                version,
                text: content.into(),
            },
        }
    }

    fn edit(range: Option<Range>, text: &str, version: i32) -> DidChangeTextDocumentParams {
        DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri(),
                version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range,
                range_length: None,
                text: text.into(),
            }],
        }
    }

    #[test]
    fn test_position_round_trip() {
        let content = "let a = 1;\nlet bé = 'ü';\n";
        let offset = content.find("'ü'").unwrap();

        let position = DocumentManager::byte_offset_to_position(content, offset);
        assert_eq!(position, Position::new(1, 9));
        assert_eq!(DocumentManager::position_to_byte_offset(content, position), offset);
    }

    #[test]
    fn test_positions_count_utf16_code_units() {
        let content = "let s = '😀'; x";
        let offset = content.find('x').unwrap();

        // the emoji takes two UTF-16 code units but four bytes
        let position = DocumentManager::byte_offset_to_position(content, offset);
        assert_eq!(position, Position::new(0, 14));
        assert_eq!(DocumentManager::position_to_byte_offset(content, position), offset);
    }

    #[test]
    fn test_positions_past_the_line_clamp() {
        let content = "ab\ncd";
        assert_eq!(DocumentManager::position_to_byte_offset(content, Position::new(0, 40)), 2);
        assert_eq!(DocumentManager::position_to_byte_offset(content, Position::new(9, 0)), 5);
    }

    #[test]
    fn test_lexical_error_is_the_only_diagnostic() {
        let registry = Registry::bundled().unwrap();
        let analysis = analyze_content("let a = b;\nlet s = 'open", &registry, true);

        assert!(analysis.ast.is_none());
        assert!(analysis.semantic_info.is_none());
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.diagnostics[0].code.as_deref(), Some("lexer"));
    }

    #[test]
    fn test_fail_fast_syntax_error_is_the_only_diagnostic() {
        let registry = Registry::bundled().unwrap();
        let analysis = analyze_content("let a = b; let = 2;", &registry, false);

        assert!(analysis.semantic_info.is_none());
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(analysis.diagnostics[0].code.as_deref(), Some("parser"));
    }

    #[test]
    fn test_recovering_mode_reports_syntax_and_semantic_errors() {
        let registry = Registry::bundled().unwrap();
        let analysis = analyze_content("let a = b; let = 2;", &registry, true);

        assert!(analysis.semantic_info.is_some());
        assert_eq!(analysis.diagnostics[0].code.as_deref(), Some("parser"));
        assert!(analysis.diagnostics[1..].iter().any(|diagnostic| {
            diagnostic.severity == Severity::Error && diagnostic.message == "cannot find `b` in this scope"
        }));
    }

    #[test]
    fn test_valid_document_has_no_diagnostics() {
        let registry = Registry::bundled().unwrap();
        let analysis = analyze_content("let x = 1", &registry, false);

        assert!(analysis.diagnostics.is_empty());
        let info = analysis.semantic_info.unwrap();
        assert_eq!(info.scopes.root().variables[0].name, "x");
    }

    #[tokio::test]
    async fn test_open_change_close() {
        let registry = Registry::bundled().unwrap();
        let manager = DocumentManager::new();

        manager.did_open(open("let a = 1;", 1), &registry, true).await;

        // replace `1` with `'x'`
        let range = Range::new(Position::new(0, 8), Position::new(0, 9));
        manager
            .did_change(edit(Some(range), "'x'", 2), &registry, true)
            .await;

        {
            let files = manager.files().read().await;
            let file = files.get(&uri()).unwrap();
            assert_eq!(file.content, "let a = 'x';");
            assert_eq!(file.version, 2);
            let info = file.analysis.semantic_info.as_ref().unwrap();
            assert_eq!(info.scopes.root().variables[0].ty.to_string(), "string");
        }

        manager
            .did_change(edit(None, "let b = c;", 3), &registry, true)
            .await;
        {
            let files = manager.files().read().await;
            let file = files.get(&uri()).unwrap();
            assert_eq!(file.analysis.diagnostics.len(), 1);
        }

        let uris = manager.reanalyze_all(&registry, false).await;
        assert_eq!(uris, [uri()]);

        manager
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: uri() },
            })
            .await;
        assert!(manager.files().read().await.is_empty());
    }
}
