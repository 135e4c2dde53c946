use cosmic_core::Severity;
use tower_lsp::lsp_types::*;

use crate::core::document_manager::DocumentManager;

const SOURCE: &str = "cosmic";

#[derive(Debug, Default)]
pub struct DiagnosticProvider;

impl DiagnosticProvider {
    pub fn new() -> Self {
        Self
    }

    /// At most `max_problems` diagnostics for `uri`, in the order they were found.
    pub async fn get_diagnostics(
        &self,
        document_manager: &DocumentManager,
        uri: &Url,
        max_problems: usize,
        related_information: bool,
    ) -> Vec<Diagnostic> {
        let files = document_manager.files().read().await;
        let Some(file_info) = files.get(uri) else {
            return Vec::new();
        };

        file_info
            .analysis
            .diagnostics
            .iter()
            .take(max_problems)
            .map(|diagnostic| {
                self.convert_diagnostic(diagnostic, uri, &file_info.content, related_information)
            })
            .collect()
    }

    fn convert_diagnostic(
        &self,
        diagnostic: &cosmic_core::Diagnostic,
        uri: &Url,
        content: &str,
        related_information: bool,
    ) -> Diagnostic {
        let range = DocumentManager::location_to_range(content, diagnostic.location);

        // syntax problems repeat their message next to the offending range
        let related_information = match diagnostic.code.as_deref() {
            Some("lexer" | "parser") if related_information => {
                Some(vec![DiagnosticRelatedInformation {
                    location: tower_lsp::lsp_types::Location::new(uri.clone(), range),
                    message: diagnostic.message.clone(),
                }])
            }
            _ => None,
        };

        Diagnostic {
            range,
            severity: Some(self.convert_severity(diagnostic.severity)),
            code: diagnostic.code.clone().map(NumberOrString::String),
            code_description: None,
            source: Some(SOURCE.to_string()),
            message: diagnostic.message.clone(),
            related_information,
            tags: None,
            data: None,
        }
    }

    fn convert_severity(&self, severity: Severity) -> DiagnosticSeverity {
        match severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
            Severity::Info => DiagnosticSeverity::INFORMATION,
            Severity::Hint => DiagnosticSeverity::HINT,
        }
    }
}
