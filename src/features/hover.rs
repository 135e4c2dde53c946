use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::core::document_manager::DocumentManager;

#[derive(Debug, Default)]
pub struct HoverProvider;

pub struct HoverContext<'ctx> {
    pub document_manager: &'ctx DocumentManager,
    pub params: HoverParams,
}

impl HoverProvider {
    pub fn new() -> Self {
        Self
    }

    pub async fn hover(&self, ctx: HoverContext<'_>) -> Result<Option<Hover>> {
        let uri = ctx.params.text_document_position_params.text_document.uri;
        let position = ctx.params.text_document_position_params.position;
        let files = ctx.document_manager.files().read().await;
        let Some(file_info) = files.get(&uri) else { return Ok(None) };
        let Some(semantic_info) = &file_info.analysis.semantic_info else { return Ok(None) };

        let byte_offset = DocumentManager::position_to_byte_offset(&file_info.content, position);
        let Some(hoverable) = semantic_info.hover_at(byte_offset) else { return Ok(None) };

        let contents = HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: hoverable.message.clone(),
        });
        let range = DocumentManager::location_to_range(&file_info.content, hoverable.location);

        Ok(Some(Hover {
            contents,
            range: Some(range),
        }))
    }
}
