use std::collections::HashSet;

use cosmic_core::Location;
use cosmic_registry::{MemberKind, Registry};
use cosmic_semantic::{Member, SemanticAnalyzer, Variable, VariableKind};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::core::document_manager::DocumentManager;

#[derive(Debug, Default)]
pub struct CompletionProvider;

pub struct CompletionContext<'ctx> {
    pub document_manager: &'ctx DocumentManager,
    pub registry: &'ctx Registry,
    pub params: CompletionParams,
}

impl CompletionProvider {
    pub fn new() -> Self {
        Self
    }

    /// Members when the cursor sits on a dotted access, otherwise the variables
    /// visible from the cursor's scope followed by the builtins.
    pub async fn complete(&self, ctx: CompletionContext<'_>) -> Result<Option<CompletionResponse>> {
        let uri = ctx.params.text_document_position.text_document.uri;
        let position = ctx.params.text_document_position.position;
        let files = ctx.document_manager.files().read().await;
        let Some(file_info) = files.get(&uri) else { return Ok(None) };
        let Some(ast) = &file_info.analysis.ast else { return Ok(None) };

        let content = file_info.content.as_str();
        let offset = DocumentManager::position_to_byte_offset(content, position);
        let info = SemanticAnalyzer::new(content, ctx.registry)
            .with_cursor(offset)
            .analyze(ast, Location::new(0, content.len()));

        if info.use_member {
            let items = info.members.iter().map(member_item).collect();
            return Ok(Some(CompletionResponse::Array(items)));
        }

        let mut seen = HashSet::new();
        let mut items = info
            .completions_at(offset)
            .into_iter()
            .filter(|variable| seen.insert(variable.name.clone()))
            .map(variable_item)
            .collect::<Vec<_>>();

        items.extend(
            builtin_items(ctx.registry)
                .into_iter()
                .filter(|item| seen.insert(item.label.clone())),
        );

        Ok(Some(CompletionResponse::Array(items)))
    }

    /// Items are complete when first sent.
    pub async fn resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        Ok(item)
    }
}

fn markdown(value: &str) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: value.to_string(),
    })
}

fn member_item(member: &Member) -> CompletionItem {
    let ty = member.ty.as_deref().unwrap_or("any");
    let (kind, detail) = match member.kind {
        MemberKind::Property => (CompletionItemKind::PROPERTY, ty.to_string()),
        MemberKind::Method => (CompletionItemKind::METHOD, format!("fn() -> {ty}")),
        MemberKind::StaticMethod => (CompletionItemKind::FUNCTION, format!("fn() -> {ty}")),
    };

    CompletionItem {
        label: member.name.clone(),
        kind: Some(kind),
        detail: Some(detail),
        documentation: member.documentation.as_deref().map(markdown),
        ..CompletionItem::default()
    }
}

fn variable_item(variable: &Variable) -> CompletionItem {
    let kind = match variable.kind {
        VariableKind::Local | VariableKind::Parameter | VariableKind::LoopBinding => {
            CompletionItemKind::VARIABLE
        }
        VariableKind::Field => CompletionItemKind::FIELD,
        VariableKind::Function => CompletionItemKind::FUNCTION,
        VariableKind::Struct => CompletionItemKind::STRUCT,
    };

    CompletionItem {
        label: variable.name.clone(),
        kind: Some(kind),
        detail: Some(variable.ty.to_string()),
        ..CompletionItem::default()
    }
}

fn builtin_items(registry: &Registry) -> Vec<CompletionItem> {
    let mut functions = registry
        .functions()
        .map(|function| {
            let params = function
                .params
                .iter()
                .map(|param| param.ty.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let dots = if function.variadic { "..." } else { "" };

            CompletionItem {
                label: function.name.clone(),
                kind: Some(CompletionItemKind::FUNCTION),
                detail: Some(format!("fn({params}{dots}) -> {}", function.returns)),
                documentation: function.documentation.as_deref().map(markdown),
                ..CompletionItem::default()
            }
        })
        .collect::<Vec<_>>();
    functions.sort_by(|a, b| a.label.cmp(&b.label));

    let mut structs = registry
        .structs()
        .map(|definition| CompletionItem {
            label: definition.name.clone(),
            kind: Some(CompletionItemKind::STRUCT),
            detail: Some(format!("struct {}", definition.name)),
            documentation: definition.documentation.as_deref().map(markdown),
            ..CompletionItem::default()
        })
        .collect::<Vec<_>>();
    structs.sort_by(|a, b| a.label.cmp(&b.label));

    functions.extend(structs);
    functions
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn complete(content: &str, position: Position) -> Vec<CompletionItem> {
        let registry = Registry::bundled().unwrap();
        let uri = Url::parse("file:///main.cosmic").unwrap();
        let manager = DocumentManager::new();
        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem::new(uri.clone(), "cosmic".into(), 1, content.into()),
        };
        manager.did_open(params, &registry, true).await;

        let params = CompletionParams {
            text_document_position: TextDocumentPositionParams::new(
                TextDocumentIdentifier::new(uri),
                position,
            ),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        };
        let ctx = CompletionContext {
            document_manager: &manager,
            registry: &registry,
            params,
        };

        match CompletionProvider::new().complete(ctx).await.unwrap() {
            Some(CompletionResponse::Array(items)) => items,
            other => panic!("unexpected response: {other:?}"),
        }
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[tokio::test]
    async fn test_members_after_a_dot() {
        let content = "let v = Vec2.zero();\nv.";
        let items = complete(content, Position::new(1, 2)).await;

        assert_eq!(
            labels(&items),
            ["x", "y", "length", "normalized", "dot", "zero"]
        );
        assert_eq!(items[0].kind, Some(CompletionItemKind::PROPERTY));
        assert_eq!(items[0].detail.as_deref(), Some("float"));
        assert_eq!(items[2].kind, Some(CompletionItemKind::METHOD));
        assert_eq!(items[5].kind, Some(CompletionItemKind::FUNCTION));
    }

    #[tokio::test]
    async fn test_variables_then_builtins() {
        let content = "let a = 1;\nfn f(p: int) {\n  let b = p;\n  print(b);\n}\n";
        let items = complete(content, Position::new(0, 0)).await;
        let labels = labels(&items);

        // functions are declared ahead of the statements around them
        assert_eq!(&labels[..4], ["f", "a", "p", "b"]);
        assert_eq!(items[0].kind, Some(CompletionItemKind::FUNCTION));
        assert_eq!(items[1].kind, Some(CompletionItemKind::VARIABLE));
        assert_eq!(items[1].detail.as_deref(), Some("int"));

        let print = items.iter().find(|item| item.label == "print").unwrap();
        assert_eq!(print.detail.as_deref(), Some("fn(any...) -> void"));
        assert!(labels.contains(&"Vec2"));
    }

    #[tokio::test]
    async fn test_duplicate_names_are_offered_once() {
        let content = "let a = 1;\nif a > 0 { let a = 'x'; print(a); }\nlet len = 2;";
        let items = complete(content, Position::new(0, 0)).await;
        let labels = labels(&items);

        assert_eq!(labels.iter().filter(|label| **label == "a").count(), 1);
        assert_eq!(labels.iter().filter(|label| **label == "len").count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_returns_the_item() {
        let item = CompletionItem::new_simple("x".into(), "int".into());
        let resolved = CompletionProvider::new().resolve(item.clone()).await.unwrap();
        assert_eq!(resolved, item);
    }
}
