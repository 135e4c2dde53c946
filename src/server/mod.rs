pub mod capabilities;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cosmic_config::{ClientSettings, Config};
use cosmic_registry::Registry;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use crate::core::document_manager::DocumentManager;
use crate::features::completion::{CompletionContext, CompletionProvider};
use crate::features::diagnostics::DiagnosticProvider;
use crate::features::hover::{HoverContext, HoverProvider};
use crate::logging;

#[derive(Debug)]
pub struct Backend {
    client: Client,
    registry: Arc<Registry>,
    config: RwLock<Config>,
    related_information: AtomicBool,
    document_manager: DocumentManager,
    diagnostic_provider: DiagnosticProvider,
    hover_provider: HoverProvider,
    completion_provider: CompletionProvider,
}

impl Backend {
    fn new(client: Client, registry: Arc<Registry>) -> Self {
        Self {
            client,
            registry,
            config: RwLock::new(Config::default()),
            related_information: AtomicBool::new(false),
            document_manager: DocumentManager::new(),
            diagnostic_provider: DiagnosticProvider::new(),
            hover_provider: HoverProvider::new(),
            completion_provider: CompletionProvider::new(),
        }
    }

    async fn publish_diagnostics(&self, uri: Url) {
        let max_problems = self.config.read().await.max_number_of_problems;
        let related_information = self.related_information.load(Ordering::Relaxed);

        let diagnostics = self
            .diagnostic_provider
            .get_diagnostics(&self.document_manager, &uri, max_problems, related_information)
            .await;

        tracing::debug!(%uri, count = diagnostics.len(), "publishing diagnostics");
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    async fn recover_from_errors(&self) -> bool {
        self.config.read().await.recover_from_errors
    }
}

/// The first workspace folder, falling back to the deprecated root uri.
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    let folder = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri);

    #[allow(deprecated)]
    let uri = folder.or(params.root_uri.as_ref())?;

    uri.to_file_path().ok()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = workspace_root(&params);
        let config = cosmic_config::load_config(root.as_ref());
        tracing::info!(root = ?root, ?config, "initializing");

        *self.config.write().await = config;
        self.related_information.store(
            capabilities::supports_related_information(&params.capabilities),
            Ordering::Relaxed,
        );

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: capabilities::server_capabilities(),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("client initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let recover = self.recover_from_errors().await;
        self.document_manager
            .did_open(params, &self.registry, recover)
            .await;
        self.publish_diagnostics(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let recover = self.recover_from_errors().await;
        self.document_manager
            .did_change(params, &self.registry, recover)
            .await;
        self.publish_diagnostics(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        self.document_manager.did_close(params).await;
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = match serde_json::from_value::<ClientSettings>(params.settings) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(%error, "ignoring malformed settings");
                return;
            }
        };

        let recover = {
            let mut config = self.config.write().await;
            config.apply(settings);
            tracing::info!(config = ?*config, "configuration changed");
            config.recover_from_errors
        };

        let uris = self
            .document_manager
            .reanalyze_all(&self.registry, recover)
            .await;
        for uri in uris {
            self.publish_diagnostics(uri).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.completion_provider
            .complete(CompletionContext {
                document_manager: &self.document_manager,
                registry: &self.registry,
                params,
            })
            .await
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        self.completion_provider.resolve(item).await
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        self.hover_provider
            .hover(HoverContext {
                document_manager: &self.document_manager,
                params,
            })
            .await
    }
}

pub async fn start() -> crate::error::Result<()> {
    // without a log file the server still runs, it just stays quiet
    let _guard = logging::init_tracing().ok();
    let registry = Arc::new(Registry::bundled()?);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend::new(client, registry));
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
