pub mod document_manager;
