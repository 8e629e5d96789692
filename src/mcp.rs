use anyhow::Result;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::config::Settings;
use crate::pdf::render::{PdfiumRenderer, DEFAULT_PREVIEW_DPI};
use crate::session::Session;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OpenSessionRequest {
    #[schemars(description = "Path to the PDF file to split")]
    pub path: String,
    #[schemars(description = "Existing folder that receives one subfolder per document type")]
    pub output_dir: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GotoPageRequest {
    #[schemars(description = "Page number (1-based); out-of-range values go to the first or last page")]
    pub page: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPageRequest {
    #[schemars(description = "File name for the current page, without .pdf (empty string clears it)")]
    #[serde(default)]
    pub file_name: Option<String>,
    #[schemars(description = "Document type for the current page; must be one of list_categories (empty string clears it)")]
    #[serde(default)]
    pub doc_type: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewRequest {
    #[schemars(description = "Where to write the PNG image")]
    pub output: String,
    #[schemars(description = "Resolution in dots per inch (default: 96)")]
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_dpi() -> u32 {
    DEFAULT_PREVIEW_DPI
}

// Result types for MCP tools

#[derive(Debug, Serialize)]
pub struct PageResult {
    pub page: usize,
    pub total_pages: usize,
    pub file_name: Option<String>,
    pub doc_type: Option<String>,
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct PreviewResult {
    pub output: String,
    pub page: usize,
    pub placeholder: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryResult {
    pub label: String,
    pub folder: String,
}

#[derive(Debug, Serialize)]
pub struct SavedResult {
    pub page: usize,
    pub path: String,
}

#[derive(Clone)]
pub struct PageSortServer {
    settings: Settings,
    session: Arc<Mutex<Option<Session>>>,
    tool_router: ToolRouter<Self>,
}

impl PageSortServer {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: Arc::new(Mutex::new(None)),
            tool_router: Self::tool_router(),
        }
    }

    /// Run `f` against the open session and serialize what it returns.
    fn with_session<T, F>(&self, f: F) -> String
    where
        T: Serialize,
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut guard = match self.session.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(session) = guard.as_mut() else {
            return "Error: No open session. Call open_session first.".to_string();
        };
        match f(session) {
            Ok(value) => to_json(&value),
            Err(e) => format!("Error: {:#}", e),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

fn page_result(session: &Session) -> PageResult {
    let config = session.current();
    PageResult {
        page: session.current_index() + 1,
        total_pages: session.total_pages(),
        file_name: config.file_name.clone(),
        doc_type: config.doc_type.clone(),
        configured: session.is_current_configured(),
    }
}

#[tool_router]
impl PageSortServer {
    #[tool(description = "Open a PDF and an output folder, starting a new session. Every page starts without a file name or document type.")]
    fn open_session(&self, Parameters(req): Parameters<OpenSessionRequest>) -> String {
        let session = match Session::open(
            &req.path,
            &req.output_dir,
            self.settings.clone(),
            Box::new(PdfiumRenderer),
        ) {
            Ok(s) => s,
            Err(e) => return format!("Error: {:#}", anyhow::Error::from(e)),
        };
        let result = page_result(&session);
        match self.session.lock() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
        to_json(&result)
    }

    #[tool(description = "List the document types a page can be assigned and the folder each one exports to")]
    fn list_categories(&self) -> String {
        let result: Vec<CategoryResult> = self
            .settings
            .categories
            .iter()
            .map(|(label, folder)| CategoryResult {
                label: label.to_string(),
                folder: folder.to_string(),
            })
            .collect();
        to_json(&result)
    }

    #[tool(description = "Show the current page number and its file name and document type")]
    fn show_page(&self) -> String {
        self.with_session(|s| Ok(page_result(s)))
    }

    #[tool(description = "Move to the next page (stays on the last page)")]
    fn next_page(&self) -> String {
        self.with_session(|s| {
            s.next();
            Ok(page_result(s))
        })
    }

    #[tool(description = "Move to the previous page (stays on the first page)")]
    fn previous_page(&self) -> String {
        self.with_session(|s| {
            s.previous();
            Ok(page_result(s))
        })
    }

    #[tool(description = "Jump to a page by its 1-based number")]
    fn goto_page(&self, Parameters(req): Parameters<GotoPageRequest>) -> String {
        self.with_session(|s| {
            s.jump_to_page(req.page);
            Ok(page_result(s))
        })
    }

    #[tool(description = "Set the file name and/or document type of the current page")]
    fn set_page(&self, Parameters(req): Parameters<SetPageRequest>) -> String {
        self.with_session(|s| {
            if let Some(doc_type) = req.doc_type.as_deref() {
                let doc_type = doc_type.trim();
                if !doc_type.is_empty() && !s.categories().contains(doc_type) {
                    anyhow::bail!(
                        "Unknown document type '{}'. Use list_categories for valid types.",
                        doc_type
                    );
                }
            }
            s.edit(req.file_name.as_deref(), req.doc_type.as_deref());
            Ok(page_result(s))
        })
    }

    #[tool(description = "Extract the text of the current page")]
    fn page_text(&self) -> String {
        self.with_session(|s| s.page_text())
    }

    #[tool(description = "Render the current page to a PNG file. A blank placeholder is written if rendering fails.")]
    fn preview_page(&self, Parameters(req): Parameters<PreviewRequest>) -> String {
        self.with_session(|s| {
            let preview = s.preview(req.dpi)?;
            std::fs::write(&req.output, &preview.png)?;
            Ok(PreviewResult {
                output: req.output.clone(),
                page: preview.page + 1,
                placeholder: preview.placeholder,
            })
        })
    }

    #[tool(description = "Export the current page as a single-page PDF into its document type's folder")]
    fn save_page(&self) -> String {
        self.with_session(|s| {
            let path = s.save_current()?;
            Ok(SavedResult {
                page: s.current_index() + 1,
                path: path.display().to_string(),
            })
        })
    }

    #[tool(description = "Export every page. Fails without writing anything if any page lacks a file name or document type.")]
    async fn save_all(&self) -> String {
        let task = {
            let guard = match self.session.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.as_ref() {
                Some(session) => session.spawn_save_all(),
                None => return "Error: No open session. Call open_session first.".to_string(),
            }
        };

        match task.finish().await {
            Ok(report) => to_json(&report),
            Err(e) => format!("Error: {:#}", anyhow::Error::from(e)),
        }
    }

    #[tool(description = "Clear the file name and document type of every page and return to page 1")]
    fn clear_all(&self) -> String {
        self.with_session(|s| {
            s.clear_all();
            Ok(page_result(s))
        })
    }
}

#[tool_handler]
impl ServerHandler for PageSortServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Split a PDF into single-page files sorted by document type. Call open_session, \
                 then for each page use show_page/page_text/preview_page to inspect it, set_page \
                 to give it a file name and document type, and next_page/previous_page/goto_page \
                 to move. save_page exports the current page; save_all exports every page."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(settings: Settings) -> Result<()> {
    let server = PageSortServer::new(settings);

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryMap, ExportPolicy};
    use crate::test_support::write_fixture;

    fn server() -> PageSortServer {
        PageSortServer::new(Settings {
            categories: CategoryMap::new([("ID", "ID'S")]).unwrap(),
            policy: ExportPolicy::FailFast,
            create_missing_dirs: true,
        })
    }

    fn open(server: &PageSortServer, dir: &std::path::Path, pages: usize) -> String {
        let path = write_fixture(dir, pages);
        server.open_session(Parameters(OpenSessionRequest {
            path: path.display().to_string(),
            output_dir: dir.display().to_string(),
        }))
    }

    #[test]
    fn test_tools_require_session() {
        let s = server();
        assert!(s.show_page().starts_with("Error: No open session"));
        assert!(s.list_categories().contains("ID'S"));
    }

    #[test]
    fn test_navigate_and_edit() {
        let dir = tempfile::tempdir().unwrap();
        let s = server();
        assert!(open(&s, dir.path(), 3).contains("\"total_pages\": 3"));

        assert!(s.next_page().contains("\"page\": 2"));
        assert!(s
            .goto_page(Parameters(GotoPageRequest { page: 50 }))
            .contains("\"page\": 3"));

        let rejected = s.set_page(Parameters(SetPageRequest {
            file_name: Some("x".into()),
            doc_type: Some("Bills".into()),
        }));
        assert!(rejected.starts_with("Error: Unknown document type"));

        let accepted = s.set_page(Parameters(SetPageRequest {
            file_name: Some("x".into()),
            doc_type: Some("ID".into()),
        }));
        assert!(accepted.contains("\"configured\": true"));

        assert!(s.clear_all().contains("\"page\": 1"));
    }

    #[tokio::test]
    async fn test_save_all_validation_and_success() {
        let dir = tempfile::tempdir().unwrap();
        let s = server();
        open(&s, dir.path(), 2);

        assert!(s.save_all().await.starts_with("Error: Pages not ready"));

        for name in ["first", "second"] {
            s.set_page(Parameters(SetPageRequest {
                file_name: Some(name.into()),
                doc_type: Some("ID".into()),
            }));
            s.next_page();
        }
        let report = s.save_all().await;
        assert!(report.contains("second.pdf"));
        assert!(dir.path().join("ID'S").join("first.pdf").exists());
    }
}
