//! Wiki generation: optional per-page enhancement and writing.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::docs::write_document;
use crate::error::WikiError;
use crate::llm::prompt::{MAX_REPLY_TOKENS, WIKI_SYSTEM_PROMPT};
use crate::llm::{
    CompletionClient, CompletionRequest, UnavailableReason, build_wiki_prompt, strip_outer_fence,
};

use super::pages::{WikiPage, build_pages, sidebar};
use super::scanner::ProjectStructure;

/// Subdirectory of the output directory holding the wiki.
pub const WIKI_DIR: &str = "wiki";

pub const SIDEBAR_FILE: &str = "_Sidebar.md";

/// Pages produced by [`generate_wiki`] and how many came from the model.
#[derive(Debug)]
pub struct WikiReport {
    pub pages: Vec<WikiPage>,
    pub enhanced: usize,
    /// Why some or all pages are structure-only, if any are.
    pub unavailable: Option<UnavailableReason>,
}

/// Build every page, asking the model once per page when a client is given.
///
/// After the first provider failure the remaining pages keep their
/// structure-only rendering; the failure is reported, never raised.
pub async fn generate_wiki(
    structure: &ProjectStructure,
    client: Result<&dyn CompletionClient, UnavailableReason>,
) -> WikiReport {
    let mut pages = build_pages(structure);

    let client = match client {
        Ok(client) => client,
        Err(reason) => {
            debug!("Wiki is structure-only: {}", reason);
            return WikiReport {
                pages,
                enhanced: 0,
                unavailable: Some(reason),
            };
        }
    };

    let mut enhanced = 0;
    for page in pages.iter_mut() {
        let request = CompletionRequest {
            system: WIKI_SYSTEM_PROMPT.to_string(),
            prompt: build_wiki_prompt(page, structure),
            max_tokens: MAX_REPLY_TOKENS,
        };

        match client.complete(&request).await {
            Ok(reply) => {
                page.content = with_heading(strip_outer_fence(&reply), &page.title);
                enhanced += 1;
                debug!("Enhanced wiki page {}", page.name);
            }
            Err(e) => {
                warn!("AI enhancement failed on wiki page {}: {}", page.name, e);
                return WikiReport {
                    pages,
                    enhanced,
                    unavailable: Some(UnavailableReason::ProviderFailed(e.to_string())),
                };
            }
        }
    }

    WikiReport {
        pages,
        enhanced,
        unavailable: None,
    }
}

/// Make sure the page opens with a level-one heading.
fn with_heading(body: &str, title: &str) -> String {
    let body = body.trim();
    if body.starts_with("# ") {
        format!("{}\n", body)
    } else {
        format!("# {}\n\n{}\n", title, body)
    }
}

/// Write `pages` and `_Sidebar.md` under `<output_dir>/wiki/`.
pub fn write_wiki(pages: &[WikiPage], output_dir: &Path) -> Result<Vec<PathBuf>, WikiError> {
    let dir = output_dir.join(WIKI_DIR);
    let mut written = Vec::with_capacity(pages.len() + 1);

    for page in pages {
        let content = if page.content.ends_with('\n') {
            page.content.clone()
        } else {
            format!("{}\n", page.content)
        };
        written.push(write_document(&dir, &page.file_name(), &content)?);
    }
    written.push(write_document(&dir, SIDEBAR_FILE, &sidebar(pages))?);

    info!("Wrote {} wiki page(s) to {}", pages.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnoreMatcher;
    use crate::error::LlmError;
    use crate::llm::Provider;
    use crate::llm::client::MockCompletionClient;
    use crate::wiki::scan_project;
    use tempfile::TempDir;

    fn sample_structure(dir: &TempDir) -> ProjectStructure {
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn api() {}\n").unwrap();
        scan_project(dir.path(), &IgnoreMatcher::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_without_client_pages_are_structure_only() {
        let dir = TempDir::new().unwrap();
        let structure = sample_structure(&dir);

        let report = generate_wiki(&structure, Err(UnavailableReason::Disabled)).await;

        assert_eq!(report.enhanced, 0);
        assert!(matches!(report.unavailable, Some(UnavailableReason::Disabled)));
        assert_eq!(report.pages, build_pages(&structure));
    }

    #[tokio::test]
    async fn test_every_page_enhanced() {
        let dir = TempDir::new().unwrap();
        let structure = sample_structure(&dir);
        let total = build_pages(&structure).len();

        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(total)
            .returning(|_| Ok("```markdown\nGenerated body\n```".to_string()));

        let report = generate_wiki(&structure, Ok(&mock as &dyn CompletionClient)).await;

        assert_eq!(report.enhanced, total);
        assert!(report.unavailable.is_none());
        assert_eq!(report.pages[1].content, "# Installation\n\nGenerated body\n");
    }

    #[tokio::test]
    async fn test_first_failure_stops_requests() {
        let dir = TempDir::new().unwrap();
        let structure = sample_structure(&dir);
        let baseline = build_pages(&structure);

        let mut mock = MockCompletionClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("# demo\n\nWelcome.".to_string()));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(LlmError::RateLimited {
                    provider: Provider::OpenAi,
                    retry_after: None,
                })
            });

        let report = generate_wiki(&structure, Ok(&mock as &dyn CompletionClient)).await;

        assert_eq!(report.enhanced, 1);
        assert!(matches!(
            report.unavailable,
            Some(UnavailableReason::ProviderFailed(_))
        ));
        assert_eq!(report.pages[0].content, "# demo\n\nWelcome.\n");
        assert_eq!(report.pages[1..], baseline[1..]);
    }

    #[test]
    fn test_write_wiki_creates_pages_and_sidebar() {
        let dir = TempDir::new().unwrap();
        let pages = vec![WikiPage {
            name: "Home".to_string(),
            title: "demo".to_string(),
            content: "# demo".to_string(),
        }];

        let written = write_wiki(&pages, &dir.path().join("docs")).unwrap();

        assert_eq!(written.len(), 2);
        let wiki = dir.path().join("docs/wiki");
        assert_eq!(std::fs::read_to_string(wiki.join("Home.md")).unwrap(), "# demo\n");
        assert!(
            std::fs::read_to_string(wiki.join("_Sidebar.md"))
                .unwrap()
                .contains("- [demo](Home.md)")
        );
    }
}
