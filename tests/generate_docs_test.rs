//! End-to-end tests for the `generate` pipeline: git → ChangeSet → document.

mod common;

use std::sync::Mutex;

use async_trait::async_trait;
use common::{TestRepo, diff_fixture, read_fixture, response_fixture, temp_test_dir};
use doctr::config::{Config, IgnoreMatcher, OutputFormat};
use doctr::diff::collect_diff_text;
use doctr::docs::{DraftOptions, GenerateOptions, GenerateOutcome, generate_change_docs};
use doctr::error::LlmError;
use doctr::llm::{
    CompletionClient, CompletionRequest, Enhancement, HttpCompletionClient, ImpactLevel, Provider,
    ProviderSelection, UnavailableReason,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client that records prompts and answers with a canned reply.
struct FakeClient {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl FakeClient {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for FakeClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(self.reply.clone())
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> String {
        "fake-model".to_string()
    }
}

/// Repository whose last commit adds `foo.py`.
fn repo_adding_foo() -> TestRepo {
    let repo = TestRepo::new();
    repo.write_file("README.md", "# Demo\n");
    repo.commit_all("initial");
    repo.write_file("foo.py", "def foo():\n    return 1\n");
    repo.commit_all("add foo");
    repo
}

fn options(output_dir: &std::path::Path) -> GenerateOptions {
    GenerateOptions {
        diff_target: "HEAD~1".to_string(),
        output_dir: output_dir.to_path_buf(),
        format: OutputFormat::Markdown,
        draft: DraftOptions::default(),
        dry_run: false,
    }
}

#[tokio::test]
async fn test_structure_only_document_from_repository() {
    let repo = repo_adding_foo();
    let out = temp_test_dir();
    let diff = collect_diff_text(&repo.repo, "HEAD~1").unwrap();

    let outcome = generate_change_docs(
        &diff,
        &IgnoreMatcher::empty(),
        &options(out.path()),
        Err(UnavailableReason::MissingCredentials),
    )
    .await
    .unwrap();

    let GenerateOutcome::Written { path, files, .. } = outcome else {
        panic!("expected a written document");
    };
    assert_eq!(files, 1);
    assert_eq!(path, out.path().join("changes-head-1.md"));

    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.starts_with("# Changes to foo.py\n"));
    assert!(text.contains("### `foo.py` (added)"));
    assert!(text.contains("no API key found"));
    assert!(text.contains("diff_target: HEAD~1\n"));
}

#[tokio::test]
async fn test_enhanced_document_via_anthropic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(read_fixture(response_fixture("anthropic_ok.json"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let selection = ProviderSelection::new(Provider::Anthropic, "claude-3-5-haiku-20241022", "key");
    let client = HttpCompletionClient::with_base_url(selection, server.uri()).unwrap();

    let repo = repo_adding_foo();
    let out = temp_test_dir();
    let diff = collect_diff_text(&repo.repo, "HEAD~1").unwrap();

    let outcome = generate_change_docs(
        &diff,
        &IgnoreMatcher::empty(),
        &options(out.path()),
        Ok(&client as &dyn CompletionClient),
    )
    .await
    .unwrap();

    let GenerateOutcome::Written {
        path, enhancement, ..
    } = outcome
    else {
        panic!("expected a written document");
    };
    let Enhancement::Generated(content) = enhancement else {
        panic!("expected generated content");
    };
    assert_eq!(content.analysis.impact_level, ImpactLevel::Minor);

    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("## Overview\n\nAdds `foo()`, which returns 1."));
    assert!(text.contains("enhanced: true\n"));
    assert!(text.contains("impact_level: minor\n"));
    assert!(text.contains("provider: Anthropic\n"));
}

#[tokio::test]
async fn test_provider_error_still_writes_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let selection = ProviderSelection::new(Provider::OpenAi, "gpt-4o-mini", "key");
    let client = HttpCompletionClient::with_base_url(selection, server.uri()).unwrap();
    let out = temp_test_dir();

    let outcome = generate_change_docs(
        &read_fixture(diff_fixture("add_foo.diff")),
        &IgnoreMatcher::empty(),
        &options(out.path()),
        Ok(&client as &dyn CompletionClient),
    )
    .await
    .unwrap();

    let GenerateOutcome::Written {
        path, enhancement, ..
    } = outcome
    else {
        panic!("expected a written document");
    };
    assert!(matches!(
        enhancement,
        Enhancement::Unavailable(UnavailableReason::ProviderFailed(_))
    ));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("### `foo.py` (added)"));
    assert!(text.contains("enhanced: false\n"));
}

#[tokio::test]
async fn test_prompt_carries_file_changes() {
    let reply = r#"{"summary": "Adds foo", "impact_level": "minor", "document": "Body"}"#;
    let client = FakeClient::new(reply);
    let out = temp_test_dir();
    let mut opts = options(out.path());
    opts.dry_run = true;

    let outcome = generate_change_docs(
        &read_fixture(diff_fixture("add_foo.diff")),
        &IgnoreMatcher::empty(),
        &opts,
        Ok(&client as &dyn CompletionClient),
    )
    .await
    .unwrap();

    let prompts = client.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("## Change 1: foo.py"));
    assert!(prompts[0].contains("def foo():"));

    let GenerateOutcome::DryRun { content, .. } = outcome else {
        panic!("expected a dry run");
    };
    assert!(content.contains("Body"));
    assert!(content.contains("model: fake-model\n"));
    assert!(!out.path().join("changes-head-1.md").exists());
}

#[tokio::test]
async fn test_rename_only_document() {
    let out = temp_test_dir();
    let mut opts = options(out.path());
    opts.format = OutputFormat::Mdx;

    let outcome = generate_change_docs(
        &read_fixture(diff_fixture("rename_only.diff")),
        &IgnoreMatcher::empty(),
        &opts,
        Err(UnavailableReason::Disabled),
    )
    .await
    .unwrap();

    let GenerateOutcome::Written { path, .. } = outcome else {
        panic!("expected a written document");
    };
    assert_eq!(path.extension().unwrap(), "mdx");
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("### `src/old_name.rs` → `src/new_name.rs` (renamed)"));
    assert!(text.starts_with("---\n"));
}

#[tokio::test]
async fn test_default_ignore_patterns_drop_log_files() {
    let diff = "diff --git a/debug.log b/debug.log
new file mode 100644
--- /dev/null
+++ b/debug.log
@@ -0,0 +1 @@
+started
";
    let ignore = Config::default().ignore_matcher().unwrap();
    let out = temp_test_dir();

    let outcome = generate_change_docs(
        diff,
        &ignore,
        &options(out.path()),
        Err(UnavailableReason::Disabled),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, GenerateOutcome::NoChanges));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
