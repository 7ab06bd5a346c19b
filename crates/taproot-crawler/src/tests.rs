//! Unit tests for the crawl engine

use crate::*;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use taproot_core::{BranchError, CrawlError, ModuleId, assemble};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn module(path: &Path) -> ModuleId {
    ModuleId::new(fs::canonicalize(path).unwrap())
}

fn entry(path: &Path) -> EntryFile {
    let canonical = fs::canonicalize(path).unwrap();
    let contents = fs::read(&canonical).unwrap();
    EntryFile::new(canonical, contents)
}

/// Counts extraction passes to pin down the at-most-once guarantee.
struct CountingExtractor {
    inner: RequireExtractor,
    calls: Arc<AtomicUsize>,
}

impl CountingExtractor {
    fn new() -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = Arc::new(CountingExtractor {
            inner: RequireExtractor::new(),
            calls: Arc::clone(&calls),
        });
        (extractor, calls)
    }
}

#[async_trait]
impl IdentifierExtractor for CountingExtractor {
    async fn extract(&self, text: &str) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.extract(text).await
    }
}

/// Refuses to load any path with the given file name.
struct FailingSource {
    deny: String,
}

#[async_trait]
impl ContentSource for FailingSource {
    async fn load(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        if path.file_name().is_some_and(|name| name == self.deny.as_str()) {
            anyhow::bail!("simulated read failure for {}", path.display());
        }
        FsContentSource.load(path).await
    }
}

/// Fails on modules whose path ends with the given suffix.
struct FailOnSuffix {
    suffix: String,
}

impl TransformStage for FailOnSuffix {
    fn name(&self) -> &str {
        "fail-on-suffix"
    }

    fn apply(&self, text: &str, module: &ModuleId) -> Result<String, StageError> {
        if module.to_string().ends_with(&self.suffix) {
            return Err(StageError::new("refused"));
        }
        Ok(text.to_string())
    }
}

/// Parses the text as an integer and adds a constant.
struct AddStage {
    amount: i64,
}

impl TransformStage for AddStage {
    fn name(&self) -> &str {
        "add"
    }

    fn apply(&self, text: &str, _module: &ModuleId) -> Result<String, StageError> {
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|err| StageError::new(format!("not a number: {err}")))?;
        Ok((value + self.amount).to_string())
    }
}

fn crawler() -> Crawler {
    Crawler::new(CrawlOptions::default()).unwrap()
}

// ── Pipeline ────────────────────────────────────────────

#[test]
fn test_empty_pipeline_is_a_byte_for_byte_no_op() {
    let pipeline = TransformPipeline::build(false, &[]).unwrap();
    let source = "import a from './a';\nconst weird = '\u{7f}\t';\n";

    let out = pipeline.run(source, &ModuleId::new("/x.js")).unwrap();
    assert_eq!(out, source);
    assert!(pipeline.is_empty());
}

#[test]
fn test_stages_apply_in_registration_order() {
    let pipeline = TransformPipeline::build(
        false,
        &[
            StageRef::Inline(Arc::new(AddStage { amount: 2 })),
            StageRef::Inline(Arc::new(AddStage { amount: 5 })),
        ],
    )
    .unwrap();

    let out = pipeline.run("1", &ModuleId::new("/x.js")).unwrap();
    assert_eq!(out, "8");
}

#[test]
fn test_module_syntax_is_stage_zero_when_enabled() {
    let pipeline = TransformPipeline::build(true, &[]).unwrap();
    assert_eq!(pipeline.stage_names(), vec!["module-syntax"]);

    let out = pipeline
        .run("import a from './a';", &ModuleId::new("/x.js"))
        .unwrap();
    assert!(out.contains("require"));
    assert!(!out.contains("import"));
}

#[test]
fn test_unknown_named_stage_is_a_configuration_error() {
    let err = TransformPipeline::build(false, &[StageRef::Named("no-such-stage".to_string())])
        .unwrap_err();
    assert!(matches!(err, CrawlError::Configuration(_)));
}

#[test]
fn test_named_builtin_stage_resolves() {
    let pipeline =
        TransformPipeline::build(false, &[StageRef::Named("strip-comments".to_string())]).unwrap();
    assert_eq!(pipeline.stage_names(), vec!["strip-comments"]);
}

#[test]
fn test_failing_stage_carries_its_identity() {
    let pipeline = TransformPipeline::build(
        false,
        &[StageRef::Inline(Arc::new(AddStage { amount: 1 }))],
    )
    .unwrap();

    let err = pipeline
        .run("not a number", &ModuleId::new("/x.js"))
        .unwrap_err();
    match err {
        BranchError::Transform { stage, .. } => assert_eq!(stage, "add"),
        other => panic!("expected transform error, got {other:?}"),
    }
}

// ── Options ─────────────────────────────────────────────

#[test]
fn test_empty_extension_list_is_rejected() {
    let options = CrawlOptions {
        resolver: ResolverOptions {
            extensions: Vec::new(),
            ..ResolverOptions::default()
        },
        ..CrawlOptions::default()
    };

    assert!(matches!(
        Crawler::new(options),
        Err(CrawlError::Configuration(_))
    ));
}

// ── Crawl ───────────────────────────────────────────────

#[tokio::test]
async fn test_crawls_transitive_chain() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "const b = require('./b');");
    let b = write(dir.path(), "b.js", "const c = require('./c');");
    let c = write(dir.path(), "c.js", "module.exports = 1;");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.roots, vec![module(&a)]);
    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
    assert_eq!(report.cache.get(&module(&b)), vec![module(&c)]);
    assert!(report.cache.get(&module(&c)).is_empty());
}

#[tokio::test]
async fn test_shared_dependency_is_extracted_once() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./c');");
    let d = write(dir.path(), "d.js", "require('./c');");
    let c = write(dir.path(), "c.js", "module.exports = 1;");

    let (extractor, calls) = CountingExtractor::new();
    let crawler = crawler().with_extractor(extractor);
    let mut edges = crawler.subscribe_edges();

    let report = crawler.crawl(vec![entry(&a), entry(&d)]).await.unwrap();

    // a, d, and c each processed exactly once.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Both referrers still name c in their own records.
    assert_eq!(report.cache.get(&module(&a)), vec![module(&c)]);
    assert_eq!(report.cache.get(&module(&d)), vec![module(&c)]);
    assert_eq!(report.roots, vec![module(&a), module(&d)]);

    let mut subjects = Vec::new();
    while let Ok(record) = edges.try_recv() {
        subjects.push(record.subject);
    }
    assert_eq!(subjects.len(), 3);
    subjects.sort();
    subjects.dedup();
    assert_eq!(subjects.len(), 3);
}

#[tokio::test]
async fn test_entry_reached_as_dependency_remains_a_root() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');");
    let b = write(dir.path(), "b.js", "module.exports = 1;");

    let report = crawler().crawl(vec![entry(&a), entry(&b)]).await.unwrap();

    assert_eq!(report.roots, vec![module(&a), module(&b)]);
    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
}

#[tokio::test]
async fn test_dependency_order_follows_source_order() {
    let dir = TempDir::new().unwrap();
    let a = write(
        dir.path(),
        "a.js",
        "require('./z');\nrequire('./m');\nrequire('./b');",
    );
    write(dir.path(), "z.js", "");
    write(dir.path(), "m.js", "");
    write(dir.path(), "b.js", "");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();

    assert_eq!(
        report.cache.get(&module(&a)),
        vec![
            module(&dir.path().join("z.js")),
            module(&dir.path().join("m.js")),
            module(&dir.path().join("b.js")),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_specifiers_collapse() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');\nrequire('./b');");
    let b = write(dir.path(), "b.js", "");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();
    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
}

#[tokio::test]
async fn test_resolution_failure_drops_only_the_specifier() {
    let dir = TempDir::new().unwrap();
    let a = write(
        dir.path(),
        "a.js",
        "require('./missing');\nrequire('./b');",
    );
    let b = write(dir.path(), "b.js", "");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();

    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
    // Quiet by default.
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_strict_resolution_surfaces_dropped_specifiers() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./missing');");

    let options = CrawlOptions {
        strict_resolution: true,
        ..CrawlOptions::default()
    };
    let report = Crawler::new(options)
        .unwrap()
        .crawl(vec![entry(&a)])
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        BranchError::Resolution { .. }
    ));
    // The subject's own branch was not abandoned.
    assert!(report.cache.contains(&module(&a)));
}

#[tokio::test]
async fn test_vendored_dependencies_are_excluded() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('pkg');\nrequire('./b');");
    let b = write(dir.path(), "b.js", "");
    let vendored = write(dir.path(), "node_modules/pkg/index.js", "require('./other');");
    write(dir.path(), "node_modules/pkg/other.js", "");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();

    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
    // The vendored module was never crawled through that edge.
    assert!(!report.cache.contains(&module(&vendored)));
}

#[tokio::test]
async fn test_vendored_dependencies_can_be_kept() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('pkg');");
    let vendored = write(dir.path(), "node_modules/pkg/index.js", "");

    let options = CrawlOptions {
        ignore_vendored: false,
        ..CrawlOptions::default()
    };
    let report = Crawler::new(options)
        .unwrap()
        .crawl(vec![entry(&a)])
        .await
        .unwrap();

    assert_eq!(report.cache.get(&module(&a)), vec![module(&vendored)]);
    assert!(report.cache.contains(&module(&vendored)));
}

#[tokio::test]
async fn test_pre_filter_excludes_raw_specifiers() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');\nrequire('./c');");
    let b = write(dir.path(), "b.js", "");
    write(dir.path(), "c.js", "");

    let options = CrawlOptions {
        pre_filter: Some(Arc::new(|specifier: &str| specifier != "./c")),
        ..CrawlOptions::default()
    };
    let report = Crawler::new(options)
        .unwrap()
        .crawl(vec![entry(&a)])
        .await
        .unwrap();

    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
}

#[tokio::test]
async fn test_post_filter_excludes_resolved_paths() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');\nrequire('./c');");
    let b = write(dir.path(), "b.js", "");
    write(dir.path(), "c.js", "");

    let options = CrawlOptions {
        post_filter: Some(Arc::new(|path: &Path| {
            !path.to_string_lossy().ends_with("c.js")
        })),
        ..CrawlOptions::default()
    };
    let report = Crawler::new(options)
        .unwrap()
        .crawl(vec![entry(&a)])
        .await
        .unwrap();

    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
}

#[tokio::test]
async fn test_transform_failure_abandons_only_that_branch() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');\nrequire('./c');");
    let b = write(dir.path(), "b.js", "require('./c');");
    let c = write(dir.path(), "c.js", "");

    let options = CrawlOptions {
        transform_stages: vec![StageRef::Inline(Arc::new(FailOnSuffix {
            suffix: "b.js".to_string(),
        }))],
        compile_module_syntax: false,
        ..CrawlOptions::default()
    };
    let report = Crawler::new(options)
        .unwrap()
        .crawl(vec![entry(&a)])
        .await
        .unwrap();

    // a still lists b; b's own record never appeared.
    assert_eq!(
        report.cache.get(&module(&a)),
        vec![module(&b), module(&c)]
    );
    assert!(report.cache.get(&module(&b)).is_empty());
    assert!(report.cache.contains(&module(&c)));
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        BranchError::Transform { .. }
    ));
}

#[tokio::test]
async fn test_content_load_failure_abandons_only_that_branch() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');\nrequire('./c');");
    let b = write(dir.path(), "b.js", "require('./c');");
    write(dir.path(), "c.js", "");

    let crawler = crawler().with_content_source(Arc::new(FailingSource {
        deny: "b.js".to_string(),
    }));
    let report = crawler.crawl(vec![entry(&a)]).await.unwrap();

    assert!(report.cache.get(&module(&b)).is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        BranchError::ContentLoad(_)
    ));
}

#[tokio::test]
async fn test_crawl_fails_when_no_entry_succeeds() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "1");

    let options = CrawlOptions {
        transform_stages: vec![StageRef::Inline(Arc::new(FailOnSuffix {
            suffix: "a.js".to_string(),
        }))],
        ..CrawlOptions::default()
    };
    let err = Crawler::new(options)
        .unwrap()
        .crawl(vec![entry(&a)])
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::NoEntrySucceeded));
}

#[tokio::test]
async fn test_empty_entry_list_yields_empty_report() {
    let report = crawler().crawl(Vec::new()).await.unwrap();

    assert!(report.roots.is_empty());
    assert_eq!(report.cache.module_count(), 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_mutual_imports_terminate() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "require('./b');");
    let b = write(dir.path(), "b.js", "require('./a');");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();

    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
    assert_eq!(report.cache.get(&module(&b)), vec![module(&a)]);

    // Assembly cuts the cycle rather than recursing forever.
    let tree = assemble(&report.cache, &report.roots);
    let under_a = tree.child(&module(&a)).unwrap();
    let under_b = under_a.child(&module(&b)).unwrap();
    assert!(under_b.child(&module(&a)).unwrap().is_empty());
}

#[tokio::test]
async fn test_lowered_imports_are_traced() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.js", "import b from './b';");
    let b = write(dir.path(), "b.js", "export default 1;");

    let report = crawler().crawl(vec![entry(&a)]).await.unwrap();
    assert_eq!(report.cache.get(&module(&a)), vec![module(&b)]);
}
