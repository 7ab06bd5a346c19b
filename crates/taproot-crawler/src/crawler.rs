//! Memoized, concurrent crawl of the transitive dependency closure

use std::path::Path;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use tokio::sync::{OnceCell, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use taproot_core::{BranchError, BranchFailure, CrawlError, EdgeCache, EdgeRecord, ModuleId};

use crate::config::CrawlOptions;
use crate::extract::{IdentifierExtractor, RequireExtractor};
use crate::guard::DuplicateGuard;
use crate::lineup::EntryFile;
use crate::pipeline::TransformPipeline;
use crate::resolve::{IdentifierResolver, NodeResolver};
use crate::source::{ContentSource, FsContentSource};

/// Result of one module's transform-extract-resolve pass, memoized for the
/// lifetime of the crawl. A failed pass stays failed; the module is never
/// retried within the same crawl.
#[derive(Debug, Clone)]
enum MemoOutcome {
    Resolved(Vec<ModuleId>),
    Failed,
}

/// At-most-once guard over module identities. The first branch to reach a
/// module wins the right to process it; every later branch awaits the
/// winner's dependency sequence instead of re-running extraction.
#[derive(Default)]
struct Memo {
    slots: DashMap<ModuleId, Arc<OnceCell<MemoOutcome>>>,
}

impl Memo {
    fn slot(&self, id: &ModuleId) -> Arc<OnceCell<MemoOutcome>> {
        self.slots
            .entry(id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn outcome(&self, id: &ModuleId) -> Option<MemoOutcome> {
        self.slots.get(id).and_then(|slot| slot.value().get().cloned())
    }
}

/// Everything one finished crawl produced: the flat adjacency, the entry
/// modules in entry order, and the branches that were abandoned along the
/// way. Tree assembly is a separate, later phase.
#[derive(Debug)]
pub struct CrawlReport {
    pub cache: EdgeCache,
    pub roots: Vec<ModuleId>,
    pub failures: Vec<BranchFailure>,
}

impl CrawlReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The crawl engine. Holds the validated options, the instantiated
/// transform pipeline, and the collaborators; per-crawl state (memo, edge
/// cache) lives in a session created fresh for every `crawl` call.
pub struct Crawler {
    options: CrawlOptions,
    pipeline: Arc<TransformPipeline>,
    extractor: Arc<dyn IdentifierExtractor>,
    resolver: Arc<dyn IdentifierResolver>,
    source: Arc<dyn ContentSource>,
    edge_tx: broadcast::Sender<EdgeRecord>,
}

impl Crawler {
    /// Validate the options and instantiate the pipeline and default
    /// collaborators. Configuration errors surface here, before any crawl
    /// starts.
    pub fn new(options: CrawlOptions) -> Result<Self, CrawlError> {
        options.validate()?;
        let pipeline = Arc::new(TransformPipeline::build(
            options.compile_module_syntax,
            &options.transform_stages,
        )?);
        let resolver = Arc::new(NodeResolver::new(options.resolver.clone()));
        let (edge_tx, _) = broadcast::channel(256);

        Ok(Crawler {
            options,
            pipeline,
            extractor: Arc::new(RequireExtractor::new()),
            resolver,
            source: Arc::new(FsContentSource),
            edge_tx,
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn IdentifierExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentifierResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = source;
        self
    }

    /// Observe edge records as they are emitted, one per crawled module.
    /// Subscribe before calling `crawl`.
    pub fn subscribe_edges(&self) -> broadcast::Receiver<EdgeRecord> {
        self.edge_tx.subscribe()
    }

    /// Crawl the closure of the given entry modules. Per-module failures
    /// are collected in the report; the call itself fails only when no
    /// entry module could be crawled at all.
    pub async fn crawl(&self, entries: Vec<EntryFile>) -> Result<CrawlReport, CrawlError> {
        let session = Arc::new(Session {
            options: self.options.clone(),
            pipeline: Arc::clone(&self.pipeline),
            extractor: Arc::clone(&self.extractor),
            resolver: Arc::clone(&self.resolver),
            source: Arc::clone(&self.source),
            edge_tx: self.edge_tx.clone(),
            memo: Memo::default(),
            cache: EdgeCache::new(),
            roots: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            guard: DuplicateGuard::new(),
        });

        let had_entries = !entries.is_empty();

        // Entry modules become roots up front, in entry order, so a root
        // that is also reached as someone's dependency stays a root.
        for entry in &entries {
            session.note_root(&entry.path);
        }

        let mut closures = JoinSet::new();
        for entry in entries {
            let session = Arc::clone(&session);
            closures.spawn(session.crawl_module(entry.path, Some(entry.contents), None));
        }
        while let Some(joined) = closures.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    warn!("Crawl branch panicked: {}", err);
                }
            }
        }

        let roots = session.roots.lock().unwrap().clone();
        if had_entries
            && roots
                .iter()
                .all(|root| matches!(session.memo.outcome(root), Some(MemoOutcome::Failed)))
        {
            return Err(CrawlError::NoEntrySucceeded);
        }

        Ok(CrawlReport {
            cache: session.cache.clone(),
            roots,
            failures: session.failures.lock().unwrap().clone(),
        })
    }
}

/// Shared state of one crawl invocation. Memo and edge cache are the only
/// mutable state touched by concurrent branches; both are discarded with
/// the session.
struct Session {
    options: CrawlOptions,
    pipeline: Arc<TransformPipeline>,
    extractor: Arc<dyn IdentifierExtractor>,
    resolver: Arc<dyn IdentifierResolver>,
    source: Arc<dyn ContentSource>,
    edge_tx: broadcast::Sender<EdgeRecord>,
    memo: Memo,
    cache: EdgeCache,
    roots: Mutex<Vec<ModuleId>>,
    failures: Mutex<Vec<BranchFailure>>,
    guard: DuplicateGuard,
}

impl Session {
    /// Crawl one module reached from `parent` (`None` for entries).
    ///
    /// The memo cell decides a winner: the winning branch processes the
    /// module and then fans out into its dependencies, completing only
    /// when every sub-crawl has completed; losing branches await the
    /// winner's dependency sequence and stop there. Awaiting only the
    /// sequence, not the whole subtree, keeps mutual imports from
    /// deadlocking the crawl.
    fn crawl_module(
        self: Arc<Self>,
        module: ModuleId,
        mut contents: Option<Vec<u8>>,
        parent: Option<ModuleId>,
    ) -> BoxFuture<'static, ()> {
        async move {
            let cell = self.memo.slot(&module);
            let mut claimed = false;
            let outcome = cell
                .get_or_init(|| {
                    claimed = true;
                    self.process(module.clone(), contents.take(), parent.clone())
                })
                .await
                .clone();

            if !claimed {
                debug!(module = %module, "Already visited; reusing dependency sequence");
                return;
            }

            let dependencies = match outcome {
                MemoOutcome::Resolved(dependencies) => dependencies,
                MemoOutcome::Failed => return,
            };

            let mut branches = JoinSet::new();
            for dependency in dependencies {
                let session = Arc::clone(&self);
                branches.spawn(session.crawl_module(dependency, None, Some(module.clone())));
            }
            while let Some(joined) = branches.join_next().await {
                if let Err(err) = joined {
                    if err.is_panic() {
                        warn!(module = %module, "Sub-crawl panicked: {}", err);
                    }
                }
            }
        }
        .boxed()
    }

    /// Steps 2–4 for a single module: load, transform, extract, resolve,
    /// emit. Runs at most once per module identity per crawl.
    async fn process(
        &self,
        module: ModuleId,
        contents: Option<Vec<u8>>,
        parent: Option<ModuleId>,
    ) -> MemoOutcome {
        debug!(module = %module, "Processing module");

        let raw = match contents {
            Some(raw) => raw,
            None => match self.source.load(module.as_path()).await {
                Ok(raw) => raw,
                Err(err) => {
                    self.fail(&module, BranchError::ContentLoad(err.to_string()));
                    return MemoOutcome::Failed;
                }
            },
        };

        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(err) => {
                self.fail(&module, BranchError::ContentLoad(err.to_string()));
                return MemoOutcome::Failed;
            }
        };

        let transformed = match self.pipeline.run(&text, &module) {
            Ok(transformed) => transformed,
            Err(err) => {
                self.fail(&module, err);
                return MemoOutcome::Failed;
            }
        };

        let identifiers = match self.extractor.extract(&transformed).await {
            Ok(identifiers) => identifiers,
            Err(err) => {
                self.fail(&module, BranchError::Extraction(err.to_string()));
                return MemoOutcome::Failed;
            }
        };

        let dependencies = self.resolve_all(&module, identifiers).await;

        if self.guard.seen(&module, &dependencies) {
            // Identical batch already filed; nothing new to emit.
            return MemoOutcome::Resolved(dependencies);
        }
        self.guard.remember(&module, &dependencies);

        let record = EdgeRecord::new(module, dependencies.clone(), parent);
        self.cache.record(&record);
        let _ = self.edge_tx.send(record);

        MemoOutcome::Resolved(dependencies)
    }

    /// Step 3: resolve every extracted specifier against the module's
    /// directory, concurrently but in source order. A specifier that fails
    /// to resolve is dropped; the module's own branch continues.
    async fn resolve_all(&self, module: &ModuleId, identifiers: Vec<String>) -> Vec<ModuleId> {
        let base_dir = module.base_dir();

        let candidates: Vec<String> = match &self.options.pre_filter {
            Some(filter) => identifiers
                .into_iter()
                .filter(|specifier| filter(specifier))
                .collect(),
            None => identifiers,
        };

        let resolutions = join_all(
            candidates
                .iter()
                .map(|specifier| self.resolver.resolve(specifier, base_dir)),
        )
        .await;

        let mut dependencies = Vec::new();
        for (specifier, resolution) in candidates.iter().zip(resolutions) {
            let path = match resolution {
                Ok(path) => path,
                Err(err) => {
                    debug!(module = %module, "Dropping `{}`: {}", specifier, err);
                    if self.options.strict_resolution {
                        self.fail(
                            module,
                            BranchError::Resolution {
                                specifier: specifier.clone(),
                                reason: err.to_string(),
                            },
                        );
                    }
                    continue;
                }
            };

            if let Some(filter) = &self.options.post_filter {
                if !filter(&path) {
                    continue;
                }
            }
            if self.options.ignore_vendored && is_vendored(&path, &self.options.vendor_dir) {
                debug!(module = %module, "Skipping vendored {}", path.display());
                continue;
            }
            let path = match &self.options.identifier_mapper {
                Some(mapper) => mapper(path),
                None => path,
            };

            let dependency = ModuleId::from(path);
            if !dependencies.contains(&dependency) {
                dependencies.push(dependency);
            }
        }
        dependencies
    }

    fn note_root(&self, module: &ModuleId) {
        let mut roots = self.roots.lock().unwrap();
        if !roots.contains(module) {
            roots.push(module.clone());
        }
    }

    fn fail(&self, module: &ModuleId, error: BranchError) {
        warn!(module = %module, "Branch failed: {}", error);
        self.failures
            .lock()
            .unwrap()
            .push(BranchFailure::new(module.clone(), error));
    }
}

fn is_vendored(path: &Path, vendor_dir: &str) -> bool {
    path.components()
        .any(|component| component.as_os_str() == vendor_dir)
}
