//! CLI command implementations

use std::path::PathBuf;

use taproot_core::assemble;
use taproot_crawler::{CrawlOptions, Crawler, GlobLineup};

pub async fn trace(
    root: PathBuf,
    lineup: String,
    output: Option<PathBuf>,
    pretty: bool,
    keep_vendored: bool,
    no_module_syntax: bool,
    strict: bool,
) -> anyhow::Result<()> {
    tracing::info!("Tracing dependencies under {}", root.display());

    let options = CrawlOptions {
        lineup: lineup.clone(),
        ignore_vendored: !keep_vendored,
        compile_module_syntax: !no_module_syntax,
        strict_resolution: strict,
        ..CrawlOptions::default()
    };

    let entries = GlobLineup::new(&root).list(&lineup)?;
    tracing::info!("Lined up {} entry files", entries.len());

    let crawler = Crawler::new(options)?;
    let report = crawler.crawl(entries).await?;

    tracing::info!(
        "Traced {} modules, {} edges from {} roots",
        report.cache.module_count(),
        report.cache.edge_count(),
        report.roots.len()
    );
    for failure in &report.failures {
        tracing::warn!("{}: {}", failure.module, failure.error);
    }

    let tree = assemble(&report.cache, &report.roots);

    let json = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            tracing::info!("Tree written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
