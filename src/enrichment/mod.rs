//! Resumable enrichment of a crawled catalog.
//!
//! The [`EnrichmentPipeline`] visits catalog items in traversal order, skips
//! the ones that are already complete, asks a [`MetadataExtractor`] for the
//! rest and checkpoints the whole catalog after each processed item. Nothing
//! about progress is stored besides the catalog itself: completeness is
//! re-derived from the facets on every run, so an interrupted run resumes by
//! simply running again.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use geoscout_common::Result;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CheckpointSink};
use crate::config::EnrichConfig;
use crate::extract::MetadataExtractor;

/// Per-run knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Cap on processing attempts per run; `None` is unbounded.
    pub limit: Option<usize>,
    /// Checkpoint after this many processed items. Values above 1 widen the
    /// redo window after a crash; the tail is always flushed at the end.
    pub checkpoint_every: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            limit: None,
            checkpoint_every: 1,
        }
    }
}

impl From<&EnrichConfig> for PipelineOptions {
    fn from(config: &EnrichConfig) -> Self {
        Self {
            limit: config.limit,
            checkpoint_every: config.checkpoint_every,
        }
    }
}

/// What one run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Items in the worklist that were looked at.
    pub visited: usize,
    /// Items already complete.
    pub skipped: usize,
    /// Extraction attempts, successful or not.
    pub processed: usize,
    /// Attempts where the extractor failed outright.
    pub failed: usize,
    /// Items that gained facets but are still incomplete.
    pub still_incomplete: usize,
    pub checkpoints: usize,
    /// Whether the run stopped early because `limit` was reached.
    pub halted: bool,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited {}, skipped {}, processed {} ({} failed, {} still incomplete), {} checkpoints{}",
            self.visited,
            self.skipped,
            self.processed,
            self.failed,
            self.still_incomplete,
            self.checkpoints,
            if self.halted { ", halted at limit" } else { "" }
        )
    }
}

/// Drives extraction over a catalog and checkpoints progress.
pub struct EnrichmentPipeline {
    extractor: Arc<dyn MetadataExtractor>,
    sink: Arc<dyn CheckpointSink>,
    options: PipelineOptions,
}

impl EnrichmentPipeline {
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        sink: Arc<dyn CheckpointSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            sink,
            options: PipelineOptions {
                checkpoint_every: options.checkpoint_every.max(1),
                ..options
            },
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Enrich every incomplete item of `catalog` whose url is in
    /// `resource_urls`, in catalog traversal order.
    ///
    /// Recoverable extractor failures are logged and leave the item for a
    /// later run.
    ///
    /// # Errors
    ///
    /// A failed checkpoint write ends the run early with an error. So does an
    /// extractor error that is not [recoverable](geoscout_common::Error::is_recoverable);
    /// pending progress is checkpointed first.
    pub async fn run(&self, catalog: &mut Catalog, resource_urls: &[String]) -> Result<RunReport> {
        let start = Instant::now();
        let wanted: HashSet<&str> = resource_urls.iter().map(String::as_str).collect();
        let mut report = RunReport::default();
        let mut pending = 0;

        info!(
            extractor = self.extractor.name(),
            worklist = resource_urls.len(),
            limit = ?self.options.limit,
            "Starting enrichment run"
        );

        for slot in catalog.slots() {
            let resource = match catalog.get(&slot) {
                Some(item) if wanted.contains(item.url.as_str()) => {
                    report.visited += 1;
                    if item.is_complete() {
                        report.skipped += 1;
                        continue;
                    }
                    item.resource()
                }
                _ => continue,
            };

            if self.options.limit.is_some_and(|limit| report.processed >= limit) {
                info!(
                    processed = report.processed,
                    "Processing limit reached; remaining items left for a later run"
                );
                report.halted = true;
                break;
            }
            report.processed += 1;

            info!(url = %resource.url, "Extracting metadata");
            let extract_start = Instant::now();
            let facets = match self.extractor.extract(&resource).await {
                Ok(facets) => facets,
                Err(e) if e.is_recoverable() => {
                    error!(
                        url = %resource.url,
                        elapsed_ms = extract_start.elapsed().as_millis() as u64,
                        error = %e,
                        "Metadata extraction failed; item left for a later run"
                    );
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    error!(url = %resource.url, error = %e, "Metadata extraction aborted the run");
                    if pending > 0 {
                        self.sink.checkpoint(catalog)?;
                    }
                    return Err(e);
                }
            };
            info!(
                url = %resource.url,
                elapsed_ms = extract_start.elapsed().as_millis() as u64,
                facets = ?facets.present(),
                "Metadata extracted"
            );

            let missing = match catalog.get_mut(&slot) {
                Some(item) => {
                    item.merge(facets);
                    item.missing_facets()
                }
                None => continue,
            };
            if !missing.is_empty() {
                warn!(
                    url = %resource.url,
                    missing = ?missing,
                    "Item still incomplete after extraction; will retry on next run"
                );
                report.still_incomplete += 1;
            }

            pending += 1;
            if pending >= self.options.checkpoint_every {
                self.sink.checkpoint(catalog)?;
                report.checkpoints += 1;
                pending = 0;
            }
        }

        if pending > 0 {
            self.sink.checkpoint(catalog)?;
            report.checkpoints += 1;
        }

        info!(
            visited = report.visited,
            skipped = report.skipped,
            processed = report.processed,
            failed = report.failed,
            still_incomplete = report.still_incomplete,
            checkpoints = report.checkpoints,
            halted = report.halted,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Enrichment run finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use geoscout_common::{Bbox, EnrichedItem, Error, Facets, ResourceRef};

    use crate::catalog::{collect_resource_urls, DirectoryNode};

    struct FixedExtractor {
        facets: Facets,
        calls: Mutex<Vec<String>>,
    }

    impl FixedExtractor {
        fn new(facets: Facets) -> Arc<Self> {
            Arc::new(Self {
                facets,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataExtractor for FixedExtractor {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract(&self, resource: &ResourceRef) -> Result<Facets> {
            self.calls.lock().unwrap().push(resource.url.clone());
            if resource.url.contains("broken") {
                return Err(Error::tool("fixed", "cannot start"));
            }
            if resource.url.contains("unreadable") {
                return Err(Error::Io(std::io::Error::other("permission denied")));
            }
            Ok(self.facets.clone())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        snapshots: Mutex<Vec<Catalog>>,
        fail: bool,
    }

    impl MemorySink {
        fn count(&self) -> usize {
            self.snapshots.lock().unwrap().len()
        }
    }

    impl CheckpointSink for MemorySink {
        fn checkpoint(&self, catalog: &Catalog) -> Result<()> {
            if self.fail {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.snapshots.lock().unwrap().push(catalog.clone());
            Ok(())
        }
    }

    fn full_facets() -> Facets {
        Facets {
            columns: Some([("geometry", "BLOB")].into_iter().collect()),
            bbox: Some(Bbox::new(vec![vec![
                [0.0, 0.0],
                [0.0, 1.0],
                [1.0, 1.0],
                [1.0, 0.0],
                [0.0, 0.0],
            ]])),
            geometry_type: Some("Polygon".into()),
        }
    }

    fn catalog(urls: &[&str]) -> Catalog {
        DirectoryNode::Files(
            urls.iter()
                .map(|url| EnrichedItem::from(ResourceRef::new(*url, 1)))
                .collect(),
        )
    }

    fn pipeline(
        extractor: Arc<FixedExtractor>,
        sink: Arc<MemorySink>,
        options: PipelineOptions,
    ) -> EnrichmentPipeline {
        EnrichmentPipeline::new(extractor, sink, options)
    }

    #[tokio::test]
    async fn processes_incomplete_items_and_checkpoints_each() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a", "b"]);
        let urls = collect_resource_urls(&catalog);

        let report = pipeline(extractor.clone(), sink.clone(), PipelineOptions::default())
            .run(&mut catalog, &urls)
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.checkpoints, 2);
        assert_eq!(sink.count(), 2);
        assert!(catalog.iter_files().all(EnrichedItem::is_complete));

        // First checkpoint holds only the first item's facets.
        let snapshots = sink.snapshots.lock().unwrap();
        let completed: Vec<bool> = snapshots[0].iter_files().map(|i| i.is_complete()).collect();
        assert_eq!(completed, vec![true, false]);
    }

    #[tokio::test]
    async fn limit_halts_run() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a", "b", "c"]);
        let urls = collect_resource_urls(&catalog);
        let options = PipelineOptions {
            limit: Some(2),
            ..Default::default()
        };

        let report = pipeline(extractor.clone(), sink, options)
            .run(&mut catalog, &urls)
            .await
            .unwrap();

        assert!(report.halted);
        assert_eq!(report.processed, 2);
        assert_eq!(extractor.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn limit_not_reached_is_not_halted() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a", "b"]);
        let urls = collect_resource_urls(&catalog);
        let options = PipelineOptions {
            limit: Some(2),
            ..Default::default()
        };

        let report = pipeline(extractor, sink, options)
            .run(&mut catalog, &urls)
            .await
            .unwrap();
        assert!(!report.halted);
        assert_eq!(report.processed, 2);
    }

    #[tokio::test]
    async fn extractor_failure_counts_toward_limit_without_checkpoint() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["broken", "b", "c"]);
        let urls = collect_resource_urls(&catalog);
        let options = PipelineOptions {
            limit: Some(2),
            ..Default::default()
        };

        let report = pipeline(extractor, sink.clone(), options)
            .run(&mut catalog, &urls)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 2);
        assert_eq!(report.checkpoints, 1);
        assert_eq!(sink.count(), 1);
        assert!(!catalog.iter_files().next().unwrap().is_complete());
    }

    #[tokio::test]
    async fn unrecoverable_extractor_error_ends_run_after_flushing() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a", "unreadable", "c"]);
        let urls = collect_resource_urls(&catalog);
        let options = PipelineOptions {
            checkpoint_every: 5,
            ..Default::default()
        };

        let err = pipeline(extractor.clone(), sink.clone(), options)
            .run(&mut catalog, &urls)
            .await
            .unwrap_err();

        assert_matches!(err, Error::Io(_));
        assert_eq!(extractor.calls(), vec!["a", "unreadable"]);
        assert_eq!(sink.count(), 1);
        let snapshot = sink.snapshots.lock().unwrap()[0].clone();
        let complete: Vec<bool> = snapshot.iter_files().map(|i| i.is_complete()).collect();
        assert_eq!(complete, vec![true, false, false]);
    }

    #[tokio::test]
    async fn partial_facets_are_kept_and_reported() {
        let extractor = FixedExtractor::new(Facets {
            geometry_type: None,
            ..full_facets()
        });
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a"]);
        let urls = collect_resource_urls(&catalog);

        let report = pipeline(extractor, sink.clone(), PipelineOptions::default())
            .run(&mut catalog, &urls)
            .await
            .unwrap();

        assert_eq!(report.still_incomplete, 1);
        assert_eq!(report.checkpoints, 1);
        let item = catalog.iter_files().next().unwrap();
        assert!(item.columns.is_some());
        assert!(item.geometry_type.is_none());
    }

    #[tokio::test]
    async fn items_outside_worklist_untouched() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a", "b"]);

        let report = pipeline(extractor.clone(), sink, PipelineOptions::default())
            .run(&mut catalog, &["b".to_string()])
            .await
            .unwrap();

        assert_eq!(report.visited, 1);
        assert_eq!(extractor.calls(), vec!["b"]);
        let completed: Vec<bool> = catalog.iter_files().map(|i| i.is_complete()).collect();
        assert_eq!(completed, vec![false, true]);
    }

    #[tokio::test]
    async fn batched_checkpoints_flush_tail() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink::default());
        let mut catalog = catalog(&["a", "b", "c"]);
        let urls = collect_resource_urls(&catalog);
        let options = PipelineOptions {
            limit: None,
            checkpoint_every: 2,
        };

        let report = pipeline(extractor, sink.clone(), options)
            .run(&mut catalog, &urls)
            .await
            .unwrap();

        assert_eq!(report.checkpoints, 2);
        let last = sink.snapshots.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last, catalog);
    }

    #[tokio::test]
    async fn checkpoint_failure_is_fatal() {
        let extractor = FixedExtractor::new(full_facets());
        let sink = Arc::new(MemorySink {
            fail: true,
            ..Default::default()
        });
        let mut catalog = catalog(&["a", "b"]);
        let urls = collect_resource_urls(&catalog);

        let err = pipeline(extractor.clone(), sink, PipelineOptions::default())
            .run(&mut catalog, &urls)
            .await
            .unwrap_err();

        assert_matches!(err, Error::Io(_));
        assert_eq!(extractor.calls(), vec!["a"]);
    }

    #[test]
    fn zero_checkpoint_interval_is_clamped() {
        let pipeline = pipeline(
            FixedExtractor::new(Facets::default()),
            Arc::new(MemorySink::default()),
            PipelineOptions {
                limit: None,
                checkpoint_every: 0,
            },
        );
        assert_eq!(pipeline.options().checkpoint_every, 1);
    }

    #[test]
    fn report_display() {
        let report = RunReport {
            visited: 3,
            skipped: 1,
            processed: 2,
            failed: 0,
            still_incomplete: 1,
            checkpoints: 2,
            halted: true,
        };
        assert_eq!(
            report.to_string(),
            "visited 3, skipped 1, processed 2 (0 failed, 1 still incomplete), 2 checkpoints, halted at limit"
        );
    }
}
