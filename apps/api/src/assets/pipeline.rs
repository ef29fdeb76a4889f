//! Concurrent resolution of every image reference in a roster.
//!
//! # Concurrency
//! - One task per network reference, all spawned up front on a `JoinSet`.
//! - Each task fetches (time-bounded per attempt by the source) and then
//!   recompresses on the blocking pool.
//! - The phase as a whole is bounded by `AssetConfig::phase_timeout`. On expiry the
//!   remaining tasks are aborted and whatever already resolved is kept.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::assets::compress::{compress_to_budget, CompressError, CompressionOutcome};
use crate::assets::source::{FetchError, ImageSource};
use crate::assets::{image_budget, AssetConfig, EncodeStep};
use crate::models::roster::ImageRef;
use crate::roster::ClassifiedRoster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum ImageKey {
    Logo,
    /// Index into `ClassifiedRoster::characters`.
    Character(usize),
}

/// Embeddable data URIs by reference. A missing key means "draw a text badge".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedImages {
    entries: BTreeMap<ImageKey, String>,
}

impl ResolvedImages {
    pub fn get(&self, key: ImageKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn insert(&mut self, key: ImageKey, data_uri: String) {
        self.entries.insert(key, data_uri);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }
}

/// Counters for logging and the layout inspection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub budget_bytes: usize,
    pub passed_through: usize,
    pub fetched: usize,
    pub embedded: usize,
    pub over_budget: usize,
    pub cleared: usize,
    pub timed_out: usize,
}

#[derive(Debug, Error)]
enum ImageFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Compress(#[from] CompressError),

    #[error("compression task failed: {0}")]
    Join(#[from] JoinError),
}

/// Resolves the roster logo and every character image.
///
/// Inline payloads pass through, absent references stay absent, and network
/// references are fetched and embedded. No reference in the result is ever a URL.
pub async fn resolve_images(
    roster: &ClassifiedRoster,
    source: Arc<dyn ImageSource>,
    config: &AssetConfig,
) -> (ResolvedImages, PipelineReport) {
    let budget = image_budget(roster.total_characters, &config.budgets);
    let ladder: Arc<Vec<EncodeStep>> = Arc::new(config.encode_ladder.clone());

    let mut resolved = ResolvedImages::default();
    let mut report = PipelineReport {
        budget_bytes: budget,
        ..Default::default()
    };

    let references = std::iter::once((ImageKey::Logo, &roster.meta.logo)).chain(
        roster
            .characters
            .iter()
            .enumerate()
            .map(|(i, c)| (ImageKey::Character(i), &c.record.image)),
    );

    let mut tasks: JoinSet<(ImageKey, Result<CompressionOutcome, ImageFailure>)> = JoinSet::new();
    for (key, image) in references {
        match image {
            ImageRef::None => {}
            ImageRef::Embedded(data_uri) => {
                resolved.insert(key, data_uri.clone());
                report.passed_through += 1;
            }
            ImageRef::Url(url) => {
                report.fetched += 1;
                let source = source.clone();
                let ladder = ladder.clone();
                let url = url.clone();
                tasks.spawn(async move {
                    (key, fetch_and_compress(source, url, budget, ladder).await)
                });
            }
        }
    }

    let deadline = tokio::time::Instant::now() + config.phase_timeout;
    loop {
        match tokio::time::timeout_at(deadline, tasks.join_next()).await {
            Ok(Some(Ok((key, Ok(outcome))))) => {
                if !outcome.within_budget {
                    report.over_budget += 1;
                    debug!(
                        "Image {:?} missed the {}-byte budget, using smallest candidate ({} bytes of {:?})",
                        key,
                        budget,
                        outcome.payload.bytes.len(),
                        outcome.attempts
                    );
                }
                resolved.insert(key, outcome.payload.data_uri());
                report.embedded += 1;
            }
            Ok(Some(Ok((key, Err(e))))) => {
                warn!("Image {:?} cleared: {e}", key);
                report.cleared += 1;
            }
            Ok(Some(Err(e))) => {
                warn!("Image task failed: {e}");
                report.cleared += 1;
            }
            Ok(None) => break,
            Err(_) => {
                report.timed_out = tasks.len();
                warn!(
                    "Image phase hit its {}ms deadline, abandoning {} pending images",
                    config.phase_timeout.as_millis(),
                    report.timed_out
                );
                tasks.abort_all();
                break;
            }
        }
    }

    info!(
        "Resolved images: {} embedded, {} passed through, {} cleared, {} timed out",
        report.embedded, report.passed_through, report.cleared, report.timed_out
    );
    (resolved, report)
}

async fn fetch_and_compress(
    source: Arc<dyn ImageSource>,
    url: String,
    budget: usize,
    ladder: Arc<Vec<EncodeStep>>,
) -> Result<CompressionOutcome, ImageFailure> {
    let bytes = source.fetch(&url).await?;
    let outcome =
        tokio::task::spawn_blocking(move || compress_to_budget(&bytes, budget, &ladder)).await??;
    Ok(outcome)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::assets::default_asset_config;
    use crate::assets::test_support::{flat_png, noisy_png, Behavior, FakeSource};
    use crate::models::roster::{CharacterRecord, Faction, RosterDocument, RosterMeta};
    use crate::roster::classifier::{classify_roster, default_classifier_config};

    fn roster_with_images(images: Vec<ImageRef>, logo: ImageRef) -> ClassifiedRoster {
        let characters = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| CharacterRecord {
                id: format!("c{i}"),
                name: format!("c{i}"),
                faction: Some(Faction::Townsfolk),
                image,
                ..Default::default()
            })
            .collect();
        classify_roster(
            RosterDocument {
                meta: RosterMeta {
                    logo,
                    ..Default::default()
                },
                characters,
            },
            &default_classifier_config(),
        )
    }

    fn url(s: &str) -> ImageRef {
        ImageRef::Url(s.to_string())
    }

    #[tokio::test]
    async fn test_mixed_references_resolve_or_clear() {
        let source = Arc::new(
            FakeSource::default()
                .with("https://img.test/ok.png", Behavior::Serve(flat_png(32, 32)))
                .with("https://img.test/bad.png", Behavior::Fail)
                .with("https://img.test/html.png", Behavior::Serve(b"<html></html>".to_vec())),
        );
        let roster = roster_with_images(
            vec![
                url("https://img.test/ok.png"),
                url("https://img.test/bad.png"),
                ImageRef::Embedded("data:image/png;base64,AAAA".to_string()),
                ImageRef::None,
                url("https://img.test/html.png"),
            ],
            url("https://img.test/ok.png"),
        );

        let (resolved, report) =
            resolve_images(&roster, source, &default_asset_config()).await;

        assert!(resolved.get(ImageKey::Logo).is_some());
        assert!(resolved.get(ImageKey::Character(0)).is_some());
        assert!(resolved.get(ImageKey::Character(1)).is_none());
        assert_eq!(
            resolved.get(ImageKey::Character(2)),
            Some("data:image/png;base64,AAAA")
        );
        assert!(resolved.get(ImageKey::Character(3)).is_none());
        assert!(resolved.get(ImageKey::Character(4)).is_none());
        assert!(resolved.values().all(|v| v.starts_with("data:image/")));

        assert_eq!(report.fetched, 4);
        assert_eq!(report.embedded, 2);
        assert_eq!(report.cleared, 2);
        assert_eq!(report.passed_through, 1);
        assert_eq!(report.timed_out, 0);
    }

    #[tokio::test]
    async fn test_phase_timeout_keeps_completed_results() {
        let source = Arc::new(
            FakeSource::default()
                .with("https://img.test/ok.png", Behavior::Serve(flat_png(16, 16)))
                .with("https://img.test/slow.png", Behavior::Hang),
        );
        let roster = roster_with_images(
            vec![url("https://img.test/slow.png"), url("https://img.test/ok.png")],
            ImageRef::None,
        );
        let mut config = default_asset_config();
        config.phase_timeout = Duration::from_millis(500);

        let started = std::time::Instant::now();
        let (resolved, report) = resolve_images(&roster, source, &config).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(resolved.get(ImageKey::Character(0)).is_none());
        assert!(resolved.get(ImageKey::Character(1)).is_some());
        assert_eq!(report.timed_out, 1);
    }

    #[tokio::test]
    async fn test_large_roster_uses_smallest_budget() {
        let big = noisy_png(112, 112);
        let source =
            Arc::new(FakeSource::default().with("https://img.test/big.png", Behavior::Serve(big.clone())));
        let roster = roster_with_images(
            (0..22).map(|_| url("https://img.test/big.png")).collect(),
            ImageRef::None,
        );

        let (resolved, report) =
            resolve_images(&roster, source, &default_asset_config()).await;

        assert_eq!(report.budget_bytes, 12_000);
        assert_eq!(resolved.len(), 22);
        // base64 inflates by 4/3; the payload itself never exceeds the original.
        let max_uri = 64 + big.len() * 4 / 3 + 4;
        assert!(resolved.values().all(|v| v.len() <= max_uri));
    }

    #[tokio::test]
    async fn test_no_references_is_a_no_op() {
        let source = Arc::new(FakeSource::default());
        let roster = roster_with_images(vec![ImageRef::None; 3], ImageRef::None);
        let (resolved, report) =
            resolve_images(&roster, source, &default_asset_config()).await;
        assert!(resolved.is_empty());
        assert_eq!(report.fetched, 0);
    }
}
