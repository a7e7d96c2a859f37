//! Scan host: turns analyzer output into enriched, persisted scans and
//! exposes the read side (history, ledger) plus barcode, live-detection and
//! recipe pass-throughs.
//!
//! Persistence is best effort. The enriched record is built in memory before
//! any storage call, and storage faults are logged and reported in
//! [`ScanOutcome::persistence`] instead of failing the request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lunchbox_ai::{Analyzer, AnalyzerError, RecipeGenerator};
use lunchbox_core::{
    Analysis, CarbonTable, Detection, Recipe, ScanRecord, UserId, UserLedger, enrich,
};
use lunchbox_lookup::{Lookup, LookupError, ProductLookup};
use lunchbox_store::ScanStore;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum HostError {
    /// The analyzer could not identify an item. Nothing was written.
    #[error("analysis failed: {0}")]
    AnalysisFailed(#[source] AnalyzerError),
    #[error("product lookup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("recipe generation failed: {0}")]
    Recipes(#[source] AnalyzerError),
    #[error("no recipe generator configured")]
    NoRecipeGenerator,
}

/// What the caller hands to [`ScanHost::submit_scan`].
#[derive(Debug, Clone)]
pub enum ScanInput {
    /// Base64 JPEG, analysed by the configured [`Analyzer`].
    Image(String),
    /// Analysis produced elsewhere. Still validated.
    Analysis(Analysis),
}

/// How far the storage step got.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Persistence {
    /// Record appended and ledger updated.
    Stored,
    /// Record appended, ledger update failed.
    LedgerSkipped { reason: String },
    /// Nothing written.
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub record: ScanRecord,
    /// Ledger after this scan, when it could be updated.
    pub ledger: Option<UserLedger>,
    pub persistence: Persistence,
}

/// Enrichment orchestrator and core API surface.
pub struct ScanHost {
    table: CarbonTable,
    store: Arc<dyn ScanStore>,
    analyzer: Arc<dyn Analyzer>,
    lookup: Arc<dyn ProductLookup>,
    recipe_generators: Vec<Arc<dyn RecipeGenerator>>,
}

impl ScanHost {
    pub fn new(
        table: CarbonTable,
        store: Arc<dyn ScanStore>,
        analyzer: Arc<dyn Analyzer>,
        lookup: Arc<dyn ProductLookup>,
    ) -> Self {
        Self {
            table,
            store,
            analyzer,
            lookup,
            recipe_generators: Vec::new(),
        }
    }

    /// Add a recipe generator. Generators are tried in the order added.
    pub fn with_recipe_generator(mut self, generator: Arc<dyn RecipeGenerator>) -> Self {
        self.recipe_generators.push(generator);
        self
    }

    // ── Write path ──

    /// Analyse (if needed), enrich and record one scan for `user`.
    pub async fn submit_scan(
        &self,
        user: &UserId,
        input: ScanInput,
    ) -> Result<ScanRecord, HostError> {
        let outcome = self.submit_scan_detailed(user, input, Utc::now()).await?;
        Ok(outcome.record)
    }

    /// Shorthand for [`submit_scan`](Self::submit_scan) with an image.
    pub async fn scan_image(
        &self,
        user: &UserId,
        image_base64: String,
    ) -> Result<ScanRecord, HostError> {
        self.submit_scan(user, ScanInput::Image(image_base64)).await
    }

    /// Like [`submit_scan`](Self::submit_scan) but reports the ledger and
    /// persistence status, with an explicit scan time.
    pub async fn submit_scan_detailed(
        &self,
        user: &UserId,
        input: ScanInput,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, HostError> {
        let analysis = match input {
            ScanInput::Image(image) => self
                .analyzer
                .analyze(&image)
                .await
                .map_err(HostError::AnalysisFailed)?,
            ScanInput::Analysis(analysis) => {
                analysis
                    .validate()
                    .map_err(|e| HostError::AnalysisFailed(e.into()))?;
                analysis
            }
        };
        Ok(self.enrich_and_record(user, analysis, now).await)
    }

    /// Enrich `analysis` and try to persist it. Never fails: storage errors
    /// degrade to [`Persistence::Skipped`] or [`Persistence::LedgerSkipped`].
    pub async fn enrich_and_record(
        &self,
        user: &UserId,
        analysis: Analysis,
        now: DateTime<Utc>,
    ) -> ScanOutcome {
        let record = enrich(analysis, &self.table, now);

        let stored = match self.store.append(user, record.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(user = %user, item = %record.item_name, error = %e, "scan not persisted");
                return ScanOutcome {
                    record,
                    ledger: None,
                    persistence: Persistence::Skipped {
                        reason: e.to_string(),
                    },
                };
            }
        };

        match self
            .store
            .apply_scan(user, stored.carbon_footprint.as_ref(), now)
            .await
        {
            Ok(ledger) => {
                info!(
                    user = %user,
                    item = %stored.item_name,
                    streak = ledger.current_streak,
                    score = ledger.sustainability_score,
                    "scan recorded"
                );
                ScanOutcome {
                    record: stored,
                    ledger: Some(ledger),
                    persistence: Persistence::Stored,
                }
            }
            Err(e) => {
                warn!(user = %user, error = %e, "ledger not updated");
                ScanOutcome {
                    record: stored,
                    ledger: None,
                    persistence: Persistence::LedgerSkipped {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    // ── Read path ──

    /// Up to `limit` of `user`'s scans, newest first. Empty if storage is down.
    pub async fn get_history(&self, user: &UserId, limit: usize) -> Vec<ScanRecord> {
        match self.store.list_recent(user, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!(user = %user, error = %e, "history unavailable");
                Vec::new()
            }
        }
    }

    /// `user`'s ledger; the zero ledger if they never scanned or storage is down.
    pub async fn get_ledger(&self, user: &UserId) -> UserLedger {
        match self.store.ledger(user).await {
            Ok(ledger) => ledger.unwrap_or_default(),
            Err(e) => {
                warn!(user = %user, error = %e, "ledger unavailable");
                UserLedger::default()
            }
        }
    }

    // ── Pass-throughs ──

    pub async fn lookup_barcode(&self, barcode: &str) -> Result<Lookup, HostError> {
        Ok(self.lookup.lookup(barcode).await?)
    }

    /// Live produce detection. Failures yield no detections.
    pub async fn live_detect(&self, image_base64: &str) -> Vec<Detection> {
        match self.analyzer.analyze_live(image_base64).await {
            Ok(detections) => detections,
            Err(e) => {
                warn!(error = %e, "live detection failed");
                Vec::new()
            }
        }
    }

    /// Recipes for `items`, trying each generator in turn.
    pub async fn suggest_recipes(&self, items: &[String]) -> Result<Vec<Recipe>, HostError> {
        let mut last_err = None;
        for generator in &self.recipe_generators {
            match generator.generate_recipes(items).await {
                Ok(recipes) => return Ok(recipes),
                Err(e) => {
                    warn!(error = %e, "recipe generator failed, trying next");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.map_or(HostError::NoRecipeGenerator, HostError::Recipes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use lunchbox_core::{CarbonEntry, CarbonFootprint};
    use lunchbox_store::{MemoryStore, StoreError};

    // ── Fakes ──

    struct FixedAnalyzer {
        reply: Option<Analysis>,
    }

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(&self, _image: &str) -> Result<Analysis, AnalyzerError> {
            self.reply.clone().ok_or(AnalyzerError::EmptyResponse)
        }

        async fn analyze_live(&self, _image: &str) -> Result<Vec<Detection>, AnalyzerError> {
            Err(AnalyzerError::Server {
                status: 503,
                body: "overloaded".into(),
            })
        }
    }

    struct NoProducts;

    #[async_trait]
    impl ProductLookup for NoProducts {
        async fn lookup(&self, barcode: &str) -> Result<Lookup, LookupError> {
            lunchbox_lookup::validate_barcode(barcode)?;
            Ok(Lookup::NotFound)
        }
    }

    struct CannedRecipes {
        ok: bool,
        title: &'static str,
    }

    #[async_trait]
    impl RecipeGenerator for CannedRecipes {
        async fn generate_recipes(&self, _items: &[String]) -> Result<Vec<Recipe>, AnalyzerError> {
            if !self.ok {
                return Err(AnalyzerError::EmptyResponse);
            }
            Ok(vec![Recipe {
                title: self.title.into(),
                description: String::new(),
                ingredients: vec![],
                steps: vec![],
                carbon_savings: String::new(),
                prep_time: "10 minutes".into(),
            }])
        }
    }

    /// Appends fine, fails every ledger update.
    struct LedgerDown(MemoryStore);

    #[async_trait]
    impl ScanStore for LedgerDown {
        async fn append(&self, user: &UserId, record: ScanRecord) -> Result<ScanRecord, StoreError> {
            self.0.append(user, record).await
        }

        async fn list_recent(
            &self,
            user: &UserId,
            limit: usize,
        ) -> Result<Vec<ScanRecord>, StoreError> {
            self.0.list_recent(user, limit).await
        }

        async fn apply_scan(
            &self,
            _user: &UserId,
            _carbon: Option<&CarbonFootprint>,
            _now: DateTime<Utc>,
        ) -> Result<UserLedger, StoreError> {
            Err(StoreError::Unavailable("ledger table locked".into()))
        }

        async fn ledger(&self, _user: &UserId) -> Result<Option<UserLedger>, StoreError> {
            Ok(None)
        }
    }

    // ── Helpers ──

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 30, 0).unwrap()
    }

    fn banana_table() -> CarbonTable {
        CarbonTable::from_entries(vec![CarbonEntry {
            item: "banana".into(),
            co2e_per_kg: 0.7,
            category: "fruit".into(),
        }])
        .unwrap()
    }

    fn analysis(item: &str) -> Analysis {
        Analysis {
            item_name: item.into(),
            category: "fruit".into(),
            freshness_score: 7,
            freshness_description: "Mostly yellow".into(),
            estimated_days_remaining: 3,
            storage_tips: vec!["Hang to avoid bruising".into()],
            visual_indicators: vec!["few brown spots".into()],
            sustainable_alternative: None,
        }
    }

    fn host_with(table: CarbonTable, store: Arc<dyn ScanStore>, reply: Option<Analysis>) -> ScanHost {
        ScanHost::new(
            table,
            store,
            Arc::new(FixedAnalyzer { reply }),
            Arc::new(NoProducts),
        )
    }

    // ── Tests ──

    #[tokio::test]
    async fn first_scan_records_and_starts_ledger() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(banana_table(), store.clone(), None);
        let user = UserId::new("alice");

        let outcome = host
            .submit_scan_detailed(&user, ScanInput::Analysis(analysis("Bananas ")), t0())
            .await
            .unwrap();

        assert_eq!(outcome.persistence, Persistence::Stored);
        assert!(outcome.record.id.is_some());
        let fp = outcome.record.carbon_footprint.as_ref().unwrap();
        assert_eq!(fp.driving_equivalent_km, 4.3);

        let ledger = outcome.ledger.unwrap();
        assert_eq!(ledger.total_scans, 1);
        assert_eq!(ledger.current_streak, 1);
        assert_eq!(ledger.best_streak, 1);
        assert_eq!(ledger.sustainability_score, 55);
        assert!((ledger.total_carbon_saved - 0.07).abs() < 1e-9);
        assert_eq!(host.get_ledger(&user).await, ledger);
    }

    #[tokio::test]
    async fn image_scan_goes_through_analyzer() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(banana_table(), store, Some(analysis("banana")));
        let user = UserId::new("alice");

        let record = host.scan_image(&user, "aGVsbG8=".into()).await.unwrap();
        assert_eq!(record.item_name, "banana");
        assert_eq!(host.get_history(&user, 10).await, vec![record]);
    }

    #[tokio::test]
    async fn storage_down_still_returns_full_record() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let host = host_with(banana_table(), store.clone(), Some(analysis("banana")));
        let user = UserId::new("alice");

        let outcome = host
            .submit_scan_detailed(&user, ScanInput::Image("img".into()), t0())
            .await
            .unwrap();
        assert!(outcome.record.id.is_none());
        assert_eq!(outcome.record.item_name, "banana");
        assert_eq!(outcome.record.storage_tips, ["Hang to avoid bruising"]);
        assert!(outcome.record.carbon_footprint.is_some());
        assert!(outcome.ledger.is_none());
        assert!(matches!(outcome.persistence, Persistence::Skipped { .. }));

        let record = host.submit_scan(&user, ScanInput::Image("img".into())).await.unwrap();
        assert!(record.id.is_none());

        store.set_available(true);
        assert!(host.get_history(&user, 10).await.is_empty());
        assert_eq!(host.get_ledger(&user).await, UserLedger::default());
    }

    #[tokio::test]
    async fn ledger_failure_keeps_stored_record() {
        let store = Arc::new(LedgerDown(MemoryStore::new()));
        let host = host_with(banana_table(), store, None);
        let user = UserId::new("alice");

        let outcome = host
            .submit_scan_detailed(&user, ScanInput::Analysis(analysis("banana")), t0())
            .await
            .unwrap();
        assert!(outcome.record.id.is_some());
        assert!(outcome.ledger.is_none());
        assert!(matches!(outcome.persistence, Persistence::LedgerSkipped { .. }));
        assert_eq!(host.get_history(&user, 5).await.len(), 1);
    }

    #[tokio::test]
    async fn empty_table_means_no_footprint_and_no_carbon_saved() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(CarbonTable::empty(), store, None);
        let user = UserId::new("alice");

        let outcome = host
            .submit_scan_detailed(&user, ScanInput::Analysis(analysis("banana")), t0())
            .await
            .unwrap();
        assert!(outcome.record.carbon_footprint.is_none());
        assert_eq!(outcome.ledger.unwrap().total_carbon_saved, 0.0);
    }

    #[tokio::test]
    async fn analyzer_failure_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(banana_table(), store.clone(), None);
        let user = UserId::new("alice");

        let err = host
            .submit_scan(&user, ScanInput::Image("img".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::AnalysisFailed(_)));
        assert!(host.get_history(&user, 10).await.is_empty());
        assert!(store.ledger(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_supplied_analysis_rejected() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(banana_table(), store.clone(), None);
        let user = UserId::new("alice");
        let mut bad = analysis("banana");
        bad.freshness_score = 0;

        let err = host
            .submit_scan(&user, ScanInput::Analysis(bad))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HostError::AnalysisFailed(AnalyzerError::AnalysisFailed(_))
        ));
        assert!(host.get_history(&user, 10).await.is_empty());
    }

    #[tokio::test]
    async fn history_newest_first_and_streak_across_days() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(banana_table(), store, None);
        let user = UserId::new("alice");

        for (day, item) in [(0, "apple"), (1, "banana"), (2, "carrot")] {
            host.enrich_and_record(&user, analysis(item), t0() + Duration::days(day))
                .await;
        }
        let names: Vec<_> = host
            .get_history(&user, 2)
            .await
            .into_iter()
            .map(|r| r.item_name)
            .collect();
        assert_eq!(names, ["carrot", "banana"]);

        let ledger = host.get_ledger(&user).await;
        assert_eq!(ledger.current_streak, 3);
        assert_eq!(ledger.sustainability_score, 50 + 6 + 9);

        host.enrich_and_record(&user, analysis("onion"), t0() + Duration::days(10))
            .await;
        let ledger = host.get_ledger(&user).await;
        assert_eq!(ledger.current_streak, 1);
        assert_eq!(ledger.best_streak, 3);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let host = host_with(banana_table(), store, None);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        host.enrich_and_record(&alice, analysis("banana"), t0()).await;
        assert_eq!(host.get_ledger(&alice).await.total_scans, 1);
        assert_eq!(host.get_ledger(&bob).await, UserLedger::default());
        assert!(host.get_history(&bob, 10).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_all_counted() {
        let store = Arc::new(MemoryStore::new());
        let host = Arc::new(host_with(banana_table(), store, None));
        let user = UserId::new("alice");

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let host = Arc::clone(&host);
            let user = user.clone();
            tasks.spawn(async move {
                host.submit_scan(&user, ScanInput::Analysis(analysis("banana")))
                    .await
                    .unwrap();
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        let ledger = host.get_ledger(&user).await;
        assert_eq!(ledger.total_scans, 20);
        assert_eq!(ledger.current_streak, 20);
        assert_eq!(host.get_history(&user, 50).await.len(), 20);
    }

    #[tokio::test]
    async fn barcode_not_found_is_a_result() {
        let host = host_with(banana_table(), Arc::new(MemoryStore::new()), None);
        assert_eq!(host.lookup_barcode("0000000000000").await.unwrap(), Lookup::NotFound);
        assert!(matches!(
            host.lookup_barcode("not-a-code").await,
            Err(HostError::Lookup(LookupError::InvalidBarcode(_)))
        ));
    }

    #[tokio::test]
    async fn live_detect_failure_is_empty() {
        let host = host_with(banana_table(), Arc::new(MemoryStore::new()), None);
        assert!(host.live_detect("img").await.is_empty());
    }

    #[tokio::test]
    async fn recipes_fall_back_to_next_generator() {
        let host = host_with(banana_table(), Arc::new(MemoryStore::new()), None)
            .with_recipe_generator(Arc::new(CannedRecipes {
                ok: false,
                title: "primary",
            }))
            .with_recipe_generator(Arc::new(CannedRecipes {
                ok: true,
                title: "fallback",
            }));
        let recipes = host.suggest_recipes(&["banana".into()]).await.unwrap();
        assert_eq!(recipes[0].title, "fallback");
    }

    #[tokio::test]
    async fn recipes_all_failing_reports_last_error() {
        let host = host_with(banana_table(), Arc::new(MemoryStore::new()), None)
            .with_recipe_generator(Arc::new(CannedRecipes {
                ok: false,
                title: "primary",
            }));
        assert!(matches!(
            host.suggest_recipes(&["banana".into()]).await,
            Err(HostError::Recipes(_))
        ));
    }

    #[tokio::test]
    async fn recipes_without_generator() {
        let host = host_with(banana_table(), Arc::new(MemoryStore::new()), None);
        assert!(matches!(
            host.suggest_recipes(&["banana".into()]).await,
            Err(HostError::NoRecipeGenerator)
        ));
    }

    #[test]
    fn outcome_serializes_persistence_status() {
        let json = serde_json::to_value(Persistence::Skipped {
            reason: "offline".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "offline");
    }
}
