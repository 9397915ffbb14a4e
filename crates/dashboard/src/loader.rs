use crate::error::LoadError;
use crate::source::SalesSource;
use analytics::{
    records_of, AnalyticsError, ElasticityEstimate, ElasticityEstimator, MetricsEngine,
    MonthlyElasticity, PriceOptimization, PromotionAnalyzer, SalesForecast, SalesForecaster,
    Segmentation,
};
use chrono::Utc;
use configuration::Config;
use core_types::{DashboardMetrics, PromotionSummary, Recommendation, SalesObservation};
use events::{DashboardEvent, DashboardSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Capacity of the event channel. Slow observers lag rather than block a load.
const EVENT_CAPACITY: usize = 64;

/// The full result of running the analytics over one batch of sales.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub estimates: Vec<ElasticityEstimate>,
    pub segmentation: Segmentation,
    pub monthly: Vec<MonthlyElasticity>,
    pub optimization: PriceOptimization,
    pub forecasts: Vec<SalesForecast>,
    pub promotions: Vec<PromotionSummary>,
    pub metrics: DashboardMetrics,
    pub recommendations: Vec<Recommendation>,
}

/// What the last settled loads left behind.
#[derive(Debug, Default)]
struct Published {
    snapshot: Option<Arc<DashboardSnapshot>>,
    /// Highest generation that finished, successfully or not.
    settled: u64,
}

impl Published {
    /// The settled generation that makes `generation` stale, if there is one.
    fn newer_than(&self, generation: u64) -> Option<u64> {
        (self.settled > generation).then_some(self.settled)
    }
}

/// The orchestrator of dashboard loads: fetch, estimate, derive, publish.
///
/// Each load gets a generation number when it starts. A load only settles (publishes
/// its snapshot or reports its failure) if no newer load has settled first, so a slow
/// fetch can never overwrite fresher data or undo a newer failure.
pub struct DashboardLoader {
    source: Arc<dyn SalesSource>,
    estimator: ElasticityEstimator,
    forecaster: SalesForecaster,
    promotions: PromotionAnalyzer,
    metrics: MetricsEngine,

    next_generation: AtomicU64,
    published: RwLock<Published>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardLoader {
    pub fn new(source: Arc<dyn SalesSource>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            estimator: ElasticityEstimator::new(config.estimation.clone()),
            forecaster: SalesForecaster::new(config.forecast.clone()),
            promotions: PromotionAnalyzer::new(),
            metrics: MetricsEngine::new(config.derivation.clone()),
            next_generation: AtomicU64::new(0),
            published: RwLock::new(Published::default()),
            events,
        }
    }

    /// Registers a new observer. It receives every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// The most recently published snapshot, if any load has completed.
    pub async fn latest(&self) -> Option<Arc<DashboardSnapshot>> {
        self.published.read().await.snapshot.clone()
    }

    /// Runs the analytics over a batch of sales without publishing anything.
    pub fn analyze(&self, sales: &[SalesObservation]) -> Result<Analysis, AnalyticsError> {
        let estimates = self.estimator.estimate(sales)?;
        let segmentation = self.estimator.segment(&estimates);
        let monthly = self.estimator.by_month(sales)?;
        let optimization = self.estimator.optimization(&estimates);
        let forecasts = self.forecaster.forecast(sales)?;
        let promotions = self.promotions.analyze(sales)?;
        let (metrics, recommendations) = self
            .metrics
            .derive_dashboard(&records_of(&estimates), &promotions)?;

        Ok(Analysis {
            estimates,
            segmentation,
            monthly,
            optimization,
            forecasts,
            promotions,
            metrics,
            recommendations,
        })
    }

    /// Performs one complete load and publishes its snapshot.
    pub async fn load(&self) -> Result<Arc<DashboardSnapshot>, LoadError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, "Dashboard load started.");
        self.emit(DashboardEvent::LoadStarted { generation });

        let result = match self.source.fetch_sales().await {
            Ok(sales) => self
                .analyze(&sales)
                .map_err(LoadError::from)
                .map(|analysis| self.snapshot(generation, &sales, analysis)),
            Err(e) => Err(LoadError::FetchFailure(e)),
        };

        match result {
            Ok(snapshot) => self.publish(snapshot).await,
            Err(e) => {
                self.report_failure(generation, &e).await;
                Err(e)
            }
        }
    }

    fn snapshot(
        &self,
        generation: u64,
        sales: &[SalesObservation],
        analysis: Analysis,
    ) -> Arc<DashboardSnapshot> {
        tracing::debug!(
            generation,
            observations = sales.len(),
            categories = analysis.estimates.len(),
            "Dashboard analysis complete."
        );
        Arc::new(DashboardSnapshot {
            generation,
            generated_at: Utc::now(),
            elasticity_data: records_of(&analysis.estimates),
            promotions_data: analysis.promotions,
            recommendations: analysis.recommendations,
            metrics: analysis.metrics,
        })
    }

    /// Compare-and-publish under the write lock.
    async fn publish(
        &self,
        snapshot: Arc<DashboardSnapshot>,
    ) -> Result<Arc<DashboardSnapshot>, LoadError> {
        let generation = snapshot.generation;
        let mut published = self.published.write().await;

        if let Some(latest) = published.newer_than(generation) {
            drop(published);
            tracing::warn!(generation, latest, "Dashboard load superseded; dropping its result.");
            self.emit(DashboardEvent::LoadSuperseded { generation, latest });
            return Err(LoadError::Superseded { generation, latest });
        }

        published.settled = generation;
        published.snapshot = Some(Arc::clone(&snapshot));
        drop(published);

        tracing::info!(
            generation,
            recommendations = snapshot.recommendations.len(),
            "Dashboard snapshot published."
        );
        self.emit(DashboardEvent::DashboardUpdated(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    async fn report_failure(&self, generation: u64, error: &LoadError) {
        let mut published = self.published.write().await;
        let latest = published.newer_than(generation);
        if latest.is_none() {
            published.settled = generation;
        }
        drop(published);

        match latest {
            Some(latest) => {
                tracing::warn!(generation, latest, error = %error, "Stale dashboard load failed.");
                self.emit(DashboardEvent::LoadSuperseded { generation, latest });
            }
            None => {
                tracing::error!(generation, error = %error, "Dashboard load failed.");
                self.emit(DashboardEvent::LoadFailed {
                    generation,
                    message: error.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: DashboardEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

