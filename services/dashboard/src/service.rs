//! Dashboard aggregation service
//!
//! One method per dashboard view: parse and bound the caller's identifiers,
//! run the orchestrated store queries, then shape the payload. Requests share
//! nothing mutable; the collaborators are read-only from here.

use crate::error::{DashboardError, Result};
use crate::orchestrator::QueryOrchestrator;
use crate::providers::{
    ConfiguredTiers, LatestEpochSource, PriceSource, RequestContext,
    StaticPrices, TierPolicy,
};
use crate::shaper::{
    ChartPoint, DashboardSummary, DisplayCurrency, ProposalHistoryRow, ProposalPoint,
    ResponseShaper, ValidatorEarnings, ValidatorsTable,
};
use crate::store::{RelationalStore, WideColumnStore};
use dashboard_config::DashboardConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use types::{ChainClock, Currency, GraffitiwallPixel, IdentifierSet};

/// Query string shared by all dashboard data routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    /// Comma-separated validator indices
    pub validators: Option<String>,
    /// Display currency code
    pub currency: Option<String>,
}

/// Everything the service reads from outside
pub struct Collaborators {
    pub relational: Arc<dyn RelationalStore>,
    pub metrics: Arc<dyn WideColumnStore>,
    pub prices: Arc<dyn PriceSource>,
    pub tiers: Arc<dyn TierPolicy>,
    pub latest_epoch: Arc<dyn LatestEpochSource>,
}

pub struct DashboardService {
    orchestrator: QueryOrchestrator,
    shaper: ResponseShaper,
    prices: Arc<dyn PriceSource>,
    tiers: Arc<dyn TierPolicy>,
    latest_epoch: Arc<dyn LatestEpochSource>,
    default_currency: Currency,
}

impl DashboardService {
    pub fn new(
        collaborators: Collaborators,
        clock: ChainClock,
        default_currency: Currency,
        query_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator: QueryOrchestrator::new(
                collaborators.relational,
                collaborators.metrics,
                query_timeout,
            ),
            shaper: ResponseShaper::new(clock),
            prices: collaborators.prices,
            tiers: collaborators.tiers,
            latest_epoch: collaborators.latest_epoch,
            default_currency,
        }
    }

    /// Wire the configured collaborators around the given stores and head
    pub fn from_config(
        config: &DashboardConfig,
        relational: Arc<dyn RelationalStore>,
        metrics: Arc<dyn WideColumnStore>,
        latest_epoch: Arc<dyn LatestEpochSource>,
    ) -> Self {
        let clock = config.chain_clock();
        let collaborators = Collaborators {
            relational,
            metrics,
            prices: Arc::new(StaticPrices::from_settings(&config.currency)),
            tiers: Arc::new(ConfiguredTiers::from_settings(&config.limits)),
            latest_epoch,
        };

        Self::new(
            collaborators,
            clock,
            Currency::new(&config.currency.default),
            Duration::from_millis(config.storage.query_timeout_ms),
        )
    }

    pub fn validator_limit(&self, ctx: &RequestContext) -> usize {
        self.tiers.max_validators(ctx)
    }

    fn parse_validators(&self, ctx: &RequestContext, query: &DashboardQuery) -> Result<IdentifierSet> {
        let limit = self.validator_limit(ctx);
        let raw = query.validators.as_deref().unwrap_or("");
        let validators = IdentifierSet::parse(raw, limit)?;
        debug!(
            request_id = %ctx.request_id,
            count = validators.len(),
            limit,
            "parsed validator set"
        );
        Ok(validators)
    }

    /// Requested currency when it has a rate, otherwise the default
    pub fn display_currency(&self, requested: Option<&str>) -> DisplayCurrency {
        if let Some(currency) = requested.map(Currency::new) {
            if let Some(rate) = self.prices.rate(&currency) {
                return DisplayCurrency::new(currency, rate);
            }
        }
        match self.prices.rate(&self.default_currency) {
            Some(rate) => DisplayCurrency::new(self.default_currency.clone(), rate),
            None => DisplayCurrency::native(),
        }
    }

    pub async fn income_history(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<Vec<ChartPoint>> {
        let validators = self.parse_validators(ctx, query)?;
        if validators.is_empty() {
            return Err(DashboardError::EmptyIdentifierSet);
        }
        let display = self.display_currency(query.currency.as_deref());

        let history = self.orchestrator.income_history(&validators).await?;
        Ok(self.shaper.income_chart(&history, &display))
    }

    pub async fn proposals(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<Vec<ProposalPoint>> {
        let validators = self.parse_validators(ctx, query)?;
        let proposals = self.orchestrator.proposals(&validators).await?;
        Ok(self.shaper.proposals(&proposals))
    }

    pub async fn validators_table(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<ValidatorsTable> {
        let validators = self.parse_validators(ctx, query)?;
        let display = self.display_currency(query.currency.as_deref());
        let limit = self.validator_limit(ctx);

        let records = self
            .orchestrator
            .validator_snapshot(&validators, limit)
            .await?;
        let latest_epoch = self.latest_epoch.latest_epoch();
        Ok(self
            .shaper
            .validators_table(&records, latest_epoch, &display))
    }

    pub async fn earnings(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<ValidatorEarnings> {
        let validators = self.parse_validators(ctx, query)?;
        let display = self.display_currency(query.currency.as_deref());

        let snapshot = self.orchestrator.earnings(&validators).await?;
        Ok(self.shaper.earnings(snapshot, &display))
    }

    pub async fn effectiveness(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<Vec<f64>> {
        let validators = self.parse_validators(ctx, query)?;
        let latest_epoch = self.latest_epoch.latest_epoch();

        let result = self
            .orchestrator
            .effectiveness(&validators, latest_epoch)
            .await?;
        Ok(self.shaper.effectiveness(&result))
    }

    pub async fn proposal_history(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<Vec<ProposalHistoryRow>> {
        let validators = self.parse_validators(ctx, query)?;
        let rows = self.orchestrator.proposal_history(&validators).await?;
        Ok(self.shaper.proposal_history(&rows))
    }

    /// Validators table and proposal history from one request
    pub async fn summary(
        &self,
        ctx: &RequestContext,
        query: &DashboardQuery,
    ) -> Result<DashboardSummary> {
        let validators = self.parse_validators(ctx, query)?;
        let display = self.display_currency(query.currency.as_deref());
        let limit = self.validator_limit(ctx);

        let (records, history) = self
            .orchestrator
            .snapshot_and_history(&validators, limit)
            .await?;
        let latest_epoch = self.latest_epoch.latest_epoch();
        Ok(self
            .shaper
            .summary(&records, &history, latest_epoch, &display))
    }

    pub async fn graffitiwall(&self) -> Result<Vec<GraffitiwallPixel>> {
        self.orchestrator.graffitiwall().await
    }
}
