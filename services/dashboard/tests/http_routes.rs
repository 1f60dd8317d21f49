//! HTTP Route Tests
//!
//! Drives the full warp filter tree against an in-memory store:
//! - identifier parsing and tier limits surface as 400s
//! - store failures surface as opaque 503s
//! - payload shapes match what the dashboard views render

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use types::{
    ChainClock, Currency, DailyIncome, EarningsSnapshot, EffectivenessSample, GraffitiwallPixel,
    ProposalHistoryRecord, ProposalRecord, ProposalStatus, ValidatorRecord, FAR_FUTURE_EPOCH,
};
use validator_dashboard::server::{CURRENCY_COOKIE, TIER_HEADER};
use validator_dashboard::{
    routes, Collaborators, ConfiguredTiers, DashboardService, MemoryStore, SharedLatestEpoch,
    StaticPrices, StoreError,
};
use warp::http::StatusCode;

const LATEST_EPOCH: u64 = 100;
const GWEI: i64 = 1_000_000_000;

struct Fixture {
    store: Arc<MemoryStore>,
    service: Arc<DashboardService>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(DashboardService::new(
            Collaborators {
                relational: store.clone(),
                metrics: store.clone(),
                prices: Arc::new(StaticPrices::new([("ETH", 1.0), ("USD", 2000.0)])),
                tiers: Arc::new(ConfiguredTiers::new(
                    3,
                    HashMap::from([("whale".to_string(), 5)]),
                )),
                latest_epoch: Arc::new(SharedLatestEpoch::new(LATEST_EPOCH)),
            },
            ChainClock::mainnet(),
            Currency::native(),
            Duration::from_millis(500),
        ));
        Self { store, service }
    }

    async fn get(&self, path: &str) -> (StatusCode, String) {
        self.request(warp::test::request().path(path)).await
    }

    async fn request(&self, request: warp::test::RequestBuilder) -> (StatusCode, String) {
        let res = request.reply(&routes(self.service.clone())).await;
        let body = String::from_utf8_lossy(res.body()).to_string();
        (res.status(), body)
    }

    async fn get_json(&self, path: &str) -> Value {
        let (status, body) = self.get(path).await;
        assert_eq!(status, StatusCode::OK, "{} returned {}", path, body);
        serde_json::from_str(&body).unwrap()
    }
}

fn active_validator(index: u64) -> ValidatorRecord {
    let mut record = ValidatorRecord::new(index, vec![index as u8; 4])
        .with_raw_lifecycle(1, FAR_FUTURE_EPOCH, FAR_FUTURE_EPOCH);
    record.balance = 32 * GWEI;
    record.effective_balance = 32 * GWEI;
    record.status = "active_online".to_string();
    record
}

#[tokio::test]
async fn test_malformed_identifier_is_rejected() {
    let fixture = Fixture::new();
    let (status, body) = fixture
        .request(
            warp::test::request()
                .path("/dashboard/data/proposals?validators=5,5,12,abc")
                .header(TIER_HEADER, "whale"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid query");
}

#[tokio::test]
async fn test_tier_header_raises_limit() {
    let fixture = Fixture::new();

    let (status, _) = fixture
        .get("/dashboard/data/proposals?validators=1,2,3,4")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = fixture
        .request(
            warp::test::request()
                .path("/dashboard/data/proposals?validators=1,2,3,4")
                .header(TIER_HEADER, "whale"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_limit_route_reports_tier_limit() {
    let fixture = Fixture::new();
    assert_eq!(
        fixture.get_json("/dashboard/data/limit").await,
        json!({ "validatorLimit": 3 })
    );

    let (_, body) = fixture
        .request(
            warp::test::request()
                .path("/dashboard/data/limit")
                .header(TIER_HEADER, "Whale"),
        )
        .await;
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "validatorLimit": 5 })
    );
}

#[tokio::test]
async fn test_proposals_filtered_and_ordered_by_slot() {
    let fixture = Fixture::new();
    for (proposer, slot, status) in [
        (5, 40, ProposalStatus::Executed),
        (7, 20, ProposalStatus::Executed),
        (12, 10, ProposalStatus::Missed),
    ] {
        fixture.store.insert_block(ProposalRecord {
            proposer,
            slot,
            status,
        });
    }

    let clock = ChainClock::mainnet();
    let body = fixture
        .get_json("/dashboard/data/proposals?validators=5,12")
        .await;
    assert_eq!(
        body,
        json!([[clock.slot_to_time(10), 2], [clock.slot_to_time(40), 1]])
    );
}

#[tokio::test]
async fn test_validators_table_renders_unset_exit_as_null() {
    let fixture = Fixture::new();
    fixture.store.insert_validator(active_validator(5));

    let body = fixture
        .get_json("/dashboard/data/validators?validators=5")
        .await;
    assert_eq!(body["latestEpoch"], json!(LATEST_EPOCH));

    let row = &body["data"][0];
    assert_eq!(row[1], json!("5"));
    assert_eq!(row[2], json!(["32.0000 ETH", "32.0 ETH"]));
    assert!(row[4].is_array());
    assert!(row[5].is_null());
    assert!(row[6].is_null());
}

#[tokio::test]
async fn test_effectiveness_without_active_validators() {
    let fixture = Fixture::new();
    fixture
        .store
        .insert_validator(ValidatorRecord::new(9, vec![9]).with_raw_lifecycle(50, 60, 300));

    let (status, body) = fixture
        .get("/dashboard/data/effectiveness?validators=9")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid query");
}

#[tokio::test]
async fn test_effectiveness_returns_completed_epoch_samples() {
    let fixture = Fixture::new();
    fixture.store.insert_validator(active_validator(5));
    fixture.store.insert_effectiveness(EffectivenessSample {
        validator_index: 5,
        epoch: LATEST_EPOCH - 1,
        attestation_efficiency: 0.75,
    });

    assert_eq!(
        fixture
            .get_json("/dashboard/data/effectiveness?validators=5")
            .await,
        json!([0.75])
    );
}

#[tokio::test]
async fn test_store_failure_is_opaque() {
    let fixture = Fixture::new();
    fixture
        .store
        .set_failure(Some(StoreError::Unavailable("connection refused".into())));

    let (status, body) = fixture
        .get("/dashboard/data/validators?validators=5")
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Internal server error");
}

#[tokio::test]
async fn test_earnings_zeroed_without_data() {
    let fixture = Fixture::new();
    let body = fixture
        .get_json("/dashboard/data/earnings?validators=5")
        .await;
    assert_eq!(body["lastDay"], json!(0.0));
    assert_eq!(body["total"], json!(0.0));
    assert_eq!(body["apr"], json!(0.0));
}

#[tokio::test]
async fn test_earnings_currency_from_query_and_cookie() {
    let fixture = Fixture::new();
    fixture.store.set_earnings(
        5,
        EarningsSnapshot {
            last_day: GWEI,
            last_week: 7 * GWEI,
            last_month: 30 * GWEI,
            total: 40 * GWEI,
            total_deposits: 32 * GWEI,
        },
    );

    let native = fixture
        .get_json("/dashboard/data/earnings?validators=5")
        .await;
    assert_eq!(native["lastDay"], json!(1.0));
    assert_eq!(native["lastDayFormatted"], json!("+1.0000 ETH"));

    let usd = fixture
        .get_json("/dashboard/data/earnings?validators=5&currency=usd")
        .await;
    assert_eq!(usd["lastDay"], json!(2000.0));
    assert_eq!(usd["lastDayFormatted"], json!("+2000.00 USD"));

    let cookie = format!("{}=USD", CURRENCY_COOKIE);
    let (_, body) = fixture
        .request(
            warp::test::request()
                .path("/dashboard/data/earnings?validators=5")
                .header("cookie", cookie.as_str()),
        )
        .await;
    let from_cookie: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(from_cookie["lastDay"], json!(2000.0));

    let (_, body) = fixture
        .request(
            warp::test::request()
                .path("/dashboard/data/earnings?validators=5&currency=ETH")
                .header("cookie", cookie.as_str()),
        )
        .await;
    let query_wins: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(query_wins["lastDay"], json!(1.0));
}

#[tokio::test]
async fn test_balance_requires_validators() {
    let fixture = Fixture::new();
    let (status, _) = fixture.get("/dashboard/data/balance").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_balance_chart_colors_by_sign() {
    let fixture = Fixture::new();
    fixture
        .store
        .insert_daily_income(5, DailyIncome { day: 1, income: GWEI });
    fixture
        .store
        .insert_daily_income(5, DailyIncome { day: 2, income: -GWEI });

    let body = fixture
        .get_json("/dashboard/data/balance?validators=5")
        .await;
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["y"], json!(1.0));
    assert_eq!(points[0]["color"], json!("#7cb5ec"));
    assert_eq!(points[1]["y"], json!(-1.0));
    assert_eq!(points[1]["color"], json!("#f7a35c"));
}

#[tokio::test]
async fn test_proposal_history_newest_day_first() {
    let fixture = Fixture::new();
    for (day, proposed) in [(3, Some(1)), (7, Some(2)), (5, None)] {
        fixture.store.insert_validator_stats(ProposalHistoryRecord {
            validator_index: 5,
            day,
            proposed,
            missed: None,
            orphaned: None,
        });
    }

    let clock = ChainClock::mainnet();
    let body = fixture
        .get_json("/dashboard/data/proposalshistory?validators=5")
        .await;
    assert_eq!(
        body,
        json!([
            [5, clock.day_to_time(7), 2, 0, 0],
            [5, clock.day_to_time(3), 1, 0, 0]
        ])
    );
}

#[tokio::test]
async fn test_summary_combines_table_and_history() {
    let fixture = Fixture::new();
    fixture.store.insert_validator(active_validator(5));
    fixture.store.insert_validator_stats(ProposalHistoryRecord {
        validator_index: 5,
        day: 1,
        proposed: Some(1),
        missed: None,
        orphaned: None,
    });

    let body = fixture
        .get_json("/dashboard/data/summary?validators=5")
        .await;
    assert_eq!(body["latestEpoch"], json!(LATEST_EPOCH));
    assert_eq!(body["validators"].as_array().unwrap().len(), 1);
    assert_eq!(body["proposalHistory"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_summary_fails_when_either_query_fails() {
    let fixture = Fixture::new();
    fixture.store.insert_validator(active_validator(5));
    fixture
        .store
        .fail_query("proposal_history", StoreError::Query("timeout".into()));

    let (status, body) = fixture.get("/dashboard/data/summary?validators=5").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Internal server error");
}

#[tokio::test]
async fn test_validators_table_defaults_missing_side_data() {
    let fixture = Fixture::new();
    fixture.store.insert_validator(active_validator(5));
    fixture.store.insert_validator(active_validator(6));
    fixture.store.set_performance(5, GWEI / 10);

    let body = fixture
        .get_json("/dashboard/data/validators?validators=5,6")
        .await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][9], json!("+0.1000 ETH"));
    assert_eq!(rows[1][1], json!("6"));
    assert_eq!(rows[1][9], json!("0 ETH"));
}

#[tokio::test]
async fn test_graffitiwall_lists_pixels() {
    let fixture = Fixture::new();
    fixture.store.insert_graffiti(GraffitiwallPixel {
        x: 10,
        y: 20,
        color: "ff0000".to_string(),
        slot: 1234,
        validator: 5,
    });

    let body = fixture.get_json("/graffitiwall/data").await;
    assert_eq!(body[0]["x"], json!(10));
    assert_eq!(body[0]["color"], json!("ff0000"));
}

#[tokio::test]
async fn test_status_route() {
    let fixture = Fixture::new();
    let body = fixture.get_json("/status").await;
    assert_eq!(body["status"], json!("running"));
}
