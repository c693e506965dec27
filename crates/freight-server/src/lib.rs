//! Process wiring for the freight marketplace server.
//!
//! Builds the [`Engine`] over a [`SqliteStore`] (which doubles as role
//! directory, commission table and conversation backend), hands domain events
//! to a [`BroadcastNotifier`], and mounts the JSON API under `/api`.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use freight_core::{
  collab::{DomainEvent, Notifier},
  commission::{RoleCommission, UserRole},
  engine::{Engine, EngineConfig},
  hierarchy::DEFAULT_HOP_LIMIT,
};
use freight_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// The engine as the server runs it.
pub type FreightEngine =
  Engine<SqliteStore, SqliteStore, SqliteStore, BroadcastNotifier>;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `FREIGHT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                      String,
  #[serde(default = "default_port")]
  pub port:                      u16,
  #[serde(default = "default_store_path")]
  pub store_path:                PathBuf,
  #[serde(default = "default_hop_limit")]
  pub hop_limit:                 usize,
  #[serde(default = "default_title_prefix")]
  pub conversation_title_prefix: String,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/freight/freight.db") }
fn default_hop_limit() -> usize { DEFAULT_HOP_LIMIT }
fn default_title_prefix() -> String { EngineConfig::default().conversation_title_prefix }

impl ServerConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      hop_limit:                 self.hop_limit,
      conversation_title_prefix: self.conversation_title_prefix.clone(),
    }
  }
}

// ─── Notifier ─────────────────────────────────────────────────────────────────

/// Fans domain events out to any number of in-process subscribers.
///
/// Events emitted while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct BroadcastNotifier {
  tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastNotifier {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
    self.tx.subscribe()
  }
}

impl Notifier for BroadcastNotifier {
  fn emit(&self, event: DomainEvent) {
    let name = event.name();
    match self.tx.send(event) {
      Ok(receivers) => tracing::debug!(event = name, receivers, "emitted"),
      Err(_) => tracing::debug!(event = name, "no subscribers; event dropped"),
    }
  }
}

/// Log every event seen on `rx` until the channel closes.
pub async fn log_events(mut rx: broadcast::Receiver<DomainEvent>) {
  loop {
    match rx.recv().await {
      Ok(event) => tracing::info!(name = event.name(), payload = ?event, "domain event"),
      Err(broadcast::error::RecvError::Lagged(skipped)) => {
        tracing::warn!(skipped, "event log fell behind");
      }
      Err(broadcast::error::RecvError::Closed) => break,
    }
  }
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

pub fn build_engine(
  store: SqliteStore,
  config: &ServerConfig,
  notifier: BroadcastNotifier,
) -> FreightEngine {
  Engine::new(
    store.clone(),
    store.clone(),
    store,
    notifier,
    config.engine_config(),
  )
}

/// Build the top-level axum [`Router`]: the JSON API nested under `/api`,
/// wrapped in request tracing.
pub fn router(engine: Arc<FreightEngine>) -> Router {
  Router::new()
    .nest("/api", freight_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

// ─── Policy seeding ───────────────────────────────────────────────────────────

/// One user-to-role assignment in a policy seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleAssignment {
  pub user_id:   Uuid,
  pub role_id:   String,
  pub role_name: String,
}

/// Contents of a policy seed file:
///
/// ```toml
/// [[roles]]
/// user_id   = "6f1c..."
/// role_id   = "carrier"
/// role_name = "Carrier"
///
/// [[commissions]]
/// role_id         = "carrier"
/// billing_cycle   = "monthly"
/// commission_type = "percentage"
/// percent         = 5.0
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySeed {
  #[serde(default)]
  pub roles:       Vec<RoleAssignment>,
  #[serde(default)]
  pub commissions: Vec<RoleCommission>,
}

/// Upsert every entry of `seed` into the policy tables.
pub async fn seed_policy(
  store: &SqliteStore,
  seed: PolicySeed,
) -> freight_store_sqlite::Result<()> {
  for assignment in seed.roles {
    store
      .assign_role(assignment.user_id, UserRole {
        role_id:   assignment.role_id,
        role_name: assignment.role_name,
      })
      .await?;
  }
  for rate in seed.commissions {
    tracing::info!(
      role_id = %rate.role_id,
      billing_cycle = %rate.billing_cycle,
      "setting commission rate"
    );
    store.set_role_commission(rate).await?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use freight_core::{
    application::ApplyRequest,
    commission::CommissionResolver,
    job::{BillingCycle, NewJob},
    service::FreightService,
  };
  use tower::ServiceExt as _;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  async fn engine(notifier: BroadcastNotifier) -> (SqliteStore, FreightEngine) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = build_engine(store.clone(), &parse(""), notifier);
    (store, engine)
  }

  #[test]
  fn config_defaults_fill_missing_keys() {
    let cfg = parse("port = 9000\nhop_limit = 3");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.engine_config().hop_limit, 3);
    assert_eq!(cfg.conversation_title_prefix, "Contract: ");
  }

  #[tokio::test]
  async fn notifier_delivers_to_subscribers() {
    let notifier = BroadcastNotifier::new(8);
    notifier.emit(DomainEvent::ContractCompleted {
      contract_id:  Uuid::new_v4(),
      job_id:       Uuid::new_v4(),
      main_earning: 0,
    });

    let mut rx = notifier.subscribe();
    let (_, engine) = engine(notifier.clone()).await;
    let poster = Uuid::new_v4();
    let driver = Uuid::new_v4();
    let job = engine
      .create_job(NewJob::new(poster, "Reefer to Boise", 700).auto())
      .await
      .unwrap();
    engine
      .apply_for_job(ApplyRequest::new(driver, job.job_id))
      .await
      .unwrap();

    match rx.recv().await.unwrap() {
      DomainEvent::JobAssigned { job_id, driver_id, .. } => {
        assert_eq!(job_id, job.job_id);
        assert_eq!(driver_id, driver);
      }
      other => panic!("unexpected event {other:?}"),
    }
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let (_, engine) = engine(BroadcastNotifier::new(8)).await;
    let app = router(Arc::new(engine));

    let req = Request::builder()
      .method("GET")
      .uri(format!("/api/jobs/{}", Uuid::new_v4()))
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["error"]["kind"], "not_found");

    let req = Request::builder()
      .method("POST")
      .uri("/api/jobs")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn seeded_policy_is_visible_to_the_resolver() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let carrier = Uuid::new_v4();
    let seed: PolicySeed = config::Config::builder()
      .add_source(config::File::from_str(
        &format!(
          r#"
[[roles]]
user_id   = "{carrier}"
role_id   = "carrier"
role_name = "Carrier"

[[commissions]]
role_id         = "carrier"
billing_cycle   = "weekly"
commission_type = "fixed_amount"
fixed_amount    = 40
"#
        ),
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    seed_policy(&store, seed).await.unwrap();

    let resolver = CommissionResolver::new(store.clone());
    let rate = resolver
      .resolve(carrier, BillingCycle::Weekly)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(rate.fixed_amount, 40);
    assert!(
      resolver
        .resolve(carrier, BillingCycle::Monthly)
        .await
        .unwrap()
        .is_none()
    );
  }
}
