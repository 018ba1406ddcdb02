//! Admin dashboard controller.
//!
//! State lives behind a session mutex. Every fetch follows the same shape: lock,
//! take a ticket and build the request, unlock, await the backend, lock again and
//! complete. A completion whose ticket was superseded is dropped.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::{
        CreditApi,
        types::{
            ApplicationList, ApplicationRecord, FraudCheckResponse, NetworkResponse,
            SearchResponse, SearchStats, SimilarClient, TemporalResponse,
        },
    },
    cache::{QueryCache, query_key},
    fetch::{FallbackPolicy, fetch_with},
    model::{ClientData, PartialClientData},
    panels::{
        Panel, PanelState, Ticket,
        counterfactual::{CounterfactualPanel, CounterfactualView, DeltaField},
        fraud::FraudSummary,
        galaxy::{self, Orb},
        search::{SearchSummary, SimilarRow, StatCard, similar_rows, stat_cards},
        temporal::{Metric, Series, TemporalAnalysis},
        trust_network::{self, NetworkStats, TrustGraph},
    },
    scene::{Scene, SceneAdapter, SceneEvent, reconcile},
};

#[derive(Debug, Error, PartialEq)]
pub enum DashboardError {
    #[error("no application selected")]
    NoApplicationSelected,

    #[error("unknown application: {0}")]
    UnknownApplication(String),

    #[error("client {0} is not among the current search results")]
    UnknownSimilarClient(String),

    #[error("run a similarity search first")]
    SearchNotRun,
}

/// Backend access shared by every dashboard operation.
#[derive(Clone, Copy)]
pub struct DashboardContext<'a> {
    pub api: &'a dyn CreditApi,
    pub cache: &'a QueryCache,
    pub top_k: usize,
    pub applications_limit: usize,
    pub synthetic_fallback: bool,
}

/// Search payload for an application: its T0 snapshot fields, defaults where missing.
pub fn client_data_for(record: &ApplicationRecord) -> ClientData {
    ClientData::from(PartialClientData {
        archetype: record.archetype,
        debt_ratio: record.debt_ratio,
        years_active: record.years_active,
        income_stability: record.income_stability,
        payment_regularity: record.payment_regularity,
        monthly_income: record.monthly_income,
    })
}

#[derive(Default)]
pub struct AdminDashboard {
    applications: Panel<ApplicationList>,
    stats: Panel<SearchStats>,
    selected_application: Option<String>,
    client_data: Option<ClientData>,
    search_triggered: bool,
    search: Panel<SearchResponse>,
    selected_similar: Option<String>,
    hovered: Option<String>,
    temporal: Panel<TemporalResponse>,
    metric: Metric,
    network: Panel<NetworkResponse>,
    counterfactual: CounterfactualPanel,
    fraud: Panel<FraudCheckResponse>,
    galaxy_scene: Scene,
    network_scene: Scene,
}

impl AdminDashboard {
    pub fn selected_application(&self) -> Option<&str> {
        self.selected_application.as_deref()
    }

    pub fn selected_similar(&self) -> Option<&str> {
        self.selected_similar.as_deref()
    }

    pub fn client_data(&self) -> Option<ClientData> {
        self.client_data
    }

    pub fn search_triggered(&self) -> bool {
        self.search_triggered
    }

    pub fn applications(&self) -> &[ApplicationRecord] {
        self.applications
            .state()
            .data()
            .map(|list| list.applications.as_slice())
            .unwrap_or_default()
    }

    pub fn search_state(&self) -> &PanelState<SearchResponse> {
        self.search.state()
    }

    pub fn temporal_state(&self) -> &PanelState<TemporalResponse> {
        self.temporal.state()
    }

    pub fn network_state(&self) -> &PanelState<NetworkResponse> {
        self.network.state()
    }

    pub fn fraud_state(&self) -> &PanelState<FraudCheckResponse> {
        self.fraud.state()
    }

    pub fn stats_state(&self) -> &PanelState<SearchStats> {
        self.stats.state()
    }

    pub fn counterfactual(&self) -> &CounterfactualPanel {
        &self.counterfactual
    }

    fn similar_clients(&self) -> &[SimilarClient] {
        self.search
            .state()
            .data()
            .map(|resp| resp.similar_clients.as_slice())
            .unwrap_or_default()
    }

    /// Pick an application: derive its search payload and clear everything downstream.
    pub fn select_application(&mut self, client_id: &str) -> Result<ClientData, DashboardError> {
        let record = self
            .applications()
            .iter()
            .find(|r| r.client_id == client_id)
            .ok_or_else(|| DashboardError::UnknownApplication(client_id.to_string()))?;
        let client_data = client_data_for(record);

        self.selected_application = Some(client_id.to_string());
        self.client_data = Some(client_data);
        self.search_triggered = false;
        self.search.reset();
        self.selected_similar = None;
        self.hovered = None;
        self.temporal.reset();
        self.network.reset();
        self.fraud.reset();
        self.counterfactual.set_base(client_data);
        info!(client_id, "application selected");
        Ok(client_data)
    }

    fn begin_network(&mut self) -> Result<NetworkJob, DashboardError> {
        let center = self
            .selected_application
            .clone()
            .ok_or(DashboardError::NoApplicationSelected)?;
        let similar = self
            .search
            .state()
            .data()
            .map(|resp| resp.similar_clients.clone())
            .ok_or(DashboardError::SearchNotRun)?;
        Ok(NetworkJob {
            ticket: self.network.begin(),
            center,
            similar,
        })
    }

    pub fn set_metric(&mut self, metric: Metric) {
        self.metric = metric;
    }

    pub fn set_counterfactual_delta(&mut self, field: DeltaField, value: f64) -> f64 {
        self.counterfactual.set_delta(field, value)
    }

    pub fn reset_counterfactual(&mut self) {
        self.counterfactual.reset();
    }

    /// Hover events are handled here; a selection is returned for [`select_similar`].
    pub fn handle_scene_event(&mut self, event: SceneEvent) -> Option<String> {
        match event {
            SceneEvent::Select(id) => Some(id),
            SceneEvent::HoverIn(id) => {
                self.hovered = Some(id);
                None
            }
            SceneEvent::HoverOut(id) => {
                if self.hovered.as_deref() == Some(id.as_str()) {
                    self.hovered = None;
                }
                None
            }
        }
    }

    pub fn galaxy_scene(&self) -> Scene {
        galaxy::scene(
            self.similar_clients(),
            self.hovered.as_deref(),
            self.selected_similar.as_deref(),
        )
    }

    pub fn network_scene(&self) -> Scene {
        match self.network.state().data() {
            Some(resp) => TrustGraph::from_response(resp.clone()).scene(self.selected_similar.as_deref()),
            None => Scene::new(),
        }
    }

    /// Bring a renderer up to date with the current galaxy. Returns the patch count.
    pub fn sync_galaxy<A: SceneAdapter + ?Sized>(&mut self, adapter: &mut A) -> usize {
        let next = self.galaxy_scene();
        reconcile(&mut self.galaxy_scene, next, adapter)
    }

    pub fn sync_network<A: SceneAdapter + ?Sized>(&mut self, adapter: &mut A) -> usize {
        let next = self.network_scene();
        reconcile(&mut self.network_scene, next, adapter)
    }

    pub fn view(&self) -> DashboardView {
        let temporal = self.temporal.state().map(TemporalAnalysis::from_response);
        let series = temporal
            .data()
            .and_then(|analysis| analysis.as_ref())
            .map(|analysis| analysis.series(self.metric));
        let network = self.network.state().map(|resp| {
            let graph = TrustGraph::from_response(resp.clone());
            NetworkView {
                stats: graph.stats(),
                graph: resp.clone(),
            }
        });

        DashboardView {
            applications: self.applications.state().map(|list| {
                list.applications
                    .iter()
                    .map(|r| ApplicationRow::from_record(r, self.selected_application.as_deref()))
                    .collect()
            }),
            stats: stat_cards(self.stats.state().data()),
            selected_application: self.selected_application.clone(),
            client_data: self.client_data,
            search_triggered: self.search_triggered,
            search: self.search.state().map(|resp| SearchSummary::from(resp)),
            similar: similar_rows(self.similar_clients(), self.selected_similar.as_deref()),
            selected_similar: self.selected_similar.clone(),
            galaxy: galaxy::layout(self.similar_clients()),
            temporal,
            metric: self.metric,
            series,
            network,
            counterfactual: self.counterfactual.view(),
            fraud: self.fraud.state().map(|resp| FraudSummary::from(resp)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationRow {
    pub client_id: String,
    pub date: String,
    pub archetype: String,
    pub risk_percent: Option<u32>,
    pub status: String,
    pub selected: bool,
}

impl ApplicationRow {
    fn from_record(record: &ApplicationRecord, selected: Option<&str>) -> Self {
        Self {
            client_id: record.client_id.clone(),
            date: record
                .date
                .as_deref()
                .or(record.timestamp.as_deref())
                .map(display_date)
                .unwrap_or_default(),
            archetype: record
                .archetype
                .map(|a| a.label().to_string())
                .unwrap_or_default(),
            risk_percent: record
                .risk_score
                .map(|r| (r.clamp(0.0, 1.0) * 100.0).round() as u32),
            status: record.status.clone().unwrap_or_else(|| "pending".to_string()),
            selected: selected == Some(record.client_id.as_str()),
        }
    }
}

/// Calendar date of a backend timestamp; anything unparseable is shown as sent.
fn display_date(raw: &str) -> String {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return at.date_naive().to_string();
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return at.date().to_string();
    }
    raw.to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkView {
    pub stats: NetworkStats,
    pub graph: NetworkResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub applications: PanelState<Vec<ApplicationRow>>,
    pub stats: Vec<StatCard>,
    pub selected_application: Option<String>,
    pub client_data: Option<ClientData>,
    pub search_triggered: bool,
    pub search: PanelState<SearchSummary>,
    pub similar: Vec<SimilarRow>,
    pub selected_similar: Option<String>,
    pub galaxy: Vec<Orb>,
    pub temporal: PanelState<Option<TemporalAnalysis>>,
    pub metric: Metric,
    pub series: Option<Series>,
    pub network: PanelState<NetworkView>,
    pub counterfactual: CounterfactualView,
    pub fraud: PanelState<FraudSummary>,
}

pub async fn load_applications(ctx: DashboardContext<'_>, dash: &Mutex<AdminDashboard>) -> bool {
    let ticket = dash.lock().await.applications.begin();
    let result = fetch_with(
        "applications.list",
        ctx.api.list_applications(ctx.applications_limit),
        FallbackPolicy::Surface,
    )
    .await;
    dash.lock().await.applications.complete(ticket, result)
}

pub async fn load_stats(ctx: DashboardContext<'_>, dash: &Mutex<AdminDashboard>) -> bool {
    let ticket = dash.lock().await.stats.begin();
    let api = ctx.api;
    let result = fetch_with(
        "search.stats",
        ctx.cache.fetch("search.stats", || api.search_stats()),
        FallbackPolicy::Surface,
    )
    .await;
    dash.lock().await.stats.complete(ticket, result)
}

/// Similarity search for the selected application, then a trust network over the results.
pub async fn run_search(
    ctx: DashboardContext<'_>,
    dash: &Mutex<AdminDashboard>,
) -> Result<bool, DashboardError> {
    let (ticket, payload) = {
        let mut state = dash.lock().await;
        let payload = state.client_data.ok_or(DashboardError::NoApplicationSelected)?;
        state.search_triggered = true;
        (state.search.begin(), payload)
    };

    let api = ctx.api;
    let top_k = ctx.top_k;
    let key = query_key("search.similar", &(payload, top_k));
    let result = fetch_with(
        "search.similar",
        ctx.cache.fetch(&key, || api.search_similar(&payload, top_k)),
        FallbackPolicy::Surface,
    )
    .await;

    // the network request is taken under the same lock the results land in
    let job = {
        let mut state = dash.lock().await;
        if !state.search.complete(ticket, result) {
            return Ok(false);
        }
        state.selected_similar = None;
        state.hovered = None;
        state.temporal.reset();
        state.counterfactual.set_base(payload);
        if state.search.state().data().is_none() {
            return Ok(true);
        }
        match state.begin_network() {
            Ok(job) => job,
            Err(err) => {
                warn!(error = %err, "trust network not rebuilt after search");
                return Ok(true);
            }
        }
    };
    build_network(ctx, dash, job).await;
    Ok(true)
}

/// Rebuild the trust network for the selected application and current similar set.
pub async fn refresh_network(
    ctx: DashboardContext<'_>,
    dash: &Mutex<AdminDashboard>,
) -> Result<bool, DashboardError> {
    let job = dash.lock().await.begin_network()?;
    Ok(build_network(ctx, dash, job).await)
}

/// Network request captured while the session is locked.
struct NetworkJob {
    ticket: Ticket,
    center: String,
    similar: Vec<SimilarClient>,
}

async fn build_network(ctx: DashboardContext<'_>, dash: &Mutex<AdminDashboard>, job: NetworkJob) -> bool {
    let NetworkJob {
        ticket,
        center,
        similar,
    } = job;
    let request = trust_network::build_request(&center, &similar);
    let policy = if ctx.synthetic_fallback {
        FallbackPolicy::synthesize(move || trust_network::synthesize(&center, &similar))
    } else {
        FallbackPolicy::Surface
    };
    let result = fetch_with("network.build", ctx.api.build_network(&request), policy).await;
    dash.lock().await.network.complete(ticket, result)
}

/// Focus one similar client. Only the temporal and counterfactual panels change.
pub async fn select_similar(
    ctx: DashboardContext<'_>,
    dash: &Mutex<AdminDashboard>,
    client_id: &str,
) -> Result<bool, DashboardError> {
    let ticket = {
        let mut state = dash.lock().await;
        let similar = state
            .similar_clients()
            .iter()
            .find(|c| c.client_id == client_id)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownSimilarClient(client_id.to_string()))?;
        let applicant = state.client_data.unwrap_or_default();
        state.selected_similar = Some(client_id.to_string());
        state.counterfactual.set_base(ClientData {
            debt_ratio: similar.debt_ratio,
            years_active: similar.years_active,
            ..applicant
        });
        state.temporal.begin()
    };
    debug!(client_id, "similar client selected");

    let result = fetch_with(
        "temporal.history",
        ctx.api.temporal(client_id),
        FallbackPolicy::LogAndIgnore,
    )
    .await;
    Ok(dash.lock().await.temporal.complete(ticket, result))
}

pub async fn run_counterfactual(ctx: DashboardContext<'_>, dash: &Mutex<AdminDashboard>) -> bool {
    let (ticket, request) = dash.lock().await.counterfactual.begin();
    let result = fetch_with(
        "counterfactual.analyze",
        ctx.api.analyze_counterfactual(&request),
        FallbackPolicy::Surface,
    )
    .await;
    dash.lock().await.counterfactual.complete(ticket, result)
}

pub async fn run_fraud_check(
    ctx: DashboardContext<'_>,
    dash: &Mutex<AdminDashboard>,
) -> Result<bool, DashboardError> {
    let (ticket, payload) = {
        let mut state = dash.lock().await;
        let payload = state.client_data.ok_or(DashboardError::NoApplicationSelected)?;
        (state.fraud.begin(), payload)
    };
    let result = fetch_with(
        "fraud.check",
        ctx.api.check_fraud(&payload),
        FallbackPolicy::Surface,
    )
    .await;
    Ok(dash.lock().await.fraud.complete(ticket, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::types::ApplicationRecord, fetch::Fetched, model::Archetype};

    fn record(id: &str) -> ApplicationRecord {
        ApplicationRecord {
            client_id: id.into(),
            archetype: Some(Archetype::Craftsman),
            years_active: Some(8.0),
            risk_score: Some(0.42),
            ..ApplicationRecord::default()
        }
    }

    fn loaded(ids: &[&str]) -> AdminDashboard {
        let mut dash = AdminDashboard::default();
        let ticket = dash.applications.begin();
        dash.applications.complete(
            ticket,
            Ok(Fetched::Live(ApplicationList {
                applications: ids.iter().map(|id| record(id)).collect(),
                total: None,
            })),
        );
        dash
    }

    #[test]
    fn selecting_application_derives_payload_with_defaults() {
        let mut dash = loaded(&["CLIENT_A"]);
        let data = dash.select_application("CLIENT_A").unwrap();
        assert_eq!(data.archetype, Archetype::Craftsman);
        assert_eq!(data.years_active, 8.0);
        assert_eq!(data.debt_ratio, 0.45);
        assert!(!dash.search_triggered());
        assert_eq!(dash.counterfactual().base(), Some(&data));
    }

    #[test]
    fn unknown_application_is_rejected() {
        let mut dash = loaded(&["CLIENT_A"]);
        assert_eq!(
            dash.select_application("CLIENT_Z"),
            Err(DashboardError::UnknownApplication("CLIENT_Z".into()))
        );
        assert!(dash.selected_application().is_none());
    }

    #[test]
    fn hover_events_track_a_single_orb() {
        let mut dash = AdminDashboard::default();
        assert_eq!(dash.handle_scene_event(SceneEvent::HoverIn("A".into())), None);
        dash.handle_scene_event(SceneEvent::HoverOut("B".into()));
        assert_eq!(dash.hovered.as_deref(), Some("A"));
        dash.handle_scene_event(SceneEvent::HoverOut("A".into()));
        assert!(dash.hovered.is_none());
        assert_eq!(
            dash.handle_scene_event(SceneEvent::Select("A".into())),
            Some("A".into())
        );
    }

    #[test]
    fn timestamps_show_as_dates() {
        assert_eq!(display_date("2024-05-02T10:15:00+01:00"), "2024-05-02");
        assert_eq!(display_date("2024-05-02T10:15:00.123456"), "2024-05-02");
        assert_eq!(display_date("2024-05-02"), "2024-05-02");
        assert_eq!(display_date("yesterday"), "yesterday");
    }

    #[test]
    fn view_renders_rows_and_placeholder_stats() {
        let mut dash = loaded(&["CLIENT_A", "CLIENT_B"]);
        dash.select_application("CLIENT_B").unwrap();
        let view = dash.view();
        let rows = view.applications.data().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].selected);
        assert_eq!(rows[0].risk_percent, Some(42));
        assert!(view.stats.iter().all(|c| c.value == "---"));
        assert!(view.galaxy.is_empty());
    }
}
