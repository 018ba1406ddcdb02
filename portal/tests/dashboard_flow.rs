mod common;

use std::time::Duration;

use common::{ScriptedApi, quick_cache};
use portal::{
    cache::QueryCache,
    dashboard::{self, AdminDashboard, DashboardContext, DashboardError},
    panels::{PanelState, temporal::Trend},
    scene::{RecordingAdapter, SceneEvent},
};
use tokio::{sync::Mutex, time::sleep};

fn context<'a>(api: &'a ScriptedApi, cache: &'a QueryCache, synthetic: bool) -> DashboardContext<'a> {
    DashboardContext {
        api,
        cache,
        top_k: 50,
        applications_limit: 50,
        synthetic_fallback: synthetic,
    }
}

async fn with_applications(ctx: DashboardContext<'_>) -> Mutex<AdminDashboard> {
    let dash = Mutex::new(AdminDashboard::default());
    assert!(dashboard::load_applications(ctx, &dash).await);
    dash.lock().await.select_application("APP_1").unwrap();
    dash
}

async fn searched(ctx: DashboardContext<'_>) -> Mutex<AdminDashboard> {
    let dash = with_applications(ctx).await;
    assert!(dashboard::run_search(ctx, &dash).await.unwrap());
    dash
}

#[tokio::test]
async fn search_populates_results_and_network() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let dash = searched(context(&api, &cache, true)).await;

    let view = dash.lock().await.view();
    assert_eq!(view.similar.len(), 3);
    assert_eq!(view.galaxy.len(), 3);
    let summary = view.search.data().unwrap();
    assert_eq!(summary.confidence_percent, 67);
    assert_eq!(summary.repaid_count, 2);
    let network = view.network.data().unwrap();
    assert_eq!(network.stats.total_nodes, 4);
    assert_eq!(network.stats.connections, 3);
    assert_eq!(api.calls(), vec!["applications", "search", "network"]);
}

#[tokio::test(start_paused = true)]
async fn late_search_for_a_previous_application_is_dropped() {
    let api = ScriptedApi::new().delayed("search", Duration::from_millis(200));
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = with_applications(ctx).await;

    let (landed, ()) = tokio::join!(dashboard::run_search(ctx, &dash), async {
        sleep(Duration::from_millis(50)).await;
        dash.lock().await.select_application("APP_2").unwrap();
    });

    assert!(!landed.unwrap());
    let state = dash.lock().await;
    assert_eq!(state.selected_application(), Some("APP_2"));
    assert!(matches!(state.search_state(), PanelState::Idle));
    assert!(matches!(state.network_state(), PanelState::Idle));
    assert!(state.view().similar.is_empty());
    assert_eq!(api.count("network"), 0);
}

#[tokio::test(start_paused = true)]
async fn late_network_for_a_previous_application_is_dropped() {
    let api = ScriptedApi::new().delayed("network", Duration::from_millis(200));
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = with_applications(ctx).await;

    let (landed, ()) = tokio::join!(dashboard::run_search(ctx, &dash), async {
        sleep(Duration::from_millis(50)).await;
        let mut state = dash.lock().await;
        assert!(state.network_state().is_loading());
        state.select_application("APP_2").unwrap();
    });

    assert!(landed.unwrap());
    assert_eq!(api.count("network"), 1);
    let state = dash.lock().await;
    assert!(matches!(state.network_state(), PanelState::Idle));
    assert!(matches!(state.search_state(), PanelState::Idle));
}

#[tokio::test]
async fn searching_before_selecting_is_rejected() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let dash = Mutex::new(AdminDashboard::default());
    let err = dashboard::run_search(context(&api, &cache, true), &dash).await.unwrap_err();
    assert_eq!(err, DashboardError::NoApplicationSelected);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn selecting_a_similar_client_leaves_other_panels_alone() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = searched(ctx).await;
    assert!(dashboard::run_fraud_check(ctx, &dash).await.unwrap());

    let before = dash.lock().await.view();
    dashboard::select_similar(ctx, &dash, "CLIENT_102").await.unwrap();
    let after = dash.lock().await.view();

    assert_eq!(after.search, before.search);
    assert_eq!(after.fraud, before.fraud);
    assert_eq!(
        after.network.data().map(|n| n.stats),
        before.network.data().map(|n| n.stats)
    );
    assert_eq!(after.selected_similar.as_deref(), Some("CLIENT_102"));

    let base = after.counterfactual.base.unwrap();
    assert_eq!(base.debt_ratio, 0.7);
    assert_eq!(base.years_active, 2.0);

    let analysis = after.temporal.data().unwrap().as_ref().unwrap();
    assert_eq!(analysis.trend, Trend::Improving);
    assert_eq!(analysis.client_id, "CLIENT_102");
    assert_eq!(api.count("search"), 1);
    assert_eq!(api.count("network"), 1);
}

#[tokio::test]
async fn temporal_failure_leaves_panel_idle() {
    let api = ScriptedApi::new().failing("temporal");
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = searched(ctx).await;

    assert!(dashboard::select_similar(ctx, &dash, "CLIENT_101").await.unwrap());
    assert!(matches!(dash.lock().await.temporal_state(), PanelState::Idle));
}

#[tokio::test]
async fn unknown_similar_client_is_rejected() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = searched(ctx).await;
    let err = dashboard::select_similar(ctx, &dash, "CLIENT_999").await.unwrap_err();
    assert_eq!(err, DashboardError::UnknownSimilarClient("CLIENT_999".into()));
}

#[tokio::test]
async fn network_failure_is_synthesized_when_enabled() {
    let api = ScriptedApi::new().failing("network");
    let cache = quick_cache();
    let dash = searched(context(&api, &cache, true)).await;

    let state = dash.lock().await;
    match state.network_state() {
        PanelState::Ready { data, synthetic } => {
            assert!(*synthetic);
            assert!(!data.nodes.is_empty());
            assert!(data.nodes.iter().any(|n| n.id == "APP_1"));
        }
        other => panic!("expected synthetic network, got {other:?}"),
    }
}

#[tokio::test]
async fn network_failure_surfaces_when_synthesis_disabled() {
    let api = ScriptedApi::new().failing("network");
    let cache = quick_cache();
    let dash = searched(context(&api, &cache, false)).await;
    let state = dash.lock().await;
    assert!(state.network_state().error().unwrap().contains("network unavailable"));
    assert!(state.search_state().data().is_some());
}

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = searched(ctx).await;
    dashboard::run_search(ctx, &dash).await.unwrap();
    assert_eq!(api.count("search"), 1);
    assert_eq!(api.count("network"), 2);
}

#[tokio::test]
async fn clicking_an_orb_selects_and_patches_the_scene() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = searched(ctx).await;

    let mut adapter = RecordingAdapter::default();
    let initial = dash.lock().await.sync_galaxy(&mut adapter);
    assert_eq!(initial, 4);

    let selected = dash
        .lock()
        .await
        .handle_scene_event(SceneEvent::Select("CLIENT_103".into()))
        .unwrap();
    dashboard::select_similar(ctx, &dash, &selected).await.unwrap();

    adapter.take_patches();
    let changed = dash.lock().await.sync_galaxy(&mut adapter);
    assert_eq!(changed, 1);
    assert_eq!(adapter.scene().node_selecting("CLIENT_103").unwrap().scale, 1.5);
}

#[tokio::test]
async fn counterfactual_uses_the_selected_base() {
    let api = ScriptedApi::new();
    let cache = quick_cache();
    let ctx = context(&api, &cache, true);
    let dash = searched(ctx).await;

    let snapped = dash
        .lock()
        .await
        .set_counterfactual_delta(portal::panels::counterfactual::DeltaField::DebtRatio, -0.123);
    assert_eq!(snapped, -0.12);
    assert!(dashboard::run_counterfactual(ctx, &dash).await);

    let view = dash.lock().await.view();
    let outcome = view.counterfactual.result.data().unwrap();
    assert!(outcome.improved);
    assert_eq!(outcome.confidence_delta, 20);
}
