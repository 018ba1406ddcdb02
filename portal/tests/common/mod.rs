#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use portal::{
    api::{
        CreditApi,
        types::{
            ApplicationList, ApplicationRecord, CounterfactualRequest, CounterfactualResponse,
            CreditHistoryRequest, DocumentUpload, FraudCheckResponse, NetworkBuildRequest,
            NetworkLink, NetworkNode, NetworkResponse, SearchResponse, SearchStats, SimilarClient,
            SubmitApplicationRequest, SubmitApplicationResponse, TemporalResponse,
            TemporalSnapshot, UploadResponse, UploadedFile, VoiceExtractRequest, VoiceExtraction,
        },
    },
    cache::{QueryCache, QueryOptions},
    config::AppConfig,
    error::{FetchError, FetchResult},
    model::{AlertLevel, Archetype, ClientData, Outcome, RiskLevel},
};
use serde_json::{Value, json};

/// In-memory backend that records which endpoints were hit, in order.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    delays: HashMap<&'static str, Duration>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make one endpoint answer with a 500.
    pub fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing.get_mut().unwrap().insert(endpoint);
        self
    }

    /// Hold every answer from `endpoint` back for `delay`.
    pub fn delayed(mut self, endpoint: &'static str, delay: Duration) -> Self {
        self.delays.insert(endpoint, delay);
        self
    }

    /// Let a failing endpoint answer normally again.
    pub fn recover(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().remove(endpoint);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls().iter().filter(|c| **c == endpoint).count()
    }

    async fn hit(&self, endpoint: &'static str) -> FetchResult<()> {
        self.calls.lock().unwrap().push(endpoint);
        if let Some(delay) = self.delays.get(endpoint) {
            tokio::time::sleep(*delay).await;
        }
        let failing = self.failing.lock().unwrap().contains(endpoint);
        if failing {
            return Err(FetchError::Status {
                status: 500,
                body: format!("{endpoint} unavailable"),
            });
        }
        Ok(())
    }
}

pub fn similar_clients() -> Vec<SimilarClient> {
    vec![
        SimilarClient {
            client_id: "CLIENT_101".into(),
            similarity: 0.93,
            outcome: Some(Outcome::Repaid),
            loan_source: "microfinance".into(),
            debt_ratio: 0.3,
            years_active: 12.0,
        },
        SimilarClient {
            client_id: "CLIENT_102".into(),
            similarity: 0.88,
            outcome: Some(Outcome::Defaulted),
            loan_source: "informal".into(),
            debt_ratio: 0.7,
            years_active: 2.0,
        },
        SimilarClient {
            client_id: "CLIENT_103".into(),
            similarity: 0.81,
            outcome: Some(Outcome::Repaid),
            loan_source: "bank".into(),
            debt_ratio: 0.4,
            years_active: 6.0,
        },
    ]
}

pub fn applications() -> Vec<ApplicationRecord> {
    vec![
        ApplicationRecord {
            client_id: "APP_1".into(),
            date: Some("2024-03-01".into()),
            archetype: Some(Archetype::ShopOwner),
            years_active: Some(9.0),
            debt_ratio: Some(0.35),
            risk_score: Some(0.28),
            ..ApplicationRecord::default()
        },
        ApplicationRecord {
            client_id: "APP_2".into(),
            archetype: Some(Archetype::GigWorker),
            ..ApplicationRecord::default()
        },
    ]
}

fn snapshot(timestamp: &str, risk_score: f64) -> TemporalSnapshot {
    TemporalSnapshot {
        timestamp: timestamp.into(),
        date: "2024-01-01".into(),
        risk_score,
        debt_ratio: 0.4,
        income_stability: 0.8,
        payment_regularity: 0.9,
        status: "active".into(),
    }
}

#[async_trait]
impl CreditApi for ScriptedApi {
    async fn search_similar(&self, _client_data: &ClientData, top_k: usize) -> FetchResult<SearchResponse> {
        self.hit("search").await?;
        let similar: Vec<_> = similar_clients().into_iter().take(top_k).collect();
        Ok(SearchResponse {
            repaid_count: similar.iter().filter(|c| c.outcome().is_repaid()).count() as u32,
            total_count: similar.len() as u32,
            similar_clients: similar,
            risk_level: RiskLevel::Medium,
            confidence: 0.67,
            recommendation: "Approve with monitoring".into(),
            oracle_explanation: "Two of three neighbours repaid.".into(),
        })
    }

    async fn search_stats(&self) -> FetchResult<SearchStats> {
        self.hit("stats").await?;
        Ok(SearchStats {
            total_clients: Some(1200),
            vector_size: Some(8),
            distance_metric: Some("Cosine".into()),
        })
    }

    async fn analyze_counterfactual(
        &self,
        _request: &CounterfactualRequest,
    ) -> FetchResult<CounterfactualResponse> {
        self.hit("counterfactual").await?;
        Ok(CounterfactualResponse {
            original_risk: RiskLevel::Medium,
            modified_risk: RiskLevel::Low,
            confidence_before: 0.6,
            confidence_after: 0.8,
            risk_change: "Risk drops one level".into(),
            improvement_path: vec!["Reduce debt".into()],
        })
    }

    async fn check_fraud(&self, _client_data: &ClientData) -> FetchResult<FraudCheckResponse> {
        self.hit("fraud").await?;
        Ok(FraudCheckResponse {
            is_suspicious: false,
            alert_level: AlertLevel::None,
            fraud_score: 0.05,
            similar_frauds: Vec::new(),
            recommendation: "Proceed".into(),
            oracle_narrative: String::new(),
        })
    }

    async fn temporal(&self, client_id: &str) -> FetchResult<TemporalResponse> {
        self.hit("temporal").await?;
        Ok(TemporalResponse {
            client_id: client_id.to_string(),
            snapshots: vec![
                snapshot("T0_application", 0.6),
                snapshot("T1_3months", 0.5),
                snapshot("T2_6months", 0.35),
            ],
        })
    }

    async fn build_network(&self, request: &NetworkBuildRequest) -> FetchResult<NetworkResponse> {
        self.hit("network").await?;
        let mut nodes = vec![NetworkNode {
            id: request.center_client_id.clone(),
            group: "center".into(),
            val: 20.0,
            ..NetworkNode::default()
        }];
        let mut links = Vec::new();
        for id in &request.related_clients {
            nodes.push(NetworkNode {
                id: id.clone(),
                group: "good".into(),
                val: 10.0,
                ..NetworkNode::default()
            });
            links.push(NetworkLink {
                source: request.center_client_id.clone(),
                target: id.clone(),
                value: 0.8,
                link_type: "similarity".into(),
            });
        }
        Ok(NetworkResponse { nodes, links })
    }

    async fn extract_voice(&self, request: &VoiceExtractRequest) -> FetchResult<VoiceExtraction> {
        self.hit("voice").await?;
        Ok(VoiceExtraction {
            archetype: Archetype::Craftsman,
            years_active: 7.0,
            monthly_income: 2100.0,
            confidence: 0.9,
            raw_transcript: request.transcript.clone(),
            name: Some("Amira".into()),
        })
    }

    async fn list_applications(&self, limit: usize) -> FetchResult<ApplicationList> {
        self.hit("applications").await?;
        let applications: Vec<_> = applications().into_iter().take(limit).collect();
        Ok(ApplicationList {
            total: Some(applications.len() as u64),
            applications,
        })
    }

    async fn submit_application(
        &self,
        request: &SubmitApplicationRequest,
    ) -> FetchResult<SubmitApplicationResponse> {
        self.hit("submit").await?;
        Ok(SubmitApplicationResponse {
            client_id: "CLIENT_NEW".into(),
            status: "received".into(),
            message: None,
            next_steps: None,
            created_point: Some(json!({
                "name": request.applicant.name,
                "documents": request.documents,
            })),
        })
    }

    async fn upload_documents(&self, files: &[DocumentUpload]) -> FetchResult<UploadResponse> {
        self.hit("upload").await?;
        Ok(UploadResponse {
            files: files
                .iter()
                .map(|f| UploadedFile {
                    path: format!("uploads/{}", f.file_name),
                })
                .collect(),
        })
    }

    async fn add_to_credit_history(&self, _request: &CreditHistoryRequest) -> FetchResult<Value> {
        self.hit("history").await?;
        Ok(json!({ "status": "stored" }))
    }
}

/// Cache that never sleeps between retries.
pub fn quick_cache() -> QueryCache {
    QueryCache::new(QueryOptions {
        retry_delay: Duration::ZERO,
        ..QueryOptions::default()
    })
}

pub fn test_config() -> AppConfig {
    serde_yaml::from_str("server:\n  host: 127.0.0.1\n  port: 0\n").unwrap()
}
