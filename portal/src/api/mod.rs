pub mod types;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    Client, Url,
    multipart::{Form, Part},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{FetchError, FetchResult},
    model::ClientData,
};
use types::{
    ApplicationList, CounterfactualRequest, CounterfactualResponse, CreditHistoryRequest,
    DocumentUpload, FraudCheckRequest, FraudCheckResponse, NetworkBuildRequest, NetworkResponse,
    SearchRequest, SearchResponse, SearchStats, SubmitApplicationRequest,
    SubmitApplicationResponse, TemporalResponse, UploadResponse, VoiceExtractRequest,
    VoiceExtraction,
};

/// Contract of the external credit-risk backend, one method per endpoint.
#[async_trait]
pub trait CreditApi: Send + Sync {
    async fn search_similar(
        &self,
        client_data: &ClientData,
        top_k: usize,
    ) -> FetchResult<SearchResponse>;

    async fn search_stats(&self) -> FetchResult<SearchStats>;

    async fn analyze_counterfactual(
        &self,
        request: &CounterfactualRequest,
    ) -> FetchResult<CounterfactualResponse>;

    async fn check_fraud(&self, client_data: &ClientData) -> FetchResult<FraudCheckResponse>;

    async fn temporal(&self, client_id: &str) -> FetchResult<TemporalResponse>;

    async fn build_network(&self, request: &NetworkBuildRequest) -> FetchResult<NetworkResponse>;

    async fn extract_voice(&self, request: &VoiceExtractRequest) -> FetchResult<VoiceExtraction>;

    async fn list_applications(&self, limit: usize) -> FetchResult<ApplicationList>;

    async fn submit_application(
        &self,
        request: &SubmitApplicationRequest,
    ) -> FetchResult<SubmitApplicationResponse>;

    async fn upload_documents(&self, files: &[DocumentUpload]) -> FetchResult<UploadResponse>;

    async fn add_to_credit_history(&self, request: &CreditHistoryRequest) -> FetchResult<Value>;
}

pub struct HttpCreditApi {
    http: Client,
    base: Url,
}

impl HttpCreditApi {
    pub fn new(base: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(5));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;
        let base = Url::parse(base).with_context(|| format!("invalid backend base URL: {base}"))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> FetchResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidRequest(format!("base URL {} cannot hold a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> FetchResult<T> {
        debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        Self::read_json(resp).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> FetchResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(%url, "POST");
        let resp = self.http.post(url).json(body).send().await?;
        Self::read_json(resp).await
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> FetchResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CreditApi for HttpCreditApi {
    async fn search_similar(
        &self,
        client_data: &ClientData,
        top_k: usize,
    ) -> FetchResult<SearchResponse> {
        let body = SearchRequest {
            client_data: *client_data,
            top_k,
        };
        self.post_json(self.endpoint(&["search", "similar"])?, &body)
            .await
    }

    async fn search_stats(&self) -> FetchResult<SearchStats> {
        self.get_json(self.endpoint(&["search", "stats"])?).await
    }

    async fn analyze_counterfactual(
        &self,
        request: &CounterfactualRequest,
    ) -> FetchResult<CounterfactualResponse> {
        self.post_json(self.endpoint(&["counterfactual", "analyze"])?, request)
            .await
    }

    async fn check_fraud(&self, client_data: &ClientData) -> FetchResult<FraudCheckResponse> {
        let body = FraudCheckRequest {
            client_data: *client_data,
        };
        self.post_json(self.endpoint(&["fraud", "check"])?, &body)
            .await
    }

    async fn temporal(&self, client_id: &str) -> FetchResult<TemporalResponse> {
        self.get_json(self.endpoint(&["temporal", client_id])?)
            .await
    }

    async fn build_network(&self, request: &NetworkBuildRequest) -> FetchResult<NetworkResponse> {
        self.post_json(self.endpoint(&["network", "build"])?, request)
            .await
    }

    async fn extract_voice(&self, request: &VoiceExtractRequest) -> FetchResult<VoiceExtraction> {
        self.post_json(self.endpoint(&["voice", "extract"])?, request)
            .await
    }

    async fn list_applications(&self, limit: usize) -> FetchResult<ApplicationList> {
        let mut url = self.endpoint(&["applications"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_json(url).await
    }

    async fn submit_application(
        &self,
        request: &SubmitApplicationRequest,
    ) -> FetchResult<SubmitApplicationResponse> {
        self.post_json(self.endpoint(&["applications", "submit"])?, request)
            .await
    }

    async fn upload_documents(&self, files: &[DocumentUpload]) -> FetchResult<UploadResponse> {
        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            if let Some(content_type) = file.content_type.as_deref() {
                part = part
                    .mime_str(content_type)
                    .map_err(|err| FetchError::InvalidRequest(err.to_string()))?;
            }
            form = form.part("files", part);
        }
        let url = self.endpoint(&["applications", "upload-documents"])?;
        debug!(%url, files = files.len(), "POST multipart");
        let resp = self.http.post(url).multipart(form).send().await?;
        Self::read_json(resp).await
    }

    async fn add_to_credit_history(&self, request: &CreditHistoryRequest) -> FetchResult<Value> {
        self.post_json(
            self.endpoint(&["applications", "add-to-credit-history"])?,
            request,
        )
        .await
    }
}
