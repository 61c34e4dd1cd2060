//! Typed client for the FRA portal REST services.

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use portal_model::{
    AssetDetection, AssetPoint, BeneficiaryProfile, ChatQuery, ChatRecommendations, Claim,
    ClaimPoint, ClaimsQuery, Dashboard, DashboardSummary, DocumentAnalysis, InterventionPlan,
    LandCoverSegmentation, LandUsePoint, RecommendationSet, SpatialRecord, StateList,
    VillageProfile,
};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use spatial_sync::{LayerKind, RequestDescriptor};
use tracing::debug;

use crate::batch::{BatchProgress, BatchReport, run_batch};
use crate::config::ApiConfig;
use crate::error::{ApiError, error_detail};
use crate::upload::{UploadFile, UploadKind};

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>');

#[derive(Debug, Clone)]
pub struct PortalClient {
    http: Client,
    api_url: String,
    document_url: String,
}

impl PortalClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http(http, config))
    }

    /// Uses an existing `reqwest::Client`; its own timeout settings apply.
    pub fn with_http(http: Client, config: &ApiConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            document_url: config.document_url.trim_end_matches('/').to_string(),
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url)
    }

    pub async fn states(&self) -> Result<Vec<String>, ApiError> {
        let list: StateList = self.get_json(&self.api("states"), &[]).await?;
        Ok(list.states)
    }

    pub async fn claims(&self, query: &ClaimsQuery) -> Result<Vec<Claim>, ApiError> {
        self.get_json(&self.api("claims/"), &query.to_query_pairs())
            .await
    }

    /// One layer of the map for the descriptor's bounds and filters.
    pub async fn spatial_layer(
        &self,
        layer: LayerKind,
        descriptor: &RequestDescriptor,
    ) -> Result<Vec<SpatialRecord>, ApiError> {
        let url = self.api(&format!("spatial/{}/", layer.as_str()));
        let query = descriptor.query_pairs();
        let records = match layer {
            LayerKind::Claims => self
                .get_json::<Vec<ClaimPoint>>(&url, &query)
                .await?
                .into_iter()
                .map(SpatialRecord::Claim)
                .collect(),
            LayerKind::Assets => self
                .get_json::<Vec<AssetPoint>>(&url, &query)
                .await?
                .into_iter()
                .map(SpatialRecord::Asset)
                .collect(),
            LayerKind::LandUse => self
                .get_json::<Vec<LandUsePoint>>(&url, &query)
                .await?
                .into_iter()
                .map(SpatialRecord::LandUse)
                .collect(),
        };
        Ok(records)
    }

    /// State-scoped official statistics with district drill-down.
    pub async fn dashboard(&self, state: &str) -> Result<Dashboard, ApiError> {
        let query = portal_model::query_pairs([("state", Some(state))]);
        self.get_json(&self.api("dashboard/"), &query).await
    }

    /// Portal-wide headline numbers.
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
        self.get_json(&self.api("dashboard/"), &[]).await
    }

    pub async fn analyze_document(&self, file: UploadFile) -> Result<DocumentAnalysis, ApiError> {
        UploadKind::Document.check(&file)?;
        let url = format!("{}/analyze-document", self.document_url);
        self.post_form(&url, file.into_form("file")?).await
    }

    pub async fn segment_land_cover(
        &self,
        file: UploadFile,
    ) -> Result<LandCoverSegmentation, ApiError> {
        UploadKind::Imagery.check(&file)?;
        self.post_form(&self.api("imagery/segment-land-cover"), file.into_form("file")?)
            .await
    }

    pub async fn detect_assets(&self, file: UploadFile) -> Result<AssetDetection, ApiError> {
        UploadKind::Imagery.check(&file)?;
        self.post_form(&self.api("imagery/detect-assets"), file.into_form("image")?)
            .await
    }

    pub async fn analyze_documents<P: AsRef<Path>>(
        &self,
        paths: &[P],
        progress: impl FnMut(BatchProgress),
    ) -> BatchReport<DocumentAnalysis> {
        run_batch(paths, UploadKind::Document, |f| self.analyze_document(f), progress).await
    }

    pub async fn segment_land_cover_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        progress: impl FnMut(BatchProgress),
    ) -> BatchReport<LandCoverSegmentation> {
        run_batch(paths, UploadKind::Imagery, |f| self.segment_land_cover(f), progress).await
    }

    pub async fn detect_assets_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        progress: impl FnMut(BatchProgress),
    ) -> BatchReport<AssetDetection> {
        run_batch(paths, UploadKind::Imagery, |f| self.detect_assets(f), progress).await
    }

    /// Model-ranked schemes for an existing claim or beneficiary.
    pub async fn ai_recommendations(&self, id: &str) -> Result<RecommendationSet, ApiError> {
        let url = self.api(&format!("dss/ai-scheme-recommendations/{}", segment(id)?));
        self.send_json(self.http.post(&url), &url).await
    }

    /// Rule-based eligibility for an existing claim.
    pub async fn rule_recommendations(&self, id: &str) -> Result<RecommendationSet, ApiError> {
        let url = self.api(&format!("dss/scheme-recommendations/{}", segment(id)?));
        self.get_json(&url, &[]).await
    }

    pub async fn chat_recommendations(&self, query: &str) -> Result<ChatRecommendations, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("query must not be empty".into()));
        }
        let body = ChatQuery {
            query: query.to_string(),
        };
        self.post_json(&self.api("dss/chat-recommendations"), &body)
            .await
    }

    pub async fn recommend_for_profile(
        &self,
        profile: &BeneficiaryProfile,
    ) -> Result<RecommendationSet, ApiError> {
        self.post_json(&self.api("dss/recommend_development_schemes"), profile)
            .await
    }

    pub async fn village_profile(&self, village: &str) -> Result<VillageProfile, ApiError> {
        let query = village_query(village)?;
        self.get_json(&self.api("dss/village-profile"), &query).await
    }

    pub async fn intervention_priorities(&self, village: &str) -> Result<InterventionPlan, ApiError> {
        let query = village_query(village)?;
        self.get_json(&self.api("dss/intervention-priority"), &query)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        self.send_json(self.http.get(url).query(query), url).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(self.http.post(url).json(body), url).await
    }

    async fn post_form<T: DeserializeOwned>(&self, url: &str, form: Form) -> Result<T, ApiError> {
        self.send_json(self.http.post(url).multipart(form), url).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        debug!("Requesting {endpoint}");
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            debug!("{endpoint} answered {status}");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: error_detail(status.as_u16(), &body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

fn segment(id: &str) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::InvalidInput("id must not be empty".into()));
    }
    Ok(utf8_percent_encode(id, SEGMENT).to_string())
}

fn village_query(village: &str) -> Result<Vec<(&'static str, String)>, ApiError> {
    let village = village.trim();
    if village.is_empty() {
        return Err(ApiError::InvalidInput("village must not be empty".into()));
    }
    Ok(vec![("village", village.to_string())])
}
