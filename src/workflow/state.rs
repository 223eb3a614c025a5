//! The per-request state record threaded through the node sequence.

use std::sync::Arc;

use crate::access::AccessFilter;
use crate::analyze::QueryAnalysis;
use crate::fusion::FusedResult;
use crate::rerank::RerankedResult;
use crate::retrieve::ProbeResult;
use crate::types::{Context, QueryRequest, UserContext};
use crate::workflow::controller::SufficiencyReport;
use crate::workflow::metrics::WorkflowMetrics;

/// Where in the node graph a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Init,
    CacheHitReturn,
    Analyzed,
    FilterBuilt,
    Retrieved,
    Fused,
    Reranked,
    Enriched,
    Assess,
    SubqueriesRun,
    Complete,
    Failed,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Init => "init",
            WorkflowStage::CacheHitReturn => "cache_hit_return",
            WorkflowStage::Analyzed => "analyzed",
            WorkflowStage::FilterBuilt => "filter_built",
            WorkflowStage::Retrieved => "retrieved",
            WorkflowStage::Fused => "fused",
            WorkflowStage::Reranked => "reranked",
            WorkflowStage::Enriched => "enriched",
            WorkflowStage::Assess => "assess",
            WorkflowStage::SubqueriesRun => "subqueries_run",
            WorkflowStage::Complete => "complete",
            WorkflowStage::Failed => "failed",
        }
    }
}

/// One request's accumulated state. Each node only writes its own slot;
/// earlier slots are never mutated, which keeps every node independently
/// testable against a hand-built state.
#[derive(Debug)]
pub struct WorkflowState {
    pub request: QueryRequest,
    pub user: UserContext,
    pub stage: WorkflowStage,
    /// Adaptive retries taken so far.
    pub iteration: u32,
    pub analysis: Option<QueryAnalysis>,
    pub filter: Option<Arc<AccessFilter>>,
    /// Per-probe result lists of the latest retrieval pass (plus sub-query
    /// probes once decomposition ran).
    pub probes: Vec<ProbeResult>,
    pub fused: Vec<FusedResult>,
    pub reranked: Vec<RerankedResult>,
    pub enriched: Vec<Context>,
    pub sufficiency: Option<SufficiencyReport>,
    pub subqueries_run: bool,
    pub metrics: WorkflowMetrics,
}

impl WorkflowState {
    pub fn new(request: QueryRequest, user: UserContext, request_id: String) -> Self {
        let metrics = WorkflowMetrics {
            request_id,
            ..Default::default()
        };

        Self {
            request,
            user,
            stage: WorkflowStage::Init,
            iteration: 0,
            analysis: None,
            filter: None,
            probes: Vec::new(),
            fused: Vec::new(),
            reranked: Vec::new(),
            enriched: Vec::new(),
            sufficiency: None,
            subqueries_run: false,
            metrics,
        }
    }
}
