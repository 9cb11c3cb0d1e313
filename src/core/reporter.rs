//! Per-request visit reporting.
//!
//! [`VisitReporter::report`] is the single entry point hosts call once per inbound
//! request. It never fails and never waits on the network: eligible visits are
//! serialized and handed to the transport on a detached task.
use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use serde::Serialize;
use tracing::Instrument;

use super::{
    context::RequestContext,
    eligibility::{EligibilityFilter, Ineligible},
    extractor::{RequestMetadataExtractor, ResolvedHeaders},
};
use crate::ports::{config_store::ConfigStore, transport::VisitTransport};

/// Wire body of one visit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VisitReport {
    pub request_path: String,
    pub request_method: String,
    pub request_headers: ResolvedHeaders,
    pub request_ip: Option<String>,
    /// Unix seconds
    pub request_timestamp: i64,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Eligible {
        report: VisitReport,
        access_token: String,
    },
    Ineligible(Ineligible),
}

pub struct VisitReporter {
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn VisitTransport>,
    filter: EligibilityFilter,
    extractor: RequestMetadataExtractor,
}

impl VisitReporter {
    /// Reporter with the default system prefixes and header set.
    pub fn new(store: Arc<dyn ConfigStore>, transport: Arc<dyn VisitTransport>) -> Self {
        Self {
            store,
            transport,
            filter: EligibilityFilter::default(),
            extractor: RequestMetadataExtractor::default(),
        }
    }

    pub fn with_filter(mut self, filter: EligibilityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_extractor(mut self, extractor: RequestMetadataExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Decide whether `ctx` is reported and, if so, build its report.
    ///
    /// Settings are read fresh from the store on every call.
    pub fn evaluate(&self, ctx: &RequestContext) -> Evaluation {
        let settings = self.store.snapshot();
        let path = self.extractor.request_path(ctx);
        let method = self.extractor.request_method(ctx);

        let (request_path, request_method) =
            match self
                .filter
                .evaluate(&settings, path.as_deref(), method.as_deref())
            {
                Ok(checked) => checked,
                Err(reason) => return Evaluation::Ineligible(reason),
            };

        let report = VisitReport {
            request_path: request_path.to_string(),
            request_method: request_method.to_string(),
            request_headers: self.extractor.resolve_headers(ctx),
            request_ip: self.extractor.resolve_client_ip(ctx),
            request_timestamp: chrono::Utc::now().timestamp(),
        };

        Evaluation::Eligible {
            report,
            access_token: settings.access_token,
        }
    }

    /// Evaluate `ctx` and dispatch its report without waiting for delivery.
    pub fn report(&self, ctx: &RequestContext) {
        match self.evaluate(ctx) {
            Evaluation::Eligible {
                report,
                access_token,
            } => self.dispatch(report, access_token),
            Evaluation::Ineligible(reason) => {
                tracing::debug!(reason = %reason, "Visit not reported");
            }
        }
    }

    /// Convenience wrapper for hosts holding an `http::Request`.
    pub fn report_request<B>(&self, req: &Request<B>) {
        self.report(&RequestContext::from_request(req));
    }

    fn dispatch(&self, report: VisitReport, access_token: String) {
        let body = match serde_json::to_vec(&report) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                tracing::debug!("Failed to serialize visit report: {}", e);
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime available, visit report dropped");
            return;
        };

        let span = tracing::debug_span!(
            "visit_dispatch",
            http.method = %report.request_method,
            http.path = %report.request_path,
        );
        let transport = self.transport.clone();
        runtime.spawn(
            async move {
                match transport.send_visit(&access_token, body).await {
                    Ok(()) => tracing::debug!("Visit report delivered"),
                    Err(e) => tracing::debug!("Visit report discarded: {}", e),
                }
            }
            .instrument(span),
        );
    }
}
