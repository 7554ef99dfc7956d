use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::data_source::{
    FireDataSource, NearbyQuery, SegmentRequest, SourceError, SourceFuture, WeatherDataSource,
};
use crate::{EnvelopeError, Incident, ProviderId, SegmentResponse, ValidationError};

/// When an incident router moves on to the next adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    pub failover_on_error: bool,
    pub failover_on_empty: bool,
    /// Results below this count are treated like an empty answer.
    pub min_results: Option<usize>,
}

impl FailoverPolicy {
    pub fn new(
        failover_on_error: bool,
        failover_on_empty: bool,
        min_results: Option<usize>,
    ) -> Result<Self, ValidationError> {
        let policy = Self {
            failover_on_error,
            failover_on_empty,
            min_results,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_results == Some(0) {
            return Err(ValidationError::ZeroMinResults);
        }
        Ok(())
    }

    fn accepts(&self, count: usize) -> bool {
        count > 0 && self.min_results.map_or(true, |min| count >= min)
    }
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            failover_on_error: true,
            failover_on_empty: true,
            min_results: None,
        }
    }
}

/// Successful routed call.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub selected_source: ProviderId,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl<T> RouteSuccess<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RouteSuccess<U> {
        RouteSuccess {
            data: f(self.data),
            selected_source: self.selected_source,
            source_chain: self.source_chain,
            warnings: self.warnings,
            errors: self.errors,
            latency_ms: self.latency_ms,
        }
    }
}

/// Failed routed call. `errors` holds one entry per adapter that failed.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub last_error: SourceError,
    pub latency_ms: u64,
}

impl Display for RouteFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("no data available from sources")?;
        let mut separator = ": ";
        for error in &self.errors {
            let source = error.source.map_or("unknown", ProviderId::as_str);
            write!(f, "{separator}{source}: {}", error.message)?;
            separator = "; ";
        }
        Ok(())
    }
}

impl std::error::Error for RouteFailure {}

pub type RouteResult<T> = Result<RouteSuccess<T>, RouteFailure>;

/// Outcome of a single adapter invocation.
enum Attempt<T> {
    /// Enough data to stop.
    Accepted(T),
    /// Empty or under the policy threshold.
    Insufficient(T),
    Failed(SourceError),
}

impl<T> Attempt<T> {
    fn classify(result: Result<T, SourceError>, sufficient: impl Fn(&T) -> bool) -> Self {
        match result {
            Ok(data) if sufficient(&data) => Self::Accepted(data),
            Ok(data) => Self::Insufficient(data),
            Err(error) => Self::Failed(error),
        }
    }
}

/// Ordered failover over incident providers.
pub struct IncidentRouter {
    adapters: Vec<Arc<dyn FireDataSource>>,
    policy: FailoverPolicy,
}

impl IncidentRouter {
    pub fn new(
        adapters: Vec<Arc<dyn FireDataSource>>,
        policy: FailoverPolicy,
    ) -> Result<Self, ValidationError> {
        if adapters.is_empty() {
            return Err(ValidationError::EmptyAdapterChain);
        }
        policy.validate()?;
        Ok(Self { adapters, policy })
    }

    pub fn policy(&self) -> FailoverPolicy {
        self.policy
    }

    /// Providers in priority order.
    pub fn source_chain(&self) -> Vec<ProviderId> {
        self.adapters.iter().map(|adapter| adapter.id()).collect()
    }

    pub async fn search_nearby(&self, query: NearbyQuery) -> RouteResult<Vec<Incident>> {
        let policy = self.policy;
        self.route(
            "search_nearby",
            move |source| source.search_nearby(query),
            move |records: &Vec<Incident>| policy.accepts(records.len()),
        )
        .await
    }

    pub async fn lookup_by_id(&self, incident_id: &str) -> RouteResult<Option<Incident>> {
        let incident_id = incident_id.to_owned();
        self.route(
            "lookup_by_id",
            move |source| source.lookup_by_id(incident_id.clone()),
            Option::is_some,
        )
        .await
    }

    async fn route<T, F, S>(
        &self,
        operation: &'static str,
        mut invoke: F,
        sufficient: S,
    ) -> RouteResult<T>
    where
        F: for<'a> FnMut(&'a dyn FireDataSource) -> SourceFuture<'a, T>,
        S: Fn(&T) -> bool,
    {
        let started = Instant::now();
        let mut source_chain = Vec::with_capacity(self.adapters.len());
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        let mut last_error = None;

        for (index, adapter) in self.adapters.iter().enumerate() {
            let provider = adapter.id();
            let has_next = index + 1 < self.adapters.len();
            source_chain.push(provider);
            debug!(%provider, operation, "querying fire source");

            match Attempt::classify(invoke(adapter.as_ref()).await, &sufficient) {
                Attempt::Accepted(data) => {
                    if index > 0 {
                        info!(%provider, operation, attempts = index + 1, "failover succeeded");
                        warnings.push(format!(
                            "source failover succeeded with '{provider}' \
                             after {index} earlier attempt(s)"
                        ));
                    }
                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        source_chain,
                        warnings,
                        errors,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Attempt::Insufficient(data) => {
                    if self.policy.failover_on_empty && has_next {
                        debug!(%provider, operation, "insufficient result, trying next source");
                        warnings.push(format!("source '{provider}' returned insufficient data"));
                        continue;
                    }
                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        source_chain,
                        warnings,
                        errors,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Attempt::Failed(error) => {
                    warn!(%provider, operation, error = %error, "fire source failed");
                    errors.push(to_envelope_error(provider, &error));
                    if self.policy.failover_on_error && has_next {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(RouteFailure {
                        source_chain,
                        warnings,
                        errors,
                        last_error: error,
                        latency_ms: elapsed_ms(started),
                    });
                }
            }
        }

        // Only reachable with an empty chain, which `new` rejects.
        Err(RouteFailure {
            source_chain,
            warnings,
            errors,
            last_error: last_error
                .unwrap_or_else(|| SourceError::internal("incident router has no adapters")),
            latency_ms: elapsed_ms(started),
        })
    }
}

/// Decides, before invocation, whether a weather adapter may answer a request.
pub trait AdapterGate: Send + Sync {
    fn allows(&self, provider: ProviderId, req: &SegmentRequest) -> bool;
}

/// Gate that never skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AdapterGate for AllowAll {
    fn allows(&self, _provider: ProviderId, _req: &SegmentRequest) -> bool {
        true
    }
}

/// First-success selection over weather providers.
pub struct WeatherRouter {
    adapters: Vec<Arc<dyn WeatherDataSource>>,
    gate: Arc<dyn AdapterGate>,
}

impl WeatherRouter {
    pub fn new(adapters: Vec<Arc<dyn WeatherDataSource>>) -> Result<Self, ValidationError> {
        if adapters.is_empty() {
            return Err(ValidationError::EmptyAdapterChain);
        }
        Ok(Self {
            adapters,
            gate: Arc::new(AllowAll),
        })
    }

    pub fn with_gate(mut self, gate: Arc<dyn AdapterGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn source_chain(&self) -> Vec<ProviderId> {
        self.adapters.iter().map(|adapter| adapter.id()).collect()
    }

    pub async fn segment(&self, req: SegmentRequest) -> RouteResult<SegmentResponse> {
        let started = Instant::now();
        let mut source_chain = Vec::with_capacity(self.adapters.len());
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        let mut last_error = None;

        for adapter in &self.adapters {
            let provider = adapter.id();
            if !self.gate.allows(provider, &req) {
                warn!(%provider, "weather source skipped by gate");
                warnings.push(format!("source '{provider}' skipped by policy"));
                continue;
            }

            source_chain.push(provider);
            debug!(%provider, "querying weather source");
            match adapter.segment_series(req).await {
                Ok(data) => {
                    if !errors.is_empty() {
                        info!(%provider, failed = errors.len(), "failover succeeded");
                        warnings.push(format!(
                            "source failover succeeded with '{provider}' \
                             after {} failed attempt(s)",
                            errors.len()
                        ));
                    }
                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        source_chain,
                        warnings,
                        errors,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) => {
                    warn!(%provider, error = %error, "weather source failed");
                    errors.push(to_envelope_error(provider, &error));
                    last_error = Some(error);
                }
            }
        }

        Err(RouteFailure {
            source_chain,
            warnings,
            errors,
            last_error: last_error
                .unwrap_or_else(|| SourceError::unavailable("every weather source was skipped")),
            latency_ms: elapsed_ms(started),
        })
    }
}

fn to_envelope_error(provider: ProviderId, error: &SourceError) -> EnvelopeError {
    let message = if error.message().trim().is_empty() {
        String::from("source failed without a message")
    } else {
        error.message().to_owned()
    };

    EnvelopeError {
        code: error.code().to_owned(),
        message,
        retryable: Some(error.retryable()),
        source: Some(provider),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejects_zero_threshold() {
        assert!(matches!(
            FailoverPolicy::new(true, true, Some(0)),
            Err(ValidationError::ZeroMinResults)
        ));
        assert!(FailoverPolicy::new(true, false, Some(3)).is_ok());
    }

    #[test]
    fn policy_threshold_applies_only_to_non_empty_results() {
        let policy = FailoverPolicy::new(true, true, Some(2)).expect("valid");
        assert!(!policy.accepts(0));
        assert!(!policy.accepts(1));
        assert!(policy.accepts(2));
        assert!(FailoverPolicy::default().accepts(1));
    }

    #[test]
    fn routers_reject_empty_chains() {
        assert!(matches!(
            IncidentRouter::new(Vec::new(), FailoverPolicy::default()),
            Err(ValidationError::EmptyAdapterChain)
        ));
        assert!(matches!(
            WeatherRouter::new(Vec::new()),
            Err(ValidationError::EmptyAdapterChain)
        ));
    }

    #[test]
    fn failure_display_lists_each_source() {
        let failure = RouteFailure {
            source_chain: vec![ProviderId::Ndbc, ProviderId::Nws],
            warnings: Vec::new(),
            errors: vec![
                to_envelope_error(ProviderId::Ndbc, &SourceError::unavailable("unavailable")),
                to_envelope_error(ProviderId::Nws, &SourceError::unavailable("timeout")),
            ],
            last_error: SourceError::unavailable("timeout"),
            latency_ms: 0,
        };

        assert_eq!(
            failure.to_string(),
            "no data available from sources: ndbc: unavailable; nws: timeout"
        );
    }
}
