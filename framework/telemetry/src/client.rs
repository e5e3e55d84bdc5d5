use crate::query::TimeSeriesQuery;
use crate::series::TimeSeries;
use futures::future::BoxFuture;
use std::time::Duration;

/// A backend that can answer a [TimeSeriesQuery].
pub trait TelemetryClient {
    /// Fetch every series matching the query.
    ///
    /// An empty list means the query succeeded but matched nothing.
    fn list_time_series<'a>(
        &'a self,
        query: &'a TimeSeriesQuery,
    ) -> BoxFuture<'a, Result<Vec<TimeSeries>, QueryError>>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Request for {metric_type} failed: {source}")]
    Request {
        metric_type: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Unexpected response for {metric_type}: {reason}")]
    Response { metric_type: String, reason: String },
    #[error("Request for {metric_type} timed out after {timeout:?}")]
    Timeout {
        metric_type: String,
        timeout: Duration,
    },
}

impl QueryError {
    /// Whether repeating the same query could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Timeout { .. })
    }
}

/// Run a query, giving up with [QueryError::Timeout] once `timeout` has elapsed.
pub async fn fetch_with_timeout<C>(
    client: &C,
    query: &TimeSeriesQuery,
    timeout: Duration,
) -> Result<Vec<TimeSeries>, QueryError>
where
    C: TelemetryClient + ?Sized,
{
    match tokio::time::timeout(timeout, client.list_time_series(query)).await {
        Ok(result) => result,
        Err(_) => Err(QueryError::Timeout {
            metric_type: query.metric_type.clone(),
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Aligner;
    use futures::FutureExt;

    struct NeverClient;

    impl TelemetryClient for NeverClient {
        fn list_time_series<'a>(
            &'a self,
            _query: &'a TimeSeriesQuery,
        ) -> BoxFuture<'a, Result<Vec<TimeSeries>, QueryError>> {
            futures::future::pending().boxed()
        }
    }

    struct EmptyClient;

    impl TelemetryClient for EmptyClient {
        fn list_time_series<'a>(
            &'a self,
            _query: &'a TimeSeriesQuery,
        ) -> BoxFuture<'a, Result<Vec<TimeSeries>, QueryError>> {
            futures::future::ready(Ok(vec![])).boxed()
        }
    }

    fn query() -> TimeSeriesQuery {
        TimeSeriesQuery::new("cpu", 0, 120, "vm-1", 60, Aligner::Mean)
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let err = fetch_with_timeout(&NeverClient, &query(), Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Timeout { ref metric_type, .. } if metric_type == "cpu"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn fast_fetch_passes_through() {
        let series = fetch_with_timeout(&EmptyClient, &query(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn only_timeouts_are_retryable() {
        let err = QueryError::Response {
            metric_type: "cpu".to_string(),
            reason: "bad".to_string(),
        };
        assert!(!err.is_retryable());

        let err = QueryError::Request {
            metric_type: "cpu".to_string(),
            source: "connection refused".into(),
        };
        assert!(!err.is_retryable());
    }
}
