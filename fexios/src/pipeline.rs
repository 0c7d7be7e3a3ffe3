//! The per-call chain: request stages, dispatch, response stages.
//!
//! A [`Pipeline`] is assembled when a request is issued. It owns the merged
//! config and snapshots of both registries taken at that moment, so handlers
//! registered or ejected afterwards do not affect it.
//!
//! ```text
//! Ok(config) ─▶ request[0] ─▶ … ─▶ request[n] ─┬─ Ok  ─▶ dispatch ─┐
//!                                              └─ Err ────────────┤
//!                                                                 ▼
//!                                   response[0] ─▶ … ─▶ response[m] ─▶ caller
//! ```
//!
//! A failed request stage skips dispatch; its error reaches the response
//! stages directly, where any `on_rejected` may still recover it. A pipeline
//! built with [`Pipeline::rejected`] starts the request stages with that
//! error instead of the config.

use std::sync::Arc;

use crate::Error;
use crate::config::RequestConfig;
use crate::dispatch::Dispatch;
use crate::interceptor::Snapshot;
use crate::response::ResponseEnvelope;

/// One request ready to run through the interceptor chain.
pub struct Pipeline {
    config: RequestConfig,
    failure: Option<Error>,
    request: Snapshot<RequestConfig>,
    response: Snapshot<ResponseEnvelope>,
    dispatcher: Arc<dyn Dispatch>,
}

impl Pipeline {
    /// Assemble a pipeline from an effective config and registry snapshots.
    pub fn new(
        config: RequestConfig,
        request: Snapshot<RequestConfig>,
        response: Snapshot<ResponseEnvelope>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            config,
            failure: None,
            request,
            response,
            dispatcher,
        }
    }

    /// Start the chain rejected with `err`.
    ///
    /// The request stages see the error in place of the config, so dispatch
    /// only runs if one of them recovers it.
    pub fn rejected(mut self, err: Error) -> Self {
        self.failure = Some(err);
        self
    }

    /// The config the first request stage will receive, unless the pipeline
    /// starts rejected.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// The error the chain starts with, if any.
    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Total number of stages, dispatch included.
    pub fn stage_count(&self) -> usize {
        self.request.len() + 1 + self.response.len()
    }

    /// Run every stage in order and settle with the last stage's outcome.
    pub async fn run(self) -> Result<ResponseEnvelope, Error> {
        #[cfg(feature = "tracing")]
        {
            use tracing::Instrument;

            let span = tracing::info_span!(
                "http.request",
                method = %self.config.method,
                url = %self.config.url,
                request_stages = self.request.len(),
                response_stages = self.response.len(),
            );
            self.execute().instrument(span).await
        }

        #[cfg(not(feature = "tracing"))]
        {
            self.execute().await
        }
    }

    async fn execute(self) -> Result<ResponseEnvelope, Error> {
        let Pipeline {
            config,
            failure,
            request,
            response,
            dispatcher,
        } = self;

        let start = match failure {
            Some(err) => Err(err),
            None => Ok(config),
        };

        let outcome = match request.run(start).await {
            Ok(config) => dispatcher.dispatch(config).await,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "request stage rejected, skipping dispatch");
                Err(err)
            }
        };

        let settled = response.run(outcome).await;

        #[cfg(feature = "tracing")]
        {
            if let Err(err) = &settled {
                tracing::debug!(error = %err, "request settled with an error");
            }
        }

        settled
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("failure", &self.failure)
            .field("request", &self.request)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{HttpDispatcher, dispatch_fn};
    use crate::interceptor::{Handler, InterceptorRegistry};
    use crate::response::Body;
    use crate::transport::RequestBody;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use http_body_util::Full;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every request with the given status and records what it saw.
    fn recording(status: StatusCode, seen: Arc<Mutex<Vec<RequestConfig>>>) -> Arc<dyn Dispatch> {
        Arc::new(dispatch_fn(move |config: RequestConfig| {
            seen.lock().unwrap().push(config.clone());
            async move {
                let res = ResponseEnvelope::new(status, HeaderMap::new(), Body::Json(json!({ "ok": true })), config);
                if res.is_success() {
                    Ok(res)
                } else {
                    Err(Error::Status(Box::new(res)))
                }
            }
        }))
    }

    fn pipeline(
        request: &InterceptorRegistry<RequestConfig>,
        response: &InterceptorRegistry<ResponseEnvelope>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Pipeline {
        Pipeline::new(
            RequestConfig::get("/users/1"),
            request.snapshot(),
            response.snapshot(),
            dispatcher,
        )
    }

    #[tokio::test]
    async fn test_header_added_by_request_stage_reaches_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        request.use_handler(Handler::new().on_fulfilled_sync(|config: RequestConfig| {
            Ok(config.header("x-trace", "abc"))
        }));

        let res = pipeline(&request, &response, recording(StatusCode::OK, seen.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(res.status, StatusCode::OK);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].headers.get("x-trace").unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_stages_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();

        for tag in ["a", "b"] {
            request.use_handler(Handler::new().on_fulfilled_sync(move |config: RequestConfig| {
                let trail = match config.options.get("trail") {
                    Some(Value::String(trail)) => format!("{trail}{tag}"),
                    _ => tag.to_string(),
                };
                Ok(config.option("trail", Value::String(trail)))
            }));
        }
        for tag in ["c", "d"] {
            response.use_handler(Handler::new().on_fulfilled_sync(move |mut res: ResponseEnvelope| {
                let trail = res.headers.get("x-trail").and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
                res.headers.insert("x-trail", format!("{trail}{tag}").parse().unwrap());
                Ok(res)
            }));
        }

        let res = pipeline(&request, &response, recording(StatusCode::OK, seen.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap()[0].options["trail"], "ab");
        assert_eq!(res.headers.get("x-trail").unwrap(), "cd");
        assert_eq!(res.config.options["trail"], "ab");
    }

    #[tokio::test]
    async fn test_status_rejection_recovered_by_response_stage() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        response.use_handler(Handler::new().on_rejected_sync(|err: Error| {
            let res = err.into_response()?;
            if res.status == StatusCode::NOT_FOUND {
                Ok(res.map(|_| Body::Json(Value::Null)))
            } else {
                Err(Error::Status(Box::new(res)))
            }
        }));

        let res = pipeline(&request, &response, recording(StatusCode::NOT_FOUND, seen))
            .run()
            .await
            .unwrap();

        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.data.as_json(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_unrecovered_status_rejects() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();

        let err = pipeline(&request, &response, recording(StatusCode::INTERNAL_SERVER_ERROR, seen))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_request_rejection_skips_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        request.use_handler(
            Handler::new().on_fulfilled_sync(|_: RequestConfig| Err(Error::interceptor("no token"))),
        );

        let rejected = Arc::new(AtomicUsize::new(0));
        let counter = rejected.clone();
        response.use_handler(Handler::new().on_rejected_sync(move |err: Error| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(err)
        }));

        let err = pipeline(&request, &response, recording(StatusCode::OK, seen.clone()))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Interceptor(_)));
        assert_eq!(err.to_string(), "interceptor failed: no token");
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_rejection_recovered_before_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        request.use_handler(
            Handler::new().on_fulfilled_sync(|_: RequestConfig| Err(Error::interceptor("stale token"))),
        );
        request.use_handler(Handler::new().on_rejected_sync(|_: Error| {
            Ok(RequestConfig::get("/fallback"))
        }));

        let res = pipeline(&request, &response, recording(StatusCode::OK, seen.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(res.config.url, "/fallback");
        assert_eq!(seen.lock().unwrap()[0].url, "/fallback");
    }

    #[tokio::test]
    async fn test_stage_count_includes_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        request.use_handler(Handler::new());
        response.use_handler(Handler::new());
        response.use_handler(Handler::new());

        let pipeline = pipeline(&request, &response, recording(StatusCode::OK, seen));
        assert_eq!(pipeline.stage_count(), 4);
        assert_eq!(pipeline.config().url, "/users/1");
    }

    /// Response stage that turns any error matching `pred` into a 200 with
    /// `{"recovered": true}`, counting the errors it sees.
    fn recover_when(
        response: &InterceptorRegistry<ResponseEnvelope>,
        seen: Arc<AtomicUsize>,
        pred: fn(&Error) -> bool,
    ) {
        response.use_handler(Handler::new().on_rejected_sync(move |err: Error| {
            seen.fetch_add(1, Ordering::SeqCst);
            if pred(&err) {
                Ok(ResponseEnvelope::new(
                    StatusCode::OK,
                    HeaderMap::new(),
                    Body::Json(json!({ "recovered": true })),
                    RequestConfig::get("/users/1"),
                ))
            } else {
                Err(err)
            }
        }));
    }

    #[tokio::test]
    async fn test_dispatch_timeout_recovered_by_response_stage() {
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        let rejected = Arc::new(AtomicUsize::new(0));
        recover_when(&response, rejected.clone(), Error::is_timeout);

        let dispatcher: Arc<dyn Dispatch> = Arc::new(dispatch_fn(|_: RequestConfig| async {
            Err::<ResponseEnvelope, _>(Error::Timeout(Duration::from_millis(20)))
        }));

        let res = pipeline(&request, &response, dispatcher).run().await.unwrap();

        assert_eq!(res.data.as_json(), Some(&json!({ "recovered": true })));
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_recovered_by_response_stage() {
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();
        let rejected = Arc::new(AtomicUsize::new(0));
        recover_when(&response, rejected.clone(), |err| matches!(err, Error::Serialization(_)));

        let dispatcher: Arc<dyn Dispatch> = Arc::new(HttpDispatcher::new(tower::service_fn(
            |_req: http::Request<RequestBody>| async {
                http::Response::builder()
                    .header("content-type", "application/json")
                    .body(Full::new(Bytes::from_static(b"{bad")))
                    .map_err(|e| Error::Transport(e.to_string()))
            },
        )));
        let pipeline = Pipeline::new(
            RequestConfig::get("/users/1").base_url("https://api.example.com"),
            request.snapshot(),
            response.snapshot(),
            dispatcher,
        );

        let res = pipeline.run().await.unwrap();

        assert_eq!(res.data.as_json(), Some(&json!({ "recovered": true })));
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_start_skips_dispatch_and_reaches_response_stages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let request = InterceptorRegistry::new();
        let response = InterceptorRegistry::new();

        let request_rejected = Arc::new(AtomicUsize::new(0));
        let counter = request_rejected.clone();
        request.use_handler(Handler::new().on_rejected_sync(move |err: Error| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<RequestConfig, _>(err)
        }));
        let response_rejected = Arc::new(AtomicUsize::new(0));
        recover_when(&response, response_rejected.clone(), |err| matches!(err, Error::Serialization(_)));

        let pipeline = pipeline(&request, &response, recording(StatusCode::OK, seen.clone()))
            .rejected(Error::Serialization("key must be a string".to_string()));
        assert!(pipeline.failure().is_some());

        let res = pipeline.run().await.unwrap();

        assert_eq!(res.data.as_json(), Some(&json!({ "recovered": true })));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(request_rejected.load(Ordering::SeqCst), 1);
        assert_eq!(response_rejected.load(Ordering::SeqCst), 1);
    }
}
