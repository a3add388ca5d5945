//! HTTP writer: batches rows, renders a body template and POSTs it with a
//! retrying client. 200 is the sole success status; non-2xx responses and
//! network errors retry with doubling backoff between `retry_wait_min` and
//! `retry_wait_max`, bounded by the total timeout. Rows count as written
//! only after a successful POST.
//!
//! The TCS flavor is composition, not inheritance: the same writer with a
//! fixed outer template and a defaulted `x-tcs-timeout_ms` header.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tera::Tera;
use tokio::time::Instant;

use crate::config::HttpParams;
use crate::error::{Result, SdvgError};
use crate::generate::value::{DataRow, Value};
use crate::runtime::CancelCause;

const BODY_TEMPLATE: &str = "body";
const DEFAULT_TEMPLATE: &str = "{{ rows | rows_json }}";
const TCS_TEMPLATE: &str = r#"{"model":"{{ model_name }}","columns":{{ column_names | json }},"rows":{{ rows | rows_json }}}"#;
const TCS_TIMEOUT_HEADER: &str = "x-tcs-timeout_ms";

pub struct HttpWriter {
    client: reqwest::Client,
    params: HttpParams,
    headers: Vec<(String, String)>,
    tera: Tera,
    model_name: String,
    column_names: Vec<String>,
    batch: Vec<DataRow>,
    batch_size: usize,
    rows_flushed: Arc<AtomicU64>,
    cancel: CancelCause,
}

impl HttpWriter {
    pub fn new(
        model_name: &str,
        column_names: Vec<String>,
        params: HttpParams,
        run_batch_size: u64,
        rows_flushed: Arc<AtomicU64>,
        cancel: CancelCause,
    ) -> Result<HttpWriter> {
        Self::build(
            model_name,
            column_names,
            params,
            run_batch_size,
            rows_flushed,
            cancel,
            false,
        )
    }

    /// The TCS writer: HTTP with the fixed outer template, and the timeout
    /// header defaulted to the configured timeout in milliseconds.
    pub fn new_tcs(
        model_name: &str,
        column_names: Vec<String>,
        mut params: HttpParams,
        run_batch_size: u64,
        rows_flushed: Arc<AtomicU64>,
        cancel: CancelCause,
    ) -> Result<HttpWriter> {
        params.format_template = Some(TCS_TEMPLATE.to_string());
        if !params.headers.contains_key(TCS_TIMEOUT_HEADER) {
            params.headers.insert(
                TCS_TIMEOUT_HEADER.to_string(),
                (params.timeout_secs * 1000).to_string(),
            );
        }
        Self::build(
            model_name,
            column_names,
            params,
            run_batch_size,
            rows_flushed,
            cancel,
            true,
        )
    }

    fn build(
        model_name: &str,
        column_names: Vec<String>,
        params: HttpParams,
        run_batch_size: u64,
        rows_flushed: Arc<AtomicU64>,
        cancel: CancelCause,
        fixed_template: bool,
    ) -> Result<HttpWriter> {
        let template = if fixed_template {
            params.format_template.clone().expect("tcs sets it")
        } else {
            params
                .format_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string())
        };

        let mut tera = Tera::default();
        tera.register_filter("json", json_filter);
        tera.register_filter("rows_json", json_filter);
        tera.add_raw_template(BODY_TEMPLATE, &template)
            .map_err(|e| SdvgError::Config {
                message: format!("invalid http format_template: {}", e),
            })?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SdvgError::Sink {
                model: model_name.to_string(),
                message: format!("building http client: {}", e),
            })?;

        let batch_size = params.batch_size.unwrap_or(run_batch_size).max(1) as usize;
        let headers = params
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(HttpWriter {
            client,
            params,
            headers,
            tera,
            model_name: model_name.to_string(),
            column_names,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            rows_flushed,
            cancel,
        })
    }

    pub async fn write_row(&mut self, row: &[Value]) -> Result<()> {
        self.batch.push(row.to_vec());
        if self.batch.len() >= self.batch_size {
            self.post_batch().await?;
        }
        Ok(())
    }

    pub async fn teardown(&mut self) -> Result<()> {
        if !self.batch.is_empty() {
            self.post_batch().await?;
        }
        Ok(())
    }

    fn render_body(&self) -> Result<String> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = self
            .batch
            .iter()
            .map(|row| {
                self.column_names
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| {
                        (
                            name.clone(),
                            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect()
            })
            .collect();

        let mut ctx = tera::Context::new();
        ctx.insert("model_name", &self.model_name);
        ctx.insert("column_names", &self.column_names);
        ctx.insert("rows", &rows);
        self.tera
            .render(BODY_TEMPLATE, &ctx)
            .map_err(|e| SdvgError::Sink {
                model: self.model_name.clone(),
                message: format!("rendering http body: {}", e),
            })
    }

    async fn post_batch(&mut self) -> Result<()> {
        let body = self.render_body()?;
        let deadline = Instant::now() + Duration::from_secs(self.params.timeout_secs.max(1));
        let mut backoff = Duration::from_millis(self.params.retry_wait_min_ms.max(1));
        let backoff_max = Duration::from_millis(
            self.params
                .retry_wait_max_ms
                .max(self.params.retry_wait_min_ms),
        );
        let mut attempts = 0u32;
        let mut last_error = String::new();

        loop {
            attempts += 1;
            let mut request = self
                .client
                .post(&self.params.endpoint)
                .header("content-type", "application/json")
                .body(body.clone());
            for (name, value) in &self.headers {
                request = request.header(name, value);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            let outcome = tokio::select! {
                result = tokio::time::timeout(remaining, request.send()) => result,
                _ = self.cancel.cancelled() => return Err(self.cancel.error()),
            };

            match outcome {
                Ok(Ok(response)) if response.status() == reqwest::StatusCode::OK => {
                    self.rows_flushed
                        .fetch_add(self.batch.len() as u64, Ordering::SeqCst);
                    self.batch.clear();
                    return Ok(());
                }
                Ok(Ok(response)) => {
                    last_error = format!("unexpected status {}", response.status());
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                }
                Err(_) => {
                    last_error = "request timed out".to_string();
                    break;
                }
            }

            tracing::warn!(
                "POST {} failed (attempt {}): {}; retrying in {:?}",
                self.params.endpoint,
                attempts,
                last_error,
                backoff
            );

            if Instant::now() + backoff >= deadline {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = self.cancel.cancelled() => return Err(self.cancel.error()),
            }
            backoff = (backoff * 2).min(backoff_max);
        }

        Err(SdvgError::HttpDelivery {
            endpoint: self.params.endpoint.clone(),
            attempts,
            last_error,
        })
    }
}

/// Serialize the filtered value as compact JSON text.
fn json_filter(
    value: &tera::Value,
    _args: &std::collections::HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let text = serde_json::to_string(value).map_err(|e| tera::Error::msg(e.to_string()))?;
    Ok(tera::Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer(template: Option<&str>) -> HttpWriter {
        HttpWriter::new(
            "events",
            vec!["id".to_string(), "name".to_string()],
            HttpParams {
                endpoint: "http://localhost:1/ingest".to_string(),
                format_template: template.map(|t| t.to_string()),
                ..HttpParams::default()
            },
            100,
            Arc::new(AtomicU64::new(0)),
            CancelCause::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_default_body_is_rows_json() {
        let mut w = writer(None);
        w.batch.push(vec![Value::Int(1), Value::String("a".into())]);
        w.batch.push(vec![Value::Null, Value::String("b".into())]);
        let body = w.render_body().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed[0]["id"], serde_json::json!(1));
        assert_eq!(parsed[1]["id"], serde_json::Value::Null);
        assert_eq!(parsed[1]["name"], serde_json::json!("b"));
    }

    #[tokio::test]
    async fn test_custom_template_sees_model_name() {
        let mut w = writer(Some(r#"{"m":"{{ model_name }}","n":{{ rows | length }}}"#));
        w.batch.push(vec![Value::Int(1), Value::Null]);
        let body = w.render_body().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["m"], serde_json::json!("events"));
        assert_eq!(parsed["n"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn test_tcs_template_and_header_default() {
        let w = HttpWriter::new_tcs(
            "events",
            vec!["id".to_string()],
            HttpParams {
                endpoint: "http://localhost:1/tcs".to_string(),
                timeout_secs: 7,
                ..HttpParams::default()
            },
            10,
            Arc::new(AtomicU64::new(0)),
            CancelCause::new(),
        )
        .unwrap();
        assert!(w
            .headers
            .iter()
            .any(|(k, v)| k == TCS_TIMEOUT_HEADER && v == "7000"));

        let mut w = w;
        w.batch.push(vec![Value::Int(5)]);
        let body = w.render_body().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["model"], serde_json::json!("events"));
        assert_eq!(parsed["rows"][0]["id"], serde_json::json!(5));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_delivery_error() {
        let mut w = HttpWriter::new(
            "events",
            vec!["id".to_string()],
            HttpParams {
                endpoint: "http://127.0.0.1:1/nowhere".to_string(),
                timeout_secs: 1,
                retry_wait_min_ms: 10,
                retry_wait_max_ms: 50,
                ..HttpParams::default()
            },
            1,
            Arc::new(AtomicU64::new(0)),
            CancelCause::new(),
        )
        .unwrap();
        let err = w.write_row(&[Value::Int(1)]).await.unwrap_err();
        assert!(matches!(err, SdvgError::HttpDelivery { .. }));
    }
}
