//! HTTP client for the spreadsheet script endpoint.
//!
//! The endpoint answers either a bare JSON array of row objects or a
//! `{ success, data, error }` wrapper; both shapes are tolerated. Key order
//! inside each row object is preserved so positional column fallbacks keep
//! working downstream.

use crate::types::RawRow;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned HTTP {status}")]
    Http { status: u16 },
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected payload shape: {0}")]
    Shape(String),
    #[error("script error: {0}")]
    Script(String),
    #[error("no rows found in the spreadsheet")]
    Empty,
}

impl LoadError {
    /// Empty-result is reported separately from transport trouble on the
    /// dashboard; everything else collapses into a connection problem.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, LoadError::Empty)
    }
}

pub struct SheetClient {
    client: reqwest::Client,
    url: String,
}

impl SheetClient {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Fetch the current row set from the script endpoint.
    ///
    /// If the first response body does not decode as JSON (the endpoint
    /// sometimes answers a redirect chain with an HTML shim first), one
    /// retry is made asking for JSON explicitly before giving up.
    pub async fn fetch_rows(&self) -> Result<Vec<RawRow>, LoadError> {
        info!(url = %self.url, "fetching rows from the sheet endpoint");
        let body = self.get_body(false).await?;
        let payload: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(err) => {
                warn!(%err, "first response was not JSON, retrying with explicit accept header");
                let body = self.get_body(true).await?;
                serde_json::from_str(&body)?
            }
        };
        let rows = rows_from_payload(&payload)?;
        info!(count = rows.len(), "rows received");
        Ok(rows)
    }

    async fn get_body(&self, force_json: bool) -> Result<String, LoadError> {
        let mut req = self.client.get(&self.url);
        if force_json {
            req = req.header(reqwest::header::ACCEPT, "application/json");
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Http {
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Pull the row list out of either payload shape. Zero rows is its own
/// error, distinct from transport failure.
pub fn rows_from_payload(payload: &Value) -> Result<Vec<RawRow>, LoadError> {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => {
            if obj.get("success").and_then(Value::as_bool) == Some(false) {
                let message = obj
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown script failure")
                    .to_string();
                return Err(LoadError::Script(message));
            }
            match obj.get("data") {
                Some(Value::Array(items)) => items.as_slice(),
                Some(other) => {
                    return Err(LoadError::Shape(format!(
                        "data field is {}, expected an array",
                        type_name(other)
                    )))
                }
                None => return Err(LoadError::Shape("object without a data field".to_string())),
            }
        }
        other => {
            return Err(LoadError::Shape(format!(
                "top-level {}, expected array or object",
                type_name(other)
            )))
        }
    };

    let rows: Vec<RawRow> = items
        .iter()
        .filter_map(Value::as_object)
        .map(RawRow::from_json_object)
        .collect();
    if rows.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(rows)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
