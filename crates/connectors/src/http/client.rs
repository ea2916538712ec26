use crate::error::ConnectorError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

pub const BACKEND: &str = "http-api";

/// Wire date format expected by the API (`dataInicial`).
const DATE_PARAM_FORMAT: &str = "%d/%m/%Y";

pub type PageItem = serde_json::Map<String, serde_json::Value>;

/// One page request against the API. The seam exists so the fetch loop
/// can be driven by stubs in tests; production uses [`HttpPageClient`].
#[async_trait]
pub trait PageClient: Send + Sync {
    /// Requests the page at `offset` for `date`. An empty Vec means the
    /// date is exhausted.
    async fn get_page(
        &self,
        base_url: &str,
        date: NaiveDate,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageItem>, ConnectorError>;
}

/// Response envelope: `{ "objeto": { "itens": [...] } }`.
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    objeto: PageBody,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    itens: Vec<serde_json::Value>,
}

/// reqwest-backed page client with an explicit request timeout; the
/// API offers no ambient one.
pub struct HttpPageClient {
    client: reqwest::Client,
}

impl HttpPageClient {
    pub fn new(timeout: Duration) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ConnectorError::Connectivity {
                backend: BACKEND,
                detail: err.to_string(),
            })?;
        Ok(HttpPageClient { client })
    }
}

#[async_trait]
impl PageClient for HttpPageClient {
    async fn get_page(
        &self,
        base_url: &str,
        date: NaiveDate,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PageItem>, ConnectorError> {
        let context = format!("date {date}, offset {offset}");
        let fetch_err = |detail: String| ConnectorError::Fetch {
            backend: BACKEND,
            context: context.clone(),
            detail,
        };

        let response = self
            .client
            .get(base_url)
            .query(&[
                ("dataInicial", date.format(DATE_PARAM_FORMAT).to_string()),
                ("inicio", offset.to_string()),
                ("limite", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|err| fetch_err(err.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!("status {}", response.status())));
        }

        let envelope: PageEnvelope = response
            .json()
            .await
            .map_err(|err| fetch_err(format!("invalid response body: {err}")))?;

        Ok(envelope
            .objeto
            .itens
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_deserializes_items() {
        let body = r#"{"objeto": {"itens": [{"id": 1, "nome": "a"}, {"id": 2}]}}"#;
        let envelope: PageEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.objeto.itens.len(), 2);
    }

    #[test]
    fn missing_items_field_defaults_to_empty() {
        let body = r#"{"objeto": {}}"#;
        let envelope: PageEnvelope = serde_json::from_str(body).unwrap();
        assert!(envelope.objeto.itens.is_empty());
    }

    #[test]
    fn date_param_uses_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date.format(DATE_PARAM_FORMAT).to_string(), "07/03/2024");
    }
}
