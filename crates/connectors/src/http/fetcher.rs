use crate::http::client::{PageClient, PageItem};
use chrono::{Local, NaiveDate};
use model::{core::value::Value, pagination::cursor::FetchCursor, records::record_set::RecordSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Walks a date range and an offset cursor against a paginated API,
/// accumulating every item in arrival order (date ascending, then
/// offset ascending). Requests are strictly sequential; each one is a
/// single suspension point.
///
/// Failure policy: a page error ends only the current date's inner
/// loop. It is logged distinctly from exhaustion, but the caller sees
/// no difference — the returned record set may be incomplete.
pub struct PaginatedFetcher {
    client: Arc<dyn PageClient>,
    page_size: usize,
}

impl PaginatedFetcher {
    pub fn new(client: Arc<dyn PageClient>, page_size: usize) -> Self {
        PaginatedFetcher {
            client,
            page_size: page_size.max(1),
        }
    }

    /// Fetches every item from `start_date` through today. "Today" is
    /// evaluated once on entry, not per page.
    pub async fn fetch(&self, base_url: &str, start_date: NaiveDate) -> RecordSet {
        self.fetch_until(base_url, start_date, Local::now().date_naive())
            .await
    }

    /// Same walk with an explicit inclusive end date.
    pub async fn fetch_until(
        &self,
        base_url: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> RecordSet {
        let mut cursor = FetchCursor::new(start_date);
        let mut items: Vec<PageItem> = Vec::new();

        while cursor.date() <= end_date {
            loop {
                let page = self
                    .client
                    .get_page(base_url, cursor.date(), cursor.offset(), self.page_size)
                    .await;

                match page {
                    Ok(page) if page.is_empty() => {
                        debug!(date = %cursor.date(), offset = cursor.offset(), "date exhausted");
                        break;
                    }
                    Ok(page) => {
                        let short = page.len() < self.page_size;
                        items.extend(page);
                        if short {
                            // A short page is the last one for this
                            // date; skip the empty confirmation call.
                            break;
                        }
                        cursor.advance_page(self.page_size);
                    }
                    Err(err) => {
                        // Not the same as "no more data", but the walk
                        // still moves to the next date.
                        warn!(
                            date = %cursor.date(),
                            offset = cursor.offset(),
                            error = %err,
                            "page request failed, skipping rest of date"
                        );
                        break;
                    }
                }
            }
            cursor.advance_date();
        }

        record_set_from_items(items)
    }
}

/// Builds a record set from accumulated items. Columns come from the
/// first item's keys; items missing a key get `Null` for it.
fn record_set_from_items(items: Vec<PageItem>) -> RecordSet {
    let columns: Vec<String> = items
        .first()
        .map(|item| item.keys().cloned().collect())
        .unwrap_or_default();

    let mut record_set = RecordSet::new(columns.clone());
    for mut item in items {
        let row = columns
            .iter()
            .map(|column| match item.remove(column) {
                Some(value) => Value::from_json(value),
                None => Value::Null,
            })
            .collect();
        record_set.push_row(row);
    }
    record_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn item(id: usize) -> PageItem {
        let mut map = PageItem::new();
        map.insert("id".into(), serde_json::json!(id));
        map
    }

    /// Serves `total` items for each configured date; errors for dates
    /// in `failing`.
    struct StubClient {
        totals: Vec<(NaiveDate, usize)>,
        failing: Vec<NaiveDate>,
        requests: Mutex<Vec<(NaiveDate, usize)>>,
    }

    impl StubClient {
        fn new(totals: Vec<(NaiveDate, usize)>) -> Self {
            StubClient {
                totals,
                failing: Vec::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(NaiveDate, usize)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageClient for StubClient {
        async fn get_page(
            &self,
            _base_url: &str,
            date: NaiveDate,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<PageItem>, ConnectorError> {
            self.requests.lock().unwrap().push((date, offset));

            if self.failing.contains(&date) {
                return Err(ConnectorError::Fetch {
                    backend: "http-api",
                    context: format!("date {date}, offset {offset}"),
                    detail: "status 500".into(),
                });
            }

            let total = self
                .totals
                .iter()
                .find(|(d, _)| *d == date)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            let end = (offset + limit).min(total);
            Ok((offset..end).map(item).collect())
        }
    }

    async fn fetch(client: &Arc<StubClient>, page_size: usize, start: u32, end: u32) -> RecordSet {
        PaginatedFetcher::new(client.clone() as Arc<dyn PageClient>, page_size)
            .fetch_until("http://api.test/items", date(start), date(end))
            .await
    }

    #[tokio::test]
    async fn empty_dates_cost_one_request_each() {
        let client = Arc::new(StubClient::new(vec![]));
        let rs = fetch(&client, 100, 1, 3).await;

        assert!(rs.is_empty());
        assert_eq!(
            client.requests(),
            vec![(date(1), 0), (date(2), 0), (date(3), 0)]
        );
    }

    #[tokio::test]
    async fn paginates_in_page_size_steps_until_a_short_page() {
        let client = Arc::new(StubClient::new(vec![(date(1), 250)]));
        let rs = fetch(&client, 100, 1, 1).await;

        assert_eq!(rs.len(), 250);
        assert_eq!(
            client.requests(),
            vec![(date(1), 0), (date(1), 100), (date(1), 200)]
        );
    }

    #[tokio::test]
    async fn a_full_final_page_needs_an_empty_confirmation() {
        let client = Arc::new(StubClient::new(vec![(date(1), 100)]));
        let rs = fetch(&client, 100, 1, 1).await;

        assert_eq!(rs.len(), 100);
        assert_eq!(client.requests(), vec![(date(1), 0), (date(1), 100)]);
    }

    #[tokio::test]
    async fn items_arrive_in_date_then_offset_order() {
        let client = Arc::new(StubClient::new(vec![(date(1), 3), (date(2), 2)]));
        let rs = fetch(&client, 2, 1, 2).await;

        assert_eq!(rs.len(), 5);
        let ids: Vec<Value> = rs.rows().iter().map(|row| row[0].clone()).collect();
        assert_eq!(
            ids,
            vec![
                Value::Int(0),
                Value::Int(1),
                Value::Int(2),
                Value::Int(0),
                Value::Int(1)
            ]
        );
    }

    #[tokio::test]
    async fn a_failing_date_does_not_stop_later_dates() {
        let mut stub = StubClient::new(vec![(date(1), 1), (date(2), 1)]);
        stub.failing.push(date(1));
        let client = Arc::new(stub);

        let rs = fetch(&client, 100, 1, 2).await;

        // Date 1's failure is silent in the result; date 2 still loads.
        assert_eq!(rs.len(), 1);
        assert_eq!(client.requests(), vec![(date(1), 0), (date(2), 0)]);
    }

    #[tokio::test]
    async fn start_after_end_fetches_nothing() {
        let client = Arc::new(StubClient::new(vec![(date(1), 10)]));
        let rs = fetch(&client, 100, 5, 1).await;

        assert!(rs.is_empty());
        assert!(client.requests().is_empty());
    }

    #[test]
    fn missing_keys_become_null() {
        let mut second = item(2);
        second.insert("extra".into(), serde_json::json!("x"));
        let mut first = item(1);
        first.insert("name".into(), serde_json::json!("a"));

        let rs = record_set_from_items(vec![first, second]);

        // Columns come from the first item.
        assert_eq!(rs.columns(), ["id".to_string(), "name".to_string()]);
        assert_eq!(rs.rows()[1], vec![Value::Int(2), Value::Null]);
    }
}
