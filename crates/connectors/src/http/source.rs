use crate::{
    capability::DataSource,
    error::ConnectorError,
    http::{
        client::{self, HttpPageClient, PageClient},
        fetcher::PaginatedFetcher,
    },
    profile::ApiProfile,
};
use async_trait::async_trait;
use model::records::record_set::RecordSet;
use std::sync::Arc;

/// Paginated HTTP API as a read capability. Consumed by the
/// orchestrator exactly like any other source.
pub struct HttpApiSource {
    profile: ApiProfile,
    fetcher: PaginatedFetcher,
}

impl HttpApiSource {
    pub fn new(profile: ApiProfile) -> Result<Self, ConnectorError> {
        let client = Arc::new(HttpPageClient::new(profile.timeout)?);
        Ok(Self::with_client(profile, client))
    }

    pub fn with_client(profile: ApiProfile, client: Arc<dyn PageClient>) -> Self {
        let fetcher = PaginatedFetcher::new(client, profile.page_size);
        HttpApiSource { profile, fetcher }
    }
}

#[async_trait]
impl DataSource for HttpApiSource {
    fn backend(&self) -> &'static str {
        client::BACKEND
    }

    /// A non-empty query overrides the profile's base URL; the date
    /// window always comes from the profile.
    async fn read(&self, query: &str) -> Result<RecordSet, ConnectorError> {
        let base_url = if query.trim().is_empty() {
            self.profile.base_url.as_str()
        } else {
            query.trim()
        };
        Ok(self.fetcher.fetch(base_url, self.profile.start_date).await)
    }
}
