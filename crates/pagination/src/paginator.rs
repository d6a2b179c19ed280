use std::time::Duration;

use errors::{
    ErrorMetadata,
    ErrorMetadataAnyhowExt,
};
use tokio_util::sync::CancellationToken;

use crate::{
    knobs::{
        PAGINATION_MAX_REFILL_QUERIES,
        PAGINATION_STORE_TIMEOUT,
    },
    metrics::{
        log_post_filter_dropped,
        log_unreadable_scope,
        paginate_timer,
        store_query_timer,
    },
    page::{
        Page,
        assemble_page,
        collect_candidates,
    },
    range::{
        QueryPlan,
        RangeQuery,
        build_range_query,
    },
    request::{
        ListArgs,
        PageRequest,
    },
    resource::ResourceSchema,
    store::DocumentStore,
    visibility::VisibilityFilter,
};

/// Serves pages of one resource kind from one store.
pub struct Paginator<S> {
    store: S,
    schema: ResourceSchema,
    timeout: Duration,
}

impl<S: DocumentStore> Paginator<S> {
    pub fn new(store: S, schema: ResourceSchema) -> Self {
        Self {
            store,
            schema,
            timeout: *PAGINATION_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lists the records of `scope_id` visible under `visibility`.
    ///
    /// An unreadable scope yields an empty page without touching the store.
    /// Either both the count and the range query succeed or the call fails;
    /// store errors are returned as the store reported them. Cancelling
    /// `cancel` or exceeding the timeout abandons both queries.
    pub async fn paginate(
        &self,
        visibility: &VisibilityFilter,
        scope_id: &str,
        args: ListArgs,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Page<S::Record>> {
        let timer = paginate_timer(self.schema.name);
        match self.paginate_inner(visibility, scope_id, args, cancel).await {
            Ok(page) => {
                timer.finish();
                Ok(page)
            },
            Err(e) => {
                timer.finish_with(e.metric_status_tag_value());
                Err(e)
            },
        }
    }

    async fn paginate_inner(
        &self,
        visibility: &VisibilityFilter,
        scope_id: &str,
        args: ListArgs,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Page<S::Record>> {
        let request = PageRequest::normalize(&self.schema, args)?;
        tracing::debug!("{} page request for {scope_id}: {request:?}", self.schema.name);

        let query = match build_range_query(&self.schema, visibility, scope_id, &request) {
            QueryPlan::Unreadable => {
                tracing::info!(
                    "{} {scope_id} is not readable, returning an empty {} page",
                    self.schema.scope_kind,
                    self.schema.name
                );
                log_unreadable_scope(self.schema.name);
                return Ok(Page::empty(request.sort.field));
            },
            QueryPlan::Range(query) => query,
        };

        let (total_count, candidates) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                anyhow::bail!(ErrorMetadata::client_disconnect());
            },
            result = tokio::time::timeout(self.timeout, self.execute(visibility, &query)) => {
                result.map_err(|_| {
                    anyhow::anyhow!(ErrorMetadata::store_unavailable(
                        "StoreQueryTimeout",
                        format!(
                            "Listing {} for {scope_id} did not finish within {:?}",
                            self.schema.name, self.timeout
                        ),
                    ))
                })??
            },
        };

        let page = assemble_page(candidates, total_count, &request);
        tracing::debug!(
            "{} page for {scope_id}: {} items of {}, {:?}",
            self.schema.name,
            page.items.len(),
            page.total_count,
            page.page_info
        );
        Ok(page)
    }

    async fn execute(
        &self,
        visibility: &VisibilityFilter,
        query: &RangeQuery,
    ) -> anyhow::Result<(u64, Vec<S::Record>)> {
        let _timer = store_query_timer();
        futures::try_join!(
            self.store.count(&query.base),
            self.find_visible(visibility, query)
        )
    }

    /// Runs `query` and keeps the rows `visibility` lets through. When the
    /// check rejects rows out of a full read, reads on past the last row until
    /// `query.limit` rows pass, the store runs dry or the refill budget is
    /// spent.
    async fn find_visible(
        &self,
        visibility: &VisibilityFilter,
        query: &RangeQuery,
    ) -> anyhow::Result<Vec<S::Record>> {
        let keep = visibility.row_filter::<S::Record>(&self.schema);
        let mut candidates = Vec::with_capacity(query.limit);
        let mut dropped = 0;
        let mut next = query.clone();
        let mut refills = 0;
        loop {
            let stream = self.store.find(&next).await?;
            let batch = collect_candidates(stream, next.limit, &keep).await?;
            dropped += batch.dropped;
            let resume = (batch.dropped > 0 && batch.read >= next.limit)
                .then(|| batch.last_read().cloned())
                .flatten();
            candidates.extend(batch.kept);
            let wanted = query.limit - candidates.len();
            let Some(last) = resume.filter(|_| wanted > 0) else {
                break;
            };
            if refills == *PAGINATION_MAX_REFILL_QUERIES {
                tracing::warn!(
                    "Gave up refilling a {} page after {refills} follow-up reads, {} of {} rows",
                    self.schema.name,
                    candidates.len(),
                    query.limit
                );
                break;
            }
            refills += 1;
            next = next.resume_past(&last, wanted);
        }
        if dropped > 0 {
            tracing::debug!(
                "Row visibility check dropped {dropped} rows matching {} over {} reads",
                query.filter(),
                refills + 1
            );
        }
        log_post_filter_dropped(self.schema.name, dropped);
        Ok(candidates)
    }
}
