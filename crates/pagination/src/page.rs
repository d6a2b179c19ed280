use futures::{
    StreamExt,
    TryStreamExt,
};
use serde::Serialize;

use crate::{
    cursor::{
        Cursor,
        encode_cursor,
        encode_identity_cursor,
    },
    request::{
        PageRequest,
        ScanDirection,
    },
    sort::SortField,
    store::{
        Record,
        RecordStream,
    },
};

/// Boundary information for one page.
///
/// Only the flag on the scanned side is backed by the store (through the
/// sentinel row). The other flag is inferred from the cursor the client
/// sent: paging forward from an `after` cursor means something precedes the
/// page, and paging backward from a `before` cursor means something follows
/// it. Without a cursor on that side the flag is `false`, even if records
/// exist there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<Cursor>,
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// One page of records in ascending display order.
#[derive(Clone, Debug)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub total_count: u64,
    pub page_info: PageInfo,
    pub sort_field: SortField,
}

impl<R> Page<R> {
    pub fn empty(sort_field: SortField) -> Self {
        Self {
            items: vec![],
            total_count: 0,
            page_info: PageInfo::default(),
            sort_field,
        }
    }
}

/// The cursor pointing at `record` under the ordering by `field`.
pub fn record_cursor<R: Record>(record: &R, field: SortField) -> Cursor {
    match record.sort_key(field) {
        Some(key) => encode_cursor(record.identity(), &key),
        None => {
            if record.field(field.field_name()).is_some() {
                tracing::warn!(
                    "Record {} has a {field} value of the wrong type, issuing a keyless cursor",
                    record.identity()
                );
            }
            encode_identity_cursor(field, record.identity())
        },
    }
}

/// The rows of one range read, split by the row-level visibility check.
#[derive(Debug)]
pub struct Batch<R> {
    /// Rows that passed, in scan order.
    pub kept: Vec<R>,
    pub dropped: usize,
    /// Rows pulled from the stream, kept or not.
    pub read: usize,
    last_dropped: Option<R>,
}

impl<R> Batch<R> {
    /// The last row pulled from the stream. A follow-up read resumes past it.
    pub fn last_read(&self) -> Option<&R> {
        self.last_dropped.as_ref().or(self.kept.last())
    }
}

/// Reads rows from `stream` until `limit` rows pass `keep` or the stream
/// ends.
///
/// Rejected rows still count against the store's limit, so a batch that
/// read `limit` rows and dropped some may stop short of rows that would
/// pass. The caller resumes past `Batch::last_read` to fill the page.
pub async fn collect_candidates<R: Record>(
    stream: RecordStream<R>,
    limit: usize,
    keep: impl Fn(&R) -> bool,
) -> anyhow::Result<Batch<R>> {
    let mut batch = Batch {
        kept: Vec::with_capacity(limit),
        dropped: 0,
        read: 0,
        last_dropped: None,
    };
    let mut stream = stream.fuse();
    while batch.kept.len() < limit {
        let Some(record) = stream.try_next().await? else {
            break;
        };
        batch.read += 1;
        if keep(&record) {
            batch.last_dropped = None;
            batch.kept.push(record);
        } else {
            batch.dropped += 1;
            batch.last_dropped = Some(record);
        }
    }
    Ok(batch)
}

/// Turns the candidates of a range query (in scan order, at most
/// `request.fetch_limit()` of them) into a page.
pub fn assemble_page<R: Record>(
    mut candidates: Vec<R>,
    total_count: u64,
    request: &PageRequest,
) -> Page<R> {
    let reached_sentinel = candidates.len() >= request.fetch_limit();
    candidates.truncate(request.page_size);

    let (has_next_page, has_previous_page) = match request.direction {
        ScanDirection::Forward => (reached_sentinel, request.after.is_some()),
        ScanDirection::Backward => (request.before.is_some(), reached_sentinel),
    };
    if request.direction == ScanDirection::Backward {
        candidates.reverse();
    }

    let field = request.sort.field;
    let page_info = PageInfo {
        start_cursor: candidates.first().map(|r| record_cursor(r, field)),
        end_cursor: candidates.last().map(|r| record_cursor(r, field)),
        has_next_page,
        has_previous_page,
    };
    Page {
        items: candidates,
        total_count,
        page_info,
        sort_field: field,
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use pretty_assertions::assert_eq;

    use super::{
        PageInfo,
        assemble_page,
        collect_candidates,
    };
    use crate::{
        cursor::Cursor,
        request::{
            ListArgs,
            PageRequest,
            PaginationArgs,
        },
        resource::ASSET,
        store::Record,
        testing::TestRecord,
    };

    fn records(ids: &[&str]) -> Vec<TestRecord> {
        ids.iter()
            .map(|id| TestRecord::new(id).with("name", *id))
            .collect()
    }

    fn request(pagination: PaginationArgs) -> PageRequest {
        PageRequest::normalize(&ASSET, ListArgs::paginate(pagination).with_sort("name")).unwrap()
    }

    fn ids(items: &[TestRecord]) -> Vec<&str> {
        items.iter().map(|r| r.identity()).collect()
    }

    #[test]
    fn test_forward_sentinel() {
        let page = assemble_page(records(&["a", "b", "c"]), 7, &request(PaginationArgs::first(2)));
        assert_eq!(ids(&page.items), vec!["a", "b"]);
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
        assert_eq!(page.page_info.start_cursor, Some(Cursor::new("name/a:a")));
        assert_eq!(page.page_info.end_cursor, Some(Cursor::new("name/b:b")));
        assert_eq!(page.total_count, 7);
    }

    #[test]
    fn test_forward_exact_fit() {
        let pagination = PaginationArgs::first(2).after(Some(Cursor::new("name/x:x")));
        let page = assemble_page(records(&["a", "b"]), 2, &request(pagination));
        assert!(!page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_backward_is_reversed() {
        let pagination = PaginationArgs::last(2).before(Some(Cursor::new("name/z:z")));
        let page = assemble_page(records(&["d", "c", "b"]), 9, &request(pagination));
        assert_eq!(ids(&page.items), vec!["c", "d"]);
        assert!(page.page_info.has_previous_page);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.start_cursor, Some(Cursor::new("name/c:c")));
    }

    #[test]
    fn test_empty_page_has_no_cursors() {
        let page = assemble_page(Vec::<TestRecord>::new(), 0, &request(PaginationArgs::first(2)));
        assert_eq!(page.page_info, PageInfo::default());
    }

    #[test]
    fn test_missing_sort_value_gives_keyless_cursor() {
        let page = assemble_page(
            vec![TestRecord::new("a")],
            1,
            &request(PaginationArgs::first(2)),
        );
        assert_eq!(page.page_info.end_cursor, Some(Cursor::new("name/a")));
    }

    #[tokio::test]
    async fn test_collect_stops_at_limit_after_filtering() -> anyhow::Result<()> {
        let rows = records(&["a", "x1", "b", "x2", "c", "d"]);
        let stream = Box::pin(stream::iter(rows.into_iter().map(anyhow::Ok)));
        let batch =
            collect_candidates(stream, 3, |r: &TestRecord| !r.identity().starts_with('x')).await?;
        assert_eq!(ids(&batch.kept), vec!["a", "b", "c"]);
        assert_eq!(batch.dropped, 2);
        assert_eq!(batch.read, 5);
        assert_eq!(batch.last_read().map(|r| r.identity()), Some("c"));
        Ok(())
    }

    #[tokio::test]
    async fn test_last_read_can_be_a_dropped_row() -> anyhow::Result<()> {
        let rows = records(&["a", "b", "x1"]);
        let stream = Box::pin(stream::iter(rows.into_iter().map(anyhow::Ok)));
        let batch =
            collect_candidates(stream, 3, |r: &TestRecord| !r.identity().starts_with('x')).await?;
        assert_eq!(ids(&batch.kept), vec!["a", "b"]);
        assert_eq!(batch.read, 3);
        assert_eq!(batch.last_read().map(|r| r.identity()), Some("x1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_collect_propagates_stream_error() {
        let rows: Vec<anyhow::Result<TestRecord>> =
            vec![Ok(TestRecord::new("a")), Err(anyhow::anyhow!("connection reset"))];
        let err = collect_candidates(Box::pin(stream::iter(rows)), 5, |_: &TestRecord| true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }
}
