use cmd_util::env::env_config;
use proptest::prelude::*;

use super::{
    list,
    paginator,
};
use crate::{
    ASSET,
    ListArgs,
    Order,
    Page,
    PaginationArgs,
    Paginator,
    Record,
    SortField,
    SortSpec,
    testing::{
        TestRecord,
        TestStore,
        assets,
    },
};

/// What a client sees after following cursors to the end.
#[derive(Debug, Default)]
struct Walk {
    ids: Vec<String>,
    total_counts: Vec<u64>,
    pages: usize,
}

fn sort_args(field: SortField, pagination: PaginationArgs) -> ListArgs {
    ListArgs::paginate(pagination).with_sort(field.to_string())
}

fn record_page(walk: &mut Walk, page: &Page<TestRecord>, prepend: bool) {
    let mut ids: Vec<_> = page.items.iter().map(|r| r.identity().to_owned()).collect();
    if prepend {
        ids.append(&mut walk.ids);
        walk.ids = ids;
    } else {
        walk.ids.extend(ids);
    }
    walk.total_counts.push(page.total_count);
    walk.pages += 1;
}

async fn walk_forward(
    paginator: &Paginator<TestStore>,
    field: SortField,
    n: i64,
    max_pages: usize,
) -> anyhow::Result<Walk> {
    let mut walk = Walk::default();
    let mut cursor = None;
    loop {
        let page = list(paginator, "w1", sort_args(field, PaginationArgs::first(n).after(cursor)))
            .await?;
        anyhow::ensure!(page.page_info.has_previous_page == (walk.pages > 0));
        record_page(&mut walk, &page, false);
        if !page.page_info.has_next_page || walk.pages > max_pages {
            return Ok(walk);
        }
        cursor = page.page_info.end_cursor;
    }
}

async fn walk_backward(
    paginator: &Paginator<TestStore>,
    field: SortField,
    n: i64,
    max_pages: usize,
) -> anyhow::Result<Walk> {
    let mut walk = Walk::default();
    let mut cursor = None;
    loop {
        let page = list(paginator, "w1", sort_args(field, PaginationArgs::last(n).before(cursor)))
            .await?;
        anyhow::ensure!(page.page_info.has_next_page == (walk.pages > 0));
        record_page(&mut walk, &page, true);
        if !page.page_info.has_previous_page || walk.pages > max_pages {
            return Ok(walk);
        }
        cursor = page.page_info.start_cursor;
    }
}

fn sortable() -> impl Strategy<Value = SortField> {
    prop::sample::select(vec![
        SortField::Id,
        SortField::Name,
        SortField::Size,
        SortField::CreatedAt,
    ])
}

/// Records whose names and sizes collide, contain the key separator, are
/// empty or are absent altogether.
fn sparse_records() -> impl Strategy<Value = Vec<TestRecord>> {
    let name = prop::option::of(prop::sample::select(vec!["", "a", "b", "b:c"]));
    let size = prop::option::of(prop::sample::select(vec![-1i64, 0, 7]));
    prop::collection::vec((name, size), 0..24).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (name, size))| {
                let mut record = TestRecord::new(&format!("r{i:02}")).with("team", "w1");
                if let Some(name) = name {
                    record.set("name", name);
                }
                if let Some(size) = size {
                    record.set("size", size);
                }
                record
            })
            .collect()
    })
}

/// Follows cursors both ways over `records` and checks that each walk visits
/// every record once, in ascending `field` order.
fn check_walks(
    records: Vec<TestRecord>,
    field: SortField,
    n: i64,
) -> Result<(), TestCaseError> {
    let m = records.len();
    let mut expected = records.clone();
    let ascending = SortSpec::new(field, Order::Asc);
    expected.sort_by(|a, b| ascending.compare(a, b));
    let expected: Vec<_> = expected.iter().map(|r| r.identity().to_owned()).collect();
    let expected_pages = m.div_ceil(n as usize).max(1);

    let (paginator, _) = paginator(ASSET, records);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (forward, backward) = runtime.block_on(async {
        let forward = walk_forward(&paginator, field, n, expected_pages).await.unwrap();
        let backward = walk_backward(&paginator, field, n, expected_pages).await.unwrap();
        (forward, backward)
    });

    prop_assert_eq!(&forward.ids, &expected);
    prop_assert_eq!(forward.pages, expected_pages);
    prop_assert!(forward.total_counts.iter().all(|c| *c == m as u64));

    prop_assert_eq!(&backward.ids, &expected);
    prop_assert_eq!(backward.pages, expected_pages);
    prop_assert!(backward.total_counts.iter().all(|c| *c == m as u64));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64 * env_config("PAGINATION_PROPTEST_MULTIPLIER", 1),
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_chained_pages_visit_every_record_once(
        m in 0usize..40,
        n in 1i64..12,
        field in sortable(),
        duplicate_sizes in any::<bool>(),
    ) {
        let mut records = assets("w1", m);
        if duplicate_sizes {
            for record in records.iter_mut() {
                record.set("size", 7);
            }
        }
        check_walks(records, field, n)?;
    }

    #[test]
    fn test_sparse_keys_visit_every_record_once(
        records in sparse_records(),
        n in 1i64..6,
        field in sortable(),
    ) {
        check_walks(records, field, n)?;
    }
}
