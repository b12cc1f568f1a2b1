use serde_json::Value;

use super::models::{ClientPayload, ClientStats, Pagination};

/// A fetched record: the verbatim payload and its decoded view, when the
/// payload could be decoded.
pub(crate) struct Decoded {
    pub raw: Value,
    pub payload: Option<ClientPayload>,
}

pub(crate) fn decode_all(records: Vec<Value>) -> Vec<Decoded> {
    records
        .into_iter()
        .map(|raw| {
            let payload = ClientPayload::from_raw(&raw).ok();
            Decoded { raw, payload }
        })
        .collect()
}

/// Case-insensitive substring match on company name or external id.
/// A blank term matches everything.
pub(crate) fn matches_search(payload: Option<&ClientPayload>, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let Some(payload) = payload else {
        return false;
    };

    let name_hit = payload
        .display_name()
        .is_some_and(|name| name.to_lowercase().contains(&needle));
    name_hit || payload.id.to_string().contains(&needle)
}

/// Slice `items` to the requested 1-based page.
///
/// An empty set still reports one (empty) page. A page past the end yields
/// an empty slice.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> (Vec<T>, Pagination) {
    let page_size = page_size.max(1);
    let current_page = page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);

    let start = (current_page - 1).saturating_mul(page_size);
    let slice: Vec<T> = items.into_iter().skip(start).take(page_size).collect();

    let pagination = Pagination {
        current_page,
        page_size,
        total_items,
        total_pages,
        has_next_page: current_page < total_pages,
        has_previous_page: current_page > 1,
    };

    (slice, pagination)
}

/// Tally presence of contact data and role flags over the full list.
pub(crate) fn compute_stats(records: &[Decoded]) -> ClientStats {
    let mut stats = ClientStats {
        total_clients: records.len(),
        ..ClientStats::default()
    };

    for payload in records.iter().filter_map(|r| r.payload.as_ref()) {
        stats.with_vat_number += usize::from(payload.has_vat_number());
        stats.with_email += usize::from(payload.has_email());
        stats.with_phone += usize::from(payload.has_phone());
        stats.clients += usize::from(payload.flg_cliente);
        stats.suppliers += usize::from(payload.flg_fornitore);
        stats.prospects += usize::from(payload.flg_prospect);
    }

    stats
}
