//! Catalog listing for icon pickers
//!
//! Listings are streamed to a callback in batches, at most one batch per
//! second plus a final flush, so a picker can show results while a large pack
//! is still being read.

use crate::pack::entry::IconEntry;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Minimum time between two delivered batches
pub const BATCH_INTERVAL: Duration = Duration::from_millis(1000);

/// The first batch is due this long after listing starts
const FIRST_BATCH_DELAY: Duration = Duration::from_millis(100);

/// One row of a catalog listing
#[derive(Debug, Clone)]
pub enum CatalogItem {
    /// Section header
    Category(String),
    /// Selectable icon
    Icon(IconEntry),
}

/// Buffers items and hands them to the callback in timed batches
pub struct Batcher<'a> {
    callback: &'a mut dyn FnMut(Vec<CatalogItem>),
    pending: Vec<CatalogItem>,
    last_send: Instant,
}

impl<'a> Batcher<'a> {
    /// Batcher delivering to `callback`
    pub fn new(callback: &'a mut dyn FnMut(Vec<CatalogItem>)) -> Self {
        let now = Instant::now();
        let last_send = now
            .checked_sub(BATCH_INTERVAL - FIRST_BATCH_DELAY)
            .unwrap_or(now);
        Self {
            callback,
            pending: Vec::new(),
            last_send,
        }
    }

    /// Buffer an item, delivering the batch if one is due
    pub fn push(&mut self, item: CatalogItem) {
        self.pending.push(item);
        self.flush(false);
    }

    /// Deliver the buffered batch if due, or unconditionally when `force` is set
    pub fn flush(&mut self, force: bool) {
        let now = Instant::now();
        if force || now.duration_since(self.last_send) >= BATCH_INTERVAL {
            (self.callback)(std::mem::take(&mut self.pending));
            self.last_send = now;
        }
    }
}

/// Alphabetic index label: uppercased first letter, `#` for anything else
pub fn index_label(display_name: &str) -> String {
    match display_name.chars().next() {
        Some(c) if c.is_alphabetic() => c.to_uppercase().collect(),
        _ => "#".to_string(),
    }
}

/// List entries grouped under alphabetic index headers
///
/// Unavailable and filtered-out entries are dropped; entries sharing an
/// identifier name are collapsed to the first in sorted order.
pub fn list_by_index<C, F>(entries: Vec<IconEntry>, batcher: &mut Batcher<'_>, cancel: C, filter: F)
where
    C: Fn() -> bool,
    F: Fn(&str) -> bool + Sync,
{
    let mut entries: Vec<IconEntry> = entries
        .into_par_iter()
        .filter(|entry| filter(entry.identifier_name()) && entry.is_available())
        .collect();
    entries.sort_by(|a, b| a.identifier_name().cmp(b.identifier_name()));
    entries.dedup_by(|a, b| a.identifier_name() == b.identifier_name());

    let mut labeled: Vec<(String, String, IconEntry)> = entries
        .into_iter()
        .map(|entry| {
            let name = entry.display_name();
            (index_label(&name), name, entry)
        })
        .collect();
    labeled.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut current_label: Option<String> = None;
    for (label, _, entry) in labeled {
        if cancel() {
            return;
        }
        if current_label.as_deref() != Some(label.as_str()) {
            batcher.push(CatalogItem::Category(label.clone()));
            current_label = Some(label);
        }
        batcher.push(CatalogItem::Icon(entry));
    }
    batcher.flush(true);
}
