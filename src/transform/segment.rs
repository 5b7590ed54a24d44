//! Segment catalog and reference resolution.
//!
//! Reservations carry free-text references (agency names, segment
//! descriptions, price list codes). Each is resolved against the hotel's
//! catalog; anything the catalog does not know becomes `UNASSIGNED`.

use std::collections::HashMap;

use crate::models::{SegmentCollection, SegmentItem, SegmentKind, UNASSIGNED};

/// Read-only lookup built once per hotel run from the configuration.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    collection: SegmentCollection,
    by_code: HashMap<(SegmentKind, String), usize>,
    by_name: HashMap<(SegmentKind, String), usize>,
    unassigned: SegmentItem,
}

impl SegmentCatalog {
    /// Build the catalog, adding the `UNASSIGNED` entry to every category.
    pub fn new(mut collection: SegmentCollection) -> Self {
        let mut by_code = HashMap::new();
        let mut by_name = HashMap::new();

        for kind in SegmentKind::ALL {
            let items = collection.items_mut(kind);
            if !items.iter().any(|item| item.code == UNASSIGNED) {
                items.push(SegmentItem::unassigned());
            }
            for (idx, item) in items.iter().enumerate() {
                // First definition wins when a hotel repeats a code.
                by_code.entry((kind, item.code.clone())).or_insert(idx);
                by_name
                    .entry((kind, normalize(&item.name)))
                    .or_insert(idx);
            }
        }

        Self {
            collection,
            by_code,
            by_name,
            unassigned: SegmentItem::unassigned(),
        }
    }

    /// Resolve a reference by code, then by name; never fails.
    pub fn resolve(&self, kind: SegmentKind, reference: Option<&str>) -> &SegmentItem {
        let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
            return &self.unassigned;
        };

        let idx = self
            .by_code
            .get(&(kind, reference.to_string()))
            .or_else(|| self.by_name.get(&(kind, normalize(reference))));

        match idx {
            Some(&idx) => &self.collection.items(kind)[idx],
            None => {
                log::debug!("No {:?} entry for '{}', using {}", kind, reference, UNASSIGNED);
                &self.unassigned
            }
        }
    }

    /// Shorthand for the resolved code.
    pub fn code(&self, kind: SegmentKind, reference: Option<&str>) -> String {
        self.resolve(kind, reference).code.clone()
    }

    /// The processed `segments` document.
    pub fn collection(&self) -> &SegmentCollection {
        &self.collection
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
