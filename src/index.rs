//! Lookup structures over a parsed table, keyed by canonical identifier.

use std::collections::HashMap;

use log::warn;

use crate::{canon::canon_id, tabular::RawTable};

/// Row lookups for one dataset: `by_id` maps a canonical entity id to its row
/// index, `by_parent` groups row indexes under a canonical parent id (campuses
/// under their district). Built fresh on every load and never mutated;
/// filtered or sorted views are produced downstream, not here.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    by_id: HashMap<String, usize>,
    by_parent: HashMap<String, Vec<usize>>,
}

impl EntityIndex {
    /// Indexes `table` by the resolved `id_column` and, when given, groups by
    /// `parent_column`. Rows whose id cell is missing or digit-free are
    /// skipped silently. A duplicate canonical id keeps the last row seen,
    /// with a warning for the dropped one.
    pub fn build(
        table: &RawTable,
        id_column: Option<usize>,
        parent_column: Option<usize>,
    ) -> Self {
        let mut index = EntityIndex::default();
        for (row_idx, row) in table.rows.iter().enumerate() {
            if let Some(raw) = table.cell(row, id_column) {
                let id = canon_id(raw);
                if !id.is_empty() {
                    if let Some(previous) = index.by_id.insert(id.clone(), row_idx) {
                        warn!(
                            "duplicate canonical id '{id}': row {} replaces row {}",
                            row_idx + 1,
                            previous + 1
                        );
                    }
                }
            }
            if let Some(raw) = table.cell(row, parent_column) {
                let parent = canon_id(raw);
                if !parent.is_empty() {
                    index.by_parent.entry(parent).or_default().push(row_idx);
                }
            }
        }
        index
    }

    pub fn get(&self, canonical_id: &str) -> Option<usize> {
        self.by_id.get(canonical_id).copied()
    }

    /// Child row indexes for a canonical parent id, in source order.
    pub fn children(&self, canonical_parent: &str) -> &[usize] {
        self.by_parent
            .get(canonical_parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn id_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn parent_count(&self) -> usize {
        self.by_parent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::parse_csv;

    #[test]
    fn indexes_rows_by_canonical_id() {
        let table = parse_csv("DISTRICT_N,NAME\n'015901,Alamo Heights ISD\n227901,Austin ISD\n");
        let index = EntityIndex::build(&table, Some(0), None);
        assert_eq!(index.get("15901"), Some(0));
        assert_eq!(index.get("227901"), Some(1));
        assert_eq!(index.get("015901"), None);
    }

    #[test]
    fn rows_without_id_are_skipped() {
        let table = parse_csv("ID,NAME\n,No Id ISD\nN/A,Lettered ISD\n101,Real ISD\n");
        let index = EntityIndex::build(&table, Some(0), None);
        assert_eq!(index.id_count(), 1);
        assert_eq!(index.get("101"), Some(2));
    }

    #[test]
    fn duplicate_ids_keep_last_row() {
        let table = parse_csv("ID,NAME\n101,First\n0101,Second\n");
        let index = EntityIndex::build(&table, Some(0), None);
        assert_eq!(index.get("101"), Some(1));
    }

    #[test]
    fn parent_groups_merge_zero_padded_variants_in_source_order() {
        let table = parse_csv(
            "CAMPUS_ID,DISTRICT_N\n101001,015901\n101002,15901\n202001,227901\n",
        );
        let index = EntityIndex::build(&table, Some(0), Some(1));
        assert_eq!(index.children("15901"), &[0, 1]);
        assert_eq!(index.children("227901"), &[2]);
        assert!(index.children("999999").is_empty());
    }
}
