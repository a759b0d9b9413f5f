use std::collections::{BTreeMap, BTreeSet};

use super::model::ClassifiedTable;

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// A column absent from the map places no constraint.
pub type FilterState = BTreeMap<String, BTreeSet<String>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(table: &ClassifiedTable) -> FilterState {
    table.unique_values.clone()
}

/// Return indices of records that pass all active filters.
///
/// A record passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The record's value for that column is in the selected set → passes
pub fn filtered_indices(table: &ClassifiedTable, filters: &FilterState) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            filters.iter().all(|(col, selected)| {
                match ClassifiedTable::value_of(rec, col) {
                    Some(val) => selected.contains(&val),
                    // unknown column: nothing to filter on
                    None => true,
                }
            })
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ClassifiedRecord, CoverslipType, COVERSLIP_COLUMN, COVERSLIP_TYPE_COLUMN};

    fn table() -> ClassifiedTable {
        let rec = |v: f64, label: &str, kind| ClassifiedRecord {
            max_derivative: v,
            coverslip: label.to_string(),
            coverslip_type: kind,
        };
        ClassifiedTable::from_records(vec![
            rec(0.2, "CTRL1 10µM", CoverslipType::Ctrl10),
            rec(0.8, "WT1 30µM", CoverslipType::Wt30),
            rec(0.1, "WT1 30µM", CoverslipType::Excluded),
        ])
    }

    #[test]
    fn everything_visible_initially() {
        let t = table();
        let filters = init_filter_state(&t);
        assert_eq!(filtered_indices(&t, &filters), vec![0, 1, 2]);
    }

    #[test]
    fn deselecting_a_type_hides_its_records() {
        let t = table();
        let mut filters = init_filter_state(&t);
        filters
            .get_mut(COVERSLIP_TYPE_COLUMN)
            .unwrap()
            .remove(CoverslipType::Excluded.label());
        assert_eq!(filtered_indices(&t, &filters), vec![0, 1]);
    }

    #[test]
    fn empty_selection_hides_everything() {
        let t = table();
        let mut filters = init_filter_state(&t);
        filters.insert(COVERSLIP_COLUMN.to_string(), BTreeSet::new());
        assert!(filtered_indices(&t, &filters).is_empty());
    }
}
