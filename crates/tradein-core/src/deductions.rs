//! Deduction bookkeeping for devices and presets.
//!
//! Three operations shape the per-device deduction rows:
//! - [`resolve_option_refs`] turns client-supplied ids into zeroed rows,
//!   dropping ids that are not in the category's catalog.
//! - [`merge_preserving_deductions`] re-pairs a new reference set with the
//!   percentages already tuned on the device.
//! - [`overwrite_matching_deductions`] / [`apply_preset`] retarget the
//!   percentages of rows that already exist, never adding or removing rows.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::catalog::{CategoryRows, DeductionRow, OptionId};

/// Output of [`resolve_option_refs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    /// Known ids in request order, each at 0%.
    pub rows: Vec<DeductionRow>,
    /// Requested ids with no catalog entry. These are not an error.
    pub dropped: Vec<OptionId>,
}

impl Resolved {
    #[must_use]
    pub fn option_ids(&self) -> Vec<OptionId> {
        self.rows.iter().map(|r| r.option_id).collect()
    }
}

/// Resolves requested option ids against a category catalog.
///
/// Duplicate ids collapse to their first occurrence, so the output holds at
/// most one row per option.
#[must_use]
pub fn resolve_option_refs<I>(requested: &[OptionId], catalog: I) -> Resolved
where
    I: IntoIterator<Item = OptionId>,
{
    let known: HashSet<OptionId> = catalog.into_iter().collect();
    let mut seen = HashSet::with_capacity(requested.len());
    let mut resolved = Resolved::default();

    for &id in requested {
        if !known.contains(&id) {
            resolved.dropped.push(id);
            continue;
        }
        if seen.insert(id) {
            resolved.rows.push(DeductionRow::zeroed(id));
        }
    }

    resolved
}

/// Re-pairs `refs` with deductions from `existing`.
///
/// A reference keeps its existing percentage when that percentage is
/// non-zero; everything else starts at 0.
#[must_use]
pub fn merge_preserving_deductions<I>(existing: &[DeductionRow], refs: I) -> Vec<DeductionRow>
where
    I: IntoIterator<Item = OptionId>,
{
    let prior: HashMap<OptionId, Decimal> = existing
        .iter()
        .map(|r| (r.option_id, r.deduction_percentage))
        .collect();
    let mut seen = HashSet::new();

    refs.into_iter()
        .filter(|id| seen.insert(*id))
        .map(|id| DeductionRow {
            option_id: id,
            deduction_percentage: prior
                .get(&id)
                .copied()
                .filter(|p| !p.is_zero())
                .unwrap_or(Decimal::ZERO),
        })
        .collect()
}

/// Overwrites the percentage of every row in `target` whose option also
/// appears in `source` under the same category.
///
/// Rows only present in `source` are ignored. Returns the number of rows
/// whose percentage was written.
pub fn overwrite_matching_deductions(target: &mut CategoryRows, source: &CategoryRows) -> usize {
    let mut written = 0;

    for (category, source_rows) in source {
        let Some(target_rows) = target.get_mut(category) else {
            continue;
        };
        let lookup: HashMap<OptionId, Decimal> = source_rows
            .iter()
            .map(|r| (r.option_id, r.deduction_percentage))
            .collect();

        for row in target_rows.iter_mut() {
            if let Some(pct) = lookup.get(&row.option_id) {
                row.deduction_percentage = *pct;
                written += 1;
            }
        }
    }

    written
}

/// Copies a preset's deduction percentages onto a device's existing rows.
pub fn apply_preset(device: &mut CategoryRows, preset: &CategoryRows) -> usize {
    overwrite_matching_deductions(device, preset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{empty_category_rows, OptionCategory};

    fn ids(raw: &[i64]) -> Vec<OptionId> {
        raw.iter().copied().map(OptionId).collect()
    }

    fn row(id: i64, pct: i64) -> DeductionRow {
        DeductionRow {
            option_id: OptionId(id),
            deduction_percentage: Decimal::from(pct),
        }
    }

    #[test]
    fn resolve_drops_unknown_ids() {
        let resolved = resolve_option_refs(&ids(&[1, 99, 2]), ids(&[1, 2, 3]));
        assert_eq!(resolved.option_ids(), ids(&[1, 2]));
        assert_eq!(resolved.dropped, ids(&[99]));
        assert!(resolved
            .rows
            .iter()
            .all(|r| r.deduction_percentage.is_zero()));
    }

    #[test]
    fn resolve_output_is_subset_of_catalog_and_input() {
        let requested = ids(&[5, 4, 4, 8, 1, 5, 12]);
        let catalog = ids(&[1, 2, 3, 4, 5]);
        let resolved = resolve_option_refs(&requested, catalog.clone());
        for r in &resolved.rows {
            assert!(catalog.contains(&r.option_id));
            assert!(requested.contains(&r.option_id));
        }
        assert_eq!(resolved.option_ids(), ids(&[5, 4, 1]));
    }

    #[test]
    fn resolve_against_empty_catalog_yields_nothing() {
        let resolved = resolve_option_refs(&ids(&[1, 2]), Vec::new());
        assert!(resolved.rows.is_empty());
        assert_eq!(resolved.dropped.len(), 2);
    }

    #[test]
    fn merge_keeps_non_zero_deductions() {
        let existing = vec![row(1, 20), row(2, 0), row(3, 15)];
        let merged = merge_preserving_deductions(&existing, ids(&[3, 1, 4]));
        assert_eq!(merged, vec![row(3, 15), row(1, 20), row(4, 0)]);
    }

    #[test]
    fn merge_with_same_refs_is_a_no_op() {
        let existing = vec![row(1, 20), row(2, 0), row(3, 15)];
        let refs: Vec<OptionId> = existing.iter().map(|r| r.option_id).collect();
        assert_eq!(merge_preserving_deductions(&existing, refs), existing);
    }

    #[test]
    fn merge_drops_refs_removed_from_the_request() {
        let existing = vec![row(1, 20), row(2, 10)];
        let merged = merge_preserving_deductions(&existing, ids(&[2]));
        assert_eq!(merged, vec![row(2, 10)]);
    }

    #[test]
    fn apply_preset_overwrites_matching_rows_only() {
        let mut device = empty_category_rows();
        device.insert(OptionCategory::BatteryHealth, vec![row(1, 0), row(2, 5)]);
        device.insert(OptionCategory::Fault, vec![row(10, 30)]);

        let mut preset = CategoryRows::new();
        preset.insert(OptionCategory::BatteryHealth, vec![row(1, 20), row(7, 50)]);
        preset.insert(OptionCategory::Fault, vec![row(11, 40)]);

        let written = apply_preset(&mut device, &preset);

        assert_eq!(written, 1);
        assert_eq!(
            device[&OptionCategory::BatteryHealth],
            vec![row(1, 20), row(2, 5)]
        );
        assert_eq!(device[&OptionCategory::Fault], vec![row(10, 30)]);
    }

    #[test]
    fn apply_preset_never_changes_row_counts() {
        let mut device = empty_category_rows();
        device.insert(OptionCategory::Repair, vec![row(1, 0)]);
        let before: Vec<usize> = device.values().map(Vec::len).collect();

        let mut preset = CategoryRows::new();
        preset.insert(OptionCategory::Repair, vec![row(2, 10), row(3, 10)]);
        preset.insert(OptionCategory::Strap, vec![row(4, 10)]);
        apply_preset(&mut device, &preset);

        let after: Vec<usize> = device.values().map(Vec::len).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn overwrite_can_reset_to_zero() {
        let mut device = CategoryRows::new();
        device.insert(OptionCategory::Side, vec![row(3, 25)]);
        let mut patch = CategoryRows::new();
        patch.insert(OptionCategory::Side, vec![row(3, 0)]);

        assert_eq!(overwrite_matching_deductions(&mut device, &patch), 1);
        assert_eq!(device[&OptionCategory::Side], vec![row(3, 0)]);
    }
}
