//! Answer checking against an expected result set.

use crate::engine::ResultSet;
use std::collections::HashSet;

/// Whether `actual` answers the question whose answer is `expected`.
///
/// - column names must match as a set (projection order is ignored)
/// - row counts must be equal
/// - each expected row must equal some actual row on every expected column
///
/// Row order is ignored. Each expected row is searched independently, so
/// duplicates are not counted against each other.
pub fn compare_against_expected(actual: &ResultSet, expected: &ResultSet) -> bool {
    let actual_columns: HashSet<&str> = actual.columns.iter().map(String::as_str).collect();
    let expected_columns: HashSet<&str> = expected.columns.iter().map(String::as_str).collect();
    if actual_columns != expected_columns {
        return false;
    }

    if actual.rows.len() != expected.rows.len() {
        return false;
    }

    expected.rows.iter().all(|want| {
        actual.rows.iter().any(|have| {
            expected
                .columns
                .iter()
                .all(|column| have.get(column) == want.get(column))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs<const C: usize, const R: usize>(columns: [&str; C], rows: [[&str; C]; R]) -> ResultSet {
        ResultSet::from_positional(columns, rows)
    }

    #[test]
    fn test_exact_match() {
        let expected = rs(["a", "b"], [["1", "x"], ["2", "y"]]);
        assert!(compare_against_expected(&expected.clone(), &expected));
    }

    #[test]
    fn test_row_order_ignored() {
        let expected = rs(["a"], [["1"], ["2"]]);
        let actual = rs(["a"], [["2"], ["1"]]);
        assert!(compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_column_order_ignored() {
        let expected = rs(["a", "b"], [["1", "x"]]);
        let actual = rs(["b", "a"], [["x", "1"]]);
        assert!(compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_column_name_mismatch() {
        let expected = rs(["SecondHighestSalary"], [["100000"]]);
        let actual = rs(["MAX(salary)"], [["120000"]]);
        assert!(!compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_row_count_mismatch() {
        let expected = rs(["a"], [["1"]]);
        let actual = rs(["a"], [["1"], ["1"]]);
        assert!(!compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_value_mismatch() {
        let expected = rs(["a"], [["1"], ["2"]]);
        let actual = rs(["a"], [["1"], ["3"]]);
        assert!(!compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_duplicates_not_multiset_counted() {
        // Both expected rows find the single "1" row
        let expected = rs(["a"], [["1"], ["1"]]);
        let actual = rs(["a"], [["1"], ["2"]]);
        assert!(compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_empty_results_match() {
        let expected = rs(["a"], []);
        let actual = rs(["a"], []);
        assert!(compare_against_expected(&actual, &expected));
    }

    #[test]
    fn test_null_compared_as_text() {
        let expected = rs(["v"], [["NULL"]]);
        let actual = rs(["v"], [["NULL"]]);
        assert!(compare_against_expected(&actual, &expected));
    }
}
