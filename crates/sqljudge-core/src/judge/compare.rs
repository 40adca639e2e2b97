use crate::model::{ResultSet, Value};

/// Row multiset in a canonical order: rows sorted lexicographically by value.
pub fn normalize_rows(rows: &[Vec<Value>]) -> Vec<Vec<Value>> {
    let mut sorted = rows.to_vec();
    sorted.sort();
    sorted
}

/// Two result sets match when they have the same column count and the same
/// multiset of rows. Column names only count when `compare_column_names` is set.
pub fn result_sets_match(expected: &ResultSet, actual: &ResultSet, compare_column_names: bool) -> bool {
    if expected.columns.len() != actual.columns.len() {
        return false;
    }
    if compare_column_names && expected.columns != actual.columns {
        return false;
    }
    if expected.rows.len() != actual.rows.len() {
        return false;
    }
    normalize_rows(&expected.rows) == normalize_rows(&actual.rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
        ResultSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn empty_results_match() {
        assert!(result_sets_match(&rs(&["a"], vec![]), &rs(&["b"], vec![]), false));
    }

    #[test]
    fn extra_column_is_a_mismatch() {
        let expected = rs(&["id"], vec![vec![Value::Integer(1)]]);
        let actual = rs(&["id", "name"], vec![vec![Value::Integer(1), Value::Text("x".into())]]);
        assert!(!result_sets_match(&expected, &actual, false));
    }

    #[test]
    fn nulls_are_sortable_and_equal() {
        let expected = rs(
            &["v"],
            vec![vec![Value::Text("b".into())], vec![Value::Null], vec![Value::Integer(4)]],
        );
        let actual = rs(
            &["v"],
            vec![vec![Value::Integer(4)], vec![Value::Text("b".into())], vec![Value::Null]],
        );
        assert!(result_sets_match(&expected, &actual, false));
    }

    #[test]
    fn integer_and_real_of_same_value_match() {
        let expected = rs(&["avg"], vec![vec![Value::Real(3.0)]]);
        let actual = rs(&["avg"], vec![vec![Value::Integer(3)]]);
        assert!(result_sets_match(&expected, &actual, false));
    }

    #[test]
    fn large_mixed_numbers_match_in_any_order() {
        let big = 1_i64 << 53;
        let rows = vec![
            vec![Value::Integer(big)],
            vec![Value::Integer(big + 1)],
            vec![Value::Real(big as f64)],
        ];
        let expected = rs(&["n"], rows.clone());
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let shuffled = order.iter().map(|&i| rows[i].clone()).collect();
            assert!(
                result_sets_match(&expected, &rs(&["n"], shuffled), false),
                "order {order:?} should match"
            );
        }
    }
}
