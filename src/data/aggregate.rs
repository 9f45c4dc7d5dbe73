//! Grouping and counting helpers over a [`Table`].

use std::collections::BTreeMap;

use super::models::{numeric_cell, Table, TableError, Value};

/// Result column name used when the caller does not pick one
pub const DEFAULT_RESULT_NAME: &str = "n";

/// A table partitioned by one or more key columns.
///
/// Groups iterate in ascending key order. Rows with a null key are left out.
#[derive(Debug)]
pub struct GroupedTable<'a> {
    table: &'a Table,
    keys: Vec<String>,
    groups: BTreeMap<Vec<Value>, Vec<usize>>,
}

impl<'a> GroupedTable<'a> {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate (group key, row indices) pairs
    pub fn groups(&self) -> impl Iterator<Item = (&Vec<Value>, &Vec<usize>)> {
        self.groups.iter()
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }
}

/// Partition `table` by the given key columns
pub fn group<'a, S: AsRef<str>>(table: &'a Table, keys: &[S]) -> Result<GroupedTable<'a>, TableError> {
    let key_idx = keys
        .iter()
        .map(|k| table.column_index(k.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
        if key.iter().any(Value::is_null) {
            continue;
        }
        groups.entry(key).or_default().push(row_idx);
    }

    Ok(GroupedTable {
        table,
        keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
        groups,
    })
}

/// Sum `var` within each group.
///
/// The result has the key columns followed by one column called `name`.
/// Sums stay integers when every summed cell is an integer and the total
/// fits in an `i64`, otherwise they are floats.
pub fn sum_by_var(grouped: &GroupedTable<'_>, var: &str, name: &str) -> Result<Table, TableError> {
    let table = grouped.table;
    let var_idx = table.column_index(var)?;

    let mut rows = Vec::with_capacity(grouped.len());
    for (key, members) in grouped.groups() {
        let cells: Vec<&Value> = members
            .iter()
            .map(|&r| &table.rows()[r][var_idx])
            .filter(|v| !v.is_null())
            .collect();

        let int_total = cells.iter().try_fold(0i64, |acc, v| match v {
            Value::Int(i) => acc.checked_add(*i),
            _ => None,
        });
        let total = match int_total {
            Some(sum) => Value::Int(sum),
            None => {
                let mut sum = 0.0;
                for cell in cells {
                    sum += numeric_cell(var, cell)?;
                }
                Value::Float(sum)
            }
        };

        let mut row = key.clone();
        row.push(total);
        rows.push(row);
    }

    let mut columns = grouped.keys.clone();
    columns.push(name.to_string());
    Ok(Table::new(columns, rows))
}

/// Occurrences of each distinct value of `var`, ascending by value.
///
/// The result has two columns: `var` and `name`. Nulls are not counted.
pub fn count_unique(table: &Table, var: &str, name: &str) -> Result<Table, TableError> {
    let mut counts: BTreeMap<Value, i64> = BTreeMap::new();
    for value in table.column(var)? {
        if value.is_null() {
            continue;
        }
        *counts.entry(value.clone()).or_insert(0) += 1;
    }

    let rows = counts
        .into_iter()
        .map(|(value, count)| vec![value, Value::Int(count)])
        .collect();
    Ok(Table::new(vec![var.to_string(), name.to_string()], rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(name: &str, values: &[i64]) -> Table {
        Table::new(
            vec![name.to_string()],
            values.iter().map(|&v| vec![Value::Int(v)]).collect(),
        )
    }

    #[test]
    fn test_count_unique_sorted_ascending() {
        let table = single_column("stage", &[3, 1, 2, 1, 3, 3]);
        let counts = count_unique(&table, "stage", DEFAULT_RESULT_NAME).unwrap();

        assert_eq!(counts.columns(), &["stage", "n"]);
        let pairs: Vec<(Value, Value)> = counts
            .rows()
            .iter()
            .map(|r| (r[0].clone(), r[1].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Value::Int(1), Value::Int(2)),
                (Value::Int(2), Value::Int(1)),
                (Value::Int(3), Value::Int(3)),
            ]
        );
    }

    #[test]
    fn test_sum_by_var_two_groups() {
        let table = Table::new(
            vec!["site".to_string(), "cells".to_string()],
            vec![
                vec![Value::from("b"), Value::Int(5)],
                vec![Value::from("a"), Value::Int(1)],
                vec![Value::from("b"), Value::Int(7)],
                vec![Value::from("a"), Value::Int(2)],
            ],
        );
        let grouped = group(&table, &["site"]).unwrap();
        let sums = sum_by_var(&grouped, "cells", "total_cells").unwrap();

        assert_eq!(sums.columns(), &["site", "total_cells"]);
        assert_eq!(sums.rows()[0], vec![Value::from("a"), Value::Int(3)]);
        assert_eq!(sums.rows()[1], vec![Value::from("b"), Value::Int(12)]);
    }

    #[test]
    fn test_sum_by_var_mixed_numbers_gives_float() {
        let table = Table::new(
            vec!["k".to_string(), "v".to_string()],
            vec![
                vec![Value::Int(1), Value::Float(0.5)],
                vec![Value::Int(1), Value::Int(2)],
                vec![Value::Int(1), Value::Null],
            ],
        );
        let grouped = group(&table, &["k"]).unwrap();
        let sums = sum_by_var(&grouped, "v", DEFAULT_RESULT_NAME).unwrap();
        assert_eq!(sums.rows()[0][1], Value::Float(2.5));
    }

    #[test]
    fn test_sum_by_var_overflow_falls_back_to_float() {
        let table = Table::new(
            vec!["k".to_string(), "v".to_string()],
            vec![
                vec![Value::Int(1), Value::Int(i64::MAX)],
                vec![Value::Int(1), Value::Int(1)],
            ],
        );
        let grouped = group(&table, &["k"]).unwrap();
        let sums = sum_by_var(&grouped, "v", DEFAULT_RESULT_NAME).unwrap();
        assert_eq!(sums.rows()[0][1], Value::Float(i64::MAX as f64 + 1.0));
    }

    #[test]
    fn test_group_by_two_keys_skips_null_keys() {
        let table = Table::new(
            vec!["a".to_string(), "b".to_string(), "v".to_string()],
            vec![
                vec![Value::from("x"), Value::Int(1), Value::Int(1)],
                vec![Value::from("x"), Value::Int(2), Value::Int(1)],
                vec![Value::from("x"), Value::Int(1), Value::Int(1)],
                vec![Value::Null, Value::Int(1), Value::Int(1)],
            ],
        );
        let grouped = group(&table, &["a", "b"]).unwrap();
        assert_eq!(grouped.len(), 2);
        let sizes: Vec<usize> = grouped.groups().map(|(_, rows)| rows.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_sum_of_text_column_is_an_error() {
        let table = Table::new(
            vec!["k".to_string(), "v".to_string()],
            vec![vec![Value::Int(1), Value::from("abc")]],
        );
        let grouped = group(&table, &["k"]).unwrap();
        assert!(matches!(
            sum_by_var(&grouped, "v", "n"),
            Err(TableError::NonNumeric { .. })
        ));
    }

    #[test]
    fn test_group_unknown_key() {
        let table = single_column("stage", &[1]);
        assert!(group(&table, &["dose"]).is_err());
    }
}
