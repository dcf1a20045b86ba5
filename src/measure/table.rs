//! Column-oriented table of per-region measurements.

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Text(Vec<String>),
    Number(Vec<f64>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(values) => values.len(),
            ColumnValues::Number(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name : String,
    pub values : ColumnValues,
}

/// One row per region, in ascending label order. Every column
/// has exactly `num_rows` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns : Vec<Column>,
    n_rows : usize,
}

impl FeatureTable {
    pub fn new(n_rows : usize) -> Self {
        FeatureTable { columns : Vec::new(), n_rows }
    }

    /// Appends a numeric column. `values` must hold one entry per row.
    pub(crate) fn push_numeric(&mut self, name : String, values : Vec<f64>) {
        debug_assert_eq!(values.len(), self.n_rows);
        self.columns.push(Column { name, values : ColumnValues::Number(values) });
    }

    /// Inserts a leading `file` column repeating `stem` on every row.
    pub fn insert_source(&mut self, stem : &str) {
        self.columns.insert(0, Column {
            name : "file".to_string(),
            values : ColumnValues::Text(vec![stem.to_string(); self.n_rows]),
        });
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name : &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn num_rows(&self) -> usize {
        self.n_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_column_goes_first() {
        let mut table = FeatureTable::new(3);
        table.push_numeric("label".into(), vec![1.0, 2.0, 5.0]);
        table.push_numeric("area".into(), vec![10.0, 4.0, 7.0]);
        table.insert_source("cells");

        assert_eq!(table.headers(), vec!["file", "label", "area"]);
        assert_eq!(table.num_columns(), 3);
        assert_eq!(
            table.column("file").unwrap().values,
            ColumnValues::Text(vec!["cells".to_string(); 3])
        );
        assert!(table.columns().iter().all(|c| c.values.len() == table.num_rows()));
    }

    #[test]
    fn empty_table_still_has_headers() {
        let mut table = FeatureTable::new(0);
        table.push_numeric("label".into(), vec![]);
        table.insert_source("empty");
        assert_eq!(table.headers(), vec!["file", "label"]);
        assert!(table.column("file").unwrap().values.is_empty());
    }
}
