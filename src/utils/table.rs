use itertools::Itertools;
use std::default::Default;
use std::fmt::{Display, Formatter};

/// A text table, rendered as markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T>
where
    T: ToString,
{
    pub headers: Vec<T>,
    pub rows: Vec<Vec<T>>,
}

impl<T> Default for Table<T>
where
    T: ToString,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Table<T>
where
    T: ToString,
{
    pub fn new() -> Self {
        Table { headers: Vec::new(), rows: Vec::new() }
    }

    pub fn add_row(&mut self, row: Vec<T>) {
        self.rows.push(row);
    }

    /// Convert table to markdown format.
    ///
    /// Cells are left-aligned, rows shorter than the headers are padded with
    /// empty cells.
    ///
    /// ```rust
    /// use haystack::utils::table::Table;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["Parameter", "Value"];
    /// table.add_row(vec!["cores", "8"]);
    /// let expected = "| Parameter | Value |\n|-----------|-------|\n| cores     | 8     |\n";
    /// assert_eq!(table.to_markdown(), expected);
    /// ```
    pub fn to_markdown(&self) -> String {
        let headers = self.headers.iter().map(|h| h.to_string()).collect_vec();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                (0..headers.len())
                    .map(|col_i| row.get(col_i).map(|cell| cell.to_string()).unwrap_or_default())
                    .collect_vec()
            })
            .collect_vec();

        // widest cell of each column, including its header
        let col_widths = headers
            .iter()
            .enumerate()
            .map(|(col_i, header)| {
                rows.iter().map(|row| row[col_i].len()).chain([header.len()]).max().unwrap_or(0)
            })
            .collect_vec();

        let line = |cells: &[String]| {
            let cells = cells.iter().zip(&col_widths).map(|(cell, &width)| format!(" {cell:<width$} "));
            format!("|{}|\n", cells.format("|"))
        };

        let mut markdown = line(&headers);
        let frame = col_widths.iter().map(|width| "-".repeat(width + 2));
        markdown.push_str(&format!("|{}|\n", frame.format("|")));
        for row in &rows {
            markdown.push_str(&line(row));
        }

        markdown
    }
}

impl<T> Display for Table<T>
where
    T: ToString,
{
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_markdown())
    }
}

#[cfg(test)]
mod tests {
    use super::Table;

    #[test]
    fn pads_columns() {
        let mut table = Table::new();
        table.headers = vec!["Parameter".to_string(), "Value".to_string()];
        table.add_row(vec!["db_output".to_string(), "/scratch/haystack/database".to_string()]);
        table.add_row(vec!["mode".to_string()]);

        let expected = "\
| Parameter | Value                      |
|-----------|----------------------------|
| db_output | /scratch/haystack/database |
| mode      |                            |
";
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn headers_only() {
        let table = Table { headers: vec!["Accession"], rows: Vec::new() };
        assert_eq!(table.to_markdown(), "| Accession |\n|-----------|\n");
    }
}
