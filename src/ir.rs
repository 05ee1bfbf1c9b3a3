//! Minimal document surface the label filler works against.
//!
//! A paragraph is an ordered list of independently styled runs; its flattened
//! text is always the concatenation of the run texts. Tables are only a
//! traversal path to more paragraphs.

pub trait RunParagraph {
    fn run_count(&self) -> usize;

    fn run_text(&self, index: usize) -> &str;

    /// Replaces the text of one run; the run's style is left alone.
    fn set_run_text(&mut self, index: usize, text: String);

    /// Whole-paragraph assignment. A paragraph with no runs gets one; otherwise
    /// the first run takes the whole text and the rest are emptied, never
    /// removed.
    fn set_text(&mut self, text: String);

    fn text(&self) -> String {
        (0..self.run_count()).map(|i| self.run_text(i)).collect()
    }
}

pub trait DocumentTree {
    type Paragraph: RunParagraph;

    fn paragraphs(&self) -> &[Self::Paragraph];

    fn tables(&self) -> &[Table<Self::Paragraph>];

    fn paragraphs_mut(&mut self) -> &mut [Self::Paragraph];

    fn tables_mut(&mut self) -> &mut [Table<Self::Paragraph>];
}

#[derive(Clone, Debug)]
pub struct Table<P> {
    pub rows: Vec<Row<P>>,
}

#[derive(Clone, Debug)]
pub struct Row<P> {
    pub cells: Vec<Cell<P>>,
}

#[derive(Clone, Debug)]
pub struct Cell<P> {
    pub paragraphs: Vec<P>,
    pub tables: Vec<Table<P>>,
}

impl<P> Default for Table<P> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<P> Default for Row<P> {
    fn default() -> Self {
        Self { cells: Vec::new() }
    }
}

impl<P> Default for Cell<P> {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            tables: Vec::new(),
        }
    }
}

impl<P> Table<P> {
    /// Read-only counterpart of [`Table::for_each_paragraph_mut`], same order.
    pub fn for_each_paragraph(&self, f: &mut dyn FnMut(&P)) {
        for row in &self.rows {
            for cell in &row.cells {
                for p in &cell.paragraphs {
                    f(p);
                }
                for nested in &cell.tables {
                    nested.for_each_paragraph(f);
                }
            }
        }
    }

    /// Visits every paragraph in every cell, row by row, descending into
    /// nested tables after a cell's own paragraphs.
    pub fn for_each_paragraph_mut(&mut self, f: &mut dyn FnMut(&mut P)) {
        for row in &mut self.rows {
            for cell in &mut row.cells {
                for p in &mut cell.paragraphs {
                    f(p);
                }
                for nested in &mut cell.tables {
                    nested.for_each_paragraph_mut(f);
                }
            }
        }
    }
}

/// Plain in-memory paragraph: a list of run strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlainParagraph {
    pub runs: Vec<String>,
}

impl PlainParagraph {
    pub fn new<S: Into<String>>(runs: impl IntoIterator<Item = S>) -> Self {
        Self {
            runs: runs.into_iter().map(Into::into).collect(),
        }
    }
}

impl RunParagraph for PlainParagraph {
    fn run_count(&self) -> usize {
        self.runs.len()
    }

    fn run_text(&self, index: usize) -> &str {
        &self.runs[index]
    }

    fn set_run_text(&mut self, index: usize, text: String) {
        self.runs[index] = text;
    }

    fn set_text(&mut self, text: String) {
        if self.runs.is_empty() {
            self.runs.push(text);
            return;
        }
        self.runs[0] = text;
        self.runs[1..].iter_mut().for_each(String::clear);
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlainDocument {
    pub paragraphs: Vec<PlainParagraph>,
    pub tables: Vec<Table<PlainParagraph>>,
}

impl DocumentTree for PlainDocument {
    type Paragraph = PlainParagraph;

    fn paragraphs(&self) -> &[PlainParagraph] {
        &self.paragraphs
    }

    fn tables(&self) -> &[Table<PlainParagraph>] {
        &self.tables
    }

    fn paragraphs_mut(&mut self) -> &mut [PlainParagraph] {
        &mut self.paragraphs
    }

    fn tables_mut(&mut self) -> &mut [Table<PlainParagraph>] {
        &mut self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_text_is_run_concatenation() {
        let p = PlainParagraph::new(["Full ", "Name", ":"]);
        assert_eq!(p.text(), "Full Name:");
        assert_eq!(PlainParagraph::default().text(), "");
    }

    #[test]
    fn set_text_keeps_run_count() {
        let mut p = PlainParagraph::new(["Job ", "Titles", ": x"]);
        p.set_text("Job Titles: Dev".to_string());
        assert_eq!(p.runs, vec!["Job Titles: Dev", "", ""]);

        let mut empty = PlainParagraph::default();
        empty.set_text("Department: HR".to_string());
        assert_eq!(empty.runs, vec!["Department: HR"]);
    }

    #[test]
    fn table_walk_reaches_nested_cells() {
        let inner = Table {
            rows: vec![Row {
                cells: vec![Cell {
                    paragraphs: vec![PlainParagraph::new(["inner"])],
                    tables: vec![],
                }],
            }],
        };
        let mut outer = Table {
            rows: vec![Row {
                cells: vec![
                    Cell {
                        paragraphs: vec![PlainParagraph::new(["a"])],
                        tables: vec![inner],
                    },
                    Cell {
                        paragraphs: vec![PlainParagraph::new(["b"])],
                        tables: vec![],
                    },
                ],
            }],
        };
        let mut seen = Vec::new();
        outer.for_each_paragraph_mut(&mut |p| seen.push(p.text()));
        assert_eq!(seen, vec!["a", "inner", "b"]);

        let mut read_only = Vec::new();
        outer.for_each_paragraph(&mut |p| read_only.push(p.text()));
        assert_eq!(read_only, seen);
    }
}
