use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{info, warn};

use crate::docx::Document;
use crate::error::NocError;
use crate::ir::{DocumentTree, RunParagraph};
use crate::label::LabelPattern;
use crate::rewrite::{fill_paragraph, FillOutcome};
use crate::textutil::sanitize_file_component;

pub const DEFAULT_FILE_PREFIX: &str = "NOC_";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FullName,
    JobTitle,
    Department,
}

static FIELD_PATTERNS: Lazy<[LabelPattern; 3]> = Lazy::new(|| {
    Field::ALL.map(|f| LabelPattern::new(f.label()).expect("field label pattern"))
});

impl Field {
    pub const ALL: [Field; 3] = [Field::FullName, Field::JobTitle, Field::Department];

    pub fn label(self) -> &'static str {
        match self {
            Field::FullName => "Full Name",
            Field::JobTitle => "Job Title",
            Field::Department => "Department",
        }
    }

    fn index(self) -> usize {
        match self {
            Field::FullName => 0,
            Field::JobTitle => 1,
            Field::Department => 2,
        }
    }

    pub fn pattern(self) -> &'static LabelPattern {
        &FIELD_PATTERNS[self.index()]
    }
}

/// Trimmed values for the three fields of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacements {
    values: [String; 3],
}

impl Replacements {
    pub fn new(full_name: &str, job_title: &str, department: &str) -> Self {
        Self {
            values: [
                full_name.trim().to_string(),
                job_title.trim().to_string(),
                department.trim().to_string(),
            ],
        }
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: Option<Field>,
    pub preserved: usize,
    pub fallback: usize,
}

impl FieldReport {
    pub fn filled(&self) -> bool {
        self.preserved + self.fallback > 0
    }

    fn record(&mut self, outcome: Option<FillOutcome>) {
        match outcome {
            Some(FillOutcome::Preserved) => self.preserved += 1,
            Some(FillOutcome::Fallback) => self.fallback += 1,
            None => {}
        }
    }
}

/// Per-field count of paragraphs rewritten.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub fields: Vec<FieldReport>,
}

impl FillReport {
    pub fn field(&self, field: Field) -> Option<&FieldReport> {
        self.fields.iter().find(|r| r.field == Some(field))
    }

    pub fn unfilled(&self) -> Vec<Field> {
        self.fields
            .iter()
            .filter(|r| !r.filled())
            .filter_map(|r| r.field)
            .collect()
    }
}

/// Fills every body paragraph and then every table-cell paragraph, one field
/// at a time. Fields whose label never shows up are left alone.
///
/// Which labels a paragraph carries is decided from its text before the first
/// field is written, so a value such as "Head of Department" never triggers the
/// Department field.
pub fn fill_document<D: DocumentTree + ?Sized>(doc: &mut D, values: &Replacements) -> FillReport {
    let originals = paragraph_texts(&*doc);
    let (body_originals, cell_originals) = originals.split_at(doc.paragraphs().len());

    let mut report = FillReport::default();
    for (field, value) in values.iter() {
        let pattern = field.pattern();
        let mut fr = FieldReport {
            field: Some(field),
            ..FieldReport::default()
        };
        for (p, original) in doc.paragraphs_mut().iter_mut().zip(body_originals) {
            fr.record(fill_paragraph(p, original, pattern, value));
        }
        let mut cell_originals = cell_originals.iter();
        for table in doc.tables_mut() {
            table.for_each_paragraph_mut(&mut |p| {
                if let Some(original) = cell_originals.next() {
                    fr.record(fill_paragraph(p, original, pattern, value));
                }
            });
        }
        if fr.fallback > 0 {
            warn!(
                label = field.label(),
                paragraphs = fr.fallback,
                "label found without a colon pattern; paragraph text replaced"
            );
        }
        report.fields.push(fr);
    }
    report
}

/// `<prefix><sanitized full name>.docx`
pub fn output_file_name(prefix: &str, full_name: &str) -> String {
    format!("{prefix}{}.docx", sanitize_file_component(full_name.trim()))
}

/// Immutable generation settings; every call loads its own copy of the
/// template, so one value can serve concurrent callers.
#[derive(Clone, Debug)]
pub struct NocGenerator {
    template: PathBuf,
    file_prefix: String,
}

impl NocGenerator {
    pub fn new(template: impl Into<PathBuf>) -> Result<Self, NocError> {
        let template = template.into();
        if !template.exists() {
            return Err(NocError::TemplateNotFound(template));
        }
        Ok(Self {
            template,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        })
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    pub fn generate(
        &self,
        full_name: &str,
        job_title: &str,
        department: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, NocError> {
        self.generate_with_report(full_name, job_title, department, output_dir)
            .map(|(path, _)| path)
    }

    pub fn generate_with_report(
        &self,
        full_name: &str,
        job_title: &str,
        department: &str,
        output_dir: &Path,
    ) -> Result<(PathBuf, FillReport), NocError> {
        let mut doc = Document::load(&self.template).map_err(|source| NocError::Load {
            path: self.template.clone(),
            source,
        })?;

        let values = Replacements::new(full_name, job_title, department);
        let report = fill_document(&mut doc, &values);
        for field in report.unfilled() {
            warn!(label = field.label(), template = %self.template.display(), "label not found in template");
        }

        std::fs::create_dir_all(output_dir).map_err(|source| NocError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let output_path = output_dir.join(output_file_name(&self.file_prefix, full_name));
        doc.save(&output_path).map_err(|source| NocError::Save {
            path: output_path.clone(),
            source,
        })?;

        info!(
            full_name = values.get(Field::FullName),
            part = doc.part_name(),
            path = %output_path.display(),
            "NOC generated"
        );
        Ok((output_path, report))
    }
}

/// Flattened texts of every paragraph, body first, in fill order.
pub fn paragraph_texts<D: DocumentTree + ?Sized>(doc: &D) -> Vec<String> {
    let mut out: Vec<String> = doc.paragraphs().iter().map(|p| p.text()).collect();
    for table in doc.tables() {
        table.for_each_paragraph(&mut |p| out.push(p.text()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Cell, PlainDocument, PlainParagraph, Row, Table};

    fn cell(runs: &[&str]) -> Cell<PlainParagraph> {
        Cell {
            paragraphs: vec![PlainParagraph::new(runs.iter().copied())],
            tables: vec![],
        }
    }

    fn template() -> PlainDocument {
        PlainDocument {
            paragraphs: vec![
                PlainParagraph::new(["No Objection Certificate"]),
                PlainParagraph::new(["Full Name", ": "]),
                PlainParagraph::new(["This is to certify that the employee named below"]),
            ],
            tables: vec![Table {
                rows: vec![
                    Row {
                        cells: vec![cell(&["Job Title:"]), cell(&["Signature"])],
                    },
                    Row {
                        cells: vec![cell(&["DEPARTMENT", " : ", "TBD"])],
                    },
                ],
            }],
        }
    }

    #[test]
    fn fills_body_and_table_cells() {
        let mut doc = template();
        let report = fill_document(&mut doc, &Replacements::new(" Arjun Kumar ", "Engineer", "R&D"));

        assert_eq!(
            paragraph_texts(&doc),
            vec![
                "No Objection Certificate",
                "Full Name: Arjun Kumar",
                "This is to certify that the employee named below",
                "Job Title: Engineer",
                "Signature",
                "DEPARTMENT : R&D",
            ]
        );
        assert_eq!(doc.paragraphs[1].runs, vec!["Full Name", ": Arjun Kumar"]);
        assert!(report.unfilled().is_empty());
        assert_eq!(report.field(Field::JobTitle).map(|r| r.preserved), Some(1));
    }

    #[test]
    fn missing_labels_are_reported_not_errors() {
        let mut doc = PlainDocument {
            paragraphs: vec![PlainParagraph::new(["Full Name:"])],
            tables: vec![],
        };
        let report = fill_document(&mut doc, &Replacements::new("A", "B", "C"));
        assert_eq!(report.unfilled(), vec![Field::JobTitle, Field::Department]);
        assert_eq!(doc.paragraphs[0].text(), "Full Name: A");
    }

    #[test]
    fn fallback_is_counted() {
        let mut doc = PlainDocument {
            paragraphs: vec![PlainParagraph::new(["Department head"])],
            tables: vec![],
        };
        let report = fill_document(&mut doc, &Replacements::new("A", "B", "Ops"));
        let dept = report.field(Field::Department).expect("department");
        assert_eq!((dept.preserved, dept.fallback), (0, 1));
        assert_eq!(doc.paragraphs[0].text(), "Department head: Ops");
    }

    #[test]
    fn values_naming_other_labels_stay_intact() {
        let mut doc = PlainDocument {
            paragraphs: vec![
                PlainParagraph::new(["Job Title", ": "]),
                PlainParagraph::new(["Department", ": "]),
            ],
            tables: vec![Table {
                rows: vec![Row {
                    cells: vec![cell(&["Full Name:"]), cell(&["Job Title", ": "])],
                }],
            }],
        };
        let report = fill_document(
            &mut doc,
            &Replacements::new("Asha Job Title", "Head of Department", "Finance"),
        );

        assert_eq!(
            paragraph_texts(&doc),
            vec![
                "Job Title: Head of Department",
                "Department: Finance",
                "Full Name: Asha Job Title",
                "Job Title: Head of Department",
            ]
        );
        assert_eq!(doc.paragraphs[0].runs, vec!["Job Title", ": Head of Department"]);
        let dept = report.field(Field::Department).expect("department");
        assert_eq!((dept.preserved, dept.fallback), (1, 0));
        let job = report.field(Field::JobTitle).expect("job title");
        assert_eq!((job.preserved, job.fallback), (2, 0));
    }

    #[test]
    fn output_names() {
        assert_eq!(output_file_name("NOC_", "Arjun/Kumar"), "NOC_Arjun_Kumar.docx");
        assert_eq!(output_file_name("NOC_", "  Arjun Kumar "), "NOC_Arjun_Kumar.docx");
        assert_eq!(output_file_name("NOC_", "   "), "NOC_unknown.docx");
    }

    #[test]
    fn missing_template_fails_fast() {
        let err = NocGenerator::new("/definitely/not/here/NDA-1.docx").expect_err("missing");
        assert!(matches!(err, NocError::TemplateNotFound(_)));
        assert!(err.to_string().contains("template not found"));
    }

    #[test]
    fn replacements_are_trimmed_and_ordered() {
        let r = Replacements::new(" a ", "\tb\n", "c");
        let got: Vec<(Field, &str)> = r.iter().collect();
        assert_eq!(
            got,
            vec![(Field::FullName, "a"), (Field::JobTitle, "b"), (Field::Department, "c")]
        );
    }
}
