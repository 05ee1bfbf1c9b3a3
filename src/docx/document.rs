//! Paragraph/run view over the main part of a WordprocessingML package.
//!
//! Runs keep pointers into the part's event list. Editing a run only touches
//! its text-bearing children (`w:t`, `w:tab`, text-wrapping `w:br`, `w:cr`);
//! `w:rPr`, drawings, field characters and page breaks are written back as
//! they were read.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek, Write};
use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::Context;

use super::package::DocxPackage;
use super::xml::{find_attr, is_xml_char, XmlEvent, XmlPart};
use crate::ir::{Cell, DocumentTree, Row, RunParagraph, Table};

#[derive(Clone, Debug)]
enum RunSlot {
    Xml {
        end: usize,
        text_children: Vec<RangeInclusive<usize>>,
    },
    Added,
}

#[derive(Clone, Debug)]
pub struct Run {
    slot: RunSlot,
    original: String,
    text: String,
}

impl Run {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_modified(&self) -> bool {
        matches!(self.slot, RunSlot::Added) || self.text != self.original
    }
}

#[derive(Clone, Debug)]
enum ParagraphAnchor {
    Open { end: usize },
    SelfClosing { index: usize, attrs: Vec<(String, String)> },
}

#[derive(Clone, Debug)]
pub struct Paragraph {
    anchor: ParagraphAnchor,
    runs: Vec<Run>,
}

impl Paragraph {
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }
}

impl RunParagraph for Paragraph {
    fn run_count(&self) -> usize {
        self.runs.len()
    }

    fn run_text(&self, index: usize) -> &str {
        &self.runs[index].text
    }

    fn set_run_text(&mut self, index: usize, text: String) {
        self.runs[index].text = text;
    }

    fn set_text(&mut self, text: String) {
        if self.runs.is_empty() {
            self.runs.push(Run {
                slot: RunSlot::Added,
                original: String::new(),
                text,
            });
            return;
        }
        let mut runs = self.runs.iter_mut();
        if let Some(first) = runs.next() {
            first.text = text;
        }
        for run in runs {
            run.text.clear();
        }
    }
}

pub struct Document {
    package: DocxPackage,
    part: XmlPart,
    paragraphs: Vec<Paragraph>,
    tables: Vec<Table<Paragraph>>,
}

impl Document {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let package = DocxPackage::read(path)?;
        Self::from_package(package).with_context(|| format!("load document: {}", path.display()))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> anyhow::Result<Self> {
        Self::from_package(DocxPackage::from_reader(reader)?)
    }

    pub fn from_package(package: DocxPackage) -> anyhow::Result<Self> {
        let name = package.main_document_part()?;
        let entry = package
            .entry(&name)
            .with_context(|| format!("missing main document part: {name}"))?;
        let part = XmlPart::parse(&name, &entry.data)
            .with_context(|| format!("parse xml: {name}"))?;
        let (paragraphs, tables) = build_tree(&part.events);
        Ok(Self {
            package,
            part,
            paragraphs,
            tables,
        })
    }

    pub fn part_name(&self) -> &str {
        &self.part.name
    }

    /// The main part with all run edits applied.
    pub fn to_xml_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut all: Vec<&Paragraph> = self.paragraphs.iter().collect();
        for table in &self.tables {
            collect_table_paragraphs(table, &mut all);
        }
        let edited = XmlPart {
            name: self.part.name.clone(),
            events: apply_run_edits(&self.part.events, &all),
        };
        edited.to_bytes()
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> anyhow::Result<W> {
        let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
        replacements.insert(self.part.name.clone(), self.to_xml_bytes()?);
        self.package.write_with_replacements(writer, &replacements)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
        replacements.insert(self.part.name.clone(), self.to_xml_bytes()?);
        self.package.save_with_replacements(path, &replacements)
    }
}

impl DocumentTree for Document {
    type Paragraph = Paragraph;

    fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    fn tables(&self) -> &[Table<Paragraph>] {
        &self.tables
    }

    fn paragraphs_mut(&mut self) -> &mut [Paragraph] {
        &mut self.paragraphs
    }

    fn tables_mut(&mut self) -> &mut [Table<Paragraph>] {
        &mut self.tables
    }
}

fn collect_table_paragraphs<'a>(table: &'a Table<Paragraph>, out: &mut Vec<&'a Paragraph>) {
    for row in &table.rows {
        for cell in &row.cells {
            out.extend(cell.paragraphs.iter());
            for nested in &cell.tables {
                collect_table_paragraphs(nested, out);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TextChild {
    Text,
    Literal(&'static str),
}

fn text_child_kind(name: &str, attrs: &[(String, String)]) -> Option<TextChild> {
    match name {
        "w:t" => Some(TextChild::Text),
        "w:tab" => Some(TextChild::Literal("\t")),
        "w:cr" => Some(TextChild::Literal("\n")),
        "w:br" => match find_attr(attrs, "w:type") {
            None | Some("textWrapping") => Some(TextChild::Literal("\n")),
            Some(_) => None,
        },
        _ => None,
    }
}

struct OpenChild {
    kind: TextChild,
    start: usize,
    text: String,
}

struct RunBuilder {
    depth: usize,
    text_children: Vec<RangeInclusive<usize>>,
    text: String,
    open_child: Option<OpenChild>,
}

impl RunBuilder {
    fn finish(self, end: usize) -> Run {
        Run {
            slot: RunSlot::Xml {
                end,
                text_children: self.text_children,
            },
            original: self.text.clone(),
            text: self.text,
        }
    }
}

enum Frame {
    Table(Table<Paragraph>),
    Row(Row<Paragraph>),
    Cell(Cell<Paragraph>),
}

#[derive(Default)]
struct TreeBuilder {
    paragraphs: Vec<Paragraph>,
    tables: Vec<Table<Paragraph>>,
    frames: Vec<Frame>,
    open_paragraphs: Vec<Vec<Run>>,
    open_runs: Vec<RunBuilder>,
}

impl TreeBuilder {
    fn attach_paragraph(&mut self, p: Paragraph) {
        match self.frames.last_mut() {
            Some(Frame::Cell(cell)) => cell.paragraphs.push(p),
            _ => self.paragraphs.push(p),
        }
    }

    fn close_frame(&mut self, name: &str) {
        let expected = match name {
            "w:tbl" => matches!(self.frames.last(), Some(Frame::Table(_))),
            "w:tr" => matches!(self.frames.last(), Some(Frame::Row(_))),
            "w:tc" => matches!(self.frames.last(), Some(Frame::Cell(_))),
            _ => false,
        };
        if !expected {
            return;
        }
        match self.frames.pop() {
            Some(Frame::Table(table)) => match self.frames.last_mut() {
                Some(Frame::Cell(cell)) => cell.tables.push(table),
                _ => self.tables.push(table),
            },
            Some(Frame::Row(row)) => {
                if let Some(Frame::Table(table)) = self.frames.last_mut() {
                    table.rows.push(row);
                }
            }
            Some(Frame::Cell(cell)) => {
                if let Some(Frame::Row(row)) = self.frames.last_mut() {
                    row.cells.push(cell);
                }
            }
            None => {}
        }
    }

    /// The innermost open run, if `depth` is one of its direct children.
    fn run_for_child(&mut self, depth: usize) -> Option<&mut RunBuilder> {
        self.open_runs
            .last_mut()
            .filter(|run| run.depth + 1 == depth)
    }
}

fn build_tree(events: &[XmlEvent]) -> (Vec<Paragraph>, Vec<Table<Paragraph>>) {
    let mut b = TreeBuilder::default();
    let mut depth = 0usize;

    for (idx, ev) in events.iter().enumerate() {
        match ev {
            XmlEvent::Start { name, attrs } => {
                depth += 1;
                match name.as_str() {
                    "w:tbl" => b.frames.push(Frame::Table(Table::default())),
                    "w:tr" => b.frames.push(Frame::Row(Row::default())),
                    "w:tc" => b.frames.push(Frame::Cell(Cell::default())),
                    "w:p" => b.open_paragraphs.push(Vec::new()),
                    "w:r" if !b.open_paragraphs.is_empty() => b.open_runs.push(RunBuilder {
                        depth,
                        text_children: Vec::new(),
                        text: String::new(),
                        open_child: None,
                    }),
                    _ => {
                        if let Some(kind) = text_child_kind(name, attrs) {
                            if let Some(run) = b.run_for_child(depth) {
                                run.open_child = Some(OpenChild {
                                    kind,
                                    start: idx,
                                    text: String::new(),
                                });
                            }
                        }
                    }
                }
            }
            XmlEvent::Empty { name, attrs } => {
                let child_depth = depth + 1;
                if name == "w:p" {
                    b.attach_paragraph(Paragraph {
                        anchor: ParagraphAnchor::SelfClosing {
                            index: idx,
                            attrs: attrs.clone(),
                        },
                        runs: Vec::new(),
                    });
                } else if let Some(kind) = text_child_kind(name, attrs) {
                    if let Some(run) = b.run_for_child(child_depth) {
                        run.text_children.push(idx..=idx);
                        if let TextChild::Literal(s) = kind {
                            run.text.push_str(s);
                        }
                    }
                }
            }
            XmlEvent::Text { text } | XmlEvent::CData { text } => {
                if let Some(child) = b
                    .open_runs
                    .last_mut()
                    .filter(|run| run.depth + 1 == depth)
                    .and_then(|run| run.open_child.as_mut())
                {
                    if child.kind == TextChild::Text {
                        child.text.push_str(text);
                    }
                }
            }
            XmlEvent::End { name } => {
                match name.as_str() {
                    "w:tbl" | "w:tr" | "w:tc" => b.close_frame(name),
                    "w:p" => {
                        if let Some(runs) = b.open_paragraphs.pop() {
                            b.attach_paragraph(Paragraph {
                                anchor: ParagraphAnchor::Open { end: idx },
                                runs,
                            });
                        }
                    }
                    "w:r" if b.open_runs.last().is_some_and(|r| r.depth == depth) => {
                        if let Some(run) = b.open_runs.pop() {
                            if let Some(runs) = b.open_paragraphs.last_mut() {
                                runs.push(run.finish(idx));
                            }
                        }
                    }
                    _ => {
                        if let Some(run) = b.run_for_child(depth) {
                            if let Some(child) = run.open_child.take() {
                                run.text_children.push(child.start..=idx);
                                match child.kind {
                                    TextChild::Text => run.text.push_str(&child.text),
                                    TextChild::Literal(s) => run.text.push_str(s),
                                }
                            }
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    (b.paragraphs, b.tables)
}

/// Text-bearing run children for `text`: tabs and line breaks become their
/// own elements, everything else goes into `w:t` with preserved spacing.
/// Characters XML 1.0 cannot carry are dropped.
fn text_child_events(text: &str) -> Vec<XmlEvent> {
    fn flush(out: &mut Vec<XmlEvent>, buf: &mut String) {
        if buf.is_empty() {
            return;
        }
        out.push(XmlEvent::start("w:t", &[("xml:space", "preserve")]));
        out.push(XmlEvent::text(std::mem::take(buf)));
        out.push(XmlEvent::end("w:t"));
    }

    let mut out = Vec::new();
    let mut buf = String::new();
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut out, &mut buf);
                out.push(XmlEvent::empty("w:tab", &[]));
            }
            '\n' => {
                flush(&mut out, &mut buf);
                out.push(XmlEvent::empty("w:br", &[]));
            }
            c if c != '\r' && is_xml_char(c) => buf.push(c),
            _ => {}
        }
    }
    flush(&mut out, &mut buf);
    out
}

fn apply_run_edits(events: &[XmlEvent], paragraphs: &[&Paragraph]) -> Vec<XmlEvent> {
    let mut dropped = vec![false; events.len()];
    let mut inserts: BTreeMap<usize, Vec<XmlEvent>> = BTreeMap::new();

    for p in paragraphs {
        let mut added: Vec<XmlEvent> = Vec::new();
        for run in p.runs.iter().filter(|r| r.is_modified()) {
            match &run.slot {
                RunSlot::Xml { end, text_children } => {
                    for range in text_children {
                        for i in range.clone() {
                            dropped[i] = true;
                        }
                    }
                    let at = text_children.first().map(|r| *r.start()).unwrap_or(*end);
                    inserts
                        .entry(at)
                        .or_default()
                        .extend(text_child_events(&run.text));
                }
                RunSlot::Added => {
                    added.push(XmlEvent::start("w:r", &[]));
                    added.extend(text_child_events(&run.text));
                    added.push(XmlEvent::end("w:r"));
                }
            }
        }
        if added.is_empty() {
            continue;
        }
        match &p.anchor {
            ParagraphAnchor::Open { end } => inserts.entry(*end).or_default().extend(added),
            ParagraphAnchor::SelfClosing { index, attrs } => {
                dropped[*index] = true;
                let slot = inserts.entry(*index).or_default();
                slot.push(XmlEvent::Start {
                    name: "w:p".to_string(),
                    attrs: attrs.clone(),
                });
                slot.extend(added);
                slot.push(XmlEvent::end("w:p"));
            }
        }
    }

    let mut out = Vec::with_capacity(events.len());
    for (i, ev) in events.iter().enumerate() {
        if let Some(ins) = inserts.remove(&i) {
            out.extend(ins);
        }
        if !dropped[i] {
            out.push(ev.clone());
        }
    }
    out
}
