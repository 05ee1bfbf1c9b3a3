//! Run-preserving value substitution.
//!
//! The paragraph's new flattened text is poured back into its existing runs,
//! each run taking as many characters as it held before. Styling anchored on
//! a run (a bold label, a coloured value) therefore stays over roughly the
//! same characters, and no run is ever created or removed.

use tracing::debug;

use crate::ir::RunParagraph;
use crate::label::LabelPattern;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// Rewritten through the runs; styling kept.
    Preserved,
    /// The label text was present without a `label:` pattern; the whole
    /// paragraph text was reassigned.
    Fallback,
}

/// `text[..colon_end] + " " + value + text[value_end..]`, or `None` when the
/// label pattern is absent.
pub fn desired_text(text: &str, pattern: &LabelPattern, value: &str) -> Option<String> {
    let m = pattern.find(text)?;
    let mut out = String::with_capacity(text.len() + value.len() + 1);
    out.push_str(&text[..m.colon_end]);
    out.push(' ');
    out.push_str(value);
    out.push_str(&text[m.value_end..]);
    Some(out)
}

/// Splits `desired` into one piece per slot, slot *i* taking `slot_lens[i]`
/// chars at the cumulative offset of the slots before it. Pieces past the end
/// come out empty; anything beyond the total slot length goes to the last
/// piece.
pub fn redistribute(desired: &str, slot_lens: &[usize]) -> Vec<String> {
    let chars: Vec<char> = desired.chars().collect();
    let mut pieces = Vec::with_capacity(slot_lens.len());
    let mut offset = 0usize;
    for &len in slot_lens {
        let start = offset.min(chars.len());
        let end = (offset + len).min(chars.len());
        pieces.push(chars[start..end].iter().collect::<String>());
        offset += len;
    }
    if offset < chars.len() {
        if let Some(last) = pieces.last_mut() {
            last.extend(&chars[offset..]);
        }
    }
    pieces
}

/// Writes `value` after the label's colon, keeping the run structure.
///
/// Returns `false` without touching the paragraph when the label pattern is
/// not present.
pub fn rewrite_label_in_paragraph<P: RunParagraph + ?Sized>(
    paragraph: &mut P,
    pattern: &LabelPattern,
    value: &str,
) -> bool {
    let full_text = paragraph.text();
    let Some(desired) = desired_text(&full_text, pattern, value) else {
        return false;
    };

    let run_count = paragraph.run_count();
    if run_count == 0 {
        paragraph.set_text(desired);
        return true;
    }

    let slot_lens: Vec<usize> = (0..run_count)
        .map(|i| paragraph.run_text(i).chars().count())
        .collect();
    for (i, piece) in redistribute(&desired, &slot_lens).into_iter().enumerate() {
        if paragraph.run_text(i) != piece {
            paragraph.set_run_text(i, piece);
        }
    }
    debug!(label = pattern.label(), runs = run_count, "rewrote label value");
    true
}

/// Whole-text replacement used when the label occurs without a `label:`
/// pattern. Everything after the first colon is replaced; without a colon
/// the value is appended after `": "`.
pub fn replace_field_text(text: &str, label: &str, value: &str) -> String {
    if !contains_label(text, label) {
        return text.to_string();
    }
    match text.split_once(':') {
        Some((before, _)) => format!("{before}: {value}"),
        None => format!("{}: {value}", text.trim()),
    }
}

fn contains_label(text: &str, label: &str) -> bool {
    text.to_lowercase().contains(&label.to_lowercase())
}

/// Fills one paragraph: run-preserving rewrite first, whole-text fallback
/// second. `original` is the paragraph's text before any field was written to
/// it; a label that only appears inside an earlier field's value is not a
/// label. `None` when `original` does not mention the label at all.
pub fn fill_paragraph<P: RunParagraph + ?Sized>(
    paragraph: &mut P,
    original: &str,
    pattern: &LabelPattern,
    value: &str,
) -> Option<FillOutcome> {
    if !contains_label(original, pattern.label()) {
        return None;
    }
    if rewrite_label_in_paragraph(paragraph, pattern, value) {
        return Some(FillOutcome::Preserved);
    }
    let current = paragraph.text();
    paragraph.set_text(replace_field_text(&current, pattern.label(), value));
    Some(FillOutcome::Fallback)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::generator::Field;
    use crate::ir::PlainParagraph;

    fn pattern(label: &str) -> LabelPattern {
        LabelPattern::new(label).expect("pattern")
    }

    fn rewrite(runs: &[&str], label: &str, value: &str) -> (bool, PlainParagraph) {
        let mut p = PlainParagraph::new(runs.iter().copied());
        let ok = rewrite_label_in_paragraph(&mut p, &pattern(label), value);
        (ok, p)
    }

    #[test]
    fn value_lands_after_colon() {
        let (ok, p) = rewrite(&["Full Name: "], "Full Name", "Arjun Kumar");
        assert!(ok);
        assert_eq!(p.text(), "Full Name: Arjun Kumar");
    }

    #[test]
    fn bold_label_run_is_untouched() {
        let (_, p) = rewrite(&["Full Name", ": "], "Full Name", "Arjun Kumar");
        assert_eq!(p.runs, vec!["Full Name", ": Arjun Kumar"]);
    }

    #[test]
    fn stacked_labels_keep_other_lines() {
        let (_, p) = rewrite(&["Full Name:\nJob Title:\n"], "Full Name", "A");
        assert_eq!(p.text(), "Full Name: A\nJob Title:\n");

        let mut p = p;
        assert!(rewrite_label_in_paragraph(&mut p, &pattern("Job Title"), "Engineer"));
        assert_eq!(p.text(), "Full Name: A\nJob Title: Engineer\n");
    }

    #[test]
    fn empty_value_clears_old_value() {
        let (_, p) = rewrite(&["Department: Engineering"], "Department", "");
        assert_eq!(p.text(), "Department: ");
    }

    #[test]
    fn shrinking_text_empties_trailing_runs() {
        let (_, p) = rewrite(&["Depa", "rtment: ", "Engineering", " Team"], "Department", "HR");
        assert_eq!(p.runs, vec!["Depa", "rtment: ", "HR", ""]);
    }

    #[test]
    fn missing_pattern_leaves_paragraph_alone() {
        let (ok, p) = rewrite(&["Job Titles: x"], "Job Title", "y");
        assert!(!ok);
        assert_eq!(p.runs, vec!["Job Titles: x"]);
    }

    #[test]
    fn runless_paragraph_gets_whole_text() {
        struct Runless(Option<String>);
        impl RunParagraph for Runless {
            fn run_count(&self) -> usize {
                0
            }
            fn run_text(&self, _: usize) -> &str {
                unreachable!()
            }
            fn set_run_text(&mut self, _: usize, _: String) {
                unreachable!()
            }
            fn set_text(&mut self, text: String) {
                self.0 = Some(text);
            }
            fn text(&self) -> String {
                "Department:".to_string()
            }
        }
        let mut p = Runless(None);
        assert!(rewrite_label_in_paragraph(&mut p, &pattern("Department"), "HR"));
        assert_eq!(p.0.as_deref(), Some("Department: HR"));
    }

    #[test]
    fn redistribute_handles_multibyte_chars() {
        assert_eq!(redistribute("Ääb: ü", &[2, 4]), vec!["Ää", "b: ü"]);
        assert_eq!(redistribute("ab", &[1, 3, 2]), vec!["a", "b", ""]);
        assert_eq!(redistribute("abcdef", &[1, 2]), vec!["a", "bcdef"]);
    }

    #[test]
    fn fallback_field_text() {
        assert_eq!(replace_field_text("Job Titles: x", "Job Title", "y"), "Job Titles: y");
        assert_eq!(replace_field_text("  Department  ", "Department", "HR"), "Department: HR");
        assert_eq!(replace_field_text("Unrelated", "Department", "HR"), "Unrelated");
    }

    fn fill(p: &mut PlainParagraph, label: &str, value: &str) -> Option<FillOutcome> {
        let original = p.text();
        fill_paragraph(p, &original, &pattern(label), value)
    }

    #[test]
    fn fill_paragraph_reports_path_taken() {
        let mut p = PlainParagraph::new(["Job Title", ":"]);
        assert_eq!(fill(&mut p, "Job Title", "Dev"), Some(FillOutcome::Preserved));
        assert_eq!(p.runs, vec!["Job Title", ": Dev"]);

        let mut p = PlainParagraph::new(["Job ", "Titles: x"]);
        assert_eq!(fill(&mut p, "Job Title", "Dev"), Some(FillOutcome::Fallback));
        assert_eq!(p.runs, vec!["Job Titles: Dev", ""]);

        let mut p = PlainParagraph::new(["Signature"]);
        assert_eq!(fill(&mut p, "Job Title", "Dev"), None);
        assert_eq!(p.runs, vec!["Signature"]);
    }

    #[test]
    fn label_inside_written_value_is_not_refilled() {
        let mut p = PlainParagraph::new(["Job Title", ": "]);
        let original = p.text();
        let job = fill_paragraph(&mut p, &original, &pattern("Job Title"), "Head of Department");
        assert_eq!(job, Some(FillOutcome::Preserved));

        let dept = fill_paragraph(&mut p, &original, &pattern("Department"), "Finance");
        assert_eq!(dept, None);
        assert_eq!(p.text(), "Job Title: Head of Department");
    }

    fn split_at(text: &str, cuts: &[prop::sample::Index]) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(chars.len() + 1)).collect();
        points.extend([0, chars.len()]);
        points.sort_unstable();
        points.dedup();
        points
            .windows(2)
            .map(|w| chars[w[0]..w[1]].iter().collect())
            .collect()
    }

    fn runs_with_label() -> impl Strategy<Value = Vec<String>> {
        ("[a-z ]{0,8}", "[a-z ]{0,12}", 1usize..6).prop_map(|(prefix, suffix, pieces)| {
            let text = format!("{prefix} Full Name:{suffix}");
            let chars: Vec<char> = text.chars().collect();
            let step = chars.len().div_ceil(pieces).max(1);
            chars.chunks(step).map(|c| c.iter().collect()).collect()
        })
    }

    proptest! {
        #[test]
        fn run_count_is_invariant(runs in runs_with_label(), value in "[A-Za-z ]{0,20}") {
            let mut p = PlainParagraph::new(runs.clone());
            prop_assert!(rewrite_label_in_paragraph(&mut p, &pattern("Full Name"), &value));
            prop_assert_eq!(p.runs.len(), runs.len());
        }

        #[test]
        fn value_follows_any_field_label(
            field in prop::sample::select(Field::ALL.to_vec()),
            head in "[A-Za-z ]{0,10}",
            other in prop::sample::select(Field::ALL.to_vec()),
            tail in "[A-Za-z&/ ]{0,10}",
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..5),
        ) {
            let label = field.label();
            let value = format!("{head}{}{tail}", other.label());
            let mut p = PlainParagraph::new(split_at(&format!("{label}: "), &cuts));
            let runs = p.run_count();

            let outcome = fill(&mut p, label, &value);
            prop_assert_eq!(outcome, Some(FillOutcome::Preserved));
            prop_assert_eq!(p.text(), format!("{label}: {value}"));
            prop_assert_eq!(p.run_count(), runs);
        }

        #[test]
        fn equal_length_keeps_every_slot(lens in prop::collection::vec(0usize..6, 1..6)) {
            let total: usize = lens.iter().sum();
            let desired: String = (0..total).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
            let pieces = redistribute(&desired, &lens);
            let got: Vec<usize> = pieces.iter().map(|s| s.chars().count()).collect();
            prop_assert_eq!(got, lens);
            prop_assert_eq!(pieces.concat(), desired);
        }

        #[test]
        fn surplus_goes_to_last_run(lens in prop::collection::vec(0usize..6, 1..6), extra in "[a-z]{1,10}") {
            let total: usize = lens.iter().sum();
            let head: String = "x".repeat(total);
            let pieces = redistribute(&format!("{head}{extra}"), &lens);
            for (piece, len) in pieces.iter().zip(&lens).take(lens.len() - 1) {
                prop_assert_eq!(piece.chars().count(), *len);
            }
            let last = pieces.last().expect("at least one slot");
            prop_assert!(last.ends_with(&extra));
            prop_assert_eq!(last.chars().count(), lens[lens.len() - 1] + extra.len());
        }
    }
}
