use regex::Regex;

/// Where a `Label:` occurrence sits in a paragraph's flattened text.
///
/// Both offsets are byte offsets into the searched text and always fall on
/// `char` boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelMatch {
    /// Just past the colon.
    pub colon_end: usize,
    /// Start of the next line after the colon, or the end of the text.
    pub value_end: usize,
}

impl LabelMatch {
    pub fn value<'t>(&self, text: &'t str) -> &'t str {
        &text[self.colon_end..self.value_end]
    }
}

/// Compiled matcher for one label: the label's words as whole words,
/// case-insensitive, separated by any whitespace, then optional whitespace and
/// a colon.
#[derive(Clone, Debug)]
pub struct LabelPattern {
    label: String,
    re: Regex,
}

impl LabelPattern {
    pub fn new(label: &str) -> Result<Self, regex::Error> {
        let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
        let re = Regex::new(&format!(r"(?i)\b{}\s*:", words.join(r"\s+")))?;
        Ok(Self {
            label: label.to_string(),
            re,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// First occurrence only.
    pub fn find(&self, text: &str) -> Option<LabelMatch> {
        let m = self.re.find(text)?;
        let colon_end = m.end();
        let value_end = text[colon_end..]
            .find('\n')
            .map_or(text.len(), |i| colon_end + i);
        Some(LabelMatch {
            colon_end,
            value_end,
        })
    }
}

pub fn locate_label(text: &str, label: &str) -> Option<LabelMatch> {
    LabelPattern::new(label).ok()?.find(text)
}
