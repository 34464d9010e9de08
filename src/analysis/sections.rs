use serde::ser::{Serialize, SerializeMap, Serializer};

use super::schema::{Header, Schema};

/// Named sections extracted from one analysis text, in first-seen order.
///
/// An empty value means no recognized header was found; callers show the
/// raw text instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    entries: Vec<(&'static Header, String)>,
}

impl Sections {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, header: &Header) -> Option<&str> {
        self.entries
            .iter()
            .find(|(h, _)| *h == header)
            .map(|(_, content)| content.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static Header, &str)> {
        self.entries.iter().map(|(h, c)| (*h, c.as_str()))
    }

    /// The first non-empty content for a header sticks; later repeats are
    /// ignored so a completed section never changes as the text grows.
    fn insert(&mut self, header: &'static Header, content: String) {
        if self.get(header).is_none() {
            self.entries.push((header, content));
        }
    }
}

impl Serialize for Sections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (header, content) in &self.entries {
            map.serialize_entry(header.label, content)?;
        }
        map.end()
    }
}

/// Accumulator for the section currently being read.
struct Open {
    header: &'static Header,
    lines: Vec<String>,
}

impl Open {
    fn flush_into(self, sections: &mut Sections) {
        let content = self.lines.join("\n").trim().to_string();
        if !content.is_empty() {
            sections.insert(self.header, content);
        }
    }
}

/// Split analysis text into sections by header.
///
/// Pure and total: any input, including partial streamed text, produces a
/// (possibly empty) result. Running it on a longer prefix of the same text
/// only extends the section that was still open.
pub fn parse(text: &str, schema: &Schema) -> Sections {
    let mut sections = Sections::default();
    let mut open: Option<Open> = None;

    for raw in text.split('\n') {
        let line = raw.trim();

        if let Some((header, rest)) = schema.match_line(line) {
            if let Some(previous) = open.take() {
                previous.flush_into(&mut sections);
            }
            let mut lines = Vec::new();
            if !rest.is_empty() {
                lines.push(rest.to_string());
            }
            open = Some(Open { header, lines });
            continue;
        }

        if let (Some(current), false) = (open.as_mut(), line.is_empty()) {
            current.lines.push(line.to_string());
        }
    }

    if let Some(last) = open {
        last.flush_into(&mut sections);
    }

    sections
}

/// Growing text of an in-flight analysis, re-parsed on demand.
#[derive(Debug, Clone)]
pub struct LiveAnalysis {
    text: String,
    schema: Schema,
}

impl LiveAnalysis {
    pub fn new(schema: Schema) -> Self {
        Self {
            text: String::new(),
            schema,
        }
    }

    pub fn push_str(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sections(&self) -> Sections {
        parse(&self.text, &self.schema)
    }

    /// Header of the last section seen so far, used for progress display.
    pub fn current_header(&self) -> Option<&'static Header> {
        self.text
            .split('\n')
            .filter_map(|line| self.schema.match_line(line.trim()))
            .map(|(header, _)| header)
            .last()
    }
}
