use super::Mode;

/// One recognized section header in model output.
#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    /// Upper-case label exactly as the prompt asks the model to write it.
    pub label: &'static str,
    /// Colon-less headers such as `WHO IS THIS FOR?` end at the label text.
    pub requires_colon: bool,
    /// Human-facing title used by the renderers.
    pub title: &'static str,
}

impl Header {
    const fn colon(label: &'static str, title: &'static str) -> Self {
        Self {
            label,
            requires_colon: true,
            title,
        }
    }

    const fn bare(label: &'static str, title: &'static str) -> Self {
        Self {
            label,
            requires_colon: false,
            title,
        }
    }

    /// If `line` (already trimmed) opens this section, return the text
    /// that follows the header on the same line.
    ///
    /// Labels are ASCII, so a byte-prefix comparison ignoring ASCII case is
    /// equivalent to upper-casing both sides and never splits a character.
    pub fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        let prefix = line.get(..self.label.len())?;
        if !prefix.eq_ignore_ascii_case(self.label) {
            return None;
        }
        let rest = if self.requires_colon {
            line.split_once(':').map_or("", |(_, after)| after)
        } else {
            &line[self.label.len()..]
        };
        Some(rest.trim())
    }
}

pub const HEADLINE: Header = Header::colon("HEADLINE:", "Headline");
pub const HEALTH_SCORE: Header = Header::colon("HEALTH SCORE:", "Health Score");
pub const WHO_IS_THIS_FOR: Header = Header::bare("WHO IS THIS FOR?", "Who Is This For?");
pub const FLAVOR_TEXTURE: Header = Header::colon("FLAVOR & TEXTURE:", "Flavor & Texture");
pub const PROS_CONS: Header = Header::colon("PROS & CONS:", "Pros & Cons");
pub const VERDICT: Header = Header::colon("VERDICT:", "Verdict");

pub const WINNER: Header = Header::colon("WINNER:", "Winner");
pub const HEALTH_COMPARISON: Header = Header::colon("HEALTH COMPARISON:", "Health Comparison");
pub const FLAVOR_FACE_OFF: Header = Header::colon("FLAVOR FACE-OFF:", "Flavor Face-Off");
pub const PROS_CONS_COMPARISON: Header =
    Header::colon("PROS & CONS COMPARISON:", "Pros & Cons Comparison");

/// Display order for single-product output.
static SINGLE: [&Header; 6] = [
    &HEADLINE,
    &HEALTH_SCORE,
    &WHO_IS_THIS_FOR,
    &FLAVOR_TEXTURE,
    &PROS_CONS,
    &VERDICT,
];

/// Display order for two-product output.
static COMPARE: [&Header; 6] = [
    &HEADLINE,
    &WINNER,
    &HEALTH_COMPARISON,
    &FLAVOR_FACE_OFF,
    &PROS_CONS_COMPARISON,
    &VERDICT,
];

/// The set of headers a piece of text is parsed against.
///
/// Matching walks the headers longest label first, so when one label is a
/// prefix of another the more specific label wins.
#[derive(Debug, Clone)]
pub struct Schema {
    display: Vec<&'static Header>,
    matching: Vec<&'static Header>,
}

impl Schema {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Single => Self::new(SINGLE.to_vec()),
            Mode::Compare => Self::new(COMPARE.to_vec()),
        }
    }

    /// Union of both modes, for stored scans whose mode was not recorded.
    pub fn any() -> Self {
        let mut display: Vec<&'static Header> = SINGLE.to_vec();
        for header in COMPARE {
            if !display.contains(&header) {
                display.push(header);
            }
        }
        Self::new(display)
    }

    fn new(display: Vec<&'static Header>) -> Self {
        let mut matching = display.clone();
        matching.sort_by(|a, b| b.label.len().cmp(&a.label.len()));
        Self { display, matching }
    }

    /// Headers in the order a renderer should present them.
    pub fn headers(&self) -> &[&'static Header] {
        &self.display
    }

    /// Find the header that opens `line`, with the trailing same-line text.
    pub fn match_line<'a>(&self, line: &'a str) -> Option<(&'static Header, &'a str)> {
        self.matching
            .iter()
            .find_map(|header| header.strip(line).map(|rest| (*header, rest)))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::any()
    }
}
