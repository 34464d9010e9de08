use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Presentation tier for a health grade, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Excellent,
    Good,
    Fair,
    Poor,
    Bad,
}

impl Severity {
    fn from_grade(grade: char) -> Option<Self> {
        match grade {
            'A' => Some(Severity::Excellent),
            'B' => Some(Severity::Good),
            'C' => Some(Severity::Fair),
            'D' => Some(Severity::Poor),
            'E' => Some(Severity::Bad),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Excellent => write!(f, "excellent"),
            Severity::Good => write!(f, "good"),
            Severity::Fair => write!(f, "fair"),
            Severity::Poor => write!(f, "poor"),
            Severity::Bad => write!(f, "bad"),
        }
    }
}

/// A health score such as `D - High sodium`, split into letter and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthGrade {
    pub grade: char,
    pub reason: String,
    pub severity: Severity,
}

/// A leading letter A-E decides the grade; whatever follows is the reason.
fn grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^([A-E])[ -]*(.*)$").expect("grade pattern is valid"))
}

impl HealthGrade {
    /// Returns `None` for anything that isn't a recognizable grade, so the
    /// caller falls back to showing the raw value.
    pub fn parse(value: &str) -> Option<Self> {
        let caps = grade_pattern().captures(value.trim())?;
        let grade = caps.get(1)?.as_str().chars().next()?.to_ascii_uppercase();
        let reason = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .trim_start_matches(|c: char| {
                        c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':')
                    })
                    .trim()
                    .to_string()
            })
            .unwrap_or_default();
        let severity = Severity::from_grade(grade)?;

        Some(Self {
            grade,
            reason,
            severity,
        })
    }
}
