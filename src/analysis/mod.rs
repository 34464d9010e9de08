pub mod grade;
pub mod product;
pub mod schema;
pub mod sections;

use std::fmt;

use serde::Serialize;

pub use grade::{HealthGrade, Severity};
pub use schema::{Header, Schema};
pub use sections::{parse, LiveAnalysis, Sections};

/// Whether one product is being reviewed or two are being compared.
///
/// Selected per request from the number of images supplied; it picks the
/// prompt template and the header schema the output is parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Single,
    Compare,
}

impl Mode {
    /// Compare mode only when a second image is actually present.
    pub fn for_second_image(present: bool) -> Self {
        if present {
            Mode::Compare
        } else {
            Mode::Single
        }
    }

    pub fn schema(self) -> Schema {
        Schema::for_mode(self)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => write!(f, "single"),
            Mode::Compare => write!(f, "compare"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_second_image() {
        assert_eq!(Mode::for_second_image(false), Mode::Single);
        assert_eq!(Mode::for_second_image(true), Mode::Compare);
    }

    #[test]
    fn mode_display() {
        assert_eq!(Mode::Single.to_string(), "single");
        assert_eq!(Mode::Compare.to_string(), "compare");
    }
}
