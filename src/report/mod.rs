//! Terminal rendering for analyses and scan history.

use console::{style, StyledObject};

use crate::analysis::schema::{HEALTH_COMPARISON, HEALTH_SCORE};
use crate::analysis::{parse, HealthGrade, Schema, Severity};
use crate::llm::gemini::ModelInfo;
use crate::storage::{Scan, ScanSummary};

fn badge(grade: &HealthGrade) -> StyledObject<String> {
    let text = format!(" {} ", grade.grade);
    match grade.severity {
        Severity::Excellent => style(text).black().on_green().bold(),
        Severity::Good => style(text).black().on_green(),
        Severity::Fair => style(text).black().on_yellow(),
        Severity::Poor => style(text).white().on_red(),
        Severity::Bad => style(text).white().on_red().bold(),
    }
}

fn graded(grade: &HealthGrade) -> String {
    if grade.reason.is_empty() {
        badge(grade).to_string()
    } else {
        format!("{} {}", badge(grade), grade.reason)
    }
}

/// `Product: B - reason` lines inside a comparison; unmatched lines pass through.
fn comparison_line(line: &str) -> String {
    let Some((name, rest)) = line.split_once(':') else {
        return line.to_string();
    };
    // The letter must stand alone, or "Candy: Expensive" would read as E
    let standalone = rest
        .trim_start()
        .chars()
        .nth(1)
        .map_or(true, |c| !c.is_alphanumeric());
    match HealthGrade::parse(rest) {
        Some(grade) if standalone => format!("{}: {}", name.trim(), graded(&grade)),
        _ => line.to_string(),
    }
}

fn indented(out: &mut String, text: &str) {
    for line in text.lines() {
        out.push_str(&format!("  {line}\n"));
    }
}

/// Render analysis text as titled sections, or the raw text when no
/// header was recognized.
pub fn render_analysis(text: &str, schema: &Schema) -> String {
    let sections = parse(text, schema);
    let mut out = String::new();

    if sections.is_empty() {
        out.push_str(text.trim());
        out.push('\n');
        return out;
    }

    for (header, content) in sections.iter() {
        out.push_str(&format!("{}\n", style(header.title).cyan().bold()));

        if *header == HEALTH_SCORE {
            match HealthGrade::parse(content) {
                Some(grade) => out.push_str(&format!("  {}\n", graded(&grade))),
                None => indented(&mut out, content),
            }
        } else if *header == HEALTH_COMPARISON {
            for line in content.lines() {
                out.push_str(&format!("  {}\n", comparison_line(line)));
            }
        } else {
            indented(&mut out, content);
        }
        out.push('\n');
    }

    out
}

pub fn render_scan_list(scans: &[ScanSummary]) -> String {
    if scans.is_empty() {
        return "No scans yet.\n".to_string();
    }

    let mut out = String::new();
    for scan in scans {
        let local = scan.created_at.with_timezone(&chrono::Local);
        out.push_str(&format!(
            "{}  {}  {}\n",
            style(&scan.id).dim(),
            local.format("%Y-%m-%d %H:%M"),
            style(&scan.product_name).bold()
        ));
        out.push_str(&format!("    {}\n", style(&scan.snippet).dim()));
    }
    out
}

pub fn render_scan_detail(scan: &Scan) -> String {
    let local = scan.created_at.with_timezone(&chrono::Local);
    let mut out = String::new();

    out.push_str(&format!("{}\n", style(scan.display_name()).bold().underlined()));
    let stored = if scan.has_image() { "  (image stored)" } else { "" };
    out.push_str(&format!(
        "{}\n",
        style(format!("{}  {}{stored}", scan.id, local.format("%Y-%m-%d %H:%M"))).dim()
    ));
    out.push('\n');
    out.push_str(&render_analysis(&scan.analysis_result, &Schema::any()));
    out
}

/// Model listing; configured candidates are marked with their position.
pub fn render_model_list(models: &[ModelInfo], candidates: &[String]) -> String {
    if models.is_empty() {
        return "No models available for content generation.\n".to_string();
    }

    let mut out = String::new();
    for model in models {
        let name = model.short_name();
        let rank = candidates
            .iter()
            .position(|c| c == name)
            .map(|i| style(format!("#{}", i + 1)).green().bold().to_string())
            .unwrap_or_else(|| "  ".to_string());
        let vision = if model.likely_supports_vision() {
            style("vision").cyan().to_string()
        } else {
            style("text").dim().to_string()
        };
        out.push_str(&format!(
            "{rank} {name:<32} {vision}  {}\n",
            style(model.display_name.as_deref().unwrap_or("")).dim()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Mode;
    use crate::storage::PLACEHOLDER_IMAGE;
    use console::strip_ansi_codes;

    fn plain(s: &str) -> String {
        strip_ansi_codes(s).to_string()
    }

    #[test]
    fn sections_get_titles_and_badge() {
        let text = "HEADLINE: Oat Bar\nHEALTH SCORE: B - Good fiber\nVERDICT: Buy it";
        let out = plain(&render_analysis(text, &Mode::Single.schema()));

        assert!(out.contains("Headline\n  Oat Bar"));
        assert!(out.contains("Health Score\n   B  Good fiber"));
        assert!(out.contains("Verdict\n  Buy it"));
    }

    #[test]
    fn ungraded_health_score_shows_raw() {
        let text = "HEALTH SCORE: hard to say";
        let out = plain(&render_analysis(text, &Mode::Single.schema()));
        assert!(out.contains("  hard to say"));
    }

    #[test]
    fn comparison_lines_are_graded() {
        let text = "HEALTH COMPARISON:\nOat Bar: A - Whole grain\nCandy: E - Sugar";
        let out = plain(&render_analysis(text, &Mode::Compare.schema()));
        assert!(out.contains("Oat Bar:  A  Whole grain"));
        assert!(out.contains("Candy:  E  Sugar"));

        let prose = plain(&render_analysis(
            "HEALTH COMPARISON:\nCandy: Expensive treat",
            &Mode::Compare.schema(),
        ));
        assert!(prose.contains("  Candy: Expensive treat"));
    }

    #[test]
    fn no_headers_falls_back_to_raw_text() {
        let text = "  The image is blurry, please try again.  ";
        let out = plain(&render_analysis(text, &Schema::any()));
        assert_eq!(out, "The image is blurry, please try again.\n");
    }

    #[test]
    fn model_list_marks_candidates() {
        let models: Vec<ModelInfo> = serde_json::from_value(serde_json::json!([
            { "name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash",
              "supportedGenerationMethods": ["generateContent"] },
            { "name": "models/text-small", "supportedGenerationMethods": ["generateContent"] }
        ]))
        .unwrap();
        let out = plain(&render_model_list(&models, &["gemini-2.5-flash".to_string()]));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("#1 gemini-2.5-flash"));
        assert!(lines[0].contains("vision"));
        assert!(lines[1].contains("text-small"));
        assert!(lines[1].contains("text"));
    }

    #[test]
    fn empty_list_message() {
        assert_eq!(render_scan_list(&[]), "No scans yet.\n");
    }

    #[test]
    fn list_and_detail_show_product() {
        let scan = Scan::new("u", PLACEHOLDER_IMAGE, "HEADLINE: Seltzer\nVERDICT: fine".into());
        let list = plain(&render_scan_list(&[ScanSummary::from(&scan)]));
        assert!(list.contains("Seltzer"));
        assert!(list.contains(&scan.id));

        let detail = plain(&render_scan_detail(&scan));
        assert!(detail.starts_with("Seltzer\n"));
        assert!(detail.contains("Verdict\n  fine"));
        assert!(!detail.contains("image stored"));
    }
}
