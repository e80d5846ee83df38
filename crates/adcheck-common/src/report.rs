/// Report presentation: judgment badges, clipboard text, printable HTML.
///
/// Pure functions over an already-parsed report. No I/O.
use std::fmt::Write as _;

use crate::model::{ComplianceReport, GroundingSource, Judgment};

pub const REPORT_HEADING: &str = "【不動産広告審査レポート】";

impl Judgment {
    /// Badge label shown to the reviewer.
    pub fn label(&self) -> &'static str {
        match self {
            Judgment::Pass => "合格",
            Judgment::Warning => "注意",
            Judgment::Fail => "修正要",
        }
    }

    /// CSS class for the badge colour.
    pub fn tone(&self) -> &'static str {
        match self {
            Judgment::Pass => "pass",
            Judgment::Warning => "warning",
            Judgment::Fail => "fail",
        }
    }
}

/// Plain-text layout used for the clipboard export.
pub fn to_plain_text(report: &ComplianceReport) -> String {
    let mut out = format!("{REPORT_HEADING}\n総評: {}\n\n", report.overall_comment);
    let items: Vec<String> = report
        .results
        .iter()
        .map(|r| {
            format!(
                "・{}: [{}] {}\n  (事実: {})",
                r.item, r.judgment, r.suggestion, r.fact_check_result
            )
        })
        .collect();
    out.push_str(&items.join("\n\n"));
    if let Some(revised) = report.revised_copy() {
        out.push_str("\n\n【修正案】\n");
        out.push_str(revised);
    }
    out
}

/// Standalone HTML document for print / PDF export.
pub fn to_print_html(report: &ComplianceReport) -> String {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>診断レポート</title>\n<style>\n",
    );
    html.push_str(PRINT_CSS);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<header>\n<h1>診断レポート</h1>\n<p class=\"subtitle\">AIによる公正競争規約との照合結果</p>\n");
    let _ = writeln!(
        html,
        "<p class=\"tally\">合格 {} / 注意 {} / 修正要 {}</p>",
        report.count(Judgment::Pass),
        report.count(Judgment::Warning),
        report.count(Judgment::Fail)
    );
    html.push_str("</header>\n");

    let _ = writeln!(
        html,
        "<section class=\"summary\">\n<h2>総評</h2>\n<p>{}</p>\n</section>",
        escape_html(&report.overall_comment)
    );

    html.push_str("<table>\n<thead><tr>");
    for heading in ["項目", "記載内容", "ファクトチェック", "判定", "修正指示"] {
        let _ = write!(html, "<th>{heading}</th>");
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for r in &report.results {
        let fact = match &r.source_url {
            Some(url) => format!(
                "{} <a href=\"{}\">{}</a>",
                escape_html(&r.fact_check_result),
                escape_html(url),
                escape_html(if r.source.is_empty() { url } else { &r.source })
            ),
            None => escape_html(&r.fact_check_result),
        };
        let _ = writeln!(
            html,
            "<tr><td class=\"item\">{}</td><td>{}</td><td class=\"fact\">{}</td>\
<td><span class=\"badge {}\">{}</span></td><td class=\"suggestion\">{}</td></tr>",
            escape_html(&r.item),
            escape_html(&r.original_content),
            fact,
            r.judgment.tone(),
            r.judgment.label(),
            escape_html(&r.suggestion)
        );
    }
    html.push_str("</tbody>\n</table>\n");

    if let Some(revised) = report.revised_copy() {
        let _ = writeln!(
            html,
            "<section class=\"revised\">\n<h2>修正後の完成原稿案</h2>\n<pre>{}</pre>\n</section>",
            escape_html(revised)
        );
    }

    if let Some(sources) = &report.grounding_sources {
        html.push_str("<section class=\"sources\">\n<h2>参照元</h2>\n<ul>\n");
        for source in sources {
            let kind = match source {
                GroundingSource::Web(_) => "Web",
                GroundingSource::Maps(_) => "Maps",
            };
            let r = source.reference();
            let title = if r.title.is_empty() { &r.uri } else { &r.title };
            let _ = writeln!(
                html,
                "<li><span class=\"kind\">{kind}</span> <a href=\"{}\">{}</a></li>",
                escape_html(&r.uri),
                escape_html(title)
            );
        }
        html.push_str("</ul>\n</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PRINT_CSS: &str = "\
body { font-family: sans-serif; color: #0f172a; margin: 2rem; }
header { border-bottom: 2px solid #0f172a; margin-bottom: 1rem; }
.subtitle { color: #64748b; font-style: italic; }
table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
th, td { border-bottom: 1px solid #e2e8f0; padding: 0.5rem; text-align: left; vertical-align: top; }
th { color: #94a3b8; font-size: 0.7rem; letter-spacing: 0.2em; }
.fact { font-style: italic; }
.suggestion { font-weight: bold; }
.badge { border-radius: 9999px; padding: 0.1rem 0.6rem; font-size: 0.75rem; }
.badge.pass { background: #dcfce7; color: #166534; }
.badge.warning { background: #fef9c3; color: #854d0e; }
.badge.fail { background: #fee2e2; color: #991b1b; }
pre { white-space: pre-wrap; background: #f8fafc; padding: 1rem; }
@media print { body { margin: 0; } }
";
