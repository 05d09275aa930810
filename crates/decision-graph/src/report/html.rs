//! Standalone HTML rendering of a [`DecisionReport`]: a table of contents followed by the
//! ranking, the source, score and result tables shaded by score, metric breakdowns and measure
//! documentation.

use super::summary::DecisionReport;
use super::views::{percent, SourceGrid};
use crate::diagnostics::Severity;
use crate::table::Table;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

const TEMPLATE: &str = include_str!("templates/report.html");

/// Section anchors and headings, in page order.
const SECTIONS: [(&str, &str); 8] = [
    ("ranking", "Ranking"),
    ("sources", "Sources"),
    ("scores", "Scores"),
    ("results", "Results"),
    ("metrics", "Metrics"),
    ("measures", "Measures"),
    ("ignored", "Ignored"),
    ("diagnostics", "Diagnostics"),
];

impl DecisionReport {
    pub fn render_html(&self) -> String {
        let mut content = String::new();
        let _ = writeln!(
            content,
            "<h1 id=\"decision\">Decision: {}</h1>",
            encode_text(&self.final_metric)
        );
        if let Some(row) = self.ranking.first() {
            let _ = writeln!(
                content,
                "<p>Winner: <strong>{}</strong> ({})</p>",
                encode_text(&row.choice),
                row.percent
            );
        }

        let mut toc = String::new();
        for (id, title) in SECTIONS {
            let body = match id {
                "ranking" => self.ranking_html(),
                "sources" => sources_html(&self.sources),
                "scores" => table_html(&self.scores),
                "results" => table_html(&self.results),
                "metrics" => self.metrics_html(),
                "measures" => self.measures_html(),
                "ignored" => self.ignored_html(),
                _ => self.diagnostics_html(),
            };
            if body.is_empty() {
                continue;
            }
            let _ = writeln!(toc, "<li><a href=\"#{id}\">{title}</a></li>");
            let _ = writeln!(
                content,
                "<h2 id=\"{id}\"><a href=\"#{id}\">{title}</a></h2>\n{body}"
            );
        }

        TEMPLATE
            .replace("{{{TITLE}}}", &encode_text(&self.final_metric))
            .replace("{{{TOC}}}", toc.trim_end())
            .replace("{{{CONTENT}}}", content.trim_end())
    }

    fn ranking_html(&self) -> String {
        let mut out = String::from("<table>\n<tr><th>rank</th><th class=\"choice\">choice</th><th>score</th></tr>\n");
        for row in &self.ranking {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><th class=\"choice\">{}</th>{}</tr>",
                row.rank,
                encode_text(&row.choice),
                score_cell(row.score)
            );
        }
        out.push_str("</table>");
        out
    }

    fn metrics_html(&self) -> String {
        let mut out = String::new();
        for breakdown in &self.metrics {
            let _ = writeln!(
                out,
                "<h3 id=\"metric-{}\">{}</h3>\n<p>{}</p>",
                encode_double_quoted_attribute(&breakdown.metric),
                encode_text(&breakdown.metric),
                encode_text(&breakdown.formula())
            );
            out.push_str("<table>\n<tr><th class=\"choice\">factor</th><th>kind</th><th>weight</th></tr>\n");
            for factor in &breakdown.factors {
                let _ = writeln!(
                    out,
                    "<tr><th class=\"choice\">{}</th><td>{}</td>{}</tr>",
                    encode_text(&factor.name),
                    factor.kind,
                    score_cell(factor.weight)
                );
            }
            out.push_str("</table>\n");
        }
        out
    }

    fn measures_html(&self) -> String {
        let mut out = String::new();
        for measure in &self.measures {
            let _ = writeln!(
                out,
                "<h3 id=\"measure-{}\">{}</h3>\n<p>Source <code>{}</code>, {} scorer.</p>",
                encode_double_quoted_attribute(&measure.name),
                encode_text(&measure.name),
                encode_text(&measure.source),
                measure.scorer
            );
            if let Some(doc) = &measure.doc {
                let _ = writeln!(out, "<p>{}</p>", encode_text(doc));
            }
            let _ = writeln!(out, "<pre>{}</pre>", encode_text(&measure.description));
        }
        out
    }

    fn ignored_html(&self) -> String {
        let mut out = String::new();
        for (title, names) in [
            ("Ignored metrics", &self.ignored_metrics),
            ("Ignored measures", &self.ignored_measures),
            ("Unused factors", &self.unused_factors),
        ] {
            if !names.is_empty() {
                let _ = writeln!(
                    out,
                    "<p>{title}: {}</p>",
                    encode_text(&names.join(", "))
                );
            }
        }
        out
    }

    fn diagnostics_html(&self) -> String {
        if self.diagnostics.is_empty() {
            return String::new();
        }
        let mut out = String::from("<ul>\n");
        for diagnostic in &self.diagnostics {
            let class = match diagnostic.severity {
                Severity::Warning => " class=\"warning\"",
                Severity::Info => "",
            };
            let _ = writeln!(out, "<li{class}>{}</li>", encode_text(&diagnostic.to_string()));
        }
        out.push_str("</ul>");
        out
    }
}

fn sources_html(grid: &SourceGrid) -> String {
    let mut out = String::from("<table>\n<tr><th class=\"choice\">choice</th>");
    for column in &grid.columns {
        let _ = write!(out, "<th>{}</th>", encode_text(column));
    }
    out.push_str("</tr>\n");
    for row in &grid.rows {
        let _ = write!(out, "<tr><th class=\"choice\">{}</th>", encode_text(&row.choice));
        for cell in &row.cells {
            let _ = write!(out, "<td>{}</td>", encode_text(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>");
    out
}

fn table_html(table: &Table) -> String {
    let mut out = String::from("<table>\n<tr><th class=\"choice\">choice</th>");
    for column in table.columns() {
        let _ = write!(out, "<th>{}</th>", encode_text(column));
    }
    out.push_str("</tr>\n");
    for (choice, row) in table.rows() {
        let _ = write!(out, "<tr><th class=\"choice\">{}</th>", encode_text(choice));
        for value in row {
            out.push_str(&score_cell(*value));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>");
    out
}

fn score_cell(value: f64) -> String {
    let (background, foreground) = shade(value);
    format!(
        "<td style=\"background-color: {background}; color: {foreground}\">{}</td>",
        percent(value)
    )
}

/// Yellow-green-blue ramp over `[0, 1]`, with light text on the dark end.
fn shade(value: f64) -> (String, &'static str) {
    const STOPS: [(f64, [f64; 3]); 3] = [
        (0.0, [255.0, 255.0, 217.0]),
        (0.5, [65.0, 182.0, 196.0]),
        (1.0, [8.0, 29.0, 88.0]),
    ];
    let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    let (low, high) = if value <= STOPS[1].0 {
        (STOPS[0], STOPS[1])
    } else {
        (STOPS[1], STOPS[2])
    };
    let t = (value - low.0) / (high.0 - low.0);
    let channel = |index: usize| (low.1[index] + t * (high.1[index] - low.1[index])).round() as u8;
    let foreground = if value > 0.6 { "#ffffff" } else { "#000000" };
    (
        format!("#{:02x}{:02x}{:02x}", channel(0), channel(1), channel(2)),
        foreground,
    )
}
