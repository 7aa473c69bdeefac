//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use ritquiz_core::model::Rit;
use ritquiz_core::record::SessionRecord;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report for one finished session.
pub fn generate_html(record: &SessionRecord) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>ritquiz report: {}</title>\n",
        html_escape(&record.username)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>ritquiz report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Student: <strong>{}</strong> | {} | Strands: {} | {}</p>\n",
        html_escape(&record.username),
        html_escape(&record.grade_level),
        html_escape(&record.strands_selected.join(", ")),
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!("<p class=\"meta\">Session {}</p>\n", record.id));
    html.push_str("</header>\n");

    // Summary dashboard
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Starting RIT</th><th>Final RIT</th><th>Growth</th><th>Score</th><th>Accuracy</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    let growth = record.growth();
    html.push_str(&format!(
        "<tr><td>{}</td><td>{}</td><td class=\"{}\">{:+}</td><td>{}/{}</td><td>{:.1}%</td></tr>\n",
        record.starting_rit,
        record.final_rit,
        if growth >= 0 { "pass" } else { "fail" },
        growth,
        record.score_correct,
        record.score_total,
        record.accuracy() * 100.0,
    ));
    html.push_str("</tbody></table>\n");

    if !record.rit_history.is_empty() {
        html.push_str(&generate_trajectory_chart(record));
    }

    html.push_str("</section>\n");

    // Per-item results
    if !record.points.is_empty() {
        html.push_str("<section class=\"results\">\n");
        html.push_str("<h2>Items</h2>\n");
        html.push_str("<table class=\"results-table\" id=\"results\">\n");
        html.push_str("<thead><tr><th onclick=\"sortItems(0)\">#</th><th onclick=\"sortItems(1)\">Item</th><th onclick=\"sortItems(2)\">Strand</th><th onclick=\"sortItems(3)\">Difficulty</th><th onclick=\"sortItems(4)\">Result</th><th onclick=\"sortItems(5)\">RIT</th></tr></thead>\n");
        html.push_str("<tbody>\n");

        for (i, p) in record.points.iter().enumerate() {
            let (class, text) = if p.correct {
                ("pass", "correct")
            } else {
                ("fail", "incorrect")
            };
            html.push_str(&format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} &rarr; {} ({:+})</td></tr>\n",
                class,
                i + 1,
                html_escape(&p.item_id),
                html_escape(&p.strand),
                p.class,
                text,
                p.ability_before,
                p.ability_after,
                p.delta
            ));
        }

        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(record).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // Column sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(record: &SessionRecord, path: &Path) -> Result<()> {
    let html = generate_html(record);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

/// Line chart of the ability estimate, starting point first.
fn generate_trajectory_chart(record: &SessionRecord) -> String {
    let width = 640.0;
    let height = 260.0;
    let left = 50.0;
    let right = 20.0;
    let top = 20.0;
    let bottom = 30.0;
    let plot_w = width - left - right;
    let plot_h = height - top - bottom;

    let values: Vec<Rit> = std::iter::once(record.starting_rit)
        .chain(record.rit_history.iter().copied())
        .collect();
    let lo = values
        .iter()
        .copied()
        .min()
        .unwrap_or(record.starting_rit)
        .saturating_sub(10);
    let hi = values
        .iter()
        .copied()
        .max()
        .unwrap_or(record.starting_rit)
        .saturating_add(10);
    let span = f64::from(hi) - f64::from(lo);
    let steps = (values.len() - 1).max(1) as f64;

    let x_of = |i: usize| left + plot_w * i as f64 / steps;
    let y_of = |v: Rit| top + plot_h * (f64::from(hi) - f64::from(v)) / span;

    let mut svg = format!(
        "<svg class=\"trajectory\" width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\">\n"
    );

    // Axes and labels
    svg.push_str(&format!(
        "  <line x1=\"{left}\" y1=\"{top}\" x2=\"{left}\" y2=\"{}\" stroke=\"currentColor\" stroke-width=\"1\"/>\n",
        top + plot_h
    ));
    svg.push_str(&format!(
        "  <line x1=\"{left}\" y1=\"{0}\" x2=\"{1}\" y2=\"{0}\" stroke=\"currentColor\" stroke-width=\"1\"/>\n",
        top + plot_h,
        left + plot_w
    ));
    for v in [lo, hi] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{:.1}\" font-size=\"12\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{v}</text>\n",
            left - 6.0,
            y_of(v)
        ));
    }

    // Starting ability reference line
    let y0 = y_of(record.starting_rit);
    svg.push_str(&format!(
        "  <line x1=\"{left}\" y1=\"{y0:.1}\" x2=\"{:.1}\" y2=\"{y0:.1}\" stroke=\"#9ca3af\" stroke-dasharray=\"4 4\"/>\n",
        left + plot_w
    ));

    let polyline: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| format!("{:.1},{:.1}", x_of(i), y_of(v)))
        .collect();
    svg.push_str(&format!(
        "  <polyline points=\"{}\" fill=\"none\" stroke=\"#3b82f6\" stroke-width=\"2\"/>\n",
        polyline.join(" ")
    ));

    for (i, &v) in values.iter().enumerate().skip(1) {
        let color = match record.points.get(i - 1) {
            Some(p) if p.correct => "#22c55e",
            Some(_) => "#ef4444",
            None => "#3b82f6",
        };
        svg.push_str(&format!(
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{color}\"><title>item {i}: {v}</title></circle>\n",
            x_of(i),
            y_of(v)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1f2937; --muted: #6b7280; --grid: #e5e7eb; --correct: #dcfce7; --incorrect: #fee2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #0f172a; --fg: #e5e7eb; --grid: #334155; --correct: #14532d; --incorrect: #7f1d1d; }
}
body { font-family: system-ui, sans-serif; max-width: 60rem; margin: 0 auto; padding: 1.5rem; background: var(--bg); color: var(--fg); }
.meta { color: var(--muted); margin: 0.25rem 0; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid var(--grid); padding: 0.4rem 0.75rem; text-align: left; }
#results th { cursor: pointer; user-select: none; }
.pass { background: var(--correct); }
.fail { background: var(--incorrect); }
svg.trajectory { display: block; margin: 1.5rem 0; }
pre { overflow-x: auto; padding: 1rem; background: var(--grid); }
summary { cursor: pointer; }
"#;

// Numeric columns (#, RIT) sort by their leading number.
const JS: &str = r#"
function sortItems(col) {
  const table = document.getElementById('results');
  const body = table.tBodies[0];
  const desc = table.dataset.col === String(col) && table.dataset.dir !== 'desc';
  const key = row => {
    const text = row.cells[col].textContent.trim();
    const n = parseFloat(text);
    return isNaN(n) ? text : n;
  };
  const rows = Array.from(body.rows).sort((a, b) => {
    const ka = key(a), kb = key(b);
    const cmp = typeof ka === 'number' && typeof kb === 'number' ? ka - kb : String(ka).localeCompare(String(kb));
    return desc ? -cmp : cmp;
  });
  table.dataset.col = String(col);
  table.dataset.dir = desc ? 'desc' : 'asc';
  rows.forEach(r => body.appendChild(r));
}
"#;
