use std::fmt::Write as _;

use serde::Serialize;

use super::{ChartData, Report, ReportRow, ReportSection};

const CHART_JS_SRC: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js";

const CANDIDATE_COLORS: (&str, &str) = ("rgba(52, 152, 219, 0.6)", "rgba(52, 152, 219, 1)");
const BASELINE_COLORS: (&str, &str) = ("rgba(46, 204, 113, 0.6)", "rgba(46, 204, 113, 1)");

const STYLE: &str = r#"<style>
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Ubuntu,sans-serif;line-height:1.6;color:#333;background:#f5f5f5;padding:20px}
.container{max-width:1200px;margin:0 auto;background:#fff;padding:30px;border-radius:8px;box-shadow:0 2px 10px rgba(0,0,0,.1)}
h1{color:#2c3e50;border-bottom:3px solid #3498db;padding-bottom:10px;margin-bottom:30px}
h2{color:#34495e;margin:40px 0 20px;padding-bottom:10px;border-bottom:2px solid #ecf0f1}
h3{color:#555;margin:30px 0 15px}
.summary{background:#ecf0f1;padding:20px;border-radius:5px;margin-bottom:30px}
.summary-grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(200px,1fr));gap:15px;margin-top:15px}
.summary-item{background:#fff;padding:15px;border-radius:5px;border-left:4px solid #3498db}
.summary-item h4{color:#7f8c8d;font-size:.9em;margin-bottom:5px}
.summary-item .value{font-size:1.5em;font-weight:bold;color:#2c3e50}
table{width:100%;border-collapse:collapse;margin:20px 0;background:#fff}
th,td{padding:12px;text-align:left;border-bottom:1px solid #ddd}
th{background:#34495e;color:#fff;font-weight:600;cursor:pointer;user-select:none}
th:hover{background:#2c3e50}
tr:hover{background:#f8f9fa}
.badge{display:inline-block;padding:4px 8px;border-radius:3px;font-size:.85em;font-weight:bold;color:#fff}
.badge-faster{background:#27ae60}
.badge-similar{background:#f39c12}
.badge-slower{background:#e74c3c}
.error-row td{color:#c0392b}
.chart-container{margin:30px 0;padding:20px;background:#fafafa;border-radius:5px}
.section{margin-bottom:40px}
.footer{margin-top:50px;padding-top:20px;border-top:2px solid #ecf0f1;color:#7f8c8d;font-size:.9em}
</style>
"#;

const SCRIPT: &str = r#"<script>
(function () {
  if (typeof Chart !== 'undefined') {
    document.querySelectorAll('script.chart-data').forEach(function (node) {
      var spec = JSON.parse(node.textContent);
      var canvas = document.getElementById(spec.id);
      if (!canvas) { return; }
      new Chart(canvas.getContext('2d'), {
        type: 'bar',
        data: { labels: spec.labels, datasets: spec.datasets },
        options: {
          responsive: true,
          scales: { y: { beginAtZero: true, title: { display: true, text: 'Time (ms)' } } }
        }
      });
    });
  }
  document.querySelectorAll('th').forEach(function (header) {
    header.addEventListener('click', function () {
      var table = header.closest('table');
      var tbody = table.querySelector('tbody');
      var rows = Array.from(tbody.querySelectorAll('tr'));
      var index = Array.from(header.parentElement.children).indexOf(header);
      var asc = header.classList.contains('asc');
      rows.sort(function (a, b) {
        var av = a.children[index].textContent.trim();
        var bv = b.children[index].textContent.trim();
        var an = parseFloat(av), bn = parseFloat(bv);
        if (!isNaN(an) && !isNaN(bn)) { return asc ? bn - an : an - bn; }
        return asc ? bv.localeCompare(av) : av.localeCompare(bv);
      });
      rows.forEach(function (row) { tbody.appendChild(row); });
      header.classList.toggle('asc');
    });
  });
})();
</script>
"#;

/// Render a self-contained HTML document. Output depends only on `report`.
pub fn render_html(report: &Report) -> String {
    let mut h = String::with_capacity(16 * 1024);
    let title = esc(&report.meta.title);

    h.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    h.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n");
    let _ = writeln!(h, "<title>{title}</title>");
    let _ = writeln!(h, "<script src=\"{CHART_JS_SRC}\"></script>");
    h.push_str(STYLE);
    h.push_str("</head>\n<body>\n<div class=\"container\">\n");
    let _ = writeln!(h, "<h1>{title}</h1>");

    render_summary(&mut h, report);
    for section in &report.sections {
        render_section(&mut h, section, report.has_comparison);
    }
    render_failed_runs(&mut h, report);
    render_footer(&mut h, report);

    h.push_str("</div>\n");
    h.push_str(SCRIPT);
    h.push_str("</body>\n</html>\n");
    h
}

fn render_summary(h: &mut String, report: &Report) {
    let meta = &report.meta;
    h.push_str("<div class=\"summary\">\n<h2>Executive Summary</h2>\n");
    let _ = writeln!(h, "<p><strong>Generated:</strong> {}</p>", esc(&meta.generated_at));

    let run = meta.run.as_ref();
    let versions = [
        (&meta.candidate_label, run.and_then(|r| r.candidate_version.as_deref())),
        (&meta.baseline_label, run.and_then(|r| r.baseline_version.as_deref())),
    ];
    for (label, version) in versions {
        if let Some(v) = version {
            let _ = writeln!(h, "<p><strong>{} Version:</strong> {}</p>", esc(label), esc(v));
        }
    }

    h.push_str("<div class=\"summary-grid\">\n");
    summary_item(h, "Total Categories", report.summary.total_categories);
    summary_item(h, "Total Tests", report.summary.total_tests);
    if report.summary.compared_tests > 0 {
        summary_item(h, "Compared Tests", report.summary.compared_tests);
    }
    h.push_str("</div>\n</div>\n");
}

fn render_failed_runs(h: &mut String, report: &Report) {
    if report.failed_runs.is_empty() {
        return;
    }
    h.push_str("<div class=\"section\">\n<h2>Failed Runs</h2>\n<table>\n<thead>\n");
    h.push_str("<tr><th>Workload</th><th>Runtime</th><th>Error</th></tr>\n</thead>\n<tbody>\n");
    for run in &report.failed_runs {
        let _ = writeln!(
            h,
            "<tr class=\"error-row\"><td>{}</td><td>{}</td><td>{}</td></tr>",
            esc(&run.workload_file),
            esc(&run.runtime_label),
            esc(&run.error)
        );
    }
    h.push_str("</tbody>\n</table>\n</div>\n");
}

fn summary_item(h: &mut String, label: &str, value: usize) {
    let _ = writeln!(
        h,
        "<div class=\"summary-item\"><h4>{label}</h4><div class=\"value\">{value}</div></div>"
    );
}

fn render_section(h: &mut String, section: &ReportSection, has_comparison: bool) {
    h.push_str("<div class=\"section\">\n");
    let _ = writeln!(h, "<h2>{}</h2>", esc(&section.category));

    if section.rows.is_empty() {
        h.push_str("<p>No tests available for this category.</p>\n</div>\n");
        return;
    }

    h.push_str("<table>\n<thead>\n<tr>");
    for col in ["Test Name", "Mean (ms)", "Median (ms)", "Min (ms)", "Max (ms)", "Std Dev (ms)"] {
        let _ = write!(h, "<th>{col}</th>");
    }
    if has_comparison {
        h.push_str("<th>Comparison</th>");
    }
    h.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &section.rows {
        render_row(h, row, has_comparison);
    }
    h.push_str("</tbody>\n</table>\n");

    render_chart(h, &section.chart);
    h.push_str("</div>\n");
}

fn render_row(h: &mut String, row: &ReportRow, has_comparison: bool) {
    let _ = write!(
        h,
        "<tr><td>{}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td>",
        esc(&row.name),
        row.mean,
        row.median,
        row.min,
        row.max,
        row.stddev
    );
    if has_comparison {
        match &row.comparison {
            Some(c) => {
                let sign = if c.percent_diff > 0.0 { "+" } else { "" };
                let _ = write!(
                    h,
                    "<td><span class=\"badge badge-{}\">{}</span><br><small>{sign}{:.1}%</small></td>",
                    c.classification.as_str(),
                    c.classification.title(),
                    c.percent_diff
                );
            }
            None => h.push_str("<td>-</td>"),
        }
    }
    h.push_str("</tr>\n");
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dataset<'a> {
    label: &'a str,
    data: &'a [Option<f64>],
    background_color: &'static str,
    border_color: &'static str,
    border_width: u32,
}

#[derive(Serialize)]
struct ChartPayload<'a> {
    id: &'a str,
    labels: &'a [String],
    datasets: Vec<Dataset<'a>>,
}

fn render_chart(h: &mut String, chart: &ChartData) {
    let datasets = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let (bg, border) = if i == 0 { CANDIDATE_COLORS } else { BASELINE_COLORS };
            Dataset {
                label: &s.label,
                data: &s.data,
                background_color: bg,
                border_color: border,
                border_width: 1,
            }
        })
        .collect();
    let payload = ChartPayload {
        id: &chart.id,
        labels: &chart.labels,
        datasets,
    };
    let json = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());

    h.push_str("<div class=\"chart-container\">\n<h3>Performance Comparison Chart</h3>\n");
    let _ = writeln!(h, "<canvas id=\"{}\" width=\"400\" height=\"200\"></canvas>", esc(&chart.id));
    let _ = writeln!(
        h,
        "<script type=\"application/json\" class=\"chart-data\">{}</script>",
        script_safe(&json)
    );
    h.push_str("</div>\n");
}

fn render_footer(h: &mut String, report: &Report) {
    h.push_str("<div class=\"footer\">\n");
    let env = match &report.meta.run {
        Some(run) => {
            let mut s = format!(
                "Platform: {}, Architecture: {}, CPUs: {}, Profile: {}",
                run.os, run.arch, run.cpu_count, run.profile
            );
            if let Some(sha) = &run.git_sha {
                let _ = write!(s, ", Commit: {sha}");
            }
            s
        }
        None => "Unknown".to_string(),
    };
    let _ = writeln!(h, "<p><strong>Test Environment:</strong> {}</p>", esc(&env));
    h.push_str(
        "<p><strong>Methodology:</strong> Each workload runs untimed warmup iterations, then timed \
         iterations. Results show mean execution time in milliseconds unless otherwise specified.</p>\n",
    );
    h.push_str("</div>\n");
}

pub(crate) fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// JSON inside `<script>` must not close the element early. These
/// characters only occur inside JSON strings, so unicode escapes are valid.
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::report::ReportMeta;
    use crate::schema::{CategoryResult, WorkloadResult};

    fn categories() -> Vec<CategoryResult> {
        let mut a = CategoryResult::new("Basic <Types>");
        a.push(WorkloadResult::from_samples("add & sub", 0, vec![1.0, 2.0, 3.0], None));
        a.push(WorkloadResult::from_samples("concat", 0, vec![4.0], None));
        let mut b = CategoryResult::new("Collections");
        b.push(WorkloadResult::from_samples("</script><b>", 0, vec![2.0], None));
        vec![a, b]
    }

    #[test]
    fn identical_inputs_render_identically() {
        let cats = categories();
        let base = categories();
        let cmp = compare(&cats, Some(base.as_slice()));
        let meta = ReportMeta::new("2026-01-01T00:00:00Z");
        let one = render_html(&Report::build(&cats, Some(&cmp), meta.clone()));
        let two = render_html(&Report::build(&cats, Some(&cmp), meta));
        assert_eq!(one, two);
    }

    #[test]
    fn user_text_is_escaped() {
        let cats = categories();
        let html = render_html(&Report::build(&cats, None, ReportMeta::new("now")));
        assert!(html.contains("<h2>Basic &lt;Types&gt;</h2>"));
        assert!(html.contains("<td>add &amp; sub</td>"));
        assert!(!html.contains("<b>"));
        assert_eq!(html.matches("</script>").count(), 1 + 2 + 1);
    }

    #[test]
    fn one_section_and_row_per_input() {
        let cats = categories();
        let html = render_html(&Report::build(&cats, None, ReportMeta::new("now")));
        assert_eq!(html.matches("<div class=\"section\">").count(), 2);
        assert_eq!(html.matches("<tr><td>").count(), 3);
        assert!(!html.contains("<th>Comparison</th>"));
        let first = html.find("Basic &lt;Types&gt;").unwrap();
        let second = html.find("Collections").unwrap();
        assert!(first < second);
    }

    #[test]
    fn comparison_column_and_badges() {
        let cats = categories();
        let mut base = categories();
        base[0].tests[1] = WorkloadResult::from_samples("concat", 0, vec![1.0], None);
        let cmp = compare(&cats, Some(base.as_slice()));
        let html = render_html(&Report::build(&cats, Some(&cmp), ReportMeta::new("now")));
        assert!(html.contains("<th>Comparison</th>"));
        assert!(html.contains("badge-slower\">Slower</span><br><small>+300.0%</small>"));
        assert!(html.contains("badge-similar\">Similar</span><br><small>0.0%</small>"));
        assert!(html.contains("Compared Tests"));
    }

    #[test]
    fn versions_appear_only_when_known() {
        let cats = categories();
        let mut run = crate::schema::RunMeta::capture("quick");
        run.candidate_version = None;
        run.baseline_version = Some("v20.1.0".into());
        let meta = ReportMeta::new("now").with_labels("Cand", "Node").with_run(run);
        let html = render_html(&Report::build(&cats, None, meta));
        assert!(html.contains("<strong>Node Version:</strong> v20.1.0"));
        assert!(!html.contains("Cand Version"));
        assert!(!html.contains("Unknown</p>"));
    }

    #[test]
    fn failed_runs_get_error_rows() {
        use crate::schema::{ProcessPair, ProcessRunResult};
        let pairs = vec![ProcessPair {
            workload_file: "bench/<w>.js".into(),
            candidate: vec![ProcessRunResult::failure("cand", "bench/<w>.js", "exited with status 3")],
            baseline: vec![ProcessRunResult::failure("base", "bench/<w>.js", "timed out after 200 ms")],
        }];
        let cats = categories();
        let report = Report::build(&cats, None, ReportMeta::new("now")).with_failed_runs(&pairs);
        assert_eq!(report.failed_runs.len(), 2);
        assert_eq!(report.failed_runs[0].runtime_label, "cand");

        let html = render_html(&report);
        assert!(html.contains("<h2>Failed Runs</h2>"));
        assert_eq!(html.matches("<tr class=\"error-row\">").count(), 2);
        assert!(html.contains("<td>bench/&lt;w&gt;.js</td><td>base</td><td>timed out after 200 ms</td>"));
    }

    #[test]
    fn no_failed_runs_section_by_default() {
        let html = render_html(&Report::build(&categories(), None, ReportMeta::new("now")));
        assert!(!html.contains("Failed Runs"));
    }

    #[test]
    fn empty_category_renders_placeholder() {
        let cats = vec![CategoryResult::new("Nothing")];
        let html = render_html(&Report::build(&cats, None, ReportMeta::new("now")));
        assert!(html.contains("No tests available for this category."));
        assert!(!html.contains("<canvas"));
    }
}
