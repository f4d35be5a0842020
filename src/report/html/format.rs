//! HTML fragments shared by the file and testsuite pages

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::format_secs;
use crate::utils::html_escape;

/// Placeholder for a count the test never reported
pub const UNKNOWN_NUMBER_HTML: &str = r#"<span style="font-size: 60%">unknown</span>"#;

/// Files below this size are previewed whole
const PREVIEW_FULL_LIMIT: u64 = 10_000;

/// Files below this size are previewed by their tail; larger ones not at all
const PREVIEW_TAIL_LIMIT: u64 = 10 * PREVIEW_FULL_LIMIT;

const PREVIEW_TAIL_LINES: usize = 50;

/// Highlight error, failure and warning lines (already escaped)
pub fn color_error_line(line: &str) -> String {
    if line.starts_with("ERROR: ") || line.starts_with("FAIL: ") {
        format!(r#"<span style="color: red">{line}</span>"#)
    } else if line.starts_with("WARNING: ") {
        format!(r#"<span style="color: blue">{line}</span>"#)
    } else {
        line.to_string()
    }
}

pub fn percent_to_html(percent: Option<f64>) -> String {
    let Some(percent) = percent else {
        return r#"<span style="color: gray">unknown percentage</span>"#.to_string();
    };
    if !(0.0..=100.0).contains(&percent) {
        return format!("? {percent:.2}% ?");
    }
    let color = if percent < 40.0 {
        "red"
    } else if percent < 70.0 {
        "orange"
    } else {
        "green"
    };
    format!(r#"<span style="color: {color}">{percent:.1}%</span>"#)
}

/// Pass percentage of `successes` out of `total`, unknown for a zero or
/// missing total
pub fn success_to_html_percent(total: Option<u64>, successes: u64) -> String {
    match total {
        Some(total) if total > 0 => {
            percent_to_html(Some(100.0 * successes as f64 / total as f64))
        }
        _ => UNKNOWN_NUMBER_HTML.to_string(),
    }
}

pub fn success_to_html_text(total: u64, successes: u64) -> String {
    if successes < total {
        r#"<span style="color: red">FAILED</span>"#.to_string()
    } else if successes == total {
        r#"<span style="color: green">succeeded</span>"#.to_string()
    } else {
        r#"<span style="color: red; font-size: 60%">? more successes than total ?</span>"#
            .to_string()
    }
}

pub fn returncode_to_html_text(returncode: i32, timed_out: Option<Duration>) -> String {
    if returncode == 0 {
        return r#"<span style="color: green">succeeded</span>"#.to_string();
    }
    let extra = timed_out
        .map(|t| format!(" (timeout &gt;{}s)", format_secs(t)))
        .unwrap_or_default();
    format!(r#"<span style="color: red">FAILED{extra}</span>"#)
}

pub fn returncode_to_success_html_par(returncode: i32) -> &'static str {
    if returncode == 0 {
        r#"<p> <span style="color: green">&#x2713;</span> Test succeeded</p>"#
    } else {
        r#"<p> <span style="color: red">&#x274c;</span> Test failed</p>"#
    }
}

/// Count or the unknown placeholder
pub fn number_or_unknown(value: Option<u64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNKNOWN_NUMBER_HTML.to_string())
}

/// Whole page wrapping one captured stream
pub fn wrap_stdstream_to_html(text: &str, title: &str) -> String {
    let mut html = format!("<html><body><h1>{}</h1><pre>", html_escape(title));
    for line in text.split_inclusive('\n') {
        html.push_str(&color_error_line(&html_escape(line)));
    }
    html.push_str("</pre></body></html>");
    html
}

/// Preview of a text file for embedding in a page.
///
/// Small files are shown whole, medium ones by their last lines, large
/// ones not at all.
pub fn html_file_preview(path: &Path) -> String {
    let name = html_escape(
        &path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let size = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return format!(r#"<p style="color: red">File {name} does not exist</p>"#),
    };
    if size == 0 {
        return format!(r#"<p style="color: red">File {name} is empty</p>"#);
    }
    if size >= PREVIEW_TAIL_LIMIT {
        return format!(r#"<p style="color: red">File {name} is too large to show</p>"#);
    }
    let text = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return format!(r#"<p style="color: red">File {name} cannot be read</p>"#),
    };

    let mut html = String::from("<pre>");
    if size < PREVIEW_FULL_LIMIT {
        for line in text.split_inclusive('\n') {
            html.push_str(&color_error_line(&html_escape(line)));
        }
    } else {
        let mut tail = VecDeque::with_capacity(PREVIEW_TAIL_LINES);
        for line in text.split_inclusive('\n') {
            if tail.len() == PREVIEW_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        html.push_str("... (lines omitted)\n");
        for line in tail {
            html.push_str(&color_error_line(&html_escape(line)));
        }
    }
    html.push_str("</pre>");
    html
}

/// Table row of plain cells
pub fn table_row<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut row = String::from("<tr>");
    for cell in cells {
        let _ = write!(row, "<td>{}</td>", cell.as_ref());
    }
    row.push_str("</tr>");
    row
}
