/// Turn an arbitrary name into an identifier made of `[A-Za-z0-9_]`.
///
/// Every other character becomes `_`; a leading digit gets an `x` prefix.
pub fn legalize_name(name: &str) -> String {
    let mut legal: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if legal.is_empty() || legal.starts_with(|c: char| c.is_ascii_digit()) {
        legal.insert(0, 'x');
    }
    legal
}

/// Path with forward slashes, usable in HTML links
pub fn to_web_path(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Escape `&`, `<` and `>` for HTML text content
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legalize_name() {
        assert_eq!(legalize_name("raster/r.slope"), "raster_r_slope");
        assert_eq!(legalize_name("3d-tools"), "x3d_tools");
        assert_eq!(legalize_name("."), "_");
        assert_eq!(legalize_name(""), "x");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(html_escape("plain"), "plain");
    }
}
