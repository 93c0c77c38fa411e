//! Escaping helpers for generated markup

/// Escape a value for use inside a double- or single-quoted attribute.
pub fn safe_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '`' => out.push_str("&#x60;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape character data.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// URI-component encoding, safe to embed in a quoted attribute.
pub fn encode_url(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'('
            | b')' => out.push(byte as char),
            b'\'' => out.push_str("&#39;"),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_attr() {
        assert_eq!(
            safe_attr(r#"a"b'c<d>&`"#),
            "a&quot;b&#39;c&lt;d&gt;&amp;&#x60;"
        );
        assert_eq!(safe_attr("plain"), "plain");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("1 < 2 & \"ok\""), "1 &lt; 2 &amp; \"ok\"");
    }

    #[test]
    fn test_encode_url() {
        assert_eq!(encode_url("/a b/c.page?x=1"), "%2Fa%20b%2Fc.page%3Fx%3D1");
        assert_eq!(encode_url("it's"), "it&#39;s");
        assert_eq!(encode_url("é"), "%C3%A9");
    }
}
