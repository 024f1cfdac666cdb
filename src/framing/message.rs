use std::borrow::Cow;

/// One complete application message as read from the wire.
///
/// `raw` holds the exact bytes received; forwarding a message always sends
/// `raw` unmodified. Header fields are only populated by the header/body
/// discipline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    raw: Vec<u8>,
    header_len: usize,
    headers: Vec<(String, String)>,
}

impl Message {
    pub(crate) fn new(raw: Vec<u8>, header_len: usize, headers: Vec<(String, String)>) -> Self {
        Self {
            raw,
            header_len,
            headers,
        }
    }

    /// Message without a header block (line-oriented protocols); the whole
    /// payload is its body.
    pub fn opaque(raw: Vec<u8>) -> Self {
        Self::new(raw, 0, Vec::new())
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Bytes following the header block, separator excluded.
    pub fn body(&self) -> &[u8] {
        &self.raw[self.header_len..]
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value of the first header called `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Whole message decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }
}

/// Splits an HTTP header block (separator excluded) into `(name, value)` pairs.
///
/// The start line is skipped. Lines without a colon are ignored.
pub(crate) fn parse_header_fields(block: &str) -> Vec<(String, String)> {
    block
        .split("\r\n")
        .skip(1)
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let fields = parse_header_fields(
            "HTTP/1.1 200 OK\r\ncontent-type:  text/csv \r\nbogus line\r\nX-Empty:\r\nHost: a:80",
        );
        assert_eq!(
            fields,
            vec![
                ("content-type".to_string(), "text/csv".to_string()),
                ("X-Empty".to_string(), String::new()),
                ("Host".to_string(), "a:80".to_string()),
            ]
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\n\r\nPK".to_vec();
        let header_len = raw.len() - 2;
        let message = Message::new(
            raw,
            header_len,
            vec![("Content-Type".to_string(), "application/zip".to_string())],
        );

        assert_eq!(message.header("content-type"), Some("application/zip"));
        assert_eq!(message.content_type(), Some("application/zip"));
        assert_eq!(message.header("Content-Length"), None);
        assert_eq!(message.body(), b"PK");
    }

    #[test]
    fn test_opaque_message() {
        let message = Message::opaque(b"USER anonymous\r\n".to_vec());
        assert!(message.headers().is_empty());
        assert_eq!(message.body(), message.raw());
        assert_eq!(message.text(), "USER anonymous\r\n");
    }
}
