use super::inspector::{ContentInspector, Verdict};
use crate::framing::Message;

/// Blocks messages whose `Content-Type` is one of a fixed set of media types.
///
/// The comparison is exact and case-sensitive on the whole header value, so
/// `text/csv; charset=utf-8` is not matched by `text/csv`.
pub struct MimeTypeBlocklist {
    blocked: Vec<String>,
}

impl Default for MimeTypeBlocklist {
    fn default() -> Self {
        Self {
            blocked: vec!["text/csv".to_string(), "application/zip".to_string()],
        }
    }
}

impl ContentInspector for MimeTypeBlocklist {
    fn name(&self) -> &'static str {
        "mime"
    }

    fn inspect(&self, message: &Message) -> Verdict {
        match message.content_type() {
            Some(content_type) if self.blocked.iter().any(|b| b == content_type) => {
                Verdict::Block(format!("blocked content type {}", content_type))
            }
            _ => Verdict::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{FramingMode, MessageFramer};
    use tokio_test::io::Builder;

    async fn response(content_type: Option<&str>) -> Message {
        let mut raw = String::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n");
        if let Some(ct) = content_type {
            raw.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        raw.push_str("\r\nab");

        let mut stream = Builder::new().read(raw.as_bytes()).build();
        let mut framer = MessageFramer::new(FramingMode::HeaderBody, 256, 4096);
        framer.next_message(&mut stream).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_blocked_types() {
        let blade = MimeTypeBlocklist::default();
        assert!(!blade.inspect(&response(Some("text/csv")).await).is_allowed());
        assert!(!blade
            .inspect(&response(Some("application/zip")).await)
            .is_allowed());
    }

    #[tokio::test]
    async fn test_other_types_and_absence_are_allowed() {
        let blade = MimeTypeBlocklist::default();
        assert_eq!(blade.inspect(&response(None).await), Verdict::Allow);
        assert_eq!(
            blade.inspect(&response(Some("text/html")).await),
            Verdict::Allow
        );
        assert_eq!(
            blade.inspect(&response(Some("Text/CSV")).await),
            Verdict::Allow
        );
        assert!(blade
            .inspect(&response(Some("text/csv; charset=utf-8")).await)
            .is_allowed());
    }

    #[test]
    fn test_headerless_message_is_allowed() {
        let blade = MimeTypeBlocklist::default();
        let message = Message::opaque(b"Content-Type: text/csv\r\n".to_vec());
        assert_eq!(blade.inspect(&message), Verdict::Allow);
    }
}
