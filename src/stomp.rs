//! Minimal STOMP 1.2 frame codec — just the subset the charging status
//! subscription needs (CONNECT/CONNECTED, SUBSCRIBE, SEND, MESSAGE,
//! ERROR, DISCONNECT). Frames are text: a command line, header lines,
//! a blank line, the body, and a NUL terminator.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is missing the NUL terminator")]
    MissingTerminator,
    #[error("frame has no command line")]
    MissingCommand,
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// First occurrence wins, per the STOMP header rules.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: &str) -> Self {
        Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn send(destination: &str, body: &str) -> Self {
        Frame::new("SEND")
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", &body.len().to_string())
            .body(body)
    }

    pub fn disconnect() -> Self {
        Frame::new("DISCONNECT").header("receipt", "bye")
    }

    pub fn serialize(&self) -> String {
        // CONNECT/CONNECTED frames are exempt from header escaping.
        let escaped = self.command != "CONNECT" && self.command != "CONNECTED";
        let mut out = String::new();
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let raw = raw
            .strip_suffix('\0')
            .ok_or(FrameError::MissingTerminator)?;
        let (head, body) = match raw.split_once("\r\n\r\n") {
            Some(parts) => parts,
            None => raw.split_once("\n\n").unwrap_or((raw, "")),
        };

        let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));
        let command = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or(FrameError::MissingCommand)?
            .to_string();

        let escaped = command != "CONNECT" && command != "CONNECTED";
        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            if escaped {
                headers.push((unescape(name), unescape(value)));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        Ok(Self {
            command,
            headers,
            body: body.to_string(),
        })
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_round_trips() {
        let frame = Frame::subscribe("sub-0", "/topic/charging/17");
        let parsed = Frame::parse(&frame.serialize()).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(parsed.header_value("destination"), Some("/topic/charging/17"));
    }

    #[test]
    fn send_frame_carries_content_length_and_body() {
        let frame = Frame::send("/app/charging/status/17", "{}");
        let serialized = frame.serialize();
        assert!(serialized.starts_with("SEND\n"));
        assert!(serialized.ends_with("{}\0"));
        let parsed = Frame::parse(&serialized).unwrap();
        assert_eq!(parsed.header_value("content-length"), Some("2"));
        assert_eq!(parsed.body, "{}");
    }

    #[test]
    fn parses_a_broker_message_frame() {
        let raw = "MESSAGE\ndestination:/topic/charging/17\nmessage-id:7\nsubscription:sub-0\n\n{\"stateOfCharge\":55.0}\0";
        let frame = Frame::parse(raw).unwrap();
        assert_eq!(frame.command, "MESSAGE");
        assert_eq!(frame.header_value("destination"), Some("/topic/charging/17"));
        assert_eq!(frame.body, "{\"stateOfCharge\":55.0}");
    }

    #[test]
    fn header_values_escape_reserved_characters() {
        let frame = Frame::new("SEND").header("note", "a:b\nc\\d");
        let serialized = frame.serialize();
        assert!(serialized.contains("note:a\\cb\\nc\\\\d"));
        let parsed = Frame::parse(&serialized).unwrap();
        assert_eq!(parsed.header_value("note"), Some("a:b\nc\\d"));
    }

    #[test]
    fn connect_frame_is_not_escaped() {
        let serialized = Frame::connect("localhost:8080").serialize();
        assert!(serialized.contains("host:localhost:8080\n"));
        let parsed = Frame::parse(&serialized).unwrap();
        assert_eq!(parsed.header_value("host"), Some("localhost:8080"));
    }

    #[test]
    fn first_header_occurrence_wins() {
        let raw = "MESSAGE\nfoo:one\nfoo:two\n\n\0";
        let frame = Frame::parse(raw).unwrap();
        assert_eq!(frame.header_value("foo"), Some("one"));
    }

    #[test]
    fn rejects_missing_terminator_and_command() {
        assert_eq!(
            Frame::parse("MESSAGE\n\nbody"),
            Err(FrameError::MissingTerminator)
        );
        assert_eq!(Frame::parse("\0"), Err(FrameError::MissingCommand));
        assert_eq!(
            Frame::parse("MESSAGE\nbroken-header\n\n\0"),
            Err(FrameError::MalformedHeader("broken-header".to_string()))
        );
    }
}
