use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChunksError(err) => write!(f, "failed to read body: {err}"),
            Error::InvalidPayload => f.write_str("event is not valid UTF-8"),
        }
    }
}

/// A reader of server-sent event `data` payloads from a chunk stream.
///
/// Lines end with `\n` or `\r\n`. Consecutive `data` lines of one event are
/// joined with `\n`. Comments and fields other than `data` are skipped, and
/// events without data are not reported. An event cut off by the end of the
/// stream is dropped.
pub struct Sse {
    buf: Vec<u8>,
    data: Option<String>,
    chunks: Chunks,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            data: None,
            chunks,
            eof: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            while let Some(line) = self.take_line()? {
                if line.is_empty() {
                    if let Some(data) = self.data.take() {
                        return Ok(Some(data));
                    }
                    continue;
                }
                self.process_line(&line);
            }

            if self.eof {
                return Ok(None);
            }
            // Bytes are buffered raw, so a multi-byte character split across
            // chunks is decoded only once the whole line has arrived.
            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.eof = true,
            }
        }
    }

    fn take_line(&mut self) -> Result<Option<String>, Error> {
        let Some(eol_idx) = self.buf.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buf.drain(..=eol_idx).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map(Some)
            .map_err(|_| Error::InvalidPayload)
    }

    fn process_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };
        if field != "data" {
            trace!("skipping sse field `{field}`");
            return;
        }
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => self.data = Some(value.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(mut sse: Sse) -> Vec<String> {
        let mut events = vec![];
        while let Some(event) = sse.next_event().await.unwrap() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::from_static([
            "data: hello\n\n".as_bytes(),
            "data: bye\n\n".as_bytes(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let chunks = Chunks::from_static([
            "data:".as_bytes(),
            " hello\n".as_bytes(),
            "\ndata:tight\n\n".as_bytes(),
        ]);
        assert_eq!(collect(Sse::new(chunks)).await, ["hello", "tight"]);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let bytes = "data: Believe – Roosevelt\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xE2).unwrap() + 1;
        let chunks = Chunks::from_static([&bytes[..split], &bytes[split..]]);
        assert_eq!(
            collect(Sse::new(chunks)).await,
            ["Believe – Roosevelt"]
        );
    }

    #[tokio::test]
    async fn test_crlf_comments_and_other_fields() {
        let chunks = Chunks::from_static([
            ": keep-alive\r\n\r\n".as_bytes(),
            "event: message\r\nid: 7\r\ndata: {\"a\":1}\r\n\r\n".as_bytes(),
            "data: first\ndata: second\n\n".as_bytes(),
        ]);
        assert_eq!(
            collect(Sse::new(chunks)).await,
            ["{\"a\":1}", "first\nsecond"]
        );
    }

    #[tokio::test]
    async fn test_incomplete_event_is_dropped() {
        let chunks = Chunks::from_static([
            "data: hello\n".as_bytes(),
            "data: bye\n".as_bytes(),
        ]);
        assert!(collect(Sse::new(chunks)).await.is_empty());

        let chunks = Chunks::from_static(["xxxxxx\n\n".as_bytes()]);
        assert!(collect(Sse::new(chunks)).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let chunks = Chunks::from_static([b"data: \xff\xfe\n\n".as_slice()]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let chunks = Chunks::failing_after(vec!["data: he".as_bytes()]);
        let mut sse = Sse::new(chunks);
        assert_eq!(
            sse.next_event().await.unwrap_err(),
            Error::ChunksError(ChunksError("connection reset".to_owned()))
        );
    }
}
