use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Comment lines and fields other than `data` are skipped. Multiple `data`
/// lines in one event are joined with `\n`. A trailing event without the
/// blank-line terminator is dropped when the stream ends.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }

    /// Takes one complete event off the buffer. Events that carry no data
    /// (keep-alive comments) are consumed silently.
    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            let Some((end, terminator_len)) = find_event_end(&self.buf) else {
                return Ok(None);
            };
            let raw: Vec<u8> = self.buf.drain(..end + terminator_len).collect();
            let Ok(raw) = String::from_utf8(raw) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in raw[..end].split('\n') {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                match field {
                    "data" => {
                        let data = data.get_or_insert_default();
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value);
                    }
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
    }
}

/// Finds the first blank line, returning the event length and the length
/// of the terminator that follows it.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let mut idx = 0;
    while idx < buf.len() {
        if buf[idx..].starts_with(b"\r\n\r\n") {
            return Some((idx, 4));
        }
        if buf[idx..].starts_with(b"\n\n") {
            return Some((idx, 2));
        }
        idx += 1;
    }
    None
}
