use std::borrow::Cow;
use std::io::{self, BufRead, Stdout, StdinLock, Write};
use tracing::warn;

/// Pull-based source of chat queries: writes a prompt, then yields one line.
///
/// Ends at end of input or on a read error. Lines that are not valid UTF-8
/// are decoded lossily rather than ending the session.
pub struct PromptedLines<R, W> {
    reader: R,
    writer: W,
    prompt: String,
}

impl<R: BufRead, W: Write> PromptedLines<R, W> {
    pub fn new(reader: R, writer: W, prompt: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            prompt: prompt.into(),
        }
    }
}

impl PromptedLines<StdinLock<'static>, Stdout> {
    pub fn stdin(prompt: impl Into<String>) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), prompt)
    }
}

impl<R: BufRead, W: Write> Iterator for PromptedLines<R, W> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Err(e) = write!(self.writer, "{}", self.prompt).and_then(|_| self.writer.flush()) {
            warn!(error = %e, "failed to write prompt");
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Cow::Owned(_) = line {
                    warn!("input line is not valid UTF-8; invalid bytes replaced");
                }
                Some(line.trim_end_matches(['\r', '\n']).to_string())
            }
            Err(e) => {
                warn!(error = %e, "failed to read input");
                None
            }
        }
    }
}
