//! Line-oriented terminal prompts
//!
//! Used by the init wizard, branch picking and the chat loops. Input comes
//! from any [`BufRead`] and output goes to any [`Write`].

use crate::error::Result;
use std::io::{BufRead, Write};

/// Question/answer helper over a reader and a writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Prompter reading answers from `input` and writing questions to `output`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask a question on its own line and return the trimmed answer
    ///
    /// End of input yields an empty answer.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{}", question)?;
        Ok(self.read_line()?.unwrap_or_default().trim().to_string())
    }

    /// Ask a yes/no question, defaulting to no
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.output, "{} (y/N): ", question)?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    /// Print `prompt` inline and read one line, `None` at end of input
    ///
    /// The trailing line terminator is stripped, other whitespace is kept.
    pub fn line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        Ok(self
            .read_line()?
            .map(|l| l.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// Writer questions go to
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Give back the reader and writer
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
