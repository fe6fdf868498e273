//! Console surface: renders dialogue as plain text and reads numbered
//! choices from a line-based input.

use std::io::{self, BufRead, Write};

use super::{DisplaySurface, SurfaceInput};
use crate::schema::line::DialogueLine;

/// Text-mode [`DisplaySurface`] writing to any `io::Write`.
///
/// Lines print as `Speaker: body`; thought lines are wrapped in `*…*`.
/// Choices are numbered from 1.
pub struct ConsoleSurface<W: Write> {
    out: W,
    visible: bool,
    choice_count: usize,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            visible: false,
            choice_count: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Block on `input` until it yields a valid interaction.
    ///
    /// Returns `None` while hidden or at end of input. With choices shown a
    /// choice number is expected; otherwise an empty line continues.
    pub fn read_input<R: BufRead>(&mut self, input: &mut R) -> io::Result<Option<SurfaceInput>> {
        loop {
            if !self.visible {
                return Ok(None);
            }

            if self.choice_count > 0 {
                write!(self.out, "> ")?;
            } else {
                write!(self.out, "[enter] ")?;
            }
            self.out.flush()?;

            let mut buf = String::new();
            if input.read_line(&mut buf)? == 0 {
                return Ok(None);
            }

            match self.interpret(buf.trim()) {
                Some(parsed) => return Ok(Some(parsed)),
                None if self.choice_count > 0 => {
                    writeln!(self.out, "Pick a number from 1 to {}.", self.choice_count)?
                }
                None => writeln!(self.out, "Press enter to continue.")?,
            }
        }
    }

    fn interpret(&self, text: &str) -> Option<SurfaceInput> {
        if self.choice_count == 0 {
            return text.is_empty().then_some(SurfaceInput::Advance);
        }
        let number: usize = text.parse().ok()?;
        (1..=self.choice_count)
            .contains(&number)
            .then(|| SurfaceInput::Choose(number - 1))
    }

    fn write_line(&mut self, line: &DialogueLine) -> io::Result<()> {
        let body = if line.is_thought() && !line.body.is_empty() {
            format!("*{}*", line.body)
        } else {
            line.body.clone()
        };

        match &line.speaker {
            Some(speaker) => writeln!(self.out, "{}: {}", speaker, body)?,
            None if !body.is_empty() => writeln!(self.out, "{}", body)?,
            None => {}
        }
        for (i, choice) in line.choices.iter().enumerate() {
            writeln!(self.out, "  {}. {}", i + 1, choice.text)?;
        }
        Ok(())
    }
}

impl<W: Write> DisplaySurface for ConsoleSurface<W> {
    fn render_line(&mut self, line: &DialogueLine) {
        self.choice_count = line.choices.len();
        if let Err(err) = self.write_line(line) {
            tracing::warn!(error = %err, "failed to write dialogue line");
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.choice_count = 0;
        }
    }
}
