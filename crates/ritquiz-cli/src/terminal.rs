//! Line-oriented terminal adapter for the `QuizUi` port.

use std::io::Write;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use ritquiz_core::model::{Item, Rit};
use ritquiz_core::session::Feedback;
use ritquiz_core::traits::QuizUi;

/// Reads answers line by line and writes prompts to `out`.
pub struct TerminalUi<R, W> {
    lines: Lines<R>,
    out: W,
}

/// A terminal UI over the process's stdin and stdout.
pub fn stdio() -> TerminalUi<BufReader<Stdin>, std::io::Stdout> {
    TerminalUi::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
}

impl<R, W> TerminalUi<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    /// Write a line of output.
    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// Show `label` and read one line. `None` when input is closed.
    pub async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.out
    }
}

fn choice_label(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

/// Map typed input to a choice: its letter, or its text.
fn resolve_choice(item: &Item, input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut chars = input.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let c = c.to_ascii_lowercase();
        if let Some(choice) = (0..item.choices.len())
            .find(|&i| choice_label(i) == c)
            .map(|i| item.choices[i].clone())
        {
            return Some(choice);
        }
    }

    item.choices
        .iter()
        .find(|choice| choice.trim().eq_ignore_ascii_case(input))
        .cloned()
}

#[async_trait]
impl<R, W> QuizUi for TerminalUi<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn present_progress(&mut self, administered: u32, max_items: u32) -> Result<()> {
        self.say(&format!("\n[{administered}/{max_items} answered]"))
    }

    async fn present_item(
        &mut self,
        item: &Item,
        number: u32,
        max_items: u32,
    ) -> Result<Option<String>> {
        self.say(&format!("Question {number} of {max_items} ({})", item.strand))?;
        self.say(&item.question)?;
        for (i, choice) in item.choices.iter().enumerate() {
            self.say(&format!("  {}) {choice}", choice_label(i)))?;
        }

        loop {
            let Some(line) = self.prompt("> ").await? else {
                return Ok(None);
            };
            match resolve_choice(item, &line) {
                Some(answer) => return Ok(Some(answer)),
                None => self.say(&format!(
                    "Enter a letter a-{} or the answer text.",
                    choice_label(item.choices.len().saturating_sub(1))
                ))?,
            }
        }
    }

    async fn present_feedback(&mut self, feedback: &Feedback) -> Result<()> {
        if feedback.is_correct {
            self.say("Correct!")?;
        } else {
            self.say(&format!(
                "Incorrect. The answer was: {}",
                feedback.correct_answer
            ))?;
        }
        self.say(&format!(
            "RIT {} -> {} ({} item)",
            feedback.ability_before, feedback.ability_after, feedback.class
        ))
    }

    async fn await_advance(&mut self) -> Result<()> {
        // A closed input is noticed when the next answer is read.
        self.prompt("Press Enter for the next question. ").await?;
        Ok(())
    }

    async fn present_final(&mut self, final_ability: Rit, trajectory: &[Rit]) -> Result<()> {
        self.say(&format!("\nFinal RIT: {final_ability}"))?;
        let path: Vec<String> = trajectory.iter().map(ToString::to_string).collect();
        self.say(&format!("Trajectory: {}", path.join(" -> ")))
    }
}
