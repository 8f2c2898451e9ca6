// src/io/terminal.rs
//
// Text-mode front end on crossterm.
//
// Raw mode + alternate screen for the whole session; restored on drop.
// Space = action, Esc = abort, digits answer comprehension questions.
// Shapes are drawn as colored glyph blocks: the experiment only needs the
// identities to be distinguishable, not the exact geometry.

use std::io::{self, BufRead, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};

use crate::comprehension::{Question, Respondent};
use crate::error::{ExperimentError, Result};
use crate::io::{InputDevice, Presenter, Tone, VisualElement};
use crate::participant::{MetadataSource, ParticipantInfo};
use crate::stimulus::{ColorId, ShapeKind};
use crate::types::{Flow, Key};

const IDLE_POLL: Duration = Duration::from_millis(250);

pub struct TerminalRig {
    out: Stdout,
    started: Instant,
    pending: Vec<VisualElement>,
}

impl TerminalRig {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut out = io::stdout();
        out.execute(EnterAlternateScreen)?;
        out.execute(Hide)?;
        Ok(Self {
            out,
            started: Instant::now(),
            pending: Vec::new(),
        })
    }

    fn size() -> (u16, u16) {
        terminal::size().unwrap_or((80, 24))
    }

    /// Map normalized window coordinates to a terminal cell.
    fn cell(pos: (f64, f64), width: usize) -> (u16, u16) {
        let (cols, rows) = Self::size();
        let x = ((pos.0 + 1.0) / 2.0 * f64::from(cols)) as i64 - (width as i64) / 2;
        let y = ((1.0 - pos.1) / 2.0 * f64::from(rows.saturating_sub(1))) as i64;
        (
            x.clamp(0, i64::from(cols.saturating_sub(1))) as u16,
            y.clamp(0, i64::from(rows.saturating_sub(1))) as u16,
        )
    }

    fn print_block(&mut self, lines: &[String], pos: (f64, f64), color: Option<Color>) -> io::Result<()> {
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let (x, y0) = Self::cell(pos, width);
        let y0 = y0.saturating_sub((lines.len() / 2) as u16);
        if let Some(c) = color {
            queue!(self.out, SetForegroundColor(c))?;
        }
        for (i, line) in lines.iter().enumerate() {
            let pad = (width - line.chars().count()) / 2;
            queue!(self.out, MoveTo(x + pad as u16, y0 + i as u16), Print(line))?;
        }
        queue!(self.out, ResetColor)?;
        Ok(())
    }

    fn render(&mut self, el: &VisualElement) -> io::Result<()> {
        match el {
            VisualElement::FixationCross => self.print_block(&["+".to_string()], (0.0, 0.0), None),
            VisualElement::Stimulus {
                shape,
                color,
                acknowledged,
                ..
            } => {
                let g = glyph(*shape);
                let row: String = std::iter::repeat(g).take(5).collect();
                let mut lines = vec![row.clone(), row.clone(), row];
                if *acknowledged {
                    for l in &mut lines {
                        *l = format!("[{l}]");
                    }
                }
                self.print_block(&lines, (0.0, 0.0), Some(rgb(*color)))
            }
            VisualElement::Text { text, pos, tone, .. } => {
                let lines: Vec<String> = text.lines().map(str::to_string).collect();
                let color = match tone {
                    Tone::Plain => None,
                    Tone::Positive => Some(rgb(ColorId::Green)),
                    Tone::Negative => Some(rgb(ColorId::Red)),
                };
                self.print_block(&lines, *pos, color)
            }
            VisualElement::Button { index, label, pos } => {
                self.print_block(&[format!("[{}] {}", index + 1, label)], *pos, None)
            }
        }
    }

    /// Next key press, or None once `until` has passed.
    fn next_key(&mut self, until: Option<Instant>) -> io::Result<Option<KeyCode>> {
        loop {
            let wait = match until {
                Some(t) => {
                    let now = Instant::now();
                    if now >= t {
                        return Ok(None);
                    }
                    t - now
                }
                None => IDLE_POLL,
            };
            if event::poll(wait)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        return Ok(Some(key.code));
                    }
                }
            }
        }
    }
}

impl Drop for TerminalRig {
    fn drop(&mut self) {
        let _ = self.out.execute(Show);
        let _ = self.out.execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn glyph(shape: ShapeKind) -> char {
    match shape {
        ShapeKind::Star5 => '★',
        ShapeKind::Star4 => '✦',
        ShapeKind::Star3 => '▼',
        ShapeKind::Triangle => '▲',
        ShapeKind::Circle => '●',
        ShapeKind::Square => '■',
        ShapeKind::Rhombus => '◆',
        ShapeKind::SemiCircle => '◗',
    }
}

fn rgb(color: ColorId) -> Color {
    let (r, g, b) = color.rgb();
    let byte = |v: f64| ((v.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8;
    Color::Rgb {
        r: byte(r),
        g: byte(g),
        b: byte(b),
    }
}

fn key_for(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Char(' ') => Some(Key::Action),
        KeyCode::Esc => Some(Key::Abort),
        _ => None,
    }
}

impl Presenter for TerminalRig {
    fn draw(&mut self, element: &VisualElement) {
        self.pending.push(element.clone());
    }

    fn present(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        for el in std::mem::take(&mut self.pending) {
            self.render(&el)?;
        }
        self.out.flush()
    }
}

impl InputDevice for TerminalRig {
    fn wait_for_key(
        &mut self,
        allowed: &[Key],
        timeout: Option<Duration>,
    ) -> io::Result<Option<Key>> {
        let until = timeout.map(|t| Instant::now() + t);
        while let Some(code) = self.next_key(until)? {
            if let Some(key) = key_for(code).filter(|k| allowed.contains(k)) {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Respondent for TerminalRig {
    fn choose(&mut self, question: &Question) -> io::Result<Flow<usize>> {
        while let Some(code) = self.next_key(None)? {
            match code {
                KeyCode::Esc => return Ok(Flow::Abort),
                KeyCode::Char(c) => {
                    if let Some(d) = c.to_digit(10) {
                        let idx = d as usize;
                        if (1..=question.options.len()).contains(&idx) {
                            return Ok(Flow::Continue(idx - 1));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(Flow::Abort)
    }
}

/// Line-based metadata prompt, run before the terminal switches to raw
/// mode. Re-asks until number and age are numeric.
pub struct PromptMetadata<R, W> {
    input: R,
    output: W,
    color_blind: Option<bool>,
}

impl<R: BufRead, W: Write> PromptMetadata<R, W> {
    pub fn new(input: R, output: W, color_blind: Option<bool>) -> Self {
        Self {
            input,
            output,
            color_blind,
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ExperimentError::InvalidMetadata(
                "input closed before metadata was complete".into(),
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> MetadataSource for PromptMetadata<R, W> {
    fn collect(&mut self) -> Result<ParticipantInfo> {
        loop {
            let number = self.ask("Participant number")?;
            let gender = self.ask("Gender (man/woman/other/undisclosed)")?;
            let age = self.ask("Age")?;
            match ParticipantInfo::parse(&number, &gender, &age, self.color_blind) {
                Ok(info) => return Ok(info),
                Err(e) => writeln!(self.output, "{e}; please try again.")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Gender;

    #[test]
    fn prompt_retries_until_numeric() {
        let input = "12x\nwoman\n30\n12\nwoman\n30\n";
        let mut out = Vec::new();
        let info = PromptMetadata::new(input.as_bytes(), &mut out, Some(false))
            .collect()
            .unwrap();
        assert_eq!(info.number, 12);
        assert_eq!(info.gender, Gender::Woman);
        assert_eq!(info.color_blind, Some(false));
        assert!(String::from_utf8(out).unwrap().contains("try again"));
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut out = Vec::new();
        let r = PromptMetadata::new("7\n".as_bytes(), &mut out, None).collect();
        assert!(matches!(r, Err(ExperimentError::InvalidMetadata(_))));
    }

    #[test]
    fn key_mapping() {
        assert_eq!(key_for(KeyCode::Char(' ')), Some(Key::Action));
        assert_eq!(key_for(KeyCode::Esc), Some(Key::Abort));
        assert_eq!(key_for(KeyCode::Enter), None);
        assert_eq!(rgb(ColorId::Black), Color::Rgb { r: 0, g: 0, b: 0 });
    }
}
