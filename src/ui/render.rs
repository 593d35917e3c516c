use crate::session::{CaptureState, SessionSnapshot};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};

/// Text shown for a snapshot, one entry per line
pub fn render_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    let mut lines = vec!["plantcam".to_string(), String::new()];

    if let Some(error) = &snapshot.error {
        lines.push(format!("! {}", error.message));
        lines.push(String::new());
    }

    match snapshot.state {
        CaptureState::Idle | CaptureState::Errored => {
            lines.push("[o] Open camera".to_string());
        }
        CaptureState::Streaming => {
            match snapshot.stream_size {
                Some((width, height)) => {
                    lines.push(format!("Camera live ({}x{})", width, height))
                }
                None => lines.push("Camera live".to_string()),
            }
            lines.push("[space] Take photo".to_string());
        }
        CaptureState::Captured | CaptureState::Identifying | CaptureState::Identified => {
            if let Some(photo) = &snapshot.photo {
                lines.push(format!(
                    "Photo {}x{} taken {}",
                    photo.width(),
                    photo.height(),
                    photo.captured_at().format("%H:%M:%S")
                ));
            }

            if snapshot.identifying {
                lines.push("Identifying...".to_string());
            }

            if !snapshot.suggestions.is_empty() {
                lines.push(String::new());
                lines.push("Top matches:".to_string());
                for (rank, suggestion) in snapshot.suggestions.iter().enumerate() {
                    lines.push(format!("  {}. {}", rank + 1, suggestion));
                    if let Some(url) = &suggestion.reference_image {
                        lines.push(format!("     {}", url));
                    }
                }
            }
            if let Some(health) = &snapshot.health {
                lines.push(health.clone());
            }

            lines.push(String::new());
            let mut controls = vec!["[o] Retake", "[s] Share"];
            if snapshot.state == CaptureState::Captured && !snapshot.identifying {
                controls.push("[r] Identify again");
            }
            lines.push(controls.join("  "));
        }
    }

    lines.push("[q] Quit".to_string());
    lines
}

/// Redraws the whole session on a terminal in raw mode
pub struct SessionView<W: Write> {
    out: W,
}

impl SessionView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> SessionView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn render(&mut self, snapshot: &SessionSnapshot) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        // Raw mode needs explicit carriage returns
        for line in render_lines(snapshot) {
            write!(self.out, "{}\r\n", line)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
