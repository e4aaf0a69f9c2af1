use crate::attachment::build_record;
use hearback_core::{AttachmentRecord, ChannelPayload};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Text submitted by the `/resolved` shortcut.
pub const RESOLVED_TEXT: &str = "Issue resolved";

/// What the first line of input asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Dismiss without writing a result.
    Cancel,
    /// Submit [`RESOLVED_TEXT`] immediately.
    Resolved,
}

/// Recognise a shortcut command.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "/cancel" => Some(Command::Cancel),
        "/resolved" => Some(Command::Resolved),
        _ => None,
    }
}

/// Turn `1, 3 3` into zero-based indices of valid options, in order and
/// without repeats.
pub fn parse_selection(line: &str, option_count: usize) -> Vec<usize> {
    let mut picked = Vec::new();
    for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
        let Ok(n) = token.parse::<usize>() else {
            continue;
        };
        if n == 0 || n > option_count {
            continue;
        }
        if !picked.contains(&(n - 1)) {
            picked.push(n - 1);
        }
    }
    picked
}

/// Combine the chosen options and the free text into one feedback string.
pub fn compose_feedback(selected: &[&str], text: &str) -> String {
    let mut parts = Vec::new();
    if !selected.is_empty() {
        parts.push(format!("Selected options: {}", selected.join("; ")));
    }
    let text = text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
    parts.join("\n\n")
}

/// Header shown before any input is requested.
pub fn format_banner(prompt: &str, options: &[String]) -> String {
    let mut banner = String::new();
    banner.push_str("\n\x1b[1;37m╔══ FEEDBACK REQUESTED ══╗\x1b[0m\n");
    for line in prompt.lines() {
        banner.push_str(&format!("  {line}\n"));
    }
    if !options.is_empty() {
        banner.push('\n');
        for (i, option) in options.iter().enumerate() {
            banner.push_str(&format!("  \x1b[36m[{}]\x1b[0m {option}\n", i + 1));
        }
    }
    banner.push_str("\x1b[1;37m╚════════════════════════╝\x1b[0m\n");
    banner.push_str("  (/resolved to answer \"Issue resolved\", /cancel to dismiss)\n");
    banner
}

/// Interactive prompt over any line-oriented input and output.
pub struct FeedbackPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> FeedbackPrompt<R, W> {
    /// Prompt reading from `input` and echoing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Run the prompt. `Ok(None)` means the human dismissed it.
    pub fn run(&mut self, prompt: &str, options: &[String]) -> io::Result<Option<ChannelPayload>> {
        write!(self.output, "{}", format_banner(prompt, options))?;

        if options.is_empty() {
            writeln!(self.output, "\nFeedback (end with a line containing only '.'):")?;
            self.output.flush()?;
        } else {
            write!(self.output, "\nSelect options (e.g. 1,3) or press Enter to skip: ")?;
            self.output.flush()?;
        }

        let Some(first) = self.read_line()? else {
            return Ok(None);
        };
        match parse_command(&first) {
            Some(Command::Cancel) => return Ok(None),
            Some(Command::Resolved) => return Ok(Some(ChannelPayload::text(RESOLVED_TEXT))),
            None => {}
        }

        let (selected, first_text_line): (Vec<&str>, _) = if options.is_empty() {
            (Vec::new(), Some(first))
        } else {
            let selected = parse_selection(&first, options.len())
                .into_iter()
                .map(|i| options[i].as_str())
                .collect();
            writeln!(self.output, "Feedback (end with a line containing only '.'):")?;
            self.output.flush()?;
            (selected, None)
        };

        let text = self.read_text(first_text_line)?;
        let attachments = self.read_attachments()?;

        Ok(Some(ChannelPayload {
            interactive_feedback: compose_feedback(&selected, &text),
            attachments,
        }))
    }

    fn read_text(&mut self, first: Option<String>) -> io::Result<String> {
        let mut lines = Vec::new();
        let mut next = first;
        loop {
            let line = match next.take() {
                Some(line) => line,
                None => match self.read_line()? {
                    Some(line) => line,
                    None => break,
                },
            };
            if line.trim() == "." {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    fn read_attachments(&mut self) -> io::Result<Vec<AttachmentRecord>> {
        let mut records = Vec::new();
        writeln!(self.output, "Attach files (one path per line, empty line to finish):")?;
        self.output.flush()?;
        while let Some(line) = self.read_line()? {
            let path = line.trim();
            if path.is_empty() {
                break;
            }
            match build_record(Path::new(path)) {
                Ok(record) => {
                    writeln!(
                        self.output,
                        "  + {} ({} bytes{})",
                        record.name,
                        record.size_bytes,
                        if record.inline_data.is_some() { ", preview" } else { "" }
                    )?;
                    records.push(record);
                }
                Err(e) => writeln!(self.output, "  ! skipped {path}: {e}")?,
            }
            self.output.flush()?;
        }
        Ok(records)
    }

    /// One line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
