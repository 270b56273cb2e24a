use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::{FilterKind, TaskView};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.color()? && io::stdout().is_terminal();
        Ok(Self { color })
    }

    /// Renderer that never emits ANSI escapes.
    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, view), fields(filter = %view.filter, rows = view.rows.len()))]
    pub fn render_view<W: Write>(&self, mut out: W, view: &TaskView) -> anyhow::Result<()> {
        writeln!(
            out,
            "Total {}  {} {}  {} {}",
            view.counts.total,
            self.paint("Completed", "32"),
            view.counts.completed,
            self.paint("Pending", "33"),
            view.counts.pending,
        )?;

        let bar = FilterKind::ALL
            .iter()
            .map(|kind| {
                let label = format!("{} ({})", kind, view.counts.for_filter(*kind));
                if *kind == view.filter {
                    format!("[{}]", self.paint(&label, "1"))
                } else {
                    label
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{bar}")?;
        writeln!(out)?;

        if view.loading {
            writeln!(out, "Loading todos...")?;
        }

        if let Some(message) = view.empty_message() {
            writeln!(out, "{message}")?;
            return Ok(());
        }
        if view.rows.is_empty() {
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Task".to_string(),
            "Owner".to_string(),
        ];

        let rows = view
            .rows
            .iter()
            .map(|task| {
                let id = self.paint(&task.id.to_string(), "33");
                let (done, text) = if task.completed {
                    ("[x]".to_string(), self.paint(&task.text, "32"))
                } else {
                    ("[ ]".to_string(), task.text.clone())
                };
                let owner = task
                    .owner
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                vec![id, done, text, owner]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = column_count.saturating_sub(1);
    write_row(&mut writer, &headers, &widths, last)?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    write_row(&mut writer, &rule, &widths, last)?;

    for row in &rows {
        write_row(&mut writer, row, &widths, last)?;
    }

    Ok(())
}

fn write_row<W: Write>(
    writer: &mut W,
    cells: &[String],
    widths: &[usize],
    last: usize,
) -> anyhow::Result<()> {
    let mut line = String::new();
    for (idx, cell) in cells.iter().enumerate() {
        line.push_str(cell);
        if idx < last {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            line.push_str(&" ".repeat(widths[idx].saturating_sub(visible_width) + 1));
        }
    }
    writeln!(writer, "{}", line.trim_end())?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
