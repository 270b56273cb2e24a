use std::io::{self, Write};

use anyhow::{Context, anyhow};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::filter::{FilterKind, TaskView};
use crate::render::Renderer;
use crate::seeder::{RemoteSeeder, SeedOutcome};
use crate::store::TaskStore;

pub const HELP: &str = "\
commands:
  add <text>          add a pending task
  toggle <id>         mark a task complete / incomplete
  delete <id>         remove a task
  filter <kind>       show all, completed or pending tasks
  reload              replace the list with a fresh copy from the API
  list                redraw the current list
  help                show this help
  quit                leave
commands may be abbreviated to any unique prefix";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(String),
    Toggle(u64),
    Delete(u64),
    Filter(FilterKind),
    Reload,
    Show,
    Help,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "toggle", "delete", "filter", "reload", "list", "help", "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

impl Intent {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let trimmed = line.trim_start();
        if trimmed.trim().is_empty() {
            return Ok(None);
        }

        let (word, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let word = word.to_ascii_lowercase();
        let command = match word.as_str() {
            "ls" => "list",
            "rm" => "delete",
            "exit" => "quit",
            other => expand_command_abbrev(other, &known_command_names())
                .ok_or_else(|| anyhow!("unknown command: {other}"))?,
        };

        let intent = match command {
            "add" => Intent::Add(rest.trim_start().trim_end_matches('\r').to_string()),
            "toggle" => Intent::Toggle(parse_id(command, rest)?),
            "delete" => Intent::Delete(parse_id(command, rest)?),
            "filter" => Intent::Filter(rest.parse()?),
            "reload" => Intent::Reload,
            "list" => Intent::Show,
            "help" => Intent::Help,
            "quit" => Intent::Quit,
            other => return Err(anyhow!("unknown command: {other}")),
        };

        debug!(?intent, "parsed intent");
        Ok(Some(intent))
    }
}

fn parse_id(command: &str, rest: &str) -> anyhow::Result<u64> {
    let raw = rest.trim();
    if raw.is_empty() {
        return Err(anyhow!("{command} requires a task id"));
    }
    raw.parse::<u64>()
        .with_context(|| format!("invalid task id: {raw}"))
}

/// What the caller should do after an intent has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Render(TaskView),
    /// Start a fetch; the view already shows the loading indicator.
    StartReload(TaskView),
    Help,
    Quit,
}

/// UI state: the task collection, the active filter and outstanding fetches.
#[derive(Debug, Clone)]
pub struct Shell {
    store: TaskStore,
    filter: FilterKind,
    in_flight: usize,
}

impl Shell {
    pub fn new(store: TaskStore, filter: FilterKind) -> Self {
        Self {
            store,
            filter,
            in_flight: 0,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn view(&self) -> TaskView {
        TaskView::project(self.store.tasks(), self.filter, self.is_loading())
    }

    #[instrument(skip(self))]
    pub fn apply(&mut self, intent: Intent) -> Effect {
        match intent {
            Intent::Add(text) => {
                self.store.add(&text);
            }
            Intent::Toggle(id) => {
                self.store.toggle(id);
            }
            Intent::Delete(id) => {
                self.store.delete(id);
            }
            Intent::Filter(kind) => {
                self.filter = kind;
            }
            Intent::Reload => {
                self.in_flight += 1;
                info!(in_flight = self.in_flight, "reload requested");
                return Effect::StartReload(self.view());
            }
            Intent::Show => {}
            Intent::Help => return Effect::Help,
            Intent::Quit => return Effect::Quit,
        }
        Effect::Render(self.view())
    }

    /// Installs a completed fetch. Whatever resolves last wins.
    #[instrument(skip(self, outcome), fields(fallback = outcome.is_fallback()))]
    pub fn finish_reload(&mut self, outcome: SeedOutcome) -> TaskView {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.store.replace_all(outcome.into_tasks());
        self.view()
    }
}

fn draw<W: Write>(out: &mut W, renderer: &Renderer, view: &TaskView) -> anyhow::Result<()> {
    writeln!(out)?;
    renderer.render_view(&mut *out, view)?;
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn spawn_reload(seeder: &RemoteSeeder, tx: &mpsc::UnboundedSender<SeedOutcome>) {
    let seeder = seeder.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = seeder.load().await;
        if tx.send(outcome).is_err() {
            debug!("shell closed before reload finished");
        }
    });
}

/// Line-driven loop over stdin and stdout.
pub async fn run_interactive(
    shell: Shell,
    seeder: RemoteSeeder,
    renderer: &Renderer,
    seed_on_start: bool,
) -> anyhow::Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    run_session(shell, seeder, renderer, input, io::stdout(), seed_on_start).await?;
    Ok(())
}

/// Reads commands from `input` and draws to `out` until `quit`. Fetches run
/// in the background so other commands stay available while one is
/// outstanding. At end of input, outstanding fetches are still installed
/// before the final shell state is returned.
#[instrument(skip(shell, seeder, renderer, input, out))]
pub async fn run_session<R, W>(
    mut shell: Shell,
    seeder: RemoteSeeder,
    renderer: &Renderer,
    input: R,
    mut out: W,
    seed_on_start: bool,
) -> anyhow::Result<Shell>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<SeedOutcome>();
    let mut lines = input.lines();
    let mut input_open = true;

    let first = if seed_on_start {
        shell.apply(Intent::Reload)
    } else {
        Effect::Render(shell.view())
    };
    if let Effect::StartReload(_) = first {
        spawn_reload(&seeder, &tx);
    }
    if let Effect::Render(view) | Effect::StartReload(view) = &first {
        draw(&mut out, renderer, view)?;
    }

    while input_open || shell.is_loading() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line.context("failed reading input")? else {
                    info!(loading = shell.is_loading(), "input closed");
                    input_open = false;
                    continue;
                };

                let intent = match Intent::parse(&line) {
                    Ok(Some(intent)) => intent,
                    Ok(None) => {
                        draw(&mut out, renderer, &shell.view())?;
                        continue;
                    }
                    Err(err) => {
                        writeln!(out, "{err:#}; type `help` for commands")?;
                        draw(&mut out, renderer, &shell.view())?;
                        continue;
                    }
                };

                match shell.apply(intent) {
                    Effect::Render(view) => draw(&mut out, renderer, &view)?,
                    Effect::StartReload(view) => {
                        spawn_reload(&seeder, &tx);
                        draw(&mut out, renderer, &view)?;
                    }
                    Effect::Help => {
                        writeln!(out, "{HELP}")?;
                        draw(&mut out, renderer, &shell.view())?;
                    }
                    Effect::Quit => break,
                }
            }
            Some(outcome) = rx.recv() => {
                let view = shell.finish_reload(outcome);
                draw(&mut out, renderer, &view)?;
            }
        }
    }

    Ok(shell)
}
