use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
  #[default]
  All,
  Completed,
  Pending
}

impl FilterKind {
  pub const ALL: [FilterKind; 3] = [
    FilterKind::All,
    FilterKind::Pending,
    FilterKind::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | FilterKind::All => "all",
      | FilterKind::Completed => {
        "completed"
      }
      | FilterKind::Pending => "pending"
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | FilterKind::All => true,
      | FilterKind::Completed => {
        task.completed
      }
      | FilterKind::Pending => {
        !task.completed
      }
    }
  }

  pub fn empty_message(
    self
  ) -> &'static str {
    match self {
      | FilterKind::All => {
        "No tasks yet. Add one above!"
      }
      | FilterKind::Pending => {
        "No pending tasks!"
      }
      | FilterKind::Completed => {
        "No completed tasks yet!"
      }
    }
  }
}

impl fmt::Display for FilterKind {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FilterKind {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let needle =
      s.trim().to_ascii_lowercase();
    match needle.as_str() {
      | "done" => {
        return Ok(FilterKind::Completed);
      }
      | "todo" => {
        return Ok(FilterKind::Pending);
      }
      | "" => {
        return Err(anyhow!(
          "filter cannot be empty"
        ));
      }
      | _ => {}
    }

    let mut candidates = FilterKind::ALL
      .into_iter()
      .filter(|kind| {
        kind
          .as_str()
          .starts_with(needle.as_str())
      });
    let first =
      candidates.next().ok_or_else(
        || {
          anyhow!(
            "unknown filter: {s} \
             (expected all, \
             completed or pending)"
          )
        }
      )?;
    if candidates.next().is_some() {
      return Err(anyhow!(
        "ambiguous filter: {s}"
      ));
    }
    Ok(first)
  }
}

/// Order-preserving subset of `tasks`
/// selected by `kind`.
pub fn apply(
  tasks: &[Task],
  kind: FilterKind
) -> Vec<&Task> {
  let out: Vec<&Task> = tasks
    .iter()
    .filter(|task| kind.matches(task))
    .collect();
  trace!(
    filter = %kind,
    total = tasks.len(),
    matched = out.len(),
    "applied filter"
  );
  out
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct Counts {
  pub total:     usize,
  pub completed: usize,
  pub pending:   usize
}

impl Counts {
  pub fn of(tasks: &[Task]) -> Self {
    let total = tasks.len();
    let completed = tasks
      .iter()
      .filter(|task| task.completed)
      .count();
    Self {
      total,
      completed,
      pending: total - completed
    }
  }

  pub fn for_filter(
    &self,
    kind: FilterKind
  ) -> usize {
    match kind {
      | FilterKind::All => self.total,
      | FilterKind::Completed => {
        self.completed
      }
      | FilterKind::Pending => {
        self.pending
      }
    }
  }
}

/// Everything the shell needs to draw
/// one frame.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct TaskView {
  pub filter:  FilterKind,
  pub rows:    Vec<Task>,
  pub counts:  Counts,
  pub loading: bool
}

impl TaskView {
  pub fn project(
    tasks: &[Task],
    filter: FilterKind,
    loading: bool
  ) -> Self {
    let rows = apply(tasks, filter)
      .into_iter()
      .cloned()
      .collect();
    Self {
      filter,
      rows,
      counts: Counts::of(tasks),
      loading
    }
  }

  /// Shown in place of the list; never
  /// while a fetch is outstanding.
  pub fn empty_message(
    &self
  ) -> Option<&'static str> {
    if self.rows.is_empty()
      && !self.loading
    {
      Some(self.filter.empty_message())
    } else {
      None
    }
  }
}
