use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::filter::FilterKind;
use crate::seeder::SeederConfig;

pub const DEFAULT_ENDPOINT: &str =
  "https://dummyjson.com/todos";
pub const DEFAULT_LIMIT: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 =
  10;

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "seed.endpoint".to_string(),
      DEFAULT_ENDPOINT.to_string()
    );
    map.insert(
      "seed.limit".to_string(),
      DEFAULT_LIMIT.to_string()
    );
    map.insert(
      "seed.timeout".to_string(),
      DEFAULT_TIMEOUT_SECS.to_string()
    );
    map.insert(
      "seed.on_start".to_string(),
      "on".to_string()
    );
    map.insert(
      "default.filter".to_string(),
      "all".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading checklistrc");
      cfg.load_file(&path, &mut vec![])?;
    } else {
      debug!(
        "no checklistrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for \
             {key}: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn seeder_config(
    &self
  ) -> anyhow::Result<SeederConfig> {
    let endpoint = self
      .get("seed.endpoint")
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .ok_or_else(|| {
        anyhow!(
          "seed.endpoint cannot be \
           empty"
        )
      })?;

    let limit = match self
      .get("seed.limit")
    {
      | Some(raw) => {
        raw
          .trim()
          .parse::<u32>()
          .with_context(|| {
            format!(
              "invalid seed.limit: \
               {raw}"
            )
          })?
      }
      | None => DEFAULT_LIMIT
    };

    let timeout_secs = match self
      .get("seed.timeout")
    {
      | Some(raw) => {
        raw
          .trim()
          .parse::<u64>()
          .with_context(|| {
            format!(
              "invalid seed.timeout: \
               {raw}"
            )
          })?
      }
      | None => DEFAULT_TIMEOUT_SECS
    };

    Ok(SeederConfig {
      endpoint,
      limit,
      timeout: Duration::from_secs(
        timeout_secs
      )
    })
  }

  pub fn seed_on_start(
    &self
  ) -> anyhow::Result<bool> {
    Ok(
      self
        .get_bool("seed.on_start")?
        .unwrap_or(true)
    )
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    Ok(
      self
        .get_bool("color")?
        .unwrap_or(true)
    )
  }

  pub fn default_filter(
    &self
  ) -> anyhow::Result<FilterKind> {
    match self.get("default.filter") {
      | Some(raw) => {
        raw.parse().with_context(|| {
          format!(
            "invalid default.filter: \
             {raw}"
          )
        })
      }
      | None => Ok(FilterKind::All)
    }
  }

  /// `open` holds the files currently
  /// being read, outermost first.
  #[tracing::instrument(skip(
    self, open
  ))]
  fn load_file(
    &mut self,
    path: &Path,
    open: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| {
          path.clone()
        });
    if open.contains(&canonical) {
      bail!(
        "include cycle at {}",
        path.display()
      );
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());
    open.push(canonical);

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line =
        strip_comment(raw_line).trim();

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );
        if include_path.exists() {
          self.load_file(
            &include_path,
            open
          )?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    open.pop();
    Ok(())
  }
}

/// `#` opens a comment only at the start
/// of a line or after whitespace, so URL
/// fragments survive.
fn strip_comment(line: &str) -> &str {
  let mut after_space = true;
  for (idx, ch) in line.char_indices() {
    if ch == '#' && after_space {
      return &line[..idx];
    }
    after_space = ch.is_whitespace();
  }
  line
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("CHECKLISTRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    return Ok(None);
  };
  let candidate =
    home.join(".checklistrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
