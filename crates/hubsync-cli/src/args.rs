//! Command line arguments and the panels they describe.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use hubsync_engine::{FilterExpression, IssueState, Qualifier, RepoId, SortField, SortKey};

#[derive(Parser, Debug)]
#[command(name = "hubsync")]
#[command(about = "Keeps GitHub issue views in sync from the terminal")]
pub struct Args {
    /// Primary repository; panels without a repository follow it
    #[arg(value_name = "OWNER/NAME")]
    pub repo: String,

    /// Extra repository panel (repeatable)
    #[arg(long = "with", value_name = "OWNER/NAME")]
    pub with: Vec<RepoId>,

    /// Only issues carrying this label (repeatable, all must match)
    #[arg(short, long)]
    pub label: Vec<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub milestone: Option<String>,

    /// Text searched in titles and bodies
    #[arg(short, long)]
    pub keyword: Option<String>,

    #[arg(long, value_enum)]
    pub state: Option<StateArg>,

    /// Order by activity from others, optionally only within the last HOURS
    #[arg(long, value_name = "HOURS", num_args = 0..=1)]
    pub updated: Option<Option<u32>>,

    /// Sort key as FIELD or FIELD:desc (repeatable, first wins)
    #[arg(long, value_name = "FIELD[:ORDER]", value_parser = parse_sort_key)]
    pub sort: Vec<SortKey>,

    /// GitHub login to verify the configured token against
    #[arg(short, long)]
    pub user: Option<String>,

    /// Seconds between refreshes (overrides the config file)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Publish once and exit
    #[arg(long)]
    pub once: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Open,
    Closed,
}

impl From<StateArg> for IssueState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Open => IssueState::Open,
            StateArg::Closed => IssueState::Closed,
        }
    }
}

/// One titled filter view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub title: String,
    pub expression: FilterExpression,
}

impl Args {
    /// The primary panel first, then one panel per `--with` repository.
    pub fn panels(&self) -> Vec<Panel> {
        let mut panels = vec![Panel {
            title: self.repo.trim().to_string(),
            expression: conjunction(self.filter_qualifiers()),
        }];
        for repo_id in &self.with {
            let mut qualifiers = vec![Qualifier::Repo(repo_id.clone())];
            qualifiers.extend(self.filter_qualifiers());
            panels.push(Panel {
                title: repo_id.to_string(),
                expression: conjunction(qualifiers),
            });
        }
        panels
    }

    fn filter_qualifiers(&self) -> Vec<Qualifier> {
        let mut qualifiers: Vec<Qualifier> =
            self.label.iter().cloned().map(Qualifier::Label).collect();
        qualifiers.extend(self.assignee.clone().map(Qualifier::Assignee));
        qualifiers.extend(self.author.clone().map(Qualifier::Author));
        qualifiers.extend(self.milestone.clone().map(Qualifier::Milestone));
        qualifiers.extend(self.keyword.clone().map(Qualifier::Keyword));
        qualifiers.extend(self.state.map(|s| Qualifier::State(s.into())));
        qualifiers.extend(self.updated.map(Qualifier::Updated));
        if !self.sort.is_empty() {
            qualifiers.push(Qualifier::Sort(self.sort.clone()));
        }
        qualifiers
    }
}

fn conjunction(qualifiers: Vec<Qualifier>) -> FilterExpression {
    qualifiers
        .into_iter()
        .fold(FilterExpression::Empty, |expr, qualifier| match expr {
            FilterExpression::Empty => qualifier.into(),
            expr => expr.and(qualifier),
        })
}

pub fn parse_sort_key(raw: &str) -> Result<SortKey, String> {
    let (name, descending) = match raw.trim().split_once(':') {
        Some((name, "desc")) => (name, true),
        Some((name, "asc")) => (name, false),
        Some((_, order)) => {
            return Err(format!("unknown sort order '{}', expected asc or desc", order))
        }
        None => (raw.trim(), false),
    };
    let field = match name.to_lowercase().as_str() {
        "id" => SortField::Id,
        "title" => SortField::Title,
        "created" => SortField::Created,
        "updated" => SortField::Updated,
        "assignee" => SortField::Assignee,
        "milestone" => SortField::Milestone,
        "state" => SortField::State,
        "comments" => SortField::Comments,
        other => return Err(format!("unknown sort field '{}'", other)),
    };
    Ok(SortKey { field, descending })
}
