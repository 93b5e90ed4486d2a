use crate::integrity::IntegrityIssue;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node '{0}' not found")]
    NodeNotFound(String),
    #[error("edge '{0}' not found")]
    EdgeNotFound(String),
    #[error("cannot merge node '{0}' into itself")]
    SelfMerge(String),
    #[error("group '{0}' is nested inside another group and cannot be a merge target")]
    NestedTarget(String),
    #[error("node '{0}' is not a group")]
    NotAGroup(String),
    #[error("merging '{node}' onto '{target}' would nest groups more than two levels deep")]
    TooDeep { node: String, target: String },
    #[error("invalid diagram name '{0}'")]
    InvalidName(String),
    #[error("placing '{child}' under '{parent}' would create a parent cycle")]
    ParentCycle { child: String, parent: String },
    #[error("diagram failed integrity checks: {}", summarize(.0))]
    Integrity(Vec<IntegrityIssue>),
    #[error("diagram '{0}' not found")]
    DiagramNotFound(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid diagram json: {0}")]
    Json(#[from] serde_json::Error),
}

fn summarize(issues: &[IntegrityIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
