use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trace::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    /// The return cannot be filed as computed. Computation still completes.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One finding about a computed return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationItem {
    pub severity: Severity,
    /// Stable dotted code, e.g. `ira.over-limit`.
    pub code: String,
    pub message: String,
    /// The traced value the finding is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl ValidationItem {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            node_id: None,
        }
    }

    pub fn info(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn at(
        mut self,
        node_id: &NodeId,
    ) -> Self {
        self.node_id = Some(node_id.clone());
        self
    }
}

impl fmt::Display for ValidationItem {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " ({node_id})")?;
        }
        Ok(())
    }
}
