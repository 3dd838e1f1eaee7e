//! Serializable snapshots of interceptor state.

use serde::Serialize;
use std::fmt;

/// One redirected stylesheet element.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntrySnapshot {
  pub node_id: usize,
  pub tag_name: String,
  /// Element is currently a direct child of the application container.
  pub in_container: bool,
  /// Rule count of the live sheet, when the element has one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub live_rules: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cached_rules: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IsolationReport {
  pub app: String,
  pub installed: bool,
  /// Installed frames on the document's head entry points, all applications.
  pub stack_depth: usize,
  pub container: Option<usize>,
  pub entries: Vec<EntrySnapshot>,
}

impl IsolationReport {
  pub fn to_json(&self) -> serde_json::Value {
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }

  pub fn to_json_string(&self) -> String {
    serde_json::to_string_pretty(self).unwrap_or_default()
  }
}

impl fmt::Display for IsolationReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "{} ({}, depth {})",
      self.app,
      if self.installed { "installed" } else { "idle" },
      self.stack_depth
    )?;
    for entry in &self.entries {
      write!(f, "  #{} <{}>", entry.node_id, entry.tag_name)?;
      if !entry.in_container {
        f.write_str(" detached")?;
      }
      if let Some(live) = entry.live_rules {
        write!(f, " live={live}")?;
      }
      if let Some(cached) = entry.cached_rules {
        write!(f, " cached={cached}")?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_omits_missing_counts() {
    let report = IsolationReport {
      app: "shop".to_string(),
      installed: true,
      stack_depth: 1,
      container: Some(5),
      entries: vec![EntrySnapshot {
        node_id: 9,
        tag_name: "link".to_string(),
        in_container: true,
        live_rules: None,
        cached_rules: None,
      }],
    };
    let json = report.to_json();
    assert_eq!(json["entries"][0]["tag_name"], "link");
    assert!(json["entries"][0].get("live_rules").is_none());
    assert_eq!(report.to_string(), "shop (installed, depth 1)\n  #9 <link>\n");
  }
}
