//! Operator-facing HTML for `GET /admin`.

use std::fmt::Write;

use crate::models::access::{AccessRecord, AccessStatus};

const STYLE: &str = r#"
      body { font-family: Arial, sans-serif; padding: 20px; background: #f8f9fa; }
      h2 { text-align: center; }
      table { width: 100%; border-collapse: collapse; margin-top: 20px; font-size: 16px; background: white; }
      th, td { border: 1px solid #ddd; padding: 12px 16px; text-align: left; }
      th { background-color: #343a40; color: white; }
      tr:nth-child(even) { background-color: #f2f2f2; }
      button { padding: 6px 12px; margin-right: 8px; font-weight: bold; border-radius: 4px; border: none; cursor: pointer; }
      button[value="approved"] { background-color: #28a745; color: white; }
      button[value="rejected"] { background-color: #dc3545; color: white; }
      button[disabled] { opacity: 0.5; cursor: not-allowed; }
"#;

/// Render the admin panel. Each row posts back to `/action` with the
/// identifier and the chosen decision; the button matching the current
/// status is disabled.
pub fn render(records: &[(String, AccessRecord)]) -> String {
    let mut rows = String::new();
    for (identifier, record) in records {
        let id = escape_html(identifier);
        let _ = write!(
            rows,
            r#"
        <tr>
          <td>{id}</td>
          <td>{status}</td>
          <td>{requested_at}</td>
          <td>
            <form method="POST" action="/action">
              <input type="hidden" name="email" value="{id}">
              <button name="decision" value="approved"{approve_disabled}>Approve</button>
              <button name="decision" value="rejected"{reject_disabled}>Reject</button>
            </form>
          </td>
        </tr>"#,
            id = id,
            status = escape_html(record.status.as_str()),
            requested_at = record.requested_at.to_rfc3339(),
            approve_disabled = disabled_if(&record.status, &AccessStatus::Approved),
            reject_disabled = disabled_if(&record.status, &AccessStatus::Rejected),
        );
    }

    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="4">No requests found</td></tr>"#);
    }

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Access Control Admin Panel</title>
    <style>{STYLE}</style>
  </head>
  <body>
    <h2>Admin Panel – Script Access</h2>
    <table>
      <thead>
        <tr><th>Email</th><th>Status</th><th>Requested At</th><th>Actions</th></tr>
      </thead>
      <tbody>{rows}
      </tbody>
    </table>
  </body>
</html>
"#
    )
}

fn disabled_if(current: &AccessStatus, button: &AccessStatus) -> &'static str {
    if current == button {
        " disabled"
    } else {
        ""
    }
}

/// Identifiers are self-reported, so everything user-supplied is escaped.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
