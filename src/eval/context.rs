use serde::Deserialize;

use crate::eval::HookError;

/// The tool the host runtime is about to run (or just ran).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Write,
    Edit,
    MultiEdit,
    Bash,
    Other(String),
}

impl Tool {
    fn from_name(name: &str) -> Self {
        match name {
            "Write" => Tool::Write,
            "Edit" => Tool::Edit,
            "MultiEdit" => Tool::MultiEdit,
            "Bash" => Tool::Bash,
            other => Tool::Other(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct HookInput {
    tool_name: Option<String>,
    tool: Option<String>,
    #[serde(default)]
    tool_input: ToolInput,
}

#[derive(Deserialize, Default)]
struct ToolInput {
    file_path: Option<String>,
    content: Option<String>,
    new_string: Option<String>,
    #[serde(default)]
    edits: Vec<EditInput>,
    command: Option<String>,
}

#[derive(Deserialize)]
struct EditInput {
    new_string: Option<String>,
}

/// One pending tool invocation, as described by the host payload.
#[derive(Debug, Clone)]
pub struct ToolEvent {
    pub tool: Tool,
    /// Target file, empty when absent.
    pub file_path: String,
    /// Full file body for `Write`.
    pub content: Option<String>,
    /// Replacement text for `Edit`.
    pub new_string: Option<String>,
    /// Replacement texts of each `MultiEdit` edit, in order.
    pub edits: Vec<String>,
    /// Shell command for `Bash`, empty when absent.
    pub command: String,
}

impl ToolEvent {
    /// Parse the JSON payload from stdin.
    ///
    /// `tool_name` takes precedence over the legacy `tool` field.
    pub fn parse(raw: &str) -> Result<Self, HookError> {
        let input: HookInput = serde_json::from_str(raw)?;
        let name = input
            .tool_name
            .filter(|n| !n.is_empty())
            .or(input.tool)
            .unwrap_or_default();
        let t = input.tool_input;
        Ok(Self {
            tool: Tool::from_name(&name),
            file_path: t.file_path.unwrap_or_default(),
            content: t.content,
            new_string: t.new_string,
            edits: t.edits.into_iter().filter_map(|e| e.new_string).collect(),
            command: t.command.unwrap_or_default(),
        })
    }

    /// Text being introduced into the file by this operation:
    /// the body for `Write`, the replacement for `Edit`, and the
    /// replacement followed by every edit's replacement for `MultiEdit`.
    /// `None` for tools that do not write files.
    pub fn proposed_text(&self) -> Option<String> {
        match self.tool {
            Tool::Write => Some(self.content.clone().unwrap_or_default()),
            Tool::Edit => Some(self.new_string.clone().unwrap_or_default()),
            Tool::MultiEdit => {
                let mut text = self.new_string.clone().unwrap_or_default();
                for edit in &self.edits {
                    text.push_str(edit);
                }
                Some(text)
            }
            Tool::Bash | Tool::Other(_) => None,
        }
    }

    /// Basename of the target file.
    pub fn file_name(&self) -> &str {
        file_name(&self.file_path)
    }
}

/// Basename of a slash-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_write() {
        let ev = ToolEvent::parse(
            r#"{"tool_name":"Write","tool_input":{"file_path":"/p/api/a.ts","content":"x"}}"#,
        )
        .unwrap();
        assert_eq!(ev.tool, Tool::Write);
        assert_eq!(ev.file_name(), "a.ts");
        assert_eq!(ev.proposed_text().as_deref(), Some("x"));
    }

    #[test]
    fn legacy_tool_field() {
        let ev = ToolEvent::parse(r#"{"tool":"Bash","tool_input":{"command":"ls"}}"#).unwrap();
        assert_eq!(ev.tool, Tool::Bash);
        assert_eq!(ev.command, "ls");
        assert_eq!(ev.proposed_text(), None);
    }

    #[test]
    fn tool_name_wins_over_tool() {
        let ev = ToolEvent::parse(r#"{"tool":"Write","tool_name":"Edit","tool_input":{}}"#)
            .unwrap();
        assert_eq!(ev.tool, Tool::Edit);
    }

    #[test]
    fn multi_edit_concatenates() {
        let ev = ToolEvent::parse(
            r#"{"tool_name":"MultiEdit","tool_input":{"file_path":"a.ts","new_string":"a","edits":[{"new_string":"b"},{"old_string":"z"},{"new_string":"c"}]}}"#,
        )
        .unwrap();
        assert_eq!(ev.proposed_text().as_deref(), Some("abc"));
    }

    #[test]
    fn missing_tool_input_is_empty() {
        let ev = ToolEvent::parse(r#"{"tool_name":"Write"}"#).unwrap();
        assert!(ev.file_path.is_empty());
    }

    #[test]
    fn malformed_is_error() {
        assert!(ToolEvent::parse("").is_err());
        assert!(ToolEvent::parse("{not json").is_err());
        assert!(ToolEvent::parse("[]").is_err());
    }

    #[test]
    fn unknown_tool() {
        let ev = ToolEvent::parse(r#"{"tool_name":"Read","tool_input":{}}"#).unwrap();
        assert_eq!(ev.tool, Tool::Other("Read".into()));
    }
}
