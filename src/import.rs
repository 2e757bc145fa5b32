//! Batch Import Parser
//!
//! Turns markdown-like checklist text into named groups of items:
//!
//! ```text
//! Work Tasks
//! - [ ] Review pull requests
//! - [x] Fix bug in login
//! ```
//!
//! Item lines look like `- [ ] text` or `- [x] text`; every other
//! non-blank line starts a new group.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name of the group that collects items appearing before any header
pub const DEFAULT_GROUP_NAME: &str = "Items";

/// Instructions for turning freeform notes into the import format
pub const LLM_PROMPT: &str = "Please format this as a todo list in the following format:

- Group names should be on their own lines (without any prefix)
- Todo items should start with \"- [ ]\" for unchecked items or \"- [x]\" for checked items
- IMPORTANT: Every todo item MUST belong to a group. Do not create items without a group.

Example format:

Work Tasks
- [ ] Review pull requests
- [ ] Update documentation
- [x] Fix bug in login

Personal
- [ ] Buy groceries
- [ ] Call dentist

Please convert the following into this format:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedGroup {
    pub name: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub text: String,
    pub done: bool,
}

/// Group and item counts of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub groups: usize,
    pub items: usize,
}

impl ImportSummary {
    pub fn of(groups: &[ParsedGroup]) -> Self {
        Self {
            groups: groups.len(),
            items: groups.iter().map(|g| g.items.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups == 0
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} group{}, {} item{}",
            self.groups,
            if self.groups == 1 { "" } else { "s" },
            self.items,
            if self.items == 1 { "" } else { "s" },
        )
    }
}

static TODO_LINE: OnceLock<Regex> = OnceLock::new();

fn todo_line() -> &'static Regex {
    TODO_LINE.get_or_init(|| {
        Regex::new(r"(?i)^(?:-\s*)?\[([ x])\]\s*(.+)$").expect("todo line pattern is valid")
    })
}

/// Parse import text into groups. Never fails; groups without items are dropped.
pub fn parse_markdown_todos(text: &str) -> Vec<ParsedGroup> {
    let mut groups: Vec<ParsedGroup> = Vec::new();
    // Index into `groups` of the group receiving items
    let mut current: Option<usize> = None;

    for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        match todo_line().captures(line) {
            Some(caps) => {
                let done = caps[1].eq_ignore_ascii_case("x");
                let text = caps[2].trim().to_string();

                let index = *current.get_or_insert_with(|| {
                    groups.push(ParsedGroup {
                        name: DEFAULT_GROUP_NAME.to_string(),
                        items: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[index].items.push(ParsedItem { text, done });
            }
            None => {
                groups.push(ParsedGroup {
                    name: line.to_string(),
                    items: Vec::new(),
                });
                current = Some(groups.len() - 1);
            }
        }
    }

    groups.retain(|g| !g.items.is_empty());
    groups
}
