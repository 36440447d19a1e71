use std::collections::HashSet;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ItemId, ModuleId};

/// Class marker of an exercise block embedded as raw HTML in a page.
pub const EXERCISE_BLOCK_CLASS: &str = "exercise-section";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PageError {
    #[error("validation step id `{0}` appears more than once")]
    DuplicateValidationId(ItemId),

    #[error("validation step at position {0} has a blank id")]
    BlankValidationId(usize),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One checkbox of a validation section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheckbox {
    pub id: ItemId,
    #[serde(default)]
    pub label: String,
}

/// Structural view of one rendered course page.
///
/// This is everything the progress engine needs to know about a page: whether it is a
/// module page (and which module), its headings and exercise blocks in document order,
/// and the checkboxes of its validation section if it has one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutline {
    #[serde(default)]
    pub module_id: Option<ModuleId>,
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default)]
    pub exercises: usize,
    #[serde(default)]
    pub validation: Option<Vec<ValidationCheckbox>>,
}

impl PageOutline {
    /// Parses and validates a JSON page outline.
    ///
    /// # Errors
    ///
    /// Returns `PageError::Json` for malformed input, or a validation error from
    /// [`PageOutline::validate`].
    pub fn from_json(json: &str) -> Result<Self, PageError> {
        let outline: Self = serde_json::from_str(json)?;
        outline.validate()
    }

    /// Extracts an outline from a markdown page.
    ///
    /// Level 2 and 3 headings become sections, raw HTML blocks carrying the
    /// `exercise-section` class become exercises and task-list items become validation
    /// steps with ids `step_<index>`. The `[x]` state written in the markdown is ignored.
    #[must_use]
    pub fn from_markdown(module_id: Option<ModuleId>, markdown: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TASKLISTS);

        let mut sections = Vec::new();
        let mut exercises = 0;
        let mut steps: Vec<ValidationCheckbox> = Vec::new();

        let mut heading: Option<String> = None;
        // Open list items: accumulated text and whether a task marker was seen.
        let mut open_items: Vec<(String, bool)> = Vec::new();

        for event in Parser::new_ext(markdown, options) {
            match event {
                Event::Start(Tag::Heading { level, .. })
                    if matches!(level, HeadingLevel::H2 | HeadingLevel::H3) =>
                {
                    heading = Some(String::new());
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(text) = heading.take() {
                        sections.push(text.trim().to_owned());
                    }
                }
                Event::Start(Tag::Item) => open_items.push((String::new(), false)),
                Event::TaskListMarker(_) => {
                    if let Some((_, is_task)) = open_items.last_mut() {
                        *is_task = true;
                    }
                }
                Event::End(TagEnd::Item) => {
                    if let Some((text, true)) = open_items.pop() {
                        steps.push(ValidationCheckbox {
                            id: ItemId::new(format!("step_{}", steps.len())),
                            label: text.trim().to_owned(),
                        });
                    }
                }
                Event::Html(html) if html.contains(EXERCISE_BLOCK_CLASS) => {
                    exercises += html.matches(EXERCISE_BLOCK_CLASS).count();
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(buf) = heading.as_mut() {
                        buf.push_str(&text);
                    } else if let Some((buf, _)) = open_items.last_mut() {
                        buf.push_str(&text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some((buf, _)) = open_items.last_mut() {
                        buf.push(' ');
                    }
                }
                _ => {}
            }
        }

        Self {
            module_id,
            sections,
            exercises,
            validation: (!steps.is_empty()).then_some(steps),
        }
    }

    /// Checks that validation checkbox ids are present and unique.
    ///
    /// # Errors
    ///
    /// Returns `PageError::BlankValidationId` or `PageError::DuplicateValidationId`.
    pub fn validate(self) -> Result<Self, PageError> {
        if let Some(steps) = &self.validation {
            let mut seen = HashSet::new();
            for (idx, step) in steps.iter().enumerate() {
                if step.id.as_str().trim().is_empty() {
                    return Err(PageError::BlankValidationId(idx));
                }
                if !seen.insert(&step.id) {
                    return Err(PageError::DuplicateValidationId(step.id.clone()));
                }
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn is_module_page(&self) -> bool {
        self.module_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"# Docker basics

Intro text.

## Installing Docker

Some prose.

### Checking the `docker` CLI

<div class="exercise-section">
Build an image.
</div>

## Running containers

<div class="exercise-section">
Run it.
</div>

#### Too deep to count

- a plain bullet
- [ ] Image builds without errors
- [x] Container answers on port 8080
"#;

    #[test]
    fn markdown_headings_become_sections() {
        let outline = PageOutline::from_markdown(Some(ModuleId::new("docker")), PAGE);
        assert_eq!(
            outline.sections,
            vec![
                "Installing Docker".to_string(),
                "Checking the docker CLI".to_string(),
                "Running containers".to_string(),
            ]
        );
        assert_eq!(outline.module_id, Some(ModuleId::new("docker")));
    }

    #[test]
    fn markdown_exercise_blocks_are_counted() {
        let outline = PageOutline::from_markdown(None, PAGE);
        assert_eq!(outline.exercises, 2);
        assert!(!outline.is_module_page());
    }

    #[test]
    fn markdown_task_items_become_validation_steps() {
        let outline = PageOutline::from_markdown(None, PAGE);
        let steps = outline.validation.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, ItemId::new("step_0"));
        assert_eq!(steps[0].label, "Image builds without errors");
        assert_eq!(steps[1].id, ItemId::new("step_1"));
    }

    #[test]
    fn page_without_tasks_has_no_validation_section() {
        let outline = PageOutline::from_markdown(None, "## Only a heading\n");
        assert!(outline.validation.is_none());
        assert_eq!(outline.sections.len(), 1);
    }

    #[test]
    fn json_outline_round_trips_defaults() {
        let outline = PageOutline::from_json(r#"{"module_id":"m1","sections":["A","B"]}"#).unwrap();
        assert_eq!(outline.exercises, 0);
        assert!(outline.validation.is_none());
        assert!(outline.is_module_page());
    }

    #[test]
    fn duplicate_validation_ids_are_rejected() {
        let json = r#"{"validation":[{"id":"check1"},{"id":"check1","label":"again"}]}"#;
        let err = PageOutline::from_json(json).unwrap_err();
        assert!(matches!(err, PageError::DuplicateValidationId(id) if id.as_str() == "check1"));
    }

    #[test]
    fn blank_validation_ids_are_rejected() {
        let err = PageOutline::from_json(r#"{"validation":[{"id":" "}]}"#).unwrap_err();
        assert!(matches!(err, PageError::BlankValidationId(0)));
    }
}
