//! Scripted story: a small in-memory branching script engine loaded from RON.
//!
//! Scripts are maps from knot path to a list of steps. Text is produced only
//! by `Line` steps; calls, branches and diverts run silently while the story
//! continues, the way `~` statements do in ink.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::{ExternalFunction, ScriptMessage, Severity, StoryEngine, StoryError};
use crate::schema::line::{Choice, DialoguePath};
use crate::schema::value::Value;

/// Upper bound on steps executed by a single engine call. Guards against
/// divert cycles that never reach a line.
const STEP_BUDGET: usize = 10_000;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One step in a knot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Raw dialogue text, e.g. `"Barkeep: Welcome!"`.
    Line {
        text: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    /// Call a bound external function and discard its result.
    Call {
        function: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Call a function and divert if it returns an integer `>= at_least`.
    Branch {
        function: String,
        #[serde(default)]
        args: Vec<Value>,
        at_least: i64,
        divert: String,
    },
    Divert(String),
    /// Present choices. Always the last reachable step of a knot.
    Choices(Vec<ScriptChoice>),
    /// Authoring note, reported with `Severity::Author`.
    Todo(String),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptChoice {
    pub text: String,
    pub divert: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub knots: HashMap<String, Vec<Step>>,
}

/// A problem found by [`Script::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptIssue {
    pub severity: Severity,
    pub knot: String,
    pub message: String,
}

impl fmt::Display for ScriptIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.severity, self.knot, self.message)
    }
}

impl Script {
    pub fn load_from_ron(path: &Path) -> Result<Script, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Script, ScriptError> {
        Ok(ron::from_str(input)?)
    }

    /// Merge another script into this one. Knots in `other` replace knots of
    /// the same name.
    pub fn merge(&mut self, other: Script) {
        self.knots.extend(other.knots);
    }

    /// Check divert targets and flag unreachable or suspicious steps.
    ///
    /// Issues are returned in knot-name order.
    pub fn validate(&self) -> Vec<ScriptIssue> {
        let mut issues = Vec::new();
        let mut names: Vec<&String> = self.knots.keys().collect();
        names.sort();

        for name in names {
            let steps = &self.knots[name];
            let mut issue = |severity, message: String| {
                issues.push(ScriptIssue {
                    severity,
                    knot: name.clone(),
                    message,
                });
            };

            if steps.is_empty() {
                issue(Severity::Warning, "knot has no steps".to_string());
                continue;
            }

            let mut terminated_at = None;
            for (i, step) in steps.iter().enumerate() {
                if let Some(end) = terminated_at {
                    issue(
                        Severity::Warning,
                        format!("step {} is unreachable after step {}", i, end),
                    );
                    break;
                }

                let targets: Vec<&str> = match step {
                    Step::Divert(target) => vec![target.as_str()],
                    Step::Branch { divert, .. } => vec![divert.as_str()],
                    Step::Choices(choices) => {
                        if choices.is_empty() {
                            issue(
                                Severity::Warning,
                                format!("step {} presents no choices and ends the story", i),
                            );
                        }
                        choices.iter().map(|c| c.divert.as_str()).collect()
                    }
                    Step::Todo(comment) => {
                        issue(Severity::Author, format!("TODO: {}", comment));
                        Vec::new()
                    }
                    _ => Vec::new(),
                };

                for target in targets {
                    if !self.knots.contains_key(target) {
                        issue(
                            Severity::Error,
                            format!("step {} diverts to unknown knot '{}'", i, target),
                        );
                    }
                }

                if matches!(step, Step::Divert(_) | Step::Choices(_) | Step::End) {
                    terminated_at = Some(i);
                }
            }
        }

        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    knot: String,
    step: usize,
}

struct Binding {
    arity: usize,
    function: ExternalFunction,
}

/// Reference [`StoryEngine`] over a [`Script`].
pub struct ScriptedStory {
    script: Script,
    cursor: Option<Cursor>,
    tags: FxHashSet<String>,
    choices: Vec<ScriptChoice>,
    bindings: FxHashMap<String, Binding>,
    messages: Vec<ScriptMessage>,
}

impl ScriptedStory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            cursor: None,
            tags: FxHashSet::default(),
            choices: Vec::new(),
            bindings: FxHashMap::default(),
            messages: Vec::new(),
        }
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ScriptError> {
        Ok(Self::new(Script::load_from_ron(path)?))
    }

    pub fn parse_ron(input: &str) -> Result<Self, ScriptError> {
        Ok(Self::new(Script::parse_ron(input)?))
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// The knot the cursor is in, if the story has not ended.
    pub fn current_knot(&self) -> Option<&str> {
        self.cursor.as_ref().map(|c| c.knot.as_str())
    }

    fn step_at_cursor(&self) -> Option<&Step> {
        let cursor = self.cursor.as_ref()?;
        self.script.knots.get(&cursor.knot)?.get(cursor.step)
    }

    fn jump(&mut self, knot: &str) -> Result<(), StoryError> {
        if !self.script.knots.contains_key(knot) {
            return Err(StoryError::UnknownPath(knot.to_string()));
        }
        self.cursor = Some(Cursor {
            knot: knot.to_string(),
            step: 0,
        });
        Ok(())
    }

    fn step_forward(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.step += 1;
        }
    }

    /// Follow diverts until the cursor rests on a step that produces content,
    /// a choice point, or the end of the story.
    fn settle(&mut self) -> Result<(), StoryError> {
        self.choices.clear();
        for _ in 0..STEP_BUDGET {
            match self.step_at_cursor().cloned() {
                None | Some(Step::End) => {
                    self.cursor = None;
                    return Ok(());
                }
                Some(Step::Divert(target)) => self.jump(&target)?,
                Some(Step::Choices(choices)) => {
                    if choices.is_empty() {
                        self.messages.push(ScriptMessage::new(
                            Severity::Warning,
                            "empty choice set treated as the end of the story",
                        ));
                        self.cursor = None;
                    }
                    self.choices = choices;
                    return Ok(());
                }
                Some(_) => return Ok(()),
            }
        }
        Err(StoryError::Runtime(format!(
            "no content reached within {} steps",
            STEP_BUDGET
        )))
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, StoryError> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| StoryError::UnboundFunction(name.to_string()))?;
        if binding.arity != args.len() {
            return Err(StoryError::ArityMismatch {
                name: name.to_string(),
                expected: binding.arity,
                got: args.len(),
            });
        }
        (binding.function)(args)
    }
}

impl StoryEngine for ScriptedStory {
    fn choose_path(&mut self, path: &DialoguePath) -> Result<(), StoryError> {
        self.jump(path.as_str())?;
        self.tags.clear();
        self.settle()
    }

    fn can_continue(&self) -> bool {
        self.cursor.is_some() && self.choices.is_empty()
    }

    fn continue_story(&mut self) -> Result<String, StoryError> {
        if !self.can_continue() {
            return Err(StoryError::CannotContinue);
        }
        self.tags.clear();

        for _ in 0..STEP_BUDGET {
            let Some(step) = self.step_at_cursor().cloned() else {
                self.cursor = None;
                return Ok(String::new());
            };

            match step {
                Step::Line { text, tags } => {
                    self.step_forward();
                    self.tags = tags.iter().map(|t| t.trim().to_string()).collect();
                    self.settle()?;
                    return Ok(text);
                }
                Step::Call { function, args } => {
                    self.call(&function, &args)?;
                    self.step_forward();
                }
                Step::Branch {
                    function,
                    args,
                    at_least,
                    divert,
                } => {
                    let value = match self.call(&function, &args)? {
                        Some(Value::Int(n)) => n,
                        other => {
                            self.messages.push(ScriptMessage::new(
                                Severity::Warning,
                                format!(
                                    "branch on '{}' expected an int result, got {:?}; using 0",
                                    function, other
                                ),
                            ));
                            0
                        }
                    };
                    if value >= at_least {
                        self.jump(&divert)?;
                    } else {
                        self.step_forward();
                    }
                }
                Step::Todo(comment) => {
                    self.messages
                        .push(ScriptMessage::new(Severity::Author, format!("TODO: {}", comment)));
                    self.step_forward();
                }
                Step::Divert(_) | Step::Choices(_) | Step::End => {
                    self.settle()?;
                    if !self.can_continue() {
                        return Ok(String::new());
                    }
                }
            }
        }

        Err(StoryError::Runtime(format!(
            "no line reached within {} steps",
            STEP_BUDGET
        )))
    }

    fn current_tags(&self) -> FxHashSet<String> {
        self.tags.clone()
    }

    fn current_choices(&self) -> Vec<Choice> {
        self.choices
            .iter()
            .enumerate()
            .map(|(index, choice)| Choice {
                index,
                text: choice.text.clone(),
            })
            .collect()
    }

    fn choose_choice_index(&mut self, index: usize) -> Result<(), StoryError> {
        let choice = self
            .choices
            .get(index)
            .cloned()
            .ok_or(StoryError::InvalidChoice {
                index,
                available: self.choices.len(),
            })?;
        self.jump(&choice.divert)?;
        self.tags.clear();
        self.settle()
    }

    fn bind_external_function(
        &mut self,
        name: &str,
        arity: usize,
        function: ExternalFunction,
    ) -> Result<(), StoryError> {
        if self.bindings.contains_key(name) {
            return Err(StoryError::AlreadyBound(name.to_string()));
        }
        self.bindings
            .insert(name.to_string(), Binding { arity, function });
        Ok(())
    }

    fn drain_messages(&mut self) -> Vec<ScriptMessage> {
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn line(text: &str) -> Step {
        Step::Line {
            text: text.to_string(),
            tags: Vec::new(),
        }
    }

    fn make_script(knots: Vec<(&str, Vec<Step>)>) -> Script {
        Script {
            knots: knots
                .into_iter()
                .map(|(name, steps)| (name.to_string(), steps))
                .collect(),
        }
    }

    #[test]
    fn lines_are_produced_in_order_until_end() {
        let script = make_script(vec![("start", vec![line("One"), line("Two"), Step::End])]);
        let mut story = ScriptedStory::new(script);
        story.choose_path(&DialoguePath::from("start")).unwrap();

        assert!(story.can_continue());
        assert_eq!(story.continue_story().unwrap(), "One");
        assert!(story.can_continue());
        assert_eq!(story.continue_story().unwrap(), "Two");
        assert!(!story.can_continue());
        assert!(story.current_choices().is_empty());
        assert!(story.current_knot().is_none());
    }

    #[test]
    fn choices_are_available_with_the_last_line() {
        let script = make_script(vec![
            (
                "start",
                vec![
                    line("Pick one."),
                    Step::Choices(vec![
                        ScriptChoice {
                            text: "Left".to_string(),
                            divert: "left".to_string(),
                        },
                        ScriptChoice {
                            text: "Right".to_string(),
                            divert: "right".to_string(),
                        },
                    ]),
                ],
            ),
            ("left", vec![line("You went left.")]),
            ("right", vec![line("You went right.")]),
        ]);
        let mut story = ScriptedStory::new(script);
        story.choose_path(&DialoguePath::from("start")).unwrap();

        assert_eq!(story.continue_story().unwrap(), "Pick one.");
        assert!(!story.can_continue());
        let choices = story.current_choices();
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[1].index, 1);
        assert_eq!(choices[1].text, "Right");

        story.choose_choice_index(1).unwrap();
        assert_eq!(story.continue_story().unwrap(), "You went right.");
    }

    #[test]
    fn invalid_choice_is_rejected() {
        let script = make_script(vec![(
            "start",
            vec![Step::Choices(vec![ScriptChoice {
                text: "Only".to_string(),
                divert: "start".to_string(),
            }])],
        )]);
        let mut story = ScriptedStory::new(script);
        story.choose_path(&DialoguePath::from("start")).unwrap();

        let err = story.choose_choice_index(3).unwrap_err();
        assert!(matches!(err, StoryError::InvalidChoice { index: 3, available: 1 }));
    }

    #[test]
    fn unknown_path_is_an_error() {
        let mut story = ScriptedStory::new(Script::default());
        let err = story.choose_path(&DialoguePath::from("nowhere")).unwrap_err();
        assert!(matches!(err, StoryError::UnknownPath(p) if p == "nowhere"));
    }

    #[test]
    fn calls_invoke_bound_functions_and_branches_divert() {
        let script = make_script(vec![
            (
                "start",
                vec![
                    Step::Call {
                        function: "Add".to_string(),
                        args: vec![Value::Int(5)],
                    },
                    Step::Branch {
                        function: "Get".to_string(),
                        args: Vec::new(),
                        at_least: 5,
                        divert: "rich".to_string(),
                    },
                    line("Poor."),
                ],
            ),
            ("rich", vec![line("Rich.")]),
        ]);
        let total = Rc::new(RefCell::new(0));
        let mut story = ScriptedStory::new(script);

        let add_total = Rc::clone(&total);
        story
            .bind_external_function(
                "Add",
                1,
                Box::new(move |args| {
                    *add_total.borrow_mut() += args[0].as_int().unwrap_or(0);
                    Ok(None)
                }),
            )
            .unwrap();
        let get_total = Rc::clone(&total);
        story
            .bind_external_function(
                "Get",
                0,
                Box::new(move |_| Ok(Some(Value::Int(*get_total.borrow())))),
            )
            .unwrap();

        story.choose_path(&DialoguePath::from("start")).unwrap();
        assert_eq!(story.continue_story().unwrap(), "Rich.");
        assert_eq!(*total.borrow(), 5);
    }

    #[test]
    fn binding_twice_is_rejected() {
        let mut story = ScriptedStory::new(Script::default());
        story
            .bind_external_function("F", 0, Box::new(|_| Ok(None)))
            .unwrap();
        let err = story
            .bind_external_function("F", 0, Box::new(|_| Ok(None)))
            .unwrap_err();
        assert!(matches!(err, StoryError::AlreadyBound(_)));
    }

    #[test]
    fn unbound_call_and_wrong_arity_are_errors() {
        let script = make_script(vec![(
            "start",
            vec![Step::Call {
                function: "Missing".to_string(),
                args: Vec::new(),
            }],
        )]);
        let mut story = ScriptedStory::new(script);
        story.choose_path(&DialoguePath::from("start")).unwrap();
        assert!(matches!(
            story.continue_story().unwrap_err(),
            StoryError::UnboundFunction(_)
        ));

        let script = make_script(vec![(
            "start",
            vec![Step::Call {
                function: "One".to_string(),
                args: Vec::new(),
            }],
        )]);
        let mut story = ScriptedStory::new(script);
        story
            .bind_external_function("One", 1, Box::new(|_| Ok(None)))
            .unwrap();
        story.choose_path(&DialoguePath::from("start")).unwrap();
        assert!(matches!(
            story.continue_story().unwrap_err(),
            StoryError::ArityMismatch { expected: 1, got: 0, .. }
        ));
    }

    #[test]
    fn reaching_choices_without_a_line_yields_empty_text() {
        let script = make_script(vec![(
            "start",
            vec![
                Step::Todo("write an intro".to_string()),
                Step::Choices(vec![ScriptChoice {
                    text: "Go".to_string(),
                    divert: "start".to_string(),
                }]),
            ],
        )]);
        let mut story = ScriptedStory::new(script);
        story.choose_path(&DialoguePath::from("start")).unwrap();

        assert!(story.can_continue());
        assert_eq!(story.continue_story().unwrap(), "");
        assert!(!story.can_continue());
        assert_eq!(story.current_choices().len(), 1);

        let messages = story.drain_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Author);
        assert!(story.drain_messages().is_empty());
    }

    #[test]
    fn tags_belong_to_the_last_line() {
        let script = make_script(vec![(
            "start",
            vec![
                Step::Line {
                    text: "Hmm.".to_string(),
                    tags: vec![" thought ".to_string()],
                },
                line("Hello."),
            ],
        )]);
        let mut story = ScriptedStory::new(script);
        story.choose_path(&DialoguePath::from("start")).unwrap();

        story.continue_story().unwrap();
        assert!(story.current_tags().contains("thought"));
        story.continue_story().unwrap();
        assert!(story.current_tags().is_empty());
    }

    #[test]
    fn divert_cycles_hit_the_step_budget() {
        let script = make_script(vec![
            ("a", vec![Step::Divert("b".to_string())]),
            ("b", vec![Step::Divert("a".to_string())]),
        ]);
        let mut story = ScriptedStory::new(script);
        let err = story.choose_path(&DialoguePath::from("a")).unwrap_err();
        assert!(matches!(err, StoryError::Runtime(_)));
    }

    #[test]
    fn parse_ron_script() {
        let ron = r#"(
            knots: {
                "start": [
                    Line(text: "Guard: Halt!", tags: ["loud"]),
                    Call(function: "Add_State", args: [String("alarm"), Int(1)]),
                    Choices([(text: "Run", divert: "start")]),
                ],
            },
        )"#;
        let script = Script::parse_ron(ron).unwrap();
        assert_eq!(script.knots["start"].len(), 3);
        assert!(matches!(&script.knots["start"][0], Step::Line { tags, .. } if tags == &["loud"]));
    }

    #[test]
    fn validate_reports_unknown_targets_and_unreachable_steps() {
        let script = make_script(vec![
            ("start", vec![Step::Divert("missing".to_string()), line("never")]),
            ("empty", Vec::new()),
        ]);
        let issues = script.validate();

        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].knot, "empty");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.contains("'missing'")));
        assert!(issues.iter().any(|i| i.message.contains("unreachable")));
    }

    #[test]
    fn merge_replaces_knots_by_name() {
        let mut base = make_script(vec![("start", vec![line("old")])]);
        base.merge(make_script(vec![("start", vec![line("new")]), ("other", vec![])]));
        assert_eq!(base.knots.len(), 2);
        assert_eq!(base.knots["start"], vec![line("new")]);
    }
}
