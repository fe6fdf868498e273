//! The dialogue controller: Story Engine → Line Parser → Display Surface.
//!
//! Owns one story engine and one display surface. Opens a session at a
//! dialogue path, advances one presentable line per user interaction,
//! forwards choices, and closes when the story has nothing more to offer.

use thiserror::Error;

use super::bridge::StateBridge;
use super::config::{ConfigError, DialogueConfig};
use super::parser::LineParser;
use super::signal::{Signal, SignalBus};
use super::state::GameState;
use crate::schema::line::{Choice, DialogueLine, DialoguePath};
use crate::story::{Severity, StoryEngine, StoryError};
use crate::surface::{DisplaySurface, SurfaceInput};

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("a dialogue session is already active")]
    SessionActive,
    #[error("dialogue is not awaiting input (phase: {0:?})")]
    NotAwaitingInput(DialoguePhase),
    #[error("choice {index} is out of range ({available} choices presented)")]
    ChoiceOutOfRange { index: usize, available: usize },
    #[error("story produced more than {limit} consecutive empty lines")]
    EmptyLineLimit { limit: usize },
    #[error("story engine error: {0}")]
    Story(#[from] StoryError),
    #[error("invalid dialogue config: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle phase of the controller.
///
/// `Opening`, `Presenting` and `Closing` are only observed by collaborators
/// called during a transition; between calls the controller is either
/// `Closed` or `AwaitingAdvanceOrChoice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    Closed,
    Opening,
    Presenting,
    AwaitingAdvanceOrChoice,
    Closing,
}

pub struct DialogueController<E, S> {
    engine: E,
    surface: S,
    parser: LineParser,
    bridge: StateBridge,
    max_skipped_lines: usize,
    phase: DialoguePhase,
    current_choices: Vec<Choice>,
}

/// Builder for a [`DialogueController`].
#[derive(Debug, Default)]
pub struct DialogueControllerBuilder {
    config: Option<DialogueConfig>,
    game_state: Option<GameState>,
}

impl DialogueControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: DialogueConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing game state (and its signal bus) with the rest of
    /// the game. A fresh one is created otherwise.
    pub fn game_state(mut self, state: GameState) -> Self {
        self.game_state = Some(state);
        self
    }

    /// Validate the config, bind the state bridge into `engine` and hide the
    /// surface.
    pub fn build<E, S>(self, mut engine: E, mut surface: S) -> Result<DialogueController<E, S>, DialogueError>
    where
        E: StoryEngine,
        S: DisplaySurface,
    {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let bridge = StateBridge::new(self.game_state.unwrap_or_default());
        bridge.bind(&mut engine, &config.functions)?;

        surface.set_visible(false);

        Ok(DialogueController {
            engine,
            surface,
            parser: config.parser(),
            bridge,
            max_skipped_lines: config.max_skipped_lines,
            phase: DialoguePhase::Closed,
            current_choices: Vec::new(),
        })
    }
}

impl<E: StoryEngine, S: DisplaySurface> DialogueController<E, S> {
    /// Build with default configuration and a fresh game state.
    pub fn new(engine: E, surface: S) -> Result<Self, DialogueError> {
        DialogueControllerBuilder::new().build(engine, surface)
    }

    /// Open a session at `path` and present its first line.
    ///
    /// # Errors
    /// * [`DialogueError::SessionActive`] if a session is already open. The
    ///   active session is left untouched.
    /// * Fatal story errors close the session before being returned.
    pub fn start_dialogue(&mut self, path: impl Into<DialoguePath>) -> Result<(), DialogueError> {
        if self.phase != DialoguePhase::Closed {
            tracing::error!(phase = ?self.phase, "start_dialogue called while a session is active");
            return Err(DialogueError::SessionActive);
        }
        let path = path.into();

        self.phase = DialoguePhase::Opening;
        tracing::info!(path = %path, "dialogue opened");
        self.surface.set_visible(true);
        self.signals().emit(&Signal::DialogueOpened);

        let jumped = self.engine.choose_path(&path).map_err(DialogueError::from);
        self.report_messages();
        let outcome = jumped.and_then(|()| self.advance());
        self.close_on_error(outcome)
    }

    /// The surface's "continue" affordance was used.
    pub fn on_advance_requested(&mut self) -> Result<(), DialogueError> {
        self.expect_awaiting()?;
        let outcome = self.advance();
        self.close_on_error(outcome)
    }

    /// The surface's choice affordance was used.
    ///
    /// # Errors
    /// * [`DialogueError::ChoiceOutOfRange`] if `index` is not one of the
    ///   choices presented. The story engine is not called.
    pub fn on_choice_selected(&mut self, index: usize) -> Result<(), DialogueError> {
        self.expect_awaiting()?;
        let Some(choice) = self.current_choices.get(index) else {
            let available = self.current_choices.len();
            tracing::error!(index, available, "display surface selected a choice that was not presented");
            return Err(DialogueError::ChoiceOutOfRange { index, available });
        };
        tracing::debug!(index, text = %choice.text, "choice selected");

        let chosen = self
            .engine
            .choose_choice_index(choice.index)
            .map_err(DialogueError::from);
        self.report_messages();
        let outcome = chosen.and_then(|()| self.advance());
        self.close_on_error(outcome)
    }

    /// Dispatch a single user interaction reported by the surface.
    pub fn handle_input(&mut self, input: SurfaceInput) -> Result<(), DialogueError> {
        match input {
            SurfaceInput::Advance => self.on_advance_requested(),
            SurfaceInput::Choose(index) => self.on_choice_selected(index),
        }
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != DialoguePhase::Closed
    }

    /// Choices attached to the line currently shown.
    pub fn current_choices(&self) -> &[Choice] {
        &self.current_choices
    }

    pub fn game_state(&self) -> &GameState {
        self.bridge.state()
    }

    pub fn signals(&self) -> &SignalBus {
        self.bridge.signals()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn expect_awaiting(&self) -> Result<(), DialogueError> {
        if self.phase == DialoguePhase::AwaitingAdvanceOrChoice {
            Ok(())
        } else {
            tracing::error!(phase = ?self.phase, "input received while not awaiting input");
            Err(DialogueError::NotAwaitingInput(self.phase))
        }
    }

    /// Produce the next presentable line, skipping empty units, or close the
    /// session if the story has ended.
    fn advance(&mut self) -> Result<(), DialogueError> {
        let mut skipped = 0;
        let text = loop {
            if !self.engine.can_continue() {
                if self.engine.current_choices().is_empty() {
                    self.close();
                    return Ok(());
                }
                break None;
            }

            let text = self.engine.continue_story();
            self.report_messages();
            let text = text?;
            if !text.trim().is_empty() {
                break Some(text);
            }

            skipped += 1;
            if skipped > self.max_skipped_lines {
                return Err(DialogueError::EmptyLineLimit {
                    limit: self.max_skipped_lines,
                });
            }
        };
        if skipped > 0 {
            tracing::trace!(skipped, "skipped empty story lines");
        }

        self.phase = DialoguePhase::Presenting;
        let mut line = match text {
            Some(text) => self.parser.parse(&text, &self.engine.current_tags()),
            None => DialogueLine::default(),
        };
        line.choices = self.engine.current_choices();
        self.current_choices = line.choices.clone();
        self.surface.render_line(&line);
        self.phase = DialoguePhase::AwaitingAdvanceOrChoice;
        Ok(())
    }

    fn close(&mut self) {
        if self.phase == DialoguePhase::Closed {
            return;
        }
        self.phase = DialoguePhase::Closing;
        self.current_choices.clear();
        self.surface.set_visible(false);
        self.signals().emit(&Signal::DialogueClosed);
        self.phase = DialoguePhase::Closed;
        tracing::info!("dialogue closed");
    }

    fn close_on_error(&mut self, outcome: Result<(), DialogueError>) -> Result<(), DialogueError> {
        if let Err(err) = &outcome {
            tracing::error!(error = %err, "dialogue aborted");
            self.close();
        }
        outcome
    }

    /// Log everything the engine reported. Author-level messages are meant
    /// for authoring tools and are dropped.
    fn report_messages(&mut self) {
        for message in self.engine.drain_messages() {
            match message.severity {
                Severity::Author => {}
                Severity::Info => tracing::info!(text = %message.message, "story message"),
                Severity::Warning => tracing::warn!(text = %message.message, "story message"),
                Severity::Error => tracing::error!(text = %message.message, "story message"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::scripted::{Script, ScriptChoice, ScriptedStory, Step};

    #[derive(Default)]
    struct Screen {
        visible: bool,
        lines: Vec<DialogueLine>,
    }

    impl DisplaySurface for Screen {
        fn render_line(&mut self, line: &DialogueLine) {
            self.lines.push(line.clone());
        }

        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }
    }

    fn line(text: &str) -> Step {
        Step::Line {
            text: text.to_string(),
            tags: Vec::new(),
        }
    }

    fn make_controller() -> DialogueController<ScriptedStory, Screen> {
        let script = Script {
            knots: [
                (
                    "gate".to_string(),
                    vec![
                        line("Guard: Who goes there?"),
                        Step::Choices(vec![
                            ScriptChoice {
                                text: "A friend.".to_string(),
                                divert: "friend".to_string(),
                            },
                            ScriptChoice {
                                text: "Nobody.".to_string(),
                                divert: "nobody".to_string(),
                            },
                        ]),
                    ],
                ),
                ("friend".to_string(), vec![line("Guard: Pass, friend."), Step::End]),
                ("nobody".to_string(), vec![Step::End]),
            ]
            .into_iter()
            .collect(),
        };
        DialogueController::new(ScriptedStory::new(script), Screen::default()).unwrap()
    }

    #[test]
    fn new_controller_is_closed_and_hidden() {
        let controller = make_controller();
        assert_eq!(controller.phase(), DialoguePhase::Closed);
        assert!(!controller.is_open());
        assert!(!controller.surface().visible);
    }

    #[test]
    fn start_presents_first_line_with_choices() {
        let mut controller = make_controller();
        controller.start_dialogue("gate").unwrap();

        assert_eq!(controller.phase(), DialoguePhase::AwaitingAdvanceOrChoice);
        assert!(controller.surface().visible);
        let shown = &controller.surface().lines[0];
        assert_eq!(shown.speaker.as_deref(), Some("Guard"));
        assert_eq!(shown.body, "Who goes there?");
        assert_eq!(shown.choices.len(), 2);
        assert_eq!(controller.current_choices().len(), 2);
    }

    #[test]
    fn choosing_advances_and_end_closes() {
        let mut controller = make_controller();
        controller.start_dialogue("gate").unwrap();

        controller.on_choice_selected(0).unwrap();
        assert_eq!(controller.surface().lines[1].body, "Pass, friend.");
        assert!(controller.current_choices().is_empty());

        controller.on_advance_requested().unwrap();
        assert_eq!(controller.phase(), DialoguePhase::Closed);
        assert!(!controller.surface().visible);
        assert_eq!(controller.surface().lines.len(), 2);
    }

    #[test]
    fn choice_leading_straight_to_end_closes() {
        let mut controller = make_controller();
        controller.start_dialogue("gate").unwrap();
        controller.handle_input(SurfaceInput::Choose(1)).unwrap();
        assert!(!controller.is_open());
    }

    #[test]
    fn input_while_closed_is_rejected() {
        let mut controller = make_controller();
        assert!(matches!(
            controller.on_advance_requested(),
            Err(DialogueError::NotAwaitingInput(DialoguePhase::Closed))
        ));
        assert!(matches!(
            controller.on_choice_selected(0),
            Err(DialogueError::NotAwaitingInput(DialoguePhase::Closed))
        ));
    }

    #[test]
    fn unknown_path_closes_the_session() {
        let mut controller = make_controller();
        let err = controller.start_dialogue("cellar").unwrap_err();
        assert!(matches!(err, DialogueError::Story(StoryError::UnknownPath(_))));
        assert!(!controller.is_open());
        assert!(!controller.surface().visible);
    }

    #[test]
    fn session_can_be_restarted_after_closing() {
        let mut controller = make_controller();
        controller.start_dialogue("gate").unwrap();
        controller.on_choice_selected(1).unwrap();
        assert!(!controller.is_open());

        controller.start_dialogue("gate").unwrap();
        assert!(controller.is_open());
        assert_eq!(controller.surface().lines.len(), 2);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = DialogueConfig {
            separator: ' ',
            ..DialogueConfig::default()
        };
        let result = DialogueControllerBuilder::new()
            .config(config)
            .build(ScriptedStory::new(Script::default()), Screen::default());
        assert!(matches!(
            result,
            Err(DialogueError::Config(ConfigError::InvalidSeparator(' ')))
        ));

        let config = DialogueConfig {
            max_skipped_lines: 0,
            ..DialogueConfig::default()
        };
        let result = DialogueControllerBuilder::new()
            .config(config)
            .build(ScriptedStory::new(Script::default()), Screen::default());
        assert!(matches!(
            result,
            Err(DialogueError::Config(ConfigError::ZeroSkipLimit))
        ));
    }
}
