//! Display surface contract: what the dialogue controller renders into.
//!
//! A surface never calls into the controller. The host reads one
//! [`SurfaceInput`] per user interaction from it and hands that to
//! [`DialogueController::handle_input`](crate::core::controller::DialogueController::handle_input).

pub mod console;

use crate::schema::line::DialogueLine;

pub trait DisplaySurface {
    /// Show `line`, replacing whatever text and choices were shown before.
    fn render_line(&mut self, line: &DialogueLine);

    fn set_visible(&mut self, visible: bool);
}

/// One user interaction. A surface reports exactly one per interaction, and
/// none while hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceInput {
    /// The "continue" affordance.
    Advance,
    /// The choice at this zero-based position.
    Choose(usize),
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for &mut S {
    fn render_line(&mut self, line: &DialogueLine) {
        (**self).render_line(line)
    }

    fn set_visible(&mut self, visible: bool) {
        (**self).set_visible(visible)
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn render_line(&mut self, line: &DialogueLine) {
        (**self).render_line(line)
    }

    fn set_visible(&mut self, visible: bool) {
        (**self).set_visible(visible)
    }
}
