//! Dialogue Engine: runs branching story scripts as in-game conversations.
//!
//! A [`DialogueController`](core::controller::DialogueController) pulls text
//! from a [`StoryEngine`](story::StoryEngine), splits each unit into speaker
//! and body, and renders it to a [`DisplaySurface`](surface::DisplaySurface).
//! Scripts read and change shared game state through a small set of bound
//! functions; state changes and script events are broadcast on a
//! [`SignalBus`](core::signal::SignalBus) that reactors and event routers
//! listen on.

pub mod core;
pub mod schema;
pub mod story;
pub mod surface;
