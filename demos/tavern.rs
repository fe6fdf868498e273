/// Tavern example: a scripted walk through the Crooked Lantern scene.
///
/// Plays `story_data/tavern/story.ron` with a fixed list of player inputs,
/// printing the conversation as it would appear on a console. A reactor
/// watches the drinks counter and an event router reacts to script events.
///
/// Run with: cargo run --example tavern

use dialogue_engine::core::config::DialogueConfig;
use dialogue_engine::core::controller::DialogueControllerBuilder;
use dialogue_engine::core::reactor::Reactor;
use dialogue_engine::core::router::EventRouter;
use dialogue_engine::core::state::{Condition, GameState};
use dialogue_engine::story::scripted::ScriptedStory;
use dialogue_engine::surface::console::ConsoleSurface;
use std::path::Path;

fn main() {
    let story = ScriptedStory::load_from_ron(Path::new("story_data/tavern/story.ron"))
        .expect("Failed to load tavern story");
    let config = DialogueConfig::load_from_ron(Path::new("story_data/tavern/config.ron"))
        .expect("Failed to load tavern config");

    let state = GameState::default();

    let _tipsy = Reactor::new(vec![Condition::at_least("ales", 2)])
        .on_fulfilled(|| println!("    (the room starts to sway)"))
        .on_unfulfilled(|| println!("    (the room steadies)"))
        .attach(&state);

    let _events = EventRouter::new()
        .on("tavern_entered", || println!("    (the door creaks shut behind you)"))
        .on("cut_off", || println!("    (the barkeep takes your mug away)"))
        .on("tavern_left", || println!("    (cold air outside)"))
        .attach(state.signals());

    let mut controller = DialogueControllerBuilder::new()
        .config(config)
        .game_state(state.clone())
        .build(story, ConsoleSurface::new(std::io::stdout()))
        .expect("Failed to build dialogue controller");

    println!("=== The Crooked Lantern ===\n");
    controller
        .start_dialogue("tavern.greeting")
        .expect("Failed to open dialogue");

    // Enter twice, ask for rumours, then three ales.
    let mut player = "\n\n2\n\n1\n\n1\n\n1\n\n\n".as_bytes();
    while let Some(action) = controller
        .surface_mut()
        .read_input(&mut player)
        .expect("Failed to read scripted input")
    {
        println!();
        controller
            .handle_input(action)
            .expect("Dialogue failed");
    }

    println!("\n=== After the scene ===\n");
    for (key, value) in state.snapshot() {
        println!("{:<16} {}", key, value);
    }

    // Sobering up drops the reactor back to unfulfilled.
    state.add("ales", -2);
}
