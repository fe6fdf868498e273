/// Dialogue Preview: play a story script interactively in the terminal.
///
/// Usage: dialogue_preview --script <path> --start <knot> [--config <path>]
///
/// Press enter to continue, type a number to pick a choice. Set `RUST_LOG`
/// (e.g. `RUST_LOG=dialogue_engine=debug`) to see engine diagnostics.

use dialogue_engine::core::config::DialogueConfig;
use dialogue_engine::core::controller::DialogueControllerBuilder;
use dialogue_engine::core::signal::Signal;
use dialogue_engine::story::scripted::ScriptedStory;
use dialogue_engine::surface::console::ConsoleSurface;
use std::io;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut script_path = None;
    let mut start = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--script" if i + 1 < args.len() => {
                i += 1;
                script_path = Some(args[i].clone());
            }
            "--start" if i + 1 < args.len() => {
                i += 1;
                start = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let (Some(script_path), Some(start)) = (script_path, start) else {
        eprintln!("ERROR: --script and --start are required");
        print_usage();
        process::exit(1);
    };

    let story = match ScriptedStory::load_from_ron(Path::new(&script_path)) {
        Ok(story) => story,
        Err(e) => {
            eprintln!("ERROR: Failed to load script: {}", e);
            process::exit(1);
        }
    };

    let config = match config_path {
        Some(ref path) => match DialogueConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => DialogueConfig::default(),
    };

    let mut controller = match DialogueControllerBuilder::new()
        .config(config)
        .build(story, ConsoleSurface::new(io::stdout()))
    {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    controller
        .signals()
        .subscribe(|signal| match signal {
            Signal::ScriptEvent(name) => println!("    [event] {}", name),
            Signal::StateChanged { key, value } => println!("    [state] {} = {}", key, value),
            Signal::DialogueOpened | Signal::DialogueClosed => {}
        })
        .detach();

    println!("Loaded {} knots", controller.engine().script().knots.len());
    println!("Starting at '{}'\n", start);

    if let Err(e) = controller.start_dialogue(start.as_str()) {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let action = match controller.surface_mut().read_input(&mut input) {
            Ok(Some(action)) => action,
            Ok(None) => break,
            Err(e) => {
                eprintln!("ERROR: Failed to read input: {}", e);
                process::exit(1);
            }
        };
        if let Err(e) = controller.handle_input(action) {
            eprintln!("ERROR: {}", e);
            if !controller.is_open() {
                process::exit(1);
            }
        }
    }

    println!("\n=== Game State ===\n");
    let snapshot = controller.game_state().snapshot();
    if snapshot.is_empty() {
        println!("(no counters set)");
    }
    for (key, value) in snapshot {
        println!("{:<24} {}", key, value);
    }
}

fn print_usage() {
    println!("Usage: dialogue_preview --script <path> --start <knot> [--config <path>]");
    println!();
    println!("  --script <path>   RON story script to play");
    println!("  --start <knot>    knot to open the dialogue at");
    println!("  --config <path>   optional RON dialogue config");
}
