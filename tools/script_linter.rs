/// Script Linter: checks story scripts for broken diverts and dead steps.
///
/// Usage: script_linter <script_file_or_dir> [--strict]
///
/// All `.ron` files under a directory are merged into one script before
/// checking, so diverts may cross files. `--strict` also fails on warnings.

use dialogue_engine::story::scripted::Script;
use dialogue_engine::story::Severity;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <script_file_or_dir> [--strict]");
        process::exit(0);
    }

    let script_arg = &args[1];
    let mut strict = false;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--strict" {
            strict = true;
        }
        i += 1;
    }

    let mut script = Script::default();
    let script_path = Path::new(script_arg);

    if script_path.is_file() {
        match Script::load_from_ron(script_path) {
            Ok(loaded) => script.merge(loaded),
            Err(e) => {
                eprintln!("ERROR: Failed to load script file: {}", e);
                process::exit(1);
            }
        }
    } else if script_path.is_dir() {
        load_scripts_recursive(script_path, &mut script);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", script_arg);
        process::exit(1);
    }

    println!("Loaded {} knots", script.knots.len());

    let issues = script.validate();

    println!("\n=== Script Lint Report ===\n");

    if issues.is_empty() {
        println!("All checks passed!");
    }

    for issue in &issues {
        println!("{}", issue);
    }

    let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);
    let notes = count(Severity::Author);

    println!(
        "\nSummary: {} errors, {} warnings, {} author notes",
        errors, warnings, notes
    );

    if errors > 0 || (strict && warnings > 0) {
        process::exit(1);
    }
}

/// Files that are not scripts (e.g. a scene's `config.ron`) fail to load and
/// are reported but skipped.
fn load_scripts_recursive(dir: &Path, script: &mut Script) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_scripts_recursive(&path, script);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match Script::load_from_ron(&path) {
                    Ok(loaded) => {
                        println!("  Loaded: {}", path.display());
                        script.merge(loaded);
                    }
                    Err(e) => {
                        eprintln!("  Skipped {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}
