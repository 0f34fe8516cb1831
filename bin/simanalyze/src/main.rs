use simanalyzer::analysis::{Analyzer, AnalyzerSettings, Frames, Value};
use simanalyzer::jvm::class_graph::{ClassGraph, ClassGraphArenas};
use simanalyzer::jvm::code::{Listing, MethodBody};
use simanalyzer::jvm::Name;

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process;

fn main() -> Result<(), simanalyzer::jvm::Error> {
    env_logger::init();

    let matches = Command::new("JVM method analyzer")
        .version(clap::crate_version!())
        .about("Print the abstract frames inferred for the methods of a JVM listing")
        .arg(
            Arg::new("method")
                .long("method")
                .value_name("NAME")
                .help("Only analyze methods with this name"),
        )
        .arg(
            Arg::new("class")
                .long("class")
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Load the class declarations of another listing into the class hierarchy"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .action(ArgAction::SetTrue)
                .help("Report unresolved type problems instead of failing on them"),
        )
        .arg(
            Arg::new("keep-dead-code")
                .long("keep-dead-code")
                .action(ArgAction::SetTrue)
                .help("Also analyze the dead side of branches on constants"),
        )
        .arg(
            Arg::new("no-simulation")
                .long("no-simulation")
                .action(ArgAction::SetTrue)
                .help("Don't track the contents of strings and string builders"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Listing containing the methods to analyze")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .get_matches();

    let class_graph_arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&class_graph_arenas);
    class_graph.insert_java_library_types();

    if let Some(class_files) = matches.get_many::<PathBuf>("class") {
        for class_file in class_files {
            log::info!("Loading classes from '{}'", class_file.display());
            Listing::read(class_file)?.declare_classes(&class_graph);
        }
    }

    let input = matches
        .get_one::<PathBuf>("INPUT")
        .expect("INPUT is a required argument");
    log::info!("Reading '{}'", input.display());
    let listing = Listing::read(input)?;
    listing.declare_classes(&class_graph);

    let settings = AnalyzerSettings {
        throw_unresolved_problems: !matches.get_flag("lenient"),
        skip_dead_code_blocks: !matches.get_flag("keep-dead-code"),
        simulate: !matches.get_flag("no-simulation"),
    };
    let analyzer = Analyzer::new(&class_graph).with_settings(settings);

    let only = matches.get_one::<String>("method");
    let mut failures = 0;
    for method in &listing.methods {
        if only.map_or(false, |only| method.name.as_str() != only.as_str()) {
            continue;
        }
        println!("{}.{}{}", method.class, method.name, method.descriptor);
        match analyzer.analyze(method) {
            Ok(frames) => print_frames(method, &frames),
            Err(err) => {
                println!("  error: {}", err);
                failures += 1;
            }
        }
        println!();
    }

    if failures > 0 {
        log::error!("{} method(s) failed to analyze", failures);
        process::exit(1);
    }
    Ok(())
}

fn print_frames(method: &MethodBody, frames: &Frames) {
    for (insn, instruction) in method.instructions.iter().enumerate() {
        let frame = match frames.frame(insn) {
            Some(frame) => frame,
            None => {
                println!("  #{:<4} {:<40} dead", insn, instruction.to_string());
                continue;
            }
        };
        let locals: Vec<String> = frame.locals().iter().map(render).collect();
        let stack: Vec<String> = frame.stack().iter().map(render).collect();
        println!(
            "  #{:<4} {:<40} locals: [{}] stack: [{}]",
            insn,
            instruction.to_string(),
            locals.join(", "),
            stack.join(", ")
        );
        if let Some(predicate) = frames.opaque_jumps().get(&insn) {
            println!("         opaque predicate ({:?})", predicate);
        }
    }
    for problem in frames.problems() {
        println!("  unresolved: {}", problem);
    }
}

/// Value with the instructions it came from
fn render(value: &Value) -> String {
    if value.provenance().is_empty() {
        value.to_string()
    } else {
        format!("{} from {}", value, value.provenance())
    }
}
