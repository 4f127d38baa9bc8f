// scvd-view: command-line front end for the expression engine

use scvd_view::config::EngineConfig;
use scvd_view::format::{format_value, FormatOptions};
use scvd_view::memory::target::SimulatedTarget;
use scvd_view::memory::value::ScalarType;
use scvd_view::model::{Description, Expression};
use scvd_view::parser::parse::parse;
use scvd_view::statements::StatementEngine;

fn usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} parse <expr>                 # Show the AST and folding result", program);
    eprintln!("  {} eval <expr>                  # Evaluate without a target", program);
    eprintln!("  {} format <spec> <expr> [type]  # Format a value, e.g. format x 255 uint16_t", program);
    eprintln!();
    eprintln!("Set RUST_LOG=debug for evaluation traces.");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(|s| s.as_str()).unwrap_or("scvd-view");

    match args.get(1).map(|s| s.as_str()) {
        Some("parse") if args.len() == 3 => cmd_parse(&args[2]),
        Some("eval") if args.len() == 3 => cmd_eval(&args[2]),
        Some("format") if args.len() == 4 || args.len() == 5 => {
            cmd_format(&args[2], &args[3], args.get(4).map(|s| s.as_str()))
        }
        _ => {
            usage(program);
            std::process::exit(1);
        }
    }
}

fn cmd_parse(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = parse(text, false);
    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic);
    }
    let Some(ast) = &result.ast else {
        std::process::exit(1);
    };
    println!("{:#?}", ast);
    if result.is_printf {
        println!("template: yes");
    }
    if let Some(constant) = &result.constant {
        println!("constant: {}", constant);
    }
    if !result.external_symbols.is_empty() {
        println!("symbols: {}", result.external_symbols.join(", "));
    }
    Ok(())
}

fn cmd_eval(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let description = Description::new();
    let mut engine = StatementEngine::new(&description, SimulatedTarget::new(), EngineConfig::default());
    let expression = Expression::parse(text);
    if let Some(diagnostic) = expression.parsed.first_error() {
        eprintln!("{}", diagnostic);
        std::process::exit(1);
    }
    let value = engine.evaluate(&expression)?;
    println!("{}", value);
    Ok(())
}

fn cmd_format(spec: &str, text: &str, ty: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mut letters = spec.trim_start_matches('%').chars();
    let (Some(letter), None) = (letters.next(), letters.next()) else {
        return Err(format!("'{}' is not a single specifier letter", spec).into());
    };
    let ty = match ty {
        Some(name) => Some(ScalarType::from_name(name).ok_or_else(|| format!("unknown type '{}'", name))?),
        None => None,
    };

    let description = Description::new();
    let mut engine = StatementEngine::new(&description, SimulatedTarget::new(), EngineConfig::default());
    let mut value = engine.evaluate(&Expression::parse(text))?;
    if let Some(ty) = ty {
        value = value
            .coerce(ty)
            .ok_or_else(|| format!("'{}' does not fit {}", value, ty))?;
    }

    let options = FormatOptions {
        type_info: ty,
        unknown: engine.config().unknown_specifier,
        ..Default::default()
    };
    println!("{}", format_value(letter, &value, &options));
    Ok(())
}
