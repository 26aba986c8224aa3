use std::io::{self, IsTerminal, Read};

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use sexpr::eval::Interp;
use sexpr::printer;
use sexpr::reader;

#[derive(Parser)]
#[command(
    name = "sexpr",
    about = "A small S-expression interpreter with a tracing collector"
)]
struct Cli {
    /// Source file to run
    file: Option<String>,

    /// Evaluate an expression and exit
    #[arg(short, long)]
    eval: Option<String>,

    /// Arena capacity in cells
    #[arg(long, default_value_t = 4096)]
    heap_cells: usize,
}

fn main() {
    let cli = Cli::parse();

    let mut interp = match Interp::new(cli.heap_cells) {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(expr) = &cli.eval {
        run_source(&mut interp, expr);
        return;
    }

    if let Some(path) = &cli.file {
        match std::fs::read_to_string(path) {
            Ok(source) => run_source(&mut interp, &source),
            Err(e) => {
                eprintln!("Error reading {path}: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if io::stdin().is_terminal() {
        repl(&mut interp);
    } else {
        let mut input = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut input) {
            eprintln!("Read error: {e}");
            std::process::exit(1);
        }
        run_source(&mut interp, &input);
    }
}

/// Parse and evaluate one expression at a time, printing each result or the
/// sticky error, and collect between forms. Parsing lazily matters: a
/// pre-parsed expression held across a collection would be invisible to the
/// collector as a root. Evaluation errors are reported and never fatal; a
/// parse error abandons the rest of the source.
fn run_source(interp: &mut Interp, source: &str) {
    let mut pos = 0;
    loop {
        match reader::read_one_at(source, pos, &mut interp.arena) {
            Ok(Some((expr, new_pos))) => {
                pos = new_pos;
                match interp.eval_top(expr) {
                    Some(val) => println!("{}", printer::print_val(val, &interp.arena)),
                    None => {
                        if let Some(e) = interp.take_error() {
                            eprintln!("Error: {e}");
                        }
                    }
                }
                interp.collect();
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }
}

/// Interactive loop: accumulate lines until parentheses balance.
fn repl(interp: &mut Interp) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Cannot initialise line editor: {e}");
            return;
        }
    };

    println!(
        "sexpr interpreter ({} cells). Ctrl-D to exit.",
        interp.arena.capacity()
    );

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "> " } else { "  " };
        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                if !is_balanced(&buffer) {
                    continue;
                }
                let input = buffer.trim().to_string();
                buffer.clear();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&input);
                run_source(interp, &input);
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Read error: {e}");
                break;
            }
        }
    }
}

/// Naive paren depth; sufficient because the grammar has no string or
/// comment syntax that could contain a bare paren.
fn is_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0
}
