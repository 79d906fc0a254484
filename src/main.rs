use std::{
    fs,
    io::{self, Read},
};

use anyhow::{anyhow, bail, Context};
use clap::{App, Arg};
use kaleido::{Driver, Lexer, Parser, PrecedenceTable};
use tracing_subscriber::EnvFilter;

/// parse an `OP=PREC` operator definition from the command line
fn parse_operator(spec: &str) -> anyhow::Result<(char, u32)> {
    let (op, precedence) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("operator `{}` is not of the form OP=PREC", spec))?;

    let mut chars = op.chars();
    let op = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => bail!("operator `{}` must be a single character", op),
    };
    if op.is_alphanumeric() || op.is_whitespace() || "(),;#.".contains(op) {
        bail!("`{}` cannot be used as a binary operator", op);
    }

    let precedence: u32 = precedence
        .parse()
        .with_context(|| format!("invalid precedence `{}` for `{}`", precedence, op))?;
    if precedence == 0 || precedence > i32::MAX as u32 {
        bail!(
            "precedence for `{}` must be between 1 and {}",
            op,
            i32::MAX
        );
    }

    Ok((op, precedence))
}

fn read_source(path: Option<&str>) -> anyhow::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path)),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read stdin")?;
            Ok(source)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let matches = App::new("kaleido")
        .version(env!("CARGO_PKG_VERSION"))
        .about("parse a program and print its syntax tree")
        .arg(
            Arg::with_name("INPUT")
                .help("source file to parse, stdin when omitted")
                .index(1),
        )
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .help("print the token stream instead of the syntax tree"),
        )
        .arg(
            Arg::with_name("operator")
                .long("operator")
                .short("o")
                .value_name("OP=PREC")
                .help("define an extra binary operator")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .get_matches();

    let source = read_source(matches.value_of("INPUT"))?;

    if matches.is_present("tokens") {
        for token in Lexer::from_source(&source) {
            println!("{}", token);
        }
        return Ok(());
    }

    let mut precedence = PrecedenceTable::default();
    for spec in matches.values_of("operator").into_iter().flatten() {
        let (op, prec) = parse_operator(spec)?;
        precedence = precedence.with_operator(op, prec);
    }

    let parser = Parser::with_precedence(Lexer::from_source(&source), precedence);
    let mut errors = 0;
    for result in Driver::new(parser) {
        match result {
            Ok(node) => println!("{}", node),
            Err(err) => {
                errors += 1;
                eprintln!("error: {}", err);
            }
        }
    }

    if errors > 0 {
        bail!("{} syntax error(s)", errors);
    }
    Ok(())
}
