//! RetainKV CLI Client
//!
//! Command-line interface for interacting with RetainKV.
//!
//! With trailing words, runs that single command and exits. Without, reads
//! commands from stdin one line at a time.

use std::io::{self, BufRead, Write};

use clap::Parser;
use retainkv::{Client, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// RetainKV CLI
#[derive(Parser, Debug)]
#[command(name = "retainkv-cli")]
#[command(about = "CLI for the RetainKV key-value store")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Command to run once, e.g. `SET greeting hello`
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client = match Client::connect(&addr) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if !args.command.is_empty() {
        let code = match run_line(&mut client, args.command) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{}", e);
                1
            }
        };
        std::process::exit(code);
    }

    // Ctrl+C: ask the server to snapshot, then leave
    let save_addr = addr.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        match Client::connect(&save_addr).and_then(|mut c| c.save()) {
            Ok(reply) => println!("\n{}", render(&reply)),
            Err(e) => eprintln!("\nSAVE before exit failed: {}", e),
        }
        std::process::exit(0);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    repl(&mut client, &addr);
}

fn repl(client: &mut Client, addr: &str) {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}> ", addr);
        if io::stdout().flush().is_err() {
            return;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Could not read input: {}", e);
                return;
            }
            None => return,
        };

        let words = match tokenize(&line) {
            Ok(words) => words,
            Err(e) => {
                println!("(error) {}", e);
                continue;
            }
        };
        if words.is_empty() {
            continue;
        }
        if words.len() == 1 && matches!(words[0].to_ascii_lowercase().as_str(), "quit" | "exit") {
            return;
        }

        if let Err(e) = run_line(client, words) {
            eprintln!("{}", e);
            return;
        }
    }
}

fn run_line(client: &mut Client, mut words: Vec<String>) -> retainkv::Result<()> {
    // Keywords are case-sensitive on the server
    if let Some(keyword) = words.first_mut() {
        *keyword = keyword.to_ascii_uppercase();
    }

    let reply = client.request(words)?;
    println!("{}", render(&reply));
    Ok(())
}

/// Split a line into words, honouring quotes
///
/// `"..."` supports `\"`, `\\`, `\n`, `\r`, `\t`; `'...'` is literal.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            return Ok(words);
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();

            match c {
                '"' => loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => word.push('\n'),
                            Some('r') => word.push('\r'),
                            Some('t') => word.push('\t'),
                            Some(other) => word.push(other),
                            None => return Err("unbalanced quotes".to_string()),
                        },
                        Some(other) => word.push(other),
                        None => return Err("unbalanced quotes".to_string()),
                    }
                },
                '\'' => loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(other) => word.push(other),
                        None => return Err("unbalanced quotes".to_string()),
                    }
                },
                other => word.push(other),
            }
        }
        words.push(word);
    }
}

/// Render a reply for the terminal
fn render(value: &Value) -> String {
    match value {
        Value::SimpleString(text) => text.clone(),
        Value::Error(text) => format!("(error) {}", text),
        Value::Integer(n) => format!("(integer) {}", n),
        Value::Double(f) => format!("(double) {}", f),
        Value::BulkString(Some(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        Value::BulkString(None) | Value::Array(None) => "(nil)".to_string(),
        Value::Array(Some(items)) if items.is_empty() => "(empty array)".to_string(),
        Value::Array(Some(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}) {}", i + 1, render(item)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
