//! ZestKV CLI Client
//!
//! Reads commands from stdin, one per line, sends each to the server and
//! prints the reply. With trailing arguments, runs that single command and
//! exits.

use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use zestkv::protocol::Reply;
use zestkv::Client;

/// ZestKV CLI
#[derive(Parser, Debug)]
#[command(name = "zestkv-cli")]
#[command(about = "CLI for the ZestKV key-value server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Run one command and exit, e.g. `zestkv-cli zadd z 1 m`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    if !args.command.is_empty() {
        match client.call(&args.command) {
            Ok(reply) => print!("{}", render(&reply)),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = repl(&mut client) {
        tracing::error!("session ended: {}", e);
        std::process::exit(1);
    }
}

fn repl(client: &mut Client) -> zestkv::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => return Ok(()),
        };
        let tokens = match tokenize(&line) {
            Ok(tokens) => tokens,
            Err(msg) => {
                eprintln!("(error) {}", msg);
                continue;
            }
        };
        match tokens.first().map(|t| t.to_ascii_lowercase()) {
            None => continue,
            Some(cmd) if cmd == "exit" || cmd == "quit" => return Ok(()),
            Some(_) => {}
        }

        let reply = client.call(&tokens)?;
        print!("{}", render(&reply));
        io::stdout().flush()?;
    }
}

/// Split a line into arguments. Double quotes group words and allow `\`
/// escapes; single quotes are literal. `""` yields an empty argument.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            '"' => {
                started = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err("trailing backslash".to_string()),
                        },
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\'' => {
                started = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            c => {
                started = true;
                current.push(c);
            }
        }
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Human-readable form of a reply, one line per value
fn render(reply: &Reply) -> String {
    let mut out = String::new();
    render_into(reply, &mut out);
    out
}

fn render_into(reply: &Reply, out: &mut String) {
    match reply {
        Reply::Nil => out.push_str("nil\n"),
        Reply::Err(msg) => {
            out.push_str("(err) ");
            out.push_str(msg);
            out.push('\n');
        }
        Reply::Str(bytes) => {
            out.push_str(&String::from_utf8_lossy(bytes));
            out.push('\n');
        }
        Reply::Int(n) => {
            out.push_str(&format!("{}\n", n));
        }
        Reply::Arr(items) => {
            out.push_str(&format!("array length: {}\n", items.len()));
            for item in items {
                render_into(item, out);
            }
            out.push_str("array end\n");
        }
    }
}
