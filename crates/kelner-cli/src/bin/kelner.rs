use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use kelner_cli::demo::{demo_catalog, demo_engine};
use kelner_core::catalog::Catalog;
use kelner_core::surface::{render, Facts, SurfaceKey};
use kelner_core::tts::process_for_tts;
use kelner_session::types::TurnRequest;

#[derive(Parser)]
#[command(name = "kelner", about = "Conversational ordering engine over a demo catalog")]
struct Cli {
    /// Initialize JSON tracing output on stderr
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive conversation on stdin
    Repl {
        /// Session id to start with (generated if absent)
        #[arg(long)]
        session: Option<String>,
        /// Print the full JSON response for each turn
        #[arg(long)]
        json: bool,
        /// Print the TTS chunking for each reply
        #[arg(long)]
        tts: bool,
        /// Persist confirmed orders to a JSONL journal
        #[arg(long)]
        orders: Option<PathBuf>,
    },

    /// Run a single utterance and print the response
    Turn {
        /// The utterance
        text: String,
        /// Session id (generated if absent)
        #[arg(long)]
        session: Option<String>,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Persist confirmed orders to a JSONL journal
        #[arg(long)]
        orders: Option<PathBuf>,
    },

    /// List the demo catalog
    Catalog,

    /// Render a surface key from JSON facts (template review)
    Render {
        /// Surface key, e.g. CHOOSE_RESTAURANT
        key: String,
        /// Facts as JSON, e.g. '{"city":"Bytomiu","restaurants":["A","B"]}'
        #[arg(default_value = "{}")]
        facts: String,
    },
}

fn main() {
    let cli = Cli::parse();
    if cli.trace {
        tracing_subscriber::fmt()
            .json()
            .with_writer(io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kelner=debug")),
            )
            .init();
    }

    match cli.command {
        Command::Repl {
            session,
            json,
            tts,
            orders,
        } => repl(session, json, tts, orders),
        Command::Turn {
            text,
            session,
            json,
            orders,
        } => {
            let engine = match demo_engine(orders.as_deref()) {
                Ok(engine) => engine,
                Err(e) => {
                    eprintln!("error: cannot open order journal: {e}");
                    process::exit(1);
                }
            };
            let resp = engine.handle_turn(TurnRequest::text(text, session.as_deref()));
            if json {
                match serde_json::to_string_pretty(&resp) {
                    Ok(out) => println!("{out}"),
                    Err(e) => {
                        eprintln!("error: {e}");
                        process::exit(1);
                    }
                }
            } else {
                print_turn(&resp, false);
            }
        }
        Command::Catalog => {
            let catalog = demo_catalog();
            for r in catalog.all_restaurants() {
                println!("[{}] {} – {}, {}", r.id, r.name, r.cuisine, r.city);
                if let Ok(menu) = catalog.get_menu(&r.id, true) {
                    for i in menu {
                        println!("    {} {:>7.2} zł  ({})", i.name, i.price, i.category);
                    }
                }
            }
        }
        Command::Render { key, facts } => {
            let key: SurfaceKey = match serde_json::from_value(serde_json::Value::String(key)) {
                Ok(key) => key,
                Err(_) => {
                    eprintln!("error: unknown surface key");
                    process::exit(2);
                }
            };
            let facts: Facts = match serde_json::from_str(&facts) {
                Ok(facts) => facts,
                Err(e) => {
                    eprintln!("error: bad facts JSON: {e}");
                    process::exit(2);
                }
            };
            let rendered = render(key, &facts);
            println!("{}", rendered.reply);
        }
    }
}

fn repl(session: Option<String>, json: bool, tts: bool, orders: Option<PathBuf>) {
    let engine = match demo_engine(orders.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: cannot open order journal: {e}");
            process::exit(1);
        }
    };
    let mut session_id = session;

    println!("kelner – napisz coś (np. \"gdzie zjeść w Bytomiu\"), Ctrl-D kończy");
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let resp = engine.handle_turn(TurnRequest::text(input, session_id.as_deref()));

        if json {
            if let Ok(out) = serde_json::to_string_pretty(&resp) {
                println!("{out}");
            }
        } else {
            print_turn(&resp, tts);
        }

        // Follow rotation like a real client.
        let next_id = resp
            .new_session_id
            .clone()
            .unwrap_or_else(|| resp.session_id.clone());
        if resp.conversation_closed {
            println!("(rozmowa zamknięta, nowa sesja: {next_id})");
        }
        session_id = Some(next_id);
    }
}

fn print_turn(resp: &kelner_session::types::TurnResponse, tts: bool) {
    println!("[{} | {}] {}", resp.intent, resp.meta.source, resp.reply);
    if tts && !resp.reply.is_empty() {
        let plan = process_for_tts(&resp.reply);
        for (i, chunk) in plan.chunks.iter().enumerate() {
            println!("  tts[{i}]: {chunk}");
        }
    }
}
