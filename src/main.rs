use clap::{Parser, Subcommand};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "plotline")]
#[command(about = "Plotline - story game server and bot player launcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server and a handful of bot players against it
    Both {
        /// Number of bots to start
        #[arg(short, long, default_value = "2")]
        bots: u32,
        /// Port for the server
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Run only the server
    Server {
        /// Port for the server
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Run bots against an already running server
    Bots {
        /// Number of bots to start
        #[arg(short, long, default_value = "2")]
        count: u32,
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Both { bots, port } => run_both(bots, port),
        Commands::Server { port } => run_server(port),
        Commands::Bots { count, port } => run_bots(count, port),
    }
}

fn run_both(bots: u32, port: u16) {
    println!("Starting plotline server on port {port} with {bots} bots");

    let server_handle = thread::spawn(move || run_server(port));

    // give the server time to bind
    thread::sleep(Duration::from_millis(1500));
    run_bots(bots, port);

    let _ = server_handle.join();
}

fn run_server(port: u16) {
    run_cargo(
        &["run", "-p", "plotline-server"],
        &[("PLOTLINE_PORT", port.to_string())],
        "Server",
    );
}

fn run_bots(count: u32, port: u16) {
    let mut handles = Vec::new();
    for i in 1..=count {
        println!("Starting bot {i}...");
        let handle = thread::spawn(move || {
            // bot 1 joins first and becomes host
            thread::sleep(Duration::from_millis(500 * i as u64));
            run_cargo(
                &["run", "--bin", "bot_client", "--", &format!("Bot{i}")],
                &[("PLOTLINE_URL", format!("ws://127.0.0.1:{port}/ws"))],
                "Bot",
            );
        });
        handles.push(handle);
    }

    println!("All bots started. Press Ctrl+C to stop.");
    for handle in handles {
        let _ = handle.join();
    }
}

fn run_cargo(args: &[&str], envs: &[(&str, String)], what: &str) {
    let mut cmd = Command::new("cargo");
    cmd.args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    for (k, v) in envs {
        cmd.env(k, v);
    }

    match cmd.status() {
        Ok(exit_status) => {
            if !exit_status.success() {
                eprintln!("{what} exited with error: {exit_status}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Failed to start {}: {e}", what.to_lowercase());
            std::process::exit(1);
        }
    }
}
