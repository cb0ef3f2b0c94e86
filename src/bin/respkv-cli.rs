//! respkv-cli: command-line client for respkv.
//!
//! With a trailing command it sends that command once and prints the reply,
//! exiting non-zero when the server answers with an error.
//! Without one it reads commands from stdin, one per line.

use clap::Parser;
use respkv::config::ClientConfig;
use respkv::{Client, ClientError};
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ClientConfig::parse();

    let mut client = match Client::connect(&config.host, config.port).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("could not connect to {}:{}: {}", config.host, config.port, e);
            return ExitCode::FAILURE;
        }
    };

    if config.command.is_empty() {
        run_repl(&mut client, &config).await
    } else {
        match client.send(config.command.as_slice()).await {
            Ok(reply) => {
                println!("{}", reply);
                if reply.is_error() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

async fn run_repl(client: &mut Client, config: &ClientConfig) -> ExitCode {
    let prompt = format!("{}:{}> ", config.host, config.port);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error reading input: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.first() {
            None => continue,
            Some(first) if first.eq_ignore_ascii_case("quit") || first.eq_ignore_ascii_case("exit") => {
                return ExitCode::SUCCESS;
            }
            Some(_) => {}
        }

        match client.send(tokens.as_slice()).await {
            Ok(reply) => println!("{}", reply),
            Err(ClientError::Disconnected) => {
                eprintln!("server closed the connection");
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
}
