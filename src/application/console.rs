use colored::Colorize;
use futures::StreamExt;
use futures_channel::mpsc::{self, UnboundedReceiver};
use snafu::Report;
use std::io::BufRead;
use tracing::debug;

use crate::application::Regenerator;
use crate::maintainer::CycleReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reload,
    Stop,
    Help,
    Nothing,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" => ConsoleCommand::Nothing,
            "reload" | "r" => ConsoleCommand::Reload,
            "stop" | "s" | "exit" => ConsoleCommand::Stop,
            _ => ConsoleCommand::Help,
        }
    }
}

/// Reads commands from stdin until `stop` or end of input.
pub async fn run(regenerator: &Regenerator) {
    let mut lines = spawn_stdin_reader();
    print_help();

    while let Some(line) = lines.next().await {
        match ConsoleCommand::parse(&line) {
            ConsoleCommand::Reload => match regenerator.regenerate().await {
                Ok(report) => print_report(&report),
                Err(err) => println!("{}", Report::from_error(err).to_string().red()),
            },
            ConsoleCommand::Stop => {
                println!("{}", "Stopping".yellow());
                return;
            }
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Nothing => {}
        }
    }
    debug!("Console input closed");
}

pub fn print_report(report: &CycleReport) {
    let summary = format!(
        "Snapshot ready: {} files, {} changes in {:?}",
        report.file_count,
        report.difference.total(),
        report.elapsed
    );
    println!("{}", summary.green());
    if report.rescanned {
        println!("{}", "Built from a full scan".dimmed());
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}  regenerate the snapshot", "reload, r".cyan());
    println!("  {}  stop the server", "stop, s, exit".cyan());
}

/// Forwards stdin lines from a plain thread, blocking reads have no place on
/// the runtime thread.
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.unbounded_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!("Stopped reading console input: {err}");
                    break;
                }
            }
        }
    });
    receiver
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("reload", ConsoleCommand::Reload)]
    #[case("r", ConsoleCommand::Reload)]
    #[case("  RELOAD \n", ConsoleCommand::Reload)]
    #[case("stop", ConsoleCommand::Stop)]
    #[case("s", ConsoleCommand::Stop)]
    #[case("exit", ConsoleCommand::Stop)]
    #[case("", ConsoleCommand::Nothing)]
    #[case("status", ConsoleCommand::Help)]
    fn test_parse(#[case] line: &str, #[case] expected: ConsoleCommand) {
        assert_eq!(ConsoleCommand::parse(line), expected);
    }
}
