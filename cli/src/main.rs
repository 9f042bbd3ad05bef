use std::io::Write;

use clap::{Args, Parser, Subcommand};
use client::net::relay::{RelayClient, RelayError};
use client::state::calculator::{
    AGE_RANGE, ActivityLevel, CalculatorInput, CalculatorState, InputRange, UnitSystem, format_bmi, format_calories,
    format_height,
};
use client::state::chat::GREETING;
use client::widget::{ChatView, ChatWidget, SubmitOutcome};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use wire::{Message, Role};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "forge-cli", about = "Apex Forge chat relay and metrics CLI")]
struct Cli {
    #[arg(long, env = "FORGE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the relay is up.
    Ping,
    /// Chat with the coach. Reads lines from stdin unless `--message` is given.
    Chat {
        #[arg(long, short)]
        message: Vec<String>,
    },
    /// Compute BMI and maintenance calories.
    Calc(CalcArgs),
}

#[derive(Args, Debug)]
struct CalcArgs {
    #[arg(long, default_value = "imperial")]
    unit: UnitSystem,
    #[arg(long, default_value_t = 25)]
    age: u32,
    /// Pounds (imperial) or kilograms (metric).
    #[arg(long, default_value_t = 180.0)]
    weight: f64,
    /// Inches (imperial) or centimetres (metric).
    #[arg(long, default_value_t = 70.0)]
    height: f64,
    /// Level name (`sedentary`, `light`, `active`, `very-active`, `elite`) or multiplier.
    #[arg(long, default_value = "active")]
    activity: ActivityLevel,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Chat { message } => run_chat(&cli.base_url, message).await,
        Command::Calc(args) => run_calc(&args),
    }
}

fn validate_base_url(base_url: &str) -> Result<&str, CliError> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        return Ok(base_url.trim_end_matches('/'));
    }
    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let base_url = validate_base_url(base_url)?;
    let response = reqwest::Client::new()
        .get(format!("{base_url}/healthz"))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

// =============================================================================
// CHAT
// =============================================================================

/// Prints the assistant reply as it streams.
struct TerminalView;

impl ChatView for TerminalView {
    fn message_appended(&mut self, message: &Message) {
        if message.role == Role::Assistant {
            print!("forge> {}", message.content);
            flush_stdout();
        }
    }

    fn fragment_appended(&mut self, _message: &Message, fragment: &str) {
        print!("{fragment}");
        flush_stdout();
    }

    fn busy_changed(&mut self, busy: bool) {
        if !busy {
            println!();
        }
    }

    fn exchange_failed(&mut self, error: &RelayError) {
        eprintln!("error: {error}");
    }
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

async fn run_chat(base_url: &str, messages: Vec<String>) -> Result<(), CliError> {
    let base_url = validate_base_url(base_url)?;
    let mut widget = ChatWidget::new(RelayClient::new(base_url));
    let mut view = TerminalView;

    println!("forge> {GREETING}");

    if !messages.is_empty() {
        for message in messages {
            println!("you> {message}");
            widget.set_input(message);
            if let SubmitOutcome::Failed(e) = widget.submit(&mut view).await {
                return Err(e.into());
            }
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        flush_stdout();
        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };
        widget.set_input(line);
        // Failures are reported by the view; the conversation continues.
        let _ = widget.submit(&mut view).await;
    }
}

// =============================================================================
// CALCULATOR
// =============================================================================

fn run_calc(args: &CalcArgs) -> Result<(), CliError> {
    let state = CalculatorState::new(CalculatorInput {
        unit_system: args.unit,
        age: args.age,
        weight: args.weight,
        height: args.height,
        activity: args.activity,
    });

    for note in range_notes(state.input()) {
        eprintln!("note: {note}");
    }

    if args.json {
        let rendered = serde_json::to_string_pretty(&json!({ "input": state.input(), "result": state.result() }))?;
        println!("{rendered}");
    } else {
        println!("{}", render_calc(&state));
    }
    Ok(())
}

fn render_calc(state: &CalculatorState) -> String {
    let input = state.input();
    let result = state.result();
    format!(
        "Height:      {}\nWeight:      {} {}\nActivity:    {}\nBMI:         {}\nMaintenance: {} kcal/day",
        format_height(input.unit_system, input.height),
        input.weight,
        input.unit_system.weight_unit(),
        input.activity,
        format_bmi(result.bmi),
        format_calories(result.maintenance_calories),
    )
}

/// Inputs outside the ranges the landing page offers.
fn range_notes(input: &CalculatorInput) -> Vec<String> {
    let unit = input.unit_system;
    let checks = [
        ("age", f64::from(input.age), AGE_RANGE, "years"),
        ("weight", input.weight, unit.weight_range(), unit.weight_unit()),
        ("height", input.height, unit.height_range(), unit.height_unit()),
    ];
    checks
        .into_iter()
        .filter(|(_, value, range, _)| !range.contains(*value))
        .map(|(name, value, InputRange { min, max }, label)| {
            format!("{name} {value} is outside the usual {min}-{max} {label} range")
        })
        .collect()
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
