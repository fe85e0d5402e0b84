//! # Checkpoint CLI
//!
//! Terminal front-end for the human-verification core.
//!
//! ## Commands
//! ```text
//! checkpoint challenge [--svg out.svg]     text CAPTCHA, answers on stdin
//! checkpoint recover --recipient <id>      OTP confirmation flow
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use checkpoint::otp::{KeyOutcome, ResendOutcome, SubmitOutcome};
use checkpoint::{Activation, AppConfig, ChallengeGenerator, HttpOtpService, OtpFlowController};
use checkpoint_common::{FlowEvent, OtpSnapshot};

/// Checkpoint - human-verification challenges
#[derive(Parser, Debug)]
#[command(name = "checkpoint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/checkpoint.toml")]
    config: String,

    /// OTP service base URL (overrides config)
    #[arg(long, env = "OTP_SERVICE_URL")]
    otp_service_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a text challenge and check answers typed on stdin
    Challenge {
        /// Also write the challenge image to this file
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Confirm a one-time passcode sent to a recipient
    Recover {
        /// Identifier the code was issued to
        #[arg(long, env = "CHECKPOINT_RECIPIENT")]
        recipient: Option<String>,

        /// Role sent with resend requests (overrides config)
        #[arg(long)]
        role: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("🛂 Starting Checkpoint v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(&args.config)?;
    if let Some(ref url) = args.otp_service_url {
        config.otp_service.base_url = url.clone();
    }

    match args.command {
        Command::Challenge { svg } => run_challenge(svg.as_deref()).await,
        Command::Recover { recipient, role } => {
            if let Some(role) = role {
                config.otp.role = role;
            }
            config.validate()?;
            run_recover(config, recipient).await
        }
    }
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

async fn run_challenge(svg_path: Option<&Path>) -> Result<()> {
    let mut generator =
        ChallengeGenerator::from_os_rng().context("Secure random source unavailable")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        show_challenge(&mut generator, svg_path).await?;
        println!("Type the characters shown, or `refresh` for a new challenge:");

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let answer = line.trim();

        if answer.eq_ignore_ascii_case("refresh") {
            generator.generate();
            continue;
        }

        if generator.set_answer(answer) {
            println!("✅ Challenge passed");
            return Ok(());
        }
        println!("❌ Incorrect answer");
    }
}

async fn show_challenge(generator: &mut ChallengeGenerator, svg_path: Option<&Path>) -> Result<()> {
    match svg_path {
        Some(path) => {
            let markup = generator.render_markup();
            tokio::fs::write(path, markup)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Challenge image written to {}", path.display());
        }
        None => {
            let glyphs: Vec<String> = generator
                .challenge()
                .glyphs()
                .map(|(c, style)| format!("{}({:+}°)", c, style.rotation_degrees))
                .collect();
            println!("{}", glyphs.join("  "));
        }
    }
    Ok(())
}

async fn run_recover(config: AppConfig, recipient: Option<String>) -> Result<()> {
    let service = Arc::new(HttpOtpService::new(&config.otp_service)?);
    let (activation, mut events) =
        OtpFlowController::activate(recipient.as_deref(), service, &config.otp);

    let Activation::Active(flow) = activation else {
        tracing::warn!("No recipient given; request a code first and pass --recipient");
        return Ok(());
    };

    println!("Enter the code digits, then `submit`. Other commands: back, resend, status, quit");
    print_status(&flow.snapshot().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&flow, line.trim()).await {
                    break;
                }
            }
            Some(event) = events.recv() => match event {
                FlowEvent::Verified(verified) => {
                    println!("✅ Code accepted for {}", verified.recipient);
                    println!("{}", serde_json::to_string(&verified)?);
                    return Ok(());
                }
                FlowEvent::ResendReady => println!("You can now request a new code (`resend`)"),
                FlowEvent::Redirected => break,
            },
        }
    }

    flow.dispose();
    Ok(())
}

/// Apply one line of input; returns false to leave the flow
async fn handle_command(flow: &OtpFlowController, command: &str) -> bool {
    match command {
        "quit" | "exit" => return false,
        "status" => {}
        "back" => {
            let focus = flow.snapshot().await.focus;
            flow.backspace(focus).await;
        }
        "submit" => match flow.submit().await {
            SubmitOutcome::Incomplete => println!("Fill every digit first"),
            SubmitOutcome::Busy => println!("Already checking the code"),
            // Handled through the event channel
            SubmitOutcome::Verified(_) => return true,
            _ => {}
        },
        "resend" => {
            if let ResendOutcome::CoolingDown(secs) = flow.resend().await {
                println!("You can request a new code in {secs}s");
            }
        }
        digits => {
            let mut focus = flow.snapshot().await.focus;
            for c in digits.chars() {
                match flow.input(focus, &c.to_string()).await {
                    KeyOutcome::Accepted { focus: next } => focus = next,
                    KeyOutcome::Rejected => {
                        println!("Ignored {c:?}: only digits are accepted");
                        break;
                    }
                }
            }
        }
    }

    print_status(&flow.snapshot().await);
    true
}

fn print_status(snapshot: &OtpSnapshot) {
    let cells: String = snapshot
        .digits
        .iter()
        .map(|d| d.unwrap_or('_'))
        .collect();
    let resend = match snapshot.resend.remaining_secs() {
        0 => "resend available".to_string(),
        secs => format!("resend in {secs}s"),
    };

    println!("[{cells}] {:?}, {resend}", snapshot.attempt);
    if let Some(message) = &snapshot.message {
        println!("{}", message.text);
    }
}
