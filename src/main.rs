use anyhow::Result;
use chrono::Utc;
use confab::messages::Sender;
use confab::reminders::{Reminder, ReminderStore};
use confab::session::{SessionCommand, SessionConfig, SessionEvent, SessionPipeline};
use confab::transport::{EchoTransport, TransportConfig};
use confab::voice::{
    RecognizerCapability, SimulatedRecognizer, SimulatedSynthesizer, SynthesizerCapability,
    VoiceBridge,
};
use std::io::{self, BufRead};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confab=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Confab chat session");

    let mut transport = TransportConfig::default();
    if let Ok(base_url) = std::env::var("CONFAB_BASE_URL") {
        transport = TransportConfig::new(base_url);
    }
    if let Ok(token) = std::env::var("CONFAB_CSRF_TOKEN") {
        transport = transport.with_csrf_token(token);
    }
    let config = SessionConfig::new().with_transport(transport);

    let voice = VoiceBridge::new(
        RecognizerCapability::Available(Box::new(SimulatedRecognizer::default())),
        SynthesizerCapability::Available(Box::new(SimulatedSynthesizer)),
    );

    let mut pipeline = SessionPipeline::new(config)?.with_voice(voice);
    if std::env::var("CONFAB_SIMULATE").is_ok() {
        info!("using the simulated backend");
        pipeline = pipeline.with_transport(Box::new(
            EchoTransport::new().with_delay(Duration::from_millis(500)),
        ));
    }

    let commands = pipeline.command_sender();
    let events = pipeline.event_receiver();
    let worker = pipeline.start_worker()?;

    let printer = std::thread::spawn(move || {
        for event in events.iter() {
            match event {
                SessionEvent::MessageAppended(message) if message.sender == Sender::Bot => {
                    if !message.text.is_empty() {
                        println!("bot: {}", message.text);
                    }
                }
                SessionEvent::TypingStarted { .. } => println!("bot is typing..."),
                SessionEvent::ReplyComplete { text, .. } => println!("bot: {}", text),
                SessionEvent::TranscriptReady(text) => println!("(voice) {}", text),
                SessionEvent::SubmissionRejected { reason } => println!("! {}", reason),
                SessionEvent::Notice(notice) => println!("! {}", notice),
                SessionEvent::Shutdown => break,
                _ => {}
            }
        }
    });

    let reminders = ReminderStore::new();

    println!("type a message, /listen for voice input, /clear to reset, /quit to exit");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if let Some(title) = trimmed.strip_prefix("/remind ") {
            match reminders.add(Reminder::new(title, "", Utc::now())) {
                Some(_) => println!("reminder added: {}", title),
                None => println!("! reminders need a title"),
            }
            continue;
        }
        if trimmed == "/reminders" {
            for reminder in reminders.active() {
                println!("- {}", reminder.title);
            }
            continue;
        }
        let send_result = match trimmed {
            "" => Ok(()),
            "/quit" => break,
            "/listen" => commands.send(SessionCommand::StartListening),
            "/clear" => commands.send(SessionCommand::ClearConversation),
            text => commands.send(SessionCommand::Submit(text.to_string())),
        };
        if send_result.is_err() {
            // Worker is gone; nothing left to drive.
            break;
        }
    }

    let _ = commands.send(SessionCommand::Shutdown);
    let _ = worker.join();
    let _ = printer.join();
    Ok(())
}
