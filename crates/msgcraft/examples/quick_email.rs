//! Builds a minimal plain-text email and writes it to the path given as the
//! first command-line argument.
//!
//! ```text
//! cargo run --example quick_email -- hello.msg
//! ```
use msgcraft::{MessageDescription, RecipientKind, Sender};
use std::fs::File;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: quick_email <output-path>")?;

    let mut desc = MessageDescription::new(
        "Hello from msgcraft",
        Sender::new("sender@example.com", "A. Sender"),
    );
    desc.add_recipient("recipient@example.com", "A. Recipient", RecipientKind::To);
    desc.body.plain = Some("This message was synthesized without Outlook or MAPI.".to_string());

    let file = File::create(&path)?;
    msgcraft::write(&desc, time::OffsetDateTime::now_utc(), file)?;
    println!("wrote {path}");
    Ok(())
}
