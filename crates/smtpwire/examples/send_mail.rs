//! Sends one message and prints every protocol event.
//!
//! ```text
//! SMTP_HOST=smtp.example.com SMTP_PORT=587 SMTP_USER=me SMTP_PASS=secret \
//! MAIL_FROM=me@example.com MAIL_TO=you@example.com \
//! RUST_LOG=smtpwire=debug cargo run --example send_mail
//! ```

use std::env;

use smtpwire::{Client, Config, Credentials, Envelope, ProtocolEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> smtpwire::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smtpwire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("SMTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(25);
    let from = env::var("MAIL_FROM").unwrap_or_default();
    let to = env::var("MAIL_TO").unwrap_or_else(|_| "postmaster@localhost".to_string());

    let mut builder = Config::builder(host).port(port).name("smtpwire.local");
    if let (Ok(user), Ok(pass)) = (env::var("SMTP_USER"), env::var("SMTP_PASS")) {
        builder = builder.auth(Credentials::password(user, pass));
    }

    let mut client = Client::connect(builder.build()).await?;
    let mut sent = false;

    while let Some(event) = client.next_event().await? {
        println!("{event:?}");
        match event {
            ProtocolEvent::Idle if !sent => {
                client.use_envelope(Envelope::new(from.clone(), [to.clone()]));
            }
            ProtocolEvent::Idle => client.quit(),
            ProtocolEvent::Ready { .. } => {
                client.send(&format!("From: {from}\r\nTo: {to}\r\n"));
                client.send("Subject: smtpwire test\r\n\r\n");
                client.end(Some("Hello from smtpwire.\r\n"));
            }
            ProtocolEvent::Done { success } => {
                sent = true;
                println!("delivered: {success}");
                client.quit();
            }
            _ => {}
        }
    }

    Ok(())
}
