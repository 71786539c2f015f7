use std::io::Read;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value as JsonValue, json};
use tinymail_core::{MailClient, MailboxView, Outcome, Session, Uid};
use tinymail_http::HttpMailApi;
use tokio::runtime::Runtime;

use super::config::AppConfig;
use super::render::render;

pub(crate) const CLI_SCHEMA_VERSION: u32 = 1;

#[derive(Parser, Debug)]
#[command(name = "tinymail", version, about = "Minimal client for the tinymail web API")]
pub(crate) struct Cli {
    /// Base URL of the tinymail server
    #[arg(long, global = true)]
    server: Option<String>,
    /// Login identity (email address)
    #[arg(long, global = true)]
    email: Option<String>,
    /// Summaries fetched per page
    #[arg(long = "page-size", global = true)]
    page_size: Option<usize>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// List the account's mailboxes
    Mailboxes,
    /// List message summaries of a mailbox
    List(ListCmd),
    /// Print one message
    Read(ReadCmd),
    /// Send a message (body from --body or stdin)
    Send(SendCmd),
    /// Print a text rendering of the client state
    View(ViewCmd),
}

#[derive(Args, Debug)]
pub(crate) struct ListCmd {
    #[arg(long)]
    mailbox: Option<String>,
    /// Extra pages to load after the initial listing
    #[arg(long, default_value_t = 0)]
    pages: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ReadCmd {
    #[arg(long)]
    mailbox: Option<String>,
    #[arg(long)]
    uid: Uid,
}

#[derive(Args, Debug)]
pub(crate) struct SendCmd {
    #[arg(long)]
    to: String,
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long)]
    body: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ViewCmd {
    #[arg(long)]
    mailbox: Option<String>,
    #[arg(long, default_value_t = 0)]
    pages: usize,
    #[arg(long)]
    uid: Option<Uid>,
}

pub(crate) fn output_ok(value: JsonValue) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string(&json!({
            "schema": CLI_SCHEMA_VERSION,
            "ok": true,
            "result": value
        }))?
    );
    Ok(())
}

pub(crate) fn output_error(message: &str) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string(&json!({
            "schema": CLI_SCHEMA_VERSION,
            "ok": false,
            "error": message
        }))?
    );
    Ok(())
}

impl Cli {
    pub(crate) fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(email) = &self.email {
            config.email = Some(email.clone());
        }
        if let Some(page_size) = self.page_size {
            config.client.page_size = page_size;
        }
    }
}

// Sequential commands never overlap, so a busy gate means something is wrong.
fn done<T>(outcome: Outcome<T>, what: &str) -> Result<T> {
    outcome
        .done()
        .ok_or_else(|| anyhow!("{} is busy", what))
}

fn login(rt: &Runtime, config: &AppConfig) -> Result<MailClient<HttpMailApi>> {
    let email = config
        .email
        .as_deref()
        .ok_or_else(|| anyhow!("no login identity (set email or TINYMAIL_EMAIL)"))?;
    let password = config
        .password
        .as_deref()
        .ok_or_else(|| anyhow!("TINYMAIL_PASSWORD is not set"))?;
    let api = HttpMailApi::new(&config.server, Duration::from_secs(config.timeout_secs))?;
    let session = Session::basic(email, password);
    let client = rt.block_on(MailClient::login(api, session, config.client.clone()))?;
    // A failed first listing leaves the session usable; the mailbox retries on select.
    if let Err(err) = rt.block_on(client.open_first_mailbox()) {
        log::warn!("opening first mailbox failed: {}", err);
    }
    Ok(client)
}

/// The named mailbox, or the first one the server listed.
fn resolve_mailbox(client: &MailClient<HttpMailApi>, requested: Option<&str>) -> Result<String> {
    if let Some(name) = requested {
        return Ok(name.to_string());
    }
    client
        .mailboxes()
        .first()
        .map(|mailbox| mailbox.name().to_string())
        .ok_or_else(|| anyhow!("account has no mailboxes"))
}

fn open_with_pages(
    rt: &Runtime,
    client: &MailClient<HttpMailApi>,
    name: &str,
    pages: usize,
) -> Result<MailboxView> {
    let mut view = done(rt.block_on(client.select_mailbox(name))?, name)?;
    for _ in 0..pages {
        if !view.has_more {
            break;
        }
        view = done(rt.block_on(client.load_more(name))?, name)?;
    }
    Ok(view)
}

/// Pages through `name` until `uid` is loaded or the cursor runs out.
fn page_until_loaded(
    rt: &Runtime,
    client: &MailClient<HttpMailApi>,
    name: &str,
    uid: Uid,
) -> Result<()> {
    let mut view = done(rt.block_on(client.select_mailbox(name))?, name)?;
    loop {
        if client.mailbox(name)?.cache().contains(uid) {
            return Ok(());
        }
        if !view.has_more {
            bail!("message {} not found in {}", uid, name);
        }
        let before = view.messages.len();
        view = done(rt.block_on(client.load_more(name))?, name)?;
        if view.messages.len() == before {
            bail!("server returned no summaries for {}", name);
        }
    }
}

fn read_body(body: Option<String>) -> Result<String> {
    if let Some(body) = body {
        return Ok(body);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

pub(crate) fn run_cli(rt: &Runtime, command: CliCommand, config: &AppConfig) -> Result<()> {
    let client = login(rt, config)?;

    match command {
        CliCommand::Mailboxes => {
            let names: Vec<&str> = client.mailboxes().iter().map(|m| m.name()).collect();
            output_ok(json!(names))
        }
        CliCommand::List(args) => {
            let name = resolve_mailbox(&client, args.mailbox.as_deref())?;
            let view = open_with_pages(rt, &client, &name, args.pages)?;
            output_ok(serde_json::to_value(view)?)
        }
        CliCommand::Read(args) => {
            let name = resolve_mailbox(&client, args.mailbox.as_deref())?;
            page_until_loaded(rt, &client, &name, args.uid)?;
            let body = done(rt.block_on(client.open_message(&name, args.uid))?, "reading pane")?;
            output_ok(serde_json::to_value(body)?)
        }
        CliCommand::Send(args) => {
            let compose = client.compose();
            let body = read_body(args.body)?;
            compose.edit(|draft| {
                draft.to = args.to;
                draft.subject = args.subject;
                draft.body = body;
            });
            done(rt.block_on(client.send(&compose))?, "draft")?;
            output_ok(json!({ "sent": compose.is_closed() }))
        }
        CliCommand::View(args) => {
            let name = resolve_mailbox(&client, args.mailbox.as_deref())?;
            match args.uid {
                Some(uid) => {
                    page_until_loaded(rt, &client, &name, uid)?;
                    done(rt.block_on(client.open_message(&name, uid))?, "reading pane")?;
                }
                None => {
                    open_with_pages(rt, &client, &name, args.pages)?;
                }
            }
            print!("{}", render(&client.view()));
            Ok(())
        }
    }
}
