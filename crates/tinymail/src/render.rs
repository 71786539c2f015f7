use tinymail_core::{AppView, MailboxView, OpenMessage};

fn display_name(name: &str) -> &str {
    if name == "INBOX" { "Inbox" } else { name }
}

/// Plain-text rendering of the application state.
pub(crate) fn render(view: &AppView) -> String {
    let mut out = String::new();
    out.push_str(&format!("tinymail - {}\n\n", view.identity));

    let selected = view.selected.as_ref().map(|mailbox| mailbox.name.as_str());
    for name in &view.mailboxes {
        let marker = if Some(name.as_str()) == selected { '>' } else { ' ' };
        out.push_str(&format!("{} {}\n", marker, display_name(name)));
    }

    if let Some(mailbox) = &view.selected {
        out.push('\n');
        render_mailbox(&mut out, mailbox);
    }
    if let Some(message) = &view.pane {
        out.push('\n');
        render_message(&mut out, message);
    }
    out
}

fn render_mailbox(out: &mut String, mailbox: &MailboxView) {
    out.push_str(&format!(
        "{} ({} loaded)\n",
        display_name(&mailbox.name),
        mailbox.messages.len()
    ));
    for msg in &mailbox.messages {
        let unread = if msg.seen { ' ' } else { 'N' };
        out.push_str(&format!(
            "  {} {:>6}  {}  {}\n",
            unread, msg.uid, msg.from, msg.subject
        ));
    }
    if mailbox.has_more {
        out.push_str("  -- load more --\n");
    }
}

fn render_message(out: &mut String, message: &OpenMessage) {
    out.push_str(&format!("From: {}\n", message.body.from));
    out.push_str(&format!("Subject: {}\n\n", message.body.subject));
    out.push_str(&message.body.body);
    if !message.body.body.ends_with('\n') {
        out.push('\n');
    }
}
