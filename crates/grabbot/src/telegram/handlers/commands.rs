//! Command and plain-text message handlers

use lazy_regex::regex_find;
use teloxide::prelude::*;
use teloxide::types::Message;
use url::Url;

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::keyboard::format_keyboard;
use crate::telegram::{messages, Bot};

pub(super) async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let text = match cmd {
        Command::Start => messages::start(deps.advertised_ceiling()),
        Command::Help => messages::help(deps.advertised_ceiling(), deps.policy()),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Answers a posted link with the format keyboard.
pub(super) async fn handle_text_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(url) = detect_url(text) else {
        // unknown commands end up here too
        if let Some(hint) = missing_link_reply(msg.chat.is_private()) {
            bot.send_message(msg.chat.id, hint).await?;
        }
        return Ok(());
    };

    let pending_id = deps.pending.insert(url.clone()).await;
    log::info!(
        "Chat {} posted {} (pending {}, ~{} waiting)",
        msg.chat.id,
        url,
        pending_id,
        deps.pending.entry_count()
    );

    bot.send_message(msg.chat.id, messages::CHOOSE_FORMAT)
        .reply_markup(format_keyboard(&pending_id))
        .await?;
    Ok(())
}

/// Group chats are full of text that is not meant for the bot; only a
/// private chat gets told that a link is missing.
pub(super) fn missing_link_reply(is_private: bool) -> Option<&'static str> {
    is_private.then_some(messages::NO_LINK)
}

/// First `http(s)://` link in a message, if it parses and has a host.
pub fn detect_url(text: &str) -> Option<Url> {
    let candidate = regex_find!(r#"(?i)https?://[^\s<>"']+"#, text)?;
    let candidate = candidate.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']']);

    let url = Url::parse(candidate).ok()?;
    url.host_str().filter(|host| !host.is_empty())?;
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_url_in_text() {
        let url = detect_url("look at this https://www.youtube.com/watch?v=dQw4w9WgXcQ please").unwrap();
        assert_eq!(url.as_str(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_detect_url_strips_trailing_punctuation() {
        let url = detect_url("(see https://youtu.be/abc).").unwrap();
        assert_eq!(url.as_str(), "https://youtu.be/abc");
    }

    #[test]
    fn test_first_url_wins() {
        let url = detect_url("http://a.example/1 https://b.example/2").unwrap();
        assert_eq!(url.host_str(), Some("a.example"));
    }

    #[test]
    fn test_missing_link_reply_only_in_private_chats() {
        assert_eq!(missing_link_reply(true), Some(messages::NO_LINK));
        assert_eq!(missing_link_reply(false), None);
    }

    #[test]
    fn test_no_url() {
        assert!(detect_url("hello there").is_none());
        assert!(detect_url("ftp://example.com/file").is_none());
        assert!(detect_url("https://").is_none());
    }
}
