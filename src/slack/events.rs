//! Slack Events API and slash-command payloads.

use serde::Deserialize;

/// Outer body of a POST to the events endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    /// Sent once when the endpoint is registered; the challenge is echoed.
    UrlVerification { challenge: String },
    EventCallback {
        #[serde(default)]
        event: Option<SlackEvent>,
    },
    #[serde(other)]
    Other,
}

/// The inner event of an `event_callback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// A message the bot should answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel: String,
    pub text: String,
    pub user: Option<String>,
}

/// Why an event was not answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotAMessage,
    FromBot,
    NoText,
    NoChannel,
    NotMentioned,
}

/// Decide whether `event` should be answered.
///
/// Bot-authored and text-less messages are always ignored. With
/// `require_mention`, the text must contain `<@bot_user_id>` or the word
/// "bot" in any case.
pub fn answerable(
    event: &SlackEvent,
    bot_user_id: &str,
    require_mention: bool,
) -> Result<IncomingMessage, Skip> {
    if event.bot_id.is_some() {
        return Err(Skip::FromBot);
    }
    if event.kind != "message" {
        return Err(Skip::NotAMessage);
    }
    let text = match event.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(Skip::NoText),
    };
    let channel = event.channel.as_deref().ok_or(Skip::NoChannel)?;

    if require_mention && !mentions_bot(text, bot_user_id) {
        return Err(Skip::NotMentioned);
    }

    Ok(IncomingMessage {
        channel: channel.to_string(),
        text: text.to_string(),
        user: event.user.clone(),
    })
}

fn mentions_bot(text: &str, bot_user_id: &str) -> bool {
    (!bot_user_id.is_empty() && text.contains(&format!("<@{}>", bot_user_id)))
        || text.to_lowercase().contains("bot")
}

/// Slash command form fields (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(text: &str) -> SlackEvent {
        SlackEvent {
            kind: "message".into(),
            channel: Some("C1".into()),
            text: Some(text.into()),
            user: Some("U1".into()),
            bot_id: None,
        }
    }

    #[test]
    fn test_parse_url_verification() {
        let env: SlackEnvelope = serde_json::from_value(json!({
            "token": "t", "challenge": "abc123", "type": "url_verification"
        }))
        .unwrap();
        assert_eq!(
            env,
            SlackEnvelope::UrlVerification {
                challenge: "abc123".into()
            }
        );
    }

    #[test]
    fn test_parse_event_callback() {
        let env: SlackEnvelope = serde_json::from_value(json!({
            "type": "event_callback",
            "team_id": "T1",
            "event": {"type": "message", "channel": "C9", "text": "hey bot", "user": "U2", "ts": "1.2"}
        }))
        .unwrap();
        let SlackEnvelope::EventCallback { event: Some(event) } = env else {
            panic!("expected event callback");
        };
        assert_eq!(event.channel.as_deref(), Some("C9"));
        assert_eq!(event.text.as_deref(), Some("hey bot"));
    }

    #[test]
    fn test_parse_unknown_type() {
        let env: SlackEnvelope =
            serde_json::from_value(json!({"type": "app_rate_limited"})).unwrap();
        assert_eq!(env, SlackEnvelope::Other);
    }

    #[test]
    fn test_mention_rules() {
        assert!(answerable(&message("<@UBOT> save this"), "UBOT", true).is_ok());
        assert!(answerable(&message("hey Bot, read notes"), "UBOT", true).is_ok());
        assert_eq!(
            answerable(&message("hello all"), "UBOT", true),
            Err(Skip::NotMentioned)
        );
        assert!(answerable(&message("hello all"), "UBOT", false).is_ok());
    }

    #[test]
    fn test_ignored_events() {
        let mut from_bot = message("bot says hi");
        from_bot.bot_id = Some("B1".into());
        assert_eq!(answerable(&from_bot, "", false), Err(Skip::FromBot));

        let mut no_text = message("");
        assert_eq!(answerable(&no_text, "", false), Err(Skip::NoText));
        no_text.text = None;
        assert_eq!(answerable(&no_text, "", false), Err(Skip::NoText));

        let mut reaction = message("bot");
        reaction.kind = "reaction_added".into();
        assert_eq!(answerable(&reaction, "", false), Err(Skip::NotAMessage));
    }
}
