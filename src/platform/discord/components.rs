// ABOUTME: Discord message components and embeds for move-request prompts and replies
// ABOUTME: Encodes request handles into button custom ids and maps reply tones to embed colours

use dragme_core::traits::{Decision, Tone};
use serenity::all::{ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed};

/// Prefix shared by every custom id this bot issues
const CUSTOM_ID_PREFIX: &str = "dragme";

/// Build the custom id for one of a prompt's buttons
pub fn custom_id(decision: Decision, handle: &str) -> String {
    format!("{}:{}:{}", CUSTOM_ID_PREFIX, decision.as_str(), handle)
}

/// Split a custom id into its decision and request handle.
///
/// Returns `None` for ids issued by anything else.
pub fn parse_custom_id(custom_id: &str) -> Option<(Decision, &str)> {
    let mut parts = custom_id.splitn(3, ':');
    if parts.next()? != CUSTOM_ID_PREFIX {
        return None;
    }
    let decision = Decision::parse(parts.next()?)?;
    let handle = parts.next().filter(|h| !h.is_empty())?;
    Some((decision, handle))
}

/// Accept and reject buttons bound to a request handle
pub fn decision_buttons(handle: &str) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(custom_id(Decision::Accept, handle))
            .label("Accept")
            .style(ButtonStyle::Success),
        CreateButton::new(custom_id(Decision::Reject, handle))
            .label("Reject")
            .style(ButtonStyle::Danger),
    ])]
}

pub fn tone_colour(tone: Tone) -> Colour {
    match tone {
        Tone::Neutral => Colour::BLURPLE,
        Tone::Success => Colour::DARK_GREEN,
        Tone::Error => Colour::RED,
    }
}

/// Titled replies render as an embed; untitled ones stay plain text
pub fn reply_embed(title: &str, content: &str, tone: Tone) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(content)
        .colour(tone_colour(tone))
}
