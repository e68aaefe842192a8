//! Status-card content for live and offline streamers.

use platform::{Embed, EmbedAuthor, EmbedFooter, Message, RoleId};
use twitch_api::api::models::{ChannelInfo, GameData, StreamData, UserData, VideoData};

/// Content line for a live announcement. The bare URL is wrapped in
/// angle brackets so the platform does not unfurl it next to the embed.
pub fn online_content(login: &str, notify_role: RoleId) -> String {
    format!("<https://twitch.tv/{login}> \n {}", notify_role.mention())
}

pub fn online_embed(stream: &StreamData, user: &UserData, game: Option<&GameData>) -> Embed {
    let footer_text = match game {
        Some(game) => game.name.clone(),
        None => stream.game_name.clone(),
    };
    let footer_icon = game.map(|g| {
        g.box_art_url
            .replace("{width}", "16")
            .replace("{height}", "16")
    });
    Embed {
        author: Some(EmbedAuthor {
            name: user.display_name.clone(),
            url: Some(format!("https://twitch.tv/{}", user.login)),
            icon_url: non_empty(&user.profile_image_url),
        }),
        url: Some(format!("https://twitch.tv/{}", user.login)),
        title: Some(stream.title.clone()),
        timestamp: Some(stream.started_at),
        footer: Some(EmbedFooter {
            text: footer_text,
            icon_url: footer_icon,
        }),
    }
}

/// Content for the offline card. Points at the VOD when one exists,
/// otherwise falls back to the channel's last known title.
pub fn offline_content(login: &str, channel: &ChannelInfo, vod: Option<&VideoData>) -> String {
    let body = match vod {
        Some(vod) => format!("<{}>\n**{}**\n{}", vod.url, vod.title, channel.game_name),
        None => format!(
            "_VOD not available_\n**{}**\n{}",
            channel.title, channel.game_name
        ),
    };
    format!("<https://twitch.tv/{login}>\n{body}")
}

/// Whether the already-posted card differs from what we would post
/// now. Compares the fields we control; anything else on the message
/// is platform decoration.
pub fn needs_edit(old: &Message, content: &str, embed: Option<&Embed>) -> bool {
    if old.content != content {
        return true;
    }
    match (old.embeds.first(), embed) {
        (None, None) => false,
        (Some(old), Some(new)) => {
            old.title != new.title
                || old.timestamp != new.timestamp
                || old.footer.as_ref().map(|f| &f.text) != new.footer.as_ref().map(|f| &f.text)
        }
        _ => true,
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
