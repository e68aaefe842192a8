//! Canonical panel message text.

use platform::{ReactionKey, Role};

/// Render the panel body from its sorted mapping.
///
/// Suppressed panels are safe to mention roles in, so they use real
/// role mentions; panels that would ping use the plain role name in
/// backticks instead.
pub fn render_panel(section: &str, mappings: &[(ReactionKey, Role)], suppressed: bool) -> String {
    let mut lines = Vec::with_capacity(mappings.len() + 1);
    lines.push(format!("**{section}** : "));
    for (key, role) in mappings {
        if suppressed {
            lines.push(format!("{} {}", key.mention(), role.id.mention()));
        } else {
            lines.push(format!("{} `{}`", key.mention(), role.name));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use platform::RoleId;

    use super::*;

    fn mapping() -> Vec<(ReactionKey, Role)> {
        vec![
            (
                ReactionKey::Unicode("🔧".to_string()),
                Role {
                    id: RoleId(10),
                    name: "builders".to_string(),
                },
            ),
            (
                ReactionKey::Custom {
                    id: 77,
                    name: "ferris".to_string(),
                    animated: false,
                },
                Role {
                    id: RoleId(11),
                    name: "rustaceans".to_string(),
                },
            ),
        ]
    }

    #[test]
    fn suppressed_panel_uses_role_mentions() {
        let text = render_panel("languages", &mapping(), true);
        assert_eq!(text, "**languages** : \n🔧 <@&10>\n<:ferris:77> <@&11>");
    }

    #[test]
    fn unsuppressed_panel_uses_plain_names() {
        let text = render_panel("languages", &mapping(), false);
        assert_eq!(text, "**languages** : \n🔧 `builders`\n<:ferris:77> `rustaceans`");
    }

    #[test]
    fn empty_mapping_renders_header_only() {
        assert_eq!(render_panel("colors", &[], true), "**colors** : ");
    }
}
