//! Per-user timezones and local-time lookups.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use platform::{GuildId, UserId};
use store::Database;

use crate::error::{BotError, BotResult};

/// Zones offered when a name fails to parse. A hand-picked subset;
/// the full IANA list is too long for a chat message.
const SUGGESTED_ZONES: &[&str] = &[
    "UTC",
    "Europe/London",
    "Europe/Berlin",
    "Europe/Paris",
    "Europe/Moscow",
    "America/New_York",
    "America/Chicago",
    "America/Los_Angeles",
    "America/Sao_Paulo",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Asia/Kolkata",
    "Australia/Sydney",
];

pub struct LocalTime {
    db: Database,
}

impl LocalTime {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a user's timezone. Matching against the IANA database is
    /// case-insensitive.
    pub fn set_timezone(&self, guild: GuildId, user: UserId, zone_name: &str) -> BotResult<String> {
        let tz = parse_zone(zone_name).ok_or_else(|| {
            BotError::Validation(format!(
                "unknown timezone {zone_name}; try one of: {}",
                SUGGESTED_ZONES.join(", ")
            ))
        })?;
        self.db.set_timezone(guild, user, tz.name())?;
        tracing::info!(%guild, %user, zone = tz.name(), "timezone set");
        Ok(format!("timezone set to {}", tz.name()))
    }

    /// Report a user's current local time, with the hour offset
    /// relative to the requester when both have zones on record.
    pub fn local_time_for(
        &self,
        guild: GuildId,
        requester: UserId,
        target: UserId,
        target_name: &str,
    ) -> BotResult<String> {
        let Some(target_zone) = self.zone_of(guild, target)? else {
            return Ok(format!("{target_name} has not set their timezone"));
        };

        let now = Utc::now();
        let mut reply = format!(
            "it is {} for {target_name} ({})",
            format_time(now, target_zone),
            target_zone.name()
        );
        if let Some(requester_zone) = self.zone_of(guild, requester)? {
            let delta = offset_hours(now, target_zone) - offset_hours(now, requester_zone);
            if delta != 0.0 {
                let direction = if delta > 0.0 { "ahead of" } else { "behind" };
                reply.push_str(&format!(", {:.1} hours {direction} you", delta.abs()));
            }
        }
        Ok(reply)
    }

    /// Sorted listing of the suggested zones, for a help reply.
    pub fn zone_listing() -> String {
        let mut zones: Vec<&str> = SUGGESTED_ZONES.to_vec();
        zones.sort_unstable();
        zones.join("\n")
    }

    fn zone_of(&self, guild: GuildId, user: UserId) -> BotResult<Option<Tz>> {
        let Some(name) = self.db.get_timezone(guild, user)? else {
            return Ok(None);
        };
        match name.parse::<Tz>() {
            Ok(tz) => Ok(Some(tz)),
            Err(_) => Err(BotError::Validation(format!(
                "stored timezone {name} is no longer valid, please set it again"
            ))),
        }
    }
}

fn parse_zone(raw: &str) -> Option<Tz> {
    let raw = raw.trim();
    if let Ok(tz) = raw.parse::<Tz>() {
        return Some(tz);
    }
    chrono_tz::TZ_VARIANTS
        .iter()
        .find(|tz| tz.name().eq_ignore_ascii_case(raw))
        .copied()
}

fn format_time(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%H:%M").to_string()
}

fn offset_hours(now: DateTime<Utc>, tz: Tz) -> f64 {
    let seconds = tz
        .offset_from_utc_datetime(&now.naive_utc())
        .fix()
        .local_minus_utc();
    f64::from(seconds) / 3600.0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parse_zone_is_case_insensitive() {
        assert_eq!(parse_zone("europe/berlin"), Some(chrono_tz::Europe::Berlin));
        assert_eq!(parse_zone("UTC"), Some(chrono_tz::UTC));
        assert_eq!(parse_zone("Not/AZone"), None);
    }

    #[test]
    fn offsets_span_zones() {
        // A winter instant, so Berlin is at +1 and Kolkata at +5.5.
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(offset_hours(now, chrono_tz::Europe::Berlin), 1.0);
        assert_eq!(offset_hours(now, chrono_tz::Asia::Kolkata), 5.5);
        assert_eq!(format_time(now, chrono_tz::Asia::Kolkata), "17:30");
    }

    #[test]
    fn unset_timezone_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let times = LocalTime::new(db);
        let reply = times
            .local_time_for(GuildId(7), UserId(1), UserId(2), "alice")
            .unwrap();
        assert_eq!(reply, "alice has not set their timezone");
    }

    #[test]
    fn set_and_query_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let times = LocalTime::new(db);
        times
            .set_timezone(GuildId(7), UserId(2), "europe/berlin")
            .unwrap();
        let reply = times
            .local_time_for(GuildId(7), UserId(1), UserId(2), "alice")
            .unwrap();
        assert!(reply.contains("Europe/Berlin"));
    }

    #[test]
    fn zone_listing_is_sorted() {
        let listing = LocalTime::zone_listing();
        let lines: Vec<&str> = listing.lines().collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
        assert!(lines.contains(&"UTC"));
    }

    #[test]
    fn bad_zone_suggests_alternatives() {
        let db = Database::open_in_memory().unwrap();
        let times = LocalTime::new(db);
        let err = times
            .set_timezone(GuildId(7), UserId(2), "Moon/Crater")
            .unwrap_err();
        assert!(err.user_message().contains("Europe/London"));
    }
}
