use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use rocket::figment::Figment;
use serde::{Deserialize, Serialize};

/// The `invitation` table of `Rocket.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    pub log_filter: String,
    pub default_addressee: String,
    pub countdown_target: DateTime<FixedOffset>,
    pub couple: Couple,
    pub event: EventDetails,
    pub gifts: Vec<GiftAccount>,
    pub guestbook: GuestbookConfig,
    pub notify: Option<NotifyConfig>,
}

impl InvitationConfig {
    /// Reads the `invitation` table, falling back to defaults when it is absent.
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        figment.focus("invitation").extract()
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        InvitationConfig {
            log_filter: "info".into(),
            default_addressee: "Bapak/Ibu/Saudara/i".into(),
            countdown_target: default_target(),
            couple: Couple::default(),
            event: EventDetails::default(),
            gifts: Vec::new(),
            guestbook: GuestbookConfig::default(),
            notify: None,
        }
    }
}

// Sabtu, 20 Juni 2026, 08.00 WIB
const DEFAULT_TARGET: &str = "2026-06-20T08:00:00+07:00";

fn default_target() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(DEFAULT_TARGET).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Couple {
    pub title: String,
    pub groom: String,
    pub groom_parents: String,
    pub bride: String,
    pub bride_parents: String,
}

impl Default for Couple {
    fn default() -> Self {
        Couple {
            title: "The Wedding Of".into(),
            groom: "Risky Santoso".into(),
            groom_parents: "Putra pertama dari Bapak H. Ahmad Santoso & Ibu Hj. Siti Nurhaliza"
                .into(),
            bride: "Nisa Wardani".into(),
            bride_parents:
                "Putri pertama dari Bapak Dr. H. Bambang Wijaya, M.Si & Ibu Hj. Dewi Kusuma Wardani"
                    .into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDetails {
    pub date_label: String,
    pub time_label: String,
    pub venue: String,
    pub city: String,
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftAccount {
    pub provider: String,
    pub number: String,
    pub holder: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    #[default]
    Memory,
    Mysql,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingStrategy {
    /// Fetch the ordered list from the collection on every read.
    #[default]
    OneShot,
    /// Keep a capped snapshot in sync with collection changes.
    Live,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuestbookConfig {
    pub backend: Backend,
    pub listing: ListingStrategy,
    pub live_limit: usize,
    pub max_name_len: usize,
    pub max_message_len: usize,
    /// Seconds between re-fetches of the live list; 0 turns polling off.
    pub poll_secs: u64,
    pub throttle: ThrottleConfig,
}

/// Width of the `guest_entries.name` column.
pub const NAME_COLUMN_WIDTH: usize = 100;

impl GuestbookConfig {
    /// Number of entries kept in the local list, if capped.
    pub fn cap(&self) -> Option<usize> {
        match self.listing {
            ListingStrategy::OneShot => None,
            ListingStrategy::Live => Some(self.live_limit),
        }
    }

    /// Longest accepted name. Never wider than the storage column.
    pub fn name_limit(&self) -> usize {
        self.max_name_len.min(NAME_COLUMN_WIDTH)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_secs > 0).then(|| Duration::from_secs(self.poll_secs))
    }
}

impl Default for GuestbookConfig {
    fn default() -> Self {
        GuestbookConfig {
            backend: Backend::default(),
            listing: ListingStrategy::default(),
            live_limit: 50,
            max_name_len: NAME_COLUMN_WIDTH,
            max_message_len: 1000,
            poll_secs: 0,
            throttle: ThrottleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub max_submissions: i64,
    pub window_secs: i64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            max_submissions: 5,
            window_secs: 86400,
        }
    }
}

/// SMTP settings for the new-entry mail. The password is read from
/// `SMTP_PASSWORD` at send time.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    pub relay: String,
    pub username: String,
    pub from: String,
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::{Format, Toml};

    #[test]
    fn missing_table_uses_defaults() {
        let config = InvitationConfig::from_figment(&Figment::new()).unwrap();
        assert_eq!(config.default_addressee, "Bapak/Ibu/Saudara/i");
        assert_eq!(config.guestbook.backend, Backend::Memory);
        assert_eq!(config.guestbook.listing, ListingStrategy::OneShot);
        assert_eq!(config.countdown_target.to_rfc3339(), "2026-06-20T08:00:00+07:00");
        assert!(config.notify.is_none());
    }

    #[test]
    fn reads_nested_tables() {
        let figment = Figment::from(Toml::string(
            r#"
            [invitation]
            countdown_target = "2026-02-07T08:00:00+07:00"

            [invitation.guestbook]
            backend = "mysql"
            listing = "live"
            live_limit = 10

            [[invitation.gifts]]
            provider = "DANA"
            number = "089510403610"
            holder = "Nisa"
            "#,
        ));
        let config = InvitationConfig::from_figment(&figment).unwrap();
        assert_eq!(config.guestbook.backend, Backend::Mysql);
        assert_eq!(config.guestbook.cap(), Some(10));
        assert_eq!(config.guestbook.max_name_len, 100);
        assert_eq!(config.gifts.len(), 1);
        assert_eq!(config.countdown_target.to_rfc3339(), "2026-02-07T08:00:00+07:00");
    }

    #[test]
    fn name_limit_never_exceeds_column() {
        let figment = Figment::from(Toml::string(
            r#"
            [invitation.guestbook]
            max_name_len = 250
            poll_secs = 15
            "#,
        ));
        let guestbook = InvitationConfig::from_figment(&figment).unwrap().guestbook;
        assert_eq!(guestbook.max_name_len, 250);
        assert_eq!(guestbook.name_limit(), NAME_COLUMN_WIDTH);
        assert_eq!(guestbook.poll_interval(), Some(Duration::from_secs(15)));

        let narrow = GuestbookConfig {
            max_name_len: 40,
            ..GuestbookConfig::default()
        };
        assert_eq!(narrow.name_limit(), 40);
        assert_eq!(narrow.poll_interval(), None);
    }

    #[test]
    fn couple_parents_default_and_override() {
        let config = InvitationConfig::from_figment(&Figment::new()).unwrap();
        assert!(config.couple.groom_parents.starts_with("Putra pertama"));
        assert!(config.couple.bride_parents.starts_with("Putri pertama"));

        let figment = Figment::from(Toml::string(
            r#"
            [invitation.couple]
            groom_parents = "Putra kedua dari Bapak Joko"
            "#,
        ));
        let couple = InvitationConfig::from_figment(&figment).unwrap().couple;
        assert_eq!(couple.groom_parents, "Putra kedua dari Bapak Joko");
        assert_eq!(couple.groom, "Risky Santoso");
    }

    #[test]
    fn one_shot_listing_is_uncapped() {
        assert_eq!(GuestbookConfig::default().cap(), None);
    }
}
