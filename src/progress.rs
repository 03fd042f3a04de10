//! XP and daily streak scoring.
//!
//! Scoring is a pure function of the user's current progress, the domains a
//! design touched and which of them the user has already been credited for.
//! Persisting the result is the store's job, see
//! [`ProgressStore::score_interaction`](crate::store::ProgressStore::score_interaction).

use std::collections::BTreeSet;

use serde::Serialize;
use time::Date;

use crate::domain::Domain;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Awarded the first time a user's design touches a domain.
pub const FIRST_USE_XP: i64 = 30;
/// Awarded for every later touch of an already credited domain.
pub const REPEAT_XP: i64 = 5;

impl Domain {
    /// Flat bonus added whenever the domain is present, on top of the
    /// first-use or repeat award.
    pub fn flat_bonus(self) -> i64 {
        match self {
            Domain::Cloud => 30,
            Domain::Display => 20,
            Domain::Actuator => 20,
            Domain::Sensor => 0,
        }
    }
}

/// Gamification state of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub xp: i64,
    /// Zero until the first scored interaction.
    pub streak: i32,
    #[serde(with = "iso_date::option")]
    pub last_visit: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub progress: Progress,
    pub xp_gained: i64,
    /// Domains credited for the first time by this interaction. The caller
    /// must record them together with `progress`.
    pub first_uses: BTreeSet<Domain>,
}

pub fn next_streak(streak: i32, last_visit: Option<Date>, today: Date) -> i32 {
    let Some(last) = last_visit else {
        return 1;
    };
    match (today - last).whole_days() {
        1 => streak + 1,
        gap if gap > 1 => 1,
        // same-day repeat (or a last visit dated after today): keep the streak
        _ => streak.max(1),
    }
}

pub fn score<F>(
    current: &Progress,
    domains: &BTreeSet<Domain>,
    is_first_use: F,
    today: Date,
) -> Scored
where
    F: Fn(Domain) -> bool,
{
    let mut xp_gained = 0;
    let mut first_uses = BTreeSet::new();

    for &domain in domains {
        if is_first_use(domain) {
            xp_gained += FIRST_USE_XP;
            first_uses.insert(domain);
        } else {
            xp_gained += REPEAT_XP;
        }
        xp_gained += domain.flat_bonus();
    }

    Scored {
        progress: Progress {
            xp: current.xp + xp_gained,
            streak: next_streak(current.streak, current.last_visit, today),
            last_visit: Some(today),
        },
        xp_gained,
        first_uses,
    }
}
