// src/services/expiry.rs

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{common::clock, middleware::i18n::Locale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryStatus {
    Expired,
    NearExpiry,
    Fresh,
    /// The stored date could not be parsed
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: ExpiryStatus,
    pub days_until_expiry: Option<i64>,
}

/// `Expired` before today, `NearExpiry` within `threshold_days` (inclusive, today counts), else `Fresh`.
pub fn classify(expiry: NaiveDate, today: NaiveDate, threshold_days: i64) -> Classification {
    let days = (expiry - today).num_days();
    let status = if days < 0 {
        ExpiryStatus::Expired
    } else if days <= threshold_days {
        ExpiryStatus::NearExpiry
    } else {
        ExpiryStatus::Fresh
    };
    Classification { status, days_until_expiry: Some(days) }
}

/// Same as [`classify`] for the text column; unparseable input yields `Invalid`.
pub fn classify_text(expiry: &str, today: NaiveDate, threshold_days: i64) -> Classification {
    match clock::parse_date(expiry) {
        Some(date) => classify(date, today, threshold_days),
        None => Classification { status: ExpiryStatus::Invalid, days_until_expiry: None },
    }
}

impl Classification {
    pub fn label(&self, locale: &Locale) -> String {
        let days = self.days_until_expiry.unwrap_or_default();
        match (self.status, locale.is_english()) {
            (ExpiryStatus::Expired, _) => "❌ Expired".to_string(),
            (ExpiryStatus::NearExpiry, true) => format!("⚠️ Near expiry ({} days left)", days),
            (ExpiryStatus::NearExpiry, false) => format!("⚠️ Hampir kedaluwarsa ({} hari lagi)", days),
            (ExpiryStatus::Fresh, true) => format!("✅ Fresh ({} days left)", days),
            (ExpiryStatus::Fresh, false) => format!("✅ Aman ({} hari lagi)", days),
            (ExpiryStatus::Invalid, true) => "⏳ Invalid date".to_string(),
            (ExpiryStatus::Invalid, false) => "⏳ Tidak valid".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()
    }

    #[test]
    fn ten_days_out_depends_on_threshold() {
        let expiry = today() + Duration::days(10);
        assert_eq!(classify(expiry, today(), 7).status, ExpiryStatus::Fresh);
        assert_eq!(classify(expiry, today(), 30).status, ExpiryStatus::NearExpiry);
    }

    #[test]
    fn boundaries() {
        let t = today();
        assert_eq!(classify(t - Duration::days(1), t, 7).status, ExpiryStatus::Expired);
        assert_eq!(classify(t, t, 7).status, ExpiryStatus::NearExpiry);
        assert_eq!(classify(t + Duration::days(7), t, 7).status, ExpiryStatus::NearExpiry);
        assert_eq!(classify(t + Duration::days(8), t, 7).status, ExpiryStatus::Fresh);
        assert_eq!(classify(t + Duration::days(8), t, 7).days_until_expiry, Some(8));
    }

    #[test]
    fn status_never_goes_back_as_expiry_moves_earlier() {
        fn rank(s: ExpiryStatus) -> u8 {
            match s {
                ExpiryStatus::Fresh => 0,
                ExpiryStatus::NearExpiry => 1,
                ExpiryStatus::Expired => 2,
                ExpiryStatus::Invalid => unreachable!(),
            }
        }
        for threshold in [0, 7, 30] {
            let mut last = 0;
            for offset in (-40..=40).rev() {
                let status = classify(today() + Duration::days(offset), today(), threshold).status;
                assert!(rank(status) >= last, "offset {offset} threshold {threshold}");
                last = rank(status);
            }
        }
    }

    #[test]
    fn unparseable_dates_fail_closed() {
        let c = classify_text("10/11/2025", today(), 7);
        assert_eq!(c.status, ExpiryStatus::Invalid);
        assert_eq!(c.days_until_expiry, None);
        assert_eq!(c.label(&Locale::default()), "⏳ Tidak valid");
        assert_eq!(classify_text("", today(), 7).status, ExpiryStatus::Invalid);
    }

    #[test]
    fn labels_are_localised() {
        let c = classify_text("2025-11-15", today(), 7);
        assert_eq!(c.label(&Locale("id".into())), "⚠️ Hampir kedaluwarsa (5 hari lagi)");
        assert_eq!(c.label(&Locale("en".into())), "⚠️ Near expiry (5 days left)");
        assert_eq!(classify_text("2025-11-01", today(), 7).label(&Locale::default()), "❌ Expired");
    }
}
