//! Calendar math on the city clock.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};

/// San Luis Potosí has stayed on UTC-6 year round since 2022.
const CITY_UTC_OFFSET_SECS: i32 = 6 * 3600;

/// Days after today covered by a generation run.
pub const WINDOW_DAYS: i64 = 7;

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub fn city_offset() -> FixedOffset {
    FixedOffset::west_opt(CITY_UTC_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// Today's date on the city's wall clock.
pub fn city_today() -> NaiveDate {
    Utc::now().with_timezone(&city_offset()).date_naive()
}

/// Dates of the ISO week containing `reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterDates {
    pub current_date: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub date_range: String,
}

pub fn current_newsletter_dates(reference: NaiveDate) -> NewsletterDates {
    let days_from_monday = reference.weekday().num_days_from_monday() as i64;
    let week_start = reference - Duration::days(days_from_monday);
    let week_end = week_start + Duration::days(6);

    NewsletterDates {
        current_date: long_date(reference),
        week_start,
        week_end,
        date_range: format_range(week_start, week_end),
    }
}

/// The forward window a generation run writes about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationWindow {
    pub today: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl GenerationWindow {
    pub fn starting(today: NaiveDate) -> Self {
        let end = today + Duration::days(WINDOW_DAYS);
        Self {
            today,
            end,
            label: format_range(today, end),
        }
    }

    pub fn today_label(&self) -> String {
        long_date(self.today)
    }

    /// Start of `today` and end of `end` on the city clock, as UTC instants.
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let offset = city_offset();
        let to_utc = |date: NaiveDate, time: NaiveTime| {
            offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| date.and_time(time).and_utc())
        };
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
        (
            to_utc(self.today, NaiveTime::default()),
            to_utc(self.end, end_of_day),
        )
    }
}

/// Month names used to steer the model away from stale search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthContext {
    pub current_en: String,
    pub current_es: String,
    /// The two months before the current one, most recent first.
    pub previous_en: Vec<String>,
    pub previous_es: Vec<String>,
}

impl MonthContext {
    pub fn for_date(date: NaiveDate) -> Self {
        let month0 = date.month0() as usize;
        let previous: Vec<usize> = (1..=2).map(|back| (month0 + 12 - back) % 12).collect();

        Self {
            current_en: english_month(month0).to_string(),
            current_es: SPANISH_MONTHS[month0].to_string(),
            previous_en: previous
                .iter()
                .map(|m| english_month(*m).to_string())
                .collect(),
            previous_es: previous
                .iter()
                .map(|m| SPANISH_MONTHS[*m].to_string())
                .collect(),
        }
    }
}

fn english_month(month0: usize) -> &'static str {
    const ENGLISH_MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    ENGLISH_MONTHS[month0 % 12]
}

pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn format_range(start: NaiveDate, end: NaiveDate) -> String {
    if start.year() == end.year() {
        format!(
            "{} - {}, {}",
            start.format("%B %-d"),
            end.format("%B %-d"),
            end.year()
        )
    } else {
        format!("{} - {}", long_date(start), long_date(end))
    }
}
