mod content;
mod newsletter;
mod section;
mod weather;

pub use content::{BlogPost, Event};
pub use newsletter::{NewsletterDraft, StoredNewsletter, UsedItem, UsedKind};
pub use section::{NewsletterSection, RegenerationStatus, SectionType};
pub use weather::{CurrentConditions, DailyForecast, WeatherForecast};
