use std::fmt::Write as _;

use crate::models::{SectionType, UsedItem, WeatherForecast};

use super::context::NewsletterContext;
use super::dates::{GenerationWindow, MonthContext};
use super::template::{CLOSING_FOOTER_MARKER, NEWSLETTER_TEMPLATE};

pub const NEWSLETTER_SYSTEM: &str = "You write San Luis Way Weekly, an English-language email \
newsletter for expats and visitors in San Luis Potosí, Mexico. You output a single HTML \
document and nothing else.";

pub const META_COMMENT_PREFIX: &str = "<!-- NEWSLETTER_META";

const ROLE: &str = r#"
# Role
You are the editor of "San Luis Way Weekly", a friendly, practical newsletter for English-speaking
expats, digital nomads and visitors living in or passing through the city of San Luis Potosí,
in the state of San Luis Potosí, Mexico.

# Goal
Fill in the HTML template at the end of this prompt with this week's content. Use your search tool
to find current local news and events. Keep the HTML structure, inline styles and every
<!-- SECTION_START:... --> / <!-- SECTION_END:... --> comment exactly where they are.
"#;

const FORMAT_RULES: &str = r#"
# Formatting rules
- Replace every [PLACEHOLDER] with real content. Never leave brackets or instructions in the output.
- If you cannot find enough real items for a list, delete the unused list items entirely.
- Keep "Why it matters:" lines short (one sentence) and specific to expats.
- Use only these link targets: sanluisway.com pages, the official pages of venues, and
  Facebook, Instagram, Eventbrite, Ticketmaster or Boletia pages for events. Never invent URLs.
- Do not add images. Leave image placeholders empty.
- Do not wrap the document in Markdown code fences.
- Keep the <!-- COMMUNITY_SECTION_PLACEHOLDER --> and <!-- CLOSING_FOOTER_PLACEHOLDER --> comments.
"#;

/// Date, place and currency constraints shared by every prompt. Several of
/// them are stated more than once on purpose.
pub fn constraints_block(window: &GenerationWindow, months: &MonthContext) -> String {
    let previous_en = months.previous_en.join(" or ");
    let previous_es = months.previous_es.join(" o ");
    format!(
        r#"
# Date constraints
- Today is {today}. This issue covers {range}.
- Only include news published in {current_en} ({current_es}) and events happening between
  {range}.
- REJECT anything dated {previous_en} (in Spanish: {previous_es}). Search results from those months
  are stale. If an article mentions {previous_en}, skip it.
- Always write literal dates, times and addresses ("Saturday, {example_date} at 7:00 PM, Teatro de la
  Paz, Villerías 205"). Never write "this weekend", "tomorrow" or "next week".

# Geographic constraints
- All content must be about the city of San Luis Potosí or the state of San Luis Potosí, MEXICO.
- Do NOT include anything from San Luis Obispo (California), San Luis (Argentina), San Luis (Arizona)
  or any other place that shares the name.
- If you are unsure whether something is in San Luis Potosí, Mexico, leave it out.

# Currency
- Give every price in Mexican pesos, written as "$250 MXN". Never use USD.

# Reminder
- Only {current_en} ({current_es}) content. Nothing from {previous_en}.
- Only San Luis Potosí, Mexico.
"#,
        today = window.today_label(),
        range = window.label,
        current_en = months.current_en,
        current_es = months.current_es,
        previous_en = previous_en,
        previous_es = previous_es,
        example_date = window.end.format("%B %-d"),
    )
}

pub fn weather_block(weather: Option<&WeatherForecast>) -> String {
    let Some(forecast) = weather else {
        return "\n# Weather\nNo forecast data is available. Search for the current 7-day forecast for \
San Luis Potosí, Mexico and summarize it in degrees Celsius.\n"
            .to_string();
    };

    let mut out = String::from("\n# Weather (use this data, do not search)\n");
    let _ = writeln!(out, "Summary: {}", forecast.summary);
    let _ = writeln!(
        out,
        "Now: {:.0}°C, {}",
        forecast.current.temperature, forecast.current.description
    );
    for day in &forecast.daily {
        let rain = day
            .precipitation_probability
            .map(|p| format!(", {p:.0}% chance of rain"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "- {}: {}, high {:.0}°C, low {:.0}°C{}",
            day.date.format("%A %B %-d"),
            day.description,
            day.temp_max,
            day.temp_min,
            rain
        );
    }
    out
}

fn events_block(context: &NewsletterContext) -> String {
    if context.events.is_empty() {
        return "\n# Events from our calendar\nNo events are listed in our calendar for these dates. \
Search for real events in San Luis Potosí during the date range.\n"
            .to_string();
    }

    let mut out = String::from(
        "\n# Events from our calendar (prefer these, and use these exact links)\n",
    );
    for event in &context.events {
        let _ = write!(
            out,
            "- {} | {}",
            event.title,
            event
                .start_date
                .with_timezone(&super::dates::city_offset())
                .format("%A, %B %-d at %-I:%M %p")
        );
        if let Some(location) = &event.location {
            let _ = write!(out, " | {location}");
        }
        let _ = writeln!(out, " | {}", event.link(&context.site_url));
        if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "  {}", truncate(description, 280));
        }
    }
    out
}

fn blog_block(context: &NewsletterContext) -> String {
    if context.blog_posts.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "\n# Recent San Luis Way articles (you may mention one in the intro or CTA, with its link)\n",
    );
    for post in &context.blog_posts {
        let _ = writeln!(out, "- {} | {}", post.title, post.link(&context.site_url));
        if let Some(excerpt) = post.excerpt.as_deref().filter(|e| !e.is_empty()) {
            let _ = writeln!(out, "  {}", truncate(excerpt, 200));
        }
    }
    out
}

fn exclusion_block(heading: &str, items: &[UsedItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = format!("\n# {heading} (already used, pick something different)\n");
    for item in items {
        let _ = writeln!(out, "- {}", item.title);
    }
    out
}

fn meta_instruction() -> String {
    format!(
        r#"
# Machine-readable summary
Directly before {CLOSING_FOOTER_MARKER}, add exactly one HTML comment of this form with the items
you chose (plain text, no HTML inside the JSON):
{META_COMMENT_PREFIX} {{"fact":{{"title":"...","body":"..."}},"tip":{{"title":"...","body":"..."}},"place":{{"name":"...","description":"..."}}}} -->
"#
    )
}

/// The full-issue prompt: instructions, context, then the template verbatim.
pub fn build_newsletter_prompt(context: &NewsletterContext) -> String {
    let mut prompt = String::new();
    prompt.push_str(ROLE);
    prompt.push_str(&constraints_block(&context.window, &context.months));
    prompt.push_str(&weather_block(context.weather.as_ref()));
    prompt.push_str(&events_block(context));
    prompt.push_str(&blog_block(context));
    prompt.push_str(&exclusion_block(
        "Facts for \"Did You Know?\"",
        &context.used_facts,
    ));
    prompt.push_str(&exclusion_block("Expat tips", &context.used_tips));
    prompt.push_str(&exclusion_block(
        "Places for \"Place of the Week\"",
        &context.used_places,
    ));
    prompt.push_str(FORMAT_RULES);
    prompt.push_str(&meta_instruction());
    prompt.push_str("\n# Template\n");
    prompt.push_str(NEWSLETTER_TEMPLATE);
    prompt
}

fn section_instructions(section: SectionType) -> &'static str {
    match section {
        SectionType::Header => {
            "Rewrite the header: keep the title, update the date range and write a warm two-sentence intro."
        }
        SectionType::Weather => {
            "Rewrite the weather block from the forecast data: one summary paragraph, the week's high and low, and one practical tip (sunscreen, jacket for cold mornings, umbrella)."
        }
        SectionType::News => {
            "Write three current local news items. Each has a linked headline, a two-sentence summary and a one-sentence \"Why it matters:\" line for expats."
        }
        SectionType::Events => {
            "List three to five real events in the date range with name, literal date and time, venue and address, price in MXN, one-sentence description and a link."
        }
        SectionType::Fact => {
            "Write one surprising, verifiable fact about San Luis Potosí history, culture, food or nature: an <h3> title and one paragraph."
        }
        SectionType::Tip => {
            "Write one practical tip for expats living in San Luis Potosí (paperwork, transport, banking, health, shopping): an <h3> title and one paragraph."
        }
        SectionType::Place => {
            "Feature one restaurant, café, museum, park or shop in San Luis Potosí: an <h3> name, one descriptive paragraph, the literal street address and a link."
        }
        SectionType::Community => {
            "Polish the community announcement: keep every fact, make the tone friendly and concise."
        }
        SectionType::Cta => {
            "Write a short call to action inviting readers to explore sanluisway.com (a title, one sentence and a button label)."
        }
        SectionType::Footer => "Keep the footer unchanged.",
    }
}

/// Prompt for rewriting a single section in place.
pub fn build_section_prompt(
    section: SectionType,
    current_html: &str,
    window: &GenerationWindow,
    months: &MonthContext,
    weather: Option<&WeatherForecast>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(ROLE);
    prompt.push_str(&constraints_block(window, months));
    if section == SectionType::Weather {
        prompt.push_str(&weather_block(weather));
    }
    let _ = write!(
        prompt,
        r#"
# Task
You are regenerating only the "{id}" section of an existing issue.
{instructions}

Return only the replacement HTML for this section, using the same structure and inline styles as
the current version below. Keep the <!-- SECTION_START:{id} --> and <!-- SECTION_END:{id} -->
comments. No images, no Markdown fences, no commentary.

# Current section
{current_html}
"#,
        id = section.id(),
        instructions = section_instructions(section),
    );
    prompt
}

pub const COMMUNITY_SYSTEM: &str = "You edit short community announcements for a friendly \
expat newsletter. You reply with JSON only.";

/// Asks the small model to restyle user-supplied text without changing facts.
pub fn build_community_prompt(raw_text: &str) -> String {
    format!(
        r#"Rewrite the community announcement below for the San Luis Way Weekly newsletter.

Rules:
- Friendly, warm and concise (at most 80 words in the body).
- Keep every date, time, place, price and contact detail exactly as given.
- Do not invent anything.
- Reply with a single JSON object and nothing else:
  {{"title": "short title with one emoji", "body": "the rewritten text", "cta": "optional short call to action or null"}}

Announcement:
{raw_text}
"#
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlogPost, CurrentConditions, DailyForecast, Event};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn context() -> NewsletterContext {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        NewsletterContext {
            window: GenerationWindow::starting(today),
            months: MonthContext::for_date(today),
            site_url: "https://www.sanluisway.com".to_string(),
            events: vec![Event {
                id: 7,
                title: "Festival de Xantolo".to_string(),
                description: Some("Traditional Huasteca celebration".to_string()),
                start_date: Utc.with_ymd_and_hms(2026, 10, 24, 1, 0, 0).unwrap(),
                end_date: None,
                location: Some("Plaza de Armas".to_string()),
                category: None,
                url: None,
            }],
            blog_posts: vec![BlogPost {
                id: 1,
                title: "Best enchiladas potosinas".to_string(),
                slug: "best-enchiladas".to_string(),
                excerpt: None,
                published_at: Utc::now(),
            }],
            used_facts: vec![UsedItem::new("The Caja Real", "...")],
            used_tips: Vec::new(),
            used_places: vec![UsedItem::new("Museo Laberinto", "...")],
            weather: None,
        }
    }

    #[test]
    fn full_prompt_carries_constraints_context_and_template() {
        let prompt = build_newsletter_prompt(&context());

        assert!(prompt.contains("Today is October 19, 2026"));
        assert!(prompt.contains("REJECT anything dated September or August"));
        assert!(prompt.contains("septiembre o agosto"));
        assert!(prompt.contains("San Luis Obispo"));
        assert!(prompt.contains("MXN"));
        assert!(prompt.contains(
            "- Festival de Xantolo | Friday, October 23 at 7:00 PM | Plaza de Armas | https://www.sanluisway.com/events/7"
        ));
        assert!(prompt.contains("https://www.sanluisway.com/blog/best-enchiladas"));
        assert!(prompt.contains("- The Caja Real"));
        assert!(prompt.contains("- Museo Laberinto"));
        assert!(!prompt.contains("# Expat tips"));
        assert!(prompt.contains("Search for the current 7-day forecast"));
        assert!(prompt.contains(META_COMMENT_PREFIX));
        assert!(prompt.ends_with(NEWSLETTER_TEMPLATE));
    }

    #[test]
    fn weather_data_replaces_search_instruction() {
        let forecast = WeatherForecast {
            current: CurrentConditions {
                temperature: 19.6,
                humidity: None,
                wind_speed: None,
                description: "Clear sky".to_string(),
            },
            daily: vec![DailyForecast {
                date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                temp_max: 25.0,
                temp_min: 9.0,
                precipitation_probability: Some(20.0),
                description: "Mainly clear".to_string(),
            }],
            summary: "Dry and sunny.".to_string(),
        };

        let block = weather_block(Some(&forecast));

        assert!(block.contains("Summary: Dry and sunny."));
        assert!(block.contains("Now: 20°C, Clear sky"));
        assert!(block.contains("- Monday October 19: Mainly clear, high 25°C, low 9°C, 20% chance of rain"));
        assert!(!block.contains("Search for"));
    }

    #[test]
    fn section_prompt_only_includes_weather_for_weather() {
        let ctx = context();
        let tip = build_section_prompt(SectionType::Tip, "<p>old</p>", &ctx.window, &ctx.months, None);
        assert!(tip.contains("regenerating only the \"tip\" section"));
        assert!(tip.contains("<p>old</p>"));
        assert!(!tip.contains("# Weather"));

        let weather =
            build_section_prompt(SectionType::Weather, "<p>old</p>", &ctx.window, &ctx.months, None);
        assert!(weather.contains("# Weather"));
        assert!(weather.contains("San Luis Obispo"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let text = "a".repeat(300);
        let cut = truncate(&text, 10);
        assert_eq!(cut, format!("{}…", "a".repeat(10)));
        assert_eq!(truncate("short", 10), "short");
    }
}
