//! The newsletter's HTML skeleton and the fixed fragments spliced into it.
//!
//! Every region the editor can work on is wrapped in
//! `<!-- SECTION_START:<id> -->` / `<!-- SECTION_END:<id> -->` comments.

use crate::models::SectionType;

pub const CLOSING_FOOTER_MARKER: &str = "<!-- CLOSING_FOOTER_PLACEHOLDER -->";
pub const COMMUNITY_MARKER: &str = "<!-- COMMUNITY_SECTION_PLACEHOLDER -->";

/// Every placeholder the model is expected to fill.
pub const PLACEHOLDERS: &[&str] = &[
    "[HERO_IMAGE_URL]",
    "[HERO_IMAGE_ALT]",
    "[NEWSLETTER_DATE_RANGE]",
    "[NEWSLETTER_INTRO]",
    "[WEATHER_SUMMARY]",
    "[WEATHER_TEMP_HIGH]",
    "[WEATHER_TEMP_LOW]",
    "[WEATHER_TIP]",
    "[NEWS_HEADLINE_1]",
    "[NEWS_SUMMARY_1]",
    "[NEWS_WHY_IT_MATTERS_1]",
    "[NEWS_LINK_1]",
    "[NEWS_HEADLINE_2]",
    "[NEWS_SUMMARY_2]",
    "[NEWS_WHY_IT_MATTERS_2]",
    "[NEWS_LINK_2]",
    "[NEWS_HEADLINE_3]",
    "[NEWS_SUMMARY_3]",
    "[NEWS_WHY_IT_MATTERS_3]",
    "[NEWS_LINK_3]",
    "[EVENT_NAME_1]",
    "[EVENT_DATE_1]",
    "[EVENT_LOCATION_1]",
    "[EVENT_PRICE_1]",
    "[EVENT_DESCRIPTION_1]",
    "[EVENT_LINK_1]",
    "[EVENT_NAME_2]",
    "[EVENT_DATE_2]",
    "[EVENT_LOCATION_2]",
    "[EVENT_PRICE_2]",
    "[EVENT_DESCRIPTION_2]",
    "[EVENT_LINK_2]",
    "[EVENT_NAME_3]",
    "[EVENT_DATE_3]",
    "[EVENT_LOCATION_3]",
    "[EVENT_PRICE_3]",
    "[EVENT_DESCRIPTION_3]",
    "[EVENT_LINK_3]",
    "[FACT_TITLE]",
    "[FACT_BODY]",
    "[TIP_TITLE]",
    "[TIP_BODY]",
    "[PLACE_NAME]",
    "[PLACE_DESCRIPTION]",
    "[PLACE_ADDRESS]",
    "[PLACE_LINK]",
    "[CTA_TITLE]",
    "[CTA_TEXT]",
    "[CTA_BUTTON_TEXT]",
    "[CTA_URL]",
];

pub fn section_start(section: SectionType) -> String {
    format!("<!-- SECTION_START:{} -->", section.id())
}

pub fn section_end(section: SectionType) -> String {
    format!("<!-- SECTION_END:{} -->", section.id())
}

pub const NEWSLETTER_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>San Luis Way Weekly</title>
<style>
  body { margin: 0; padding: 0; background-color: #f3f4f6; font-family: Arial, Helvetica, sans-serif; }
  .container { max-width: 600px; margin: 0 auto; background-color: #ffffff; }
  .section-title { font-size: 20px; font-weight: bold; color: #1e3a8a; }
  .event-card { border-left: 4px solid #3b82f6; padding-left: 12px; }
  @media only screen and (max-width: 620px) { .container { width: 100% !important; } }
</style>
<!--[if mso]>
<style type="text/css">
  table { border-collapse: collapse; }
</style>
<![endif]-->
</head>
<body>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color: #f3f4f6;">
<tr>
<td align="center" style="padding: 24px 12px;">
<table role="presentation" class="container" width="600" cellpadding="0" cellspacing="0" border="0" style="max-width: 600px; background-color: #ffffff; border-radius: 12px;">

<!-- SECTION_START:header -->
<tr>
<td class="header" style="background: linear-gradient(135deg, #1e3a8a 0%, #3b82f6 100%); padding: 32px 24px; text-align: center; border-radius: 12px 12px 0 0;">
<img src="[HERO_IMAGE_URL]" alt="[HERO_IMAGE_ALT]" width="552" style="display: block; width: 100%; max-width: 552px; border-radius: 8px;">
<h1 style="margin: 16px 0 4px; color: #ffffff; font-size: 28px;">San Luis Way Weekly</h1>
<p style="margin: 0; color: #dbeafe; font-size: 14px;">[NEWSLETTER_DATE_RANGE]</p>
<p style="margin: 16px 0 0; color: #ffffff; font-size: 16px; line-height: 1.5;">[NEWSLETTER_INTRO]</p>
</td>
</tr>
<!-- SECTION_END:header -->

<!-- SECTION_START:weather -->
<tr>
<td style="padding: 24px;">
<h2 class="section-title" style="margin: 0 0 12px; color: #1e3a8a; font-size: 20px;">☀️ This Week's Weather</h2>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background: linear-gradient(135deg, #e0f2fe 0%, #bae6fd 100%); border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
<tr>
<td style="padding: 16px;">
<p style="margin: 0 0 8px; font-size: 15px; line-height: 1.5; color: #1f2937;">[WEATHER_SUMMARY]</p>
<p style="margin: 0 0 8px; font-size: 14px; color: #1f2937;"><strong>High:</strong> [WEATHER_TEMP_HIGH] &nbsp; <strong>Low:</strong> [WEATHER_TEMP_LOW]</p>
<p style="margin: 0; font-size: 14px; color: #374151;">[WEATHER_TIP]</p>
</td>
</tr>
</table>
</td>
</tr>
<!-- SECTION_END:weather -->

<!-- SECTION_START:news -->
<tr>
<td style="padding: 24px;">
<h2 class="section-title" style="margin: 0 0 12px; color: #1e3a8a; font-size: 20px;">📰 Local News</h2>
<ul style="margin: 0; padding-left: 20px; color: #1f2937;">
<li style="margin-bottom: 16px;">
<p style="margin: 0 0 4px; font-weight: bold;"><a href="[NEWS_LINK_1]" style="color: #1e3a8a;">[NEWS_HEADLINE_1]</a></p>
<p style="margin: 0 0 4px; font-size: 14px; line-height: 1.5;">[NEWS_SUMMARY_1]</p>
<p style="margin: 0; font-size: 14px;"><strong>Why it matters:</strong> [NEWS_WHY_IT_MATTERS_1]</p>
</li>
<li style="margin-bottom: 16px;">
<p style="margin: 0 0 4px; font-weight: bold;"><a href="[NEWS_LINK_2]" style="color: #1e3a8a;">[NEWS_HEADLINE_2]</a></p>
<p style="margin: 0 0 4px; font-size: 14px; line-height: 1.5;">[NEWS_SUMMARY_2]</p>
<p style="margin: 0; font-size: 14px;"><strong>Why it matters:</strong> [NEWS_WHY_IT_MATTERS_2]</p>
</li>
<li style="margin-bottom: 16px;">
<p style="margin: 0 0 4px; font-weight: bold;"><a href="[NEWS_LINK_3]" style="color: #1e3a8a;">[NEWS_HEADLINE_3]</a></p>
<p style="margin: 0 0 4px; font-size: 14px; line-height: 1.5;">[NEWS_SUMMARY_3]</p>
<p style="margin: 0; font-size: 14px;"><strong>Why it matters:</strong> [NEWS_WHY_IT_MATTERS_3]</p>
</li>
</ul>
</td>
</tr>
<!-- SECTION_END:news -->

<!-- SECTION_START:events -->
<tr>
<td style="padding: 24px;">
<h2 class="section-title" style="margin: 0 0 12px; color: #1e3a8a; font-size: 20px;">🎉 Events This Week</h2>
<div class="event-card" style="border-left: 4px solid #3b82f6; padding-left: 12px; margin-bottom: 16px;">
<p style="margin: 0 0 4px; font-weight: bold; font-size: 16px;">[EVENT_NAME_1]</p>
<p style="margin: 0 0 4px; font-size: 14px; color: #374151;">📅 [EVENT_DATE_1] &nbsp; 📍 [EVENT_LOCATION_1] &nbsp; 💵 [EVENT_PRICE_1]</p>
<p style="margin: 0 0 4px; font-size: 14px; line-height: 1.5;">[EVENT_DESCRIPTION_1]</p>
<a href="[EVENT_LINK_1]" style="color: #3b82f6; font-size: 14px;">More info →</a>
</div>
<div class="event-card" style="border-left: 4px solid #3b82f6; padding-left: 12px; margin-bottom: 16px;">
<p style="margin: 0 0 4px; font-weight: bold; font-size: 16px;">[EVENT_NAME_2]</p>
<p style="margin: 0 0 4px; font-size: 14px; color: #374151;">📅 [EVENT_DATE_2] &nbsp; 📍 [EVENT_LOCATION_2] &nbsp; 💵 [EVENT_PRICE_2]</p>
<p style="margin: 0 0 4px; font-size: 14px; line-height: 1.5;">[EVENT_DESCRIPTION_2]</p>
<a href="[EVENT_LINK_2]" style="color: #3b82f6; font-size: 14px;">More info →</a>
</div>
<div class="event-card" style="border-left: 4px solid #3b82f6; padding-left: 12px; margin-bottom: 16px;">
<p style="margin: 0 0 4px; font-weight: bold; font-size: 16px;">[EVENT_NAME_3]</p>
<p style="margin: 0 0 4px; font-size: 14px; color: #374151;">📅 [EVENT_DATE_3] &nbsp; 📍 [EVENT_LOCATION_3] &nbsp; 💵 [EVENT_PRICE_3]</p>
<p style="margin: 0 0 4px; font-size: 14px; line-height: 1.5;">[EVENT_DESCRIPTION_3]</p>
<a href="[EVENT_LINK_3]" style="color: #3b82f6; font-size: 14px;">More info →</a>
</div>
</td>
</tr>
<!-- SECTION_END:events -->

<!-- SECTION_START:fact -->
<tr>
<td style="padding: 24px;">
<h2 class="section-title" style="margin: 0 0 12px; color: #1e3a8a; font-size: 20px;">💡 Did You Know?</h2>
<h3 style="margin: 0 0 8px; font-size: 16px; color: #1f2937;">[FACT_TITLE]</h3>
<p style="margin: 0; font-size: 14px; line-height: 1.6; color: #374151;">[FACT_BODY]</p>
</td>
</tr>
<!-- SECTION_END:fact -->

<!-- SECTION_START:tip -->
<tr>
<td style="padding: 24px;">
<h2 class="section-title" style="margin: 0 0 12px; color: #1e3a8a; font-size: 20px;">🧭 Expat Tip of the Week</h2>
<h3 style="margin: 0 0 8px; font-size: 16px; color: #1f2937;">[TIP_TITLE]</h3>
<p style="margin: 0; font-size: 14px; line-height: 1.6; color: #374151;">[TIP_BODY]</p>
</td>
</tr>
<!-- SECTION_END:tip -->

<!-- SECTION_START:place -->
<tr>
<td style="padding: 24px;">
<h2 class="section-title" style="margin: 0 0 12px; color: #1e3a8a; font-size: 20px;">📍 Place of the Week</h2>
<h3 style="margin: 0 0 8px; font-size: 16px; color: #1f2937;">[PLACE_NAME]</h3>
<p style="margin: 0 0 8px; font-size: 14px; line-height: 1.6; color: #374151;">[PLACE_DESCRIPTION]</p>
<p style="margin: 0; font-size: 13px; color: #6b7280;">📌 [PLACE_ADDRESS] &nbsp; <a href="[PLACE_LINK]" style="color: #3b82f6;">Learn more</a></p>
</td>
</tr>
<!-- SECTION_END:place -->

<!-- COMMUNITY_SECTION_PLACEHOLDER -->

<!-- SECTION_START:cta -->
<tr>
<td style="padding: 24px;">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background: linear-gradient(135deg, #f59e0b 0%, #ef4444 100%); border-radius: 12px;">
<tr>
<td style="padding: 24px; text-align: center;">
<h2 style="margin: 0 0 8px; color: #ffffff; font-size: 20px;">✨ [CTA_TITLE]</h2>
<p style="margin: 0 0 16px; color: #ffffff; font-size: 15px; line-height: 1.5;">[CTA_TEXT]</p>
<a href="[CTA_URL]" style="display: inline-block; background-color: #ffffff; color: #b91c1c; padding: 12px 24px; border-radius: 6px; font-weight: bold; text-decoration: none; box-shadow: 0 4px 6px rgba(0,0,0,0.15);">[CTA_BUTTON_TEXT]</a>
</td>
</tr>
</table>
</td>
</tr>
<!-- SECTION_END:cta -->

<!-- CLOSING_FOOTER_PLACEHOLDER -->

</table>
</td>
</tr>
</table>
</body>
</html>"##;

/// Hand-written sign-off spliced in after generation so the model never
/// rewrites it.
pub const CLOSING_FOOTER: &str = r##"<!-- SECTION_START:footer -->
<tr>
<td style="padding: 24px; background-color: #1e3a8a; border-radius: 0 0 12px 12px; text-align: center;">
<p style="margin: 0 0 8px; color: #ffffff; font-size: 18px; font-weight: bold;">¡Hasta la próxima! 👋</p>
<p style="margin: 0 0 16px; color: #dbeafe; font-size: 14px; line-height: 1.5;">Thanks for reading San Luis Way Weekly. Know someone who just moved to San Luis Potosí? Forward this email their way.</p>
<p style="margin: 0 0 16px; font-size: 14px;">
<a href="https://www.sanluisway.com" style="color: #ffffff; text-decoration: none;">🌐 Website</a> &nbsp;|&nbsp;
<a href="https://www.instagram.com/sanluisway" style="color: #ffffff; text-decoration: none;">📸 Instagram</a> &nbsp;|&nbsp;
<a href="https://www.facebook.com/sanluisway" style="color: #ffffff; text-decoration: none;">👍 Facebook</a> &nbsp;|&nbsp;
<a href="mailto:info@sanluisway.com" style="color: #ffffff; text-decoration: none;">✉️ Contact</a>
</p>
<p style="margin: 0; color: #93c5fd; font-size: 12px;">You are receiving this because you subscribed at sanluisway.com.</p>
</td>
</tr>
<!-- SECTION_END:footer -->"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_contains_every_placeholder() {
        for placeholder in PLACEHOLDERS {
            assert!(
                NEWSLETTER_TEMPLATE.contains(placeholder),
                "missing {placeholder}"
            );
        }
    }

    #[test]
    fn template_has_injection_markers() {
        assert!(NEWSLETTER_TEMPLATE.contains(CLOSING_FOOTER_MARKER));
        assert!(NEWSLETTER_TEMPLATE.contains(COMMUNITY_MARKER));
        assert!(NEWSLETTER_TEMPLATE.contains("[HERO_IMAGE_URL]"));
        assert!(NEWSLETTER_TEMPLATE.contains("[CTA_TITLE]"));
    }

    #[test]
    fn template_markers_are_balanced() {
        for section in [
            SectionType::Header,
            SectionType::Weather,
            SectionType::News,
            SectionType::Events,
            SectionType::Fact,
            SectionType::Tip,
            SectionType::Place,
            SectionType::Cta,
        ] {
            let start = NEWSLETTER_TEMPLATE.find(&section_start(section));
            let end = NEWSLETTER_TEMPLATE.find(&section_end(section));
            assert!(matches!((start, end), (Some(s), Some(e)) if s < e), "{section:?}");
        }
    }

    #[test]
    fn footer_signs_off() {
        assert!(CLOSING_FOOTER.contains("Hasta la próxima"));
        assert!(CLOSING_FOOTER.contains("🌐 Website"));
        assert!(CLOSING_FOOTER.starts_with(&section_start(SectionType::Footer)));
        assert!(CLOSING_FOOTER.ends_with(&section_end(SectionType::Footer)));
    }
}
