//! Report cards for the history view.

use chrono::{DateTime, FixedOffset, Utc};

use crate::draft::ReportRecord;
use crate::payload::Payload;
use crate::reply::{Button, Card, Template};
use crate::store::MediaUrls;

/// Title of the pagination button on the last card of a page.
pub const VIEW_MORE_TITLE: &str = "view more";

/// Format a stored UTC timestamp in the configured local zone.
pub fn localize(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Renders pages of [`ReportRecord`]s as card templates.
pub struct ReportTemplates<'a> {
    media: &'a dyn MediaUrls,
    offset: FixedOffset,
}

impl<'a> ReportTemplates<'a> {
    pub fn new(media: &'a dyn MediaUrls, offset: FixedOffset) -> Self {
        Self { media, offset }
    }

    /// Render one page.
    ///
    /// `records` is the history fetched past the page end, newest first. A
    /// single record becomes a detail card. Otherwise the first `limit`
    /// records become a carousel, and when records remain beyond the page the
    /// last card links to the next page, starting at the first record not
    /// shown. Returns `None` when there is nothing to show.
    pub fn report_page(&self, records: &[ReportRecord], limit: usize) -> Option<Template> {
        match records {
            [] => None,
            [only] => Some(Template::Detail {
                card: self.card(only),
            }),
            _ => {
                let limit = limit.max(1);
                let shown = &records[..records.len().min(limit)];
                let next_cursor = records.get(limit).map(|r| r.timestamp);

                let mut cards: Vec<Card> = shown.iter().map(|r| self.card(r)).collect();
                if let (Some(cursor), Some(last)) = (next_cursor, cards.last_mut()) {
                    last.buttons
                        .push(Button::postback(VIEW_MORE_TITLE, &Payload::recent_report(cursor)));
                }
                Some(Template::Carousel { cards })
            }
        }
    }

    /// A card for one report: target and local time as title, hashtags as
    /// subtitle, first image as picture.
    pub fn card(&self, report: &ReportRecord) -> Card {
        let when = localize(report.timestamp, self.offset);
        let title = match report.target.as_deref() {
            Some(target) if !target.is_empty() => format!("{} {}", target, when),
            _ => when,
        };

        let subtitle = if report.tags.is_empty() {
            None
        } else {
            Some(
                report
                    .tags
                    .iter()
                    .map(|t| format!("#{}", t))
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        };

        Card {
            title,
            subtitle,
            image_url: report.images.first().map(|key| self.media.url_for(key)),
            buttons: Vec::new(),
        }
    }
}
