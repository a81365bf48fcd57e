use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use gallery_core::GalleryIcon;

use crate::html::{element_text, static_selector};

static ICON_CELL: Lazy<Selector> = Lazy::new(|| static_selector("div.gallery-icon"));
static ICON_IMG: Lazy<Selector> = Lazy::new(|| static_selector("img.icon"));
static ICON_KEYWORD: Lazy<Selector> = Lazy::new(|| static_selector("span.icon-keyword"));

/// Parses the icons shown on `/galleries/{id}`.
pub struct GalleryIconParser;

impl GalleryIconParser {
    /// Icons in page order. Entries missing the image or the keyword are skipped.
    pub fn parse(html: &str) -> Vec<GalleryIcon> {
        let document = Html::parse_document(html);

        document
            .select(&ICON_CELL)
            .filter_map(|cell| {
                let url = cell
                    .select(&ICON_IMG)
                    .next()?
                    .value()
                    .attr("src")
                    .unwrap_or_default()
                    .to_string();
                let keyword = element_text(&cell.select(&ICON_KEYWORD).next()?);
                Some(GalleryIcon { url, keyword })
            })
            .collect()
    }
}
