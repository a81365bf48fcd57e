use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use gallery_core::{GalleryRecord, GALLERYLESS_ID, GALLERYLESS_NAME};

use crate::html::{class_contains, element_text, static_selector};

static GALLERY_ROW: Lazy<Selector> = Lazy::new(|| static_selector("tr[id^='gallery-']"));
static CELL: Lazy<Selector> = Lazy::new(|| static_selector("td"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| static_selector("a"));
static ANY_HREF: Lazy<Selector> = Lazy::new(|| static_selector("a[href]"));

const ROW_ID_PREFIX: &str = "gallery-";
const NAME_CELL_CLASS: &str = "gallery-name";
const COUNT_CELL_CLASS: &str = "gallery-icon-count";

/// Parses `/users/{id}/galleries`.
#[derive(Debug, Default)]
pub struct GalleryCatalogParser;

impl GalleryCatalogParser {
    /// Gallery rows in markup order, with the galleryless bucket first when the
    /// page links to it. Rows without a named anchor are skipped.
    pub fn parse(&self, html: &str) -> Vec<GalleryRecord> {
        let document = Html::parse_document(html);
        let mut galleries: Vec<GalleryRecord> = document
            .select(&GALLERY_ROW)
            .filter_map(|row| Self::parse_row(&row))
            .collect();

        if let Some(href) = Self::find_galleryless_anchor(&document) {
            galleries.insert(0, Self::galleryless_record(href));
        }

        debug!(count = galleries.len(), "parsed gallery listing");
        galleries
    }

    fn parse_row(row: &ElementRef) -> Option<GalleryRecord> {
        let row_id = row.value().id()?;
        let id = row_id.strip_prefix(ROW_ID_PREFIX)?.to_string();
        if id.is_empty() {
            return None;
        }

        let name_cell = row
            .select(&CELL)
            .find(|cell| class_contains(cell, NAME_CELL_CLASS))?;
        let link = name_cell.select(&ANCHOR).next()?;
        let name = element_text(&link);
        let href = link.value().attr("href").unwrap_or_default().to_string();

        let icon_count = row
            .select(&CELL)
            .find(|cell| class_contains(cell, COUNT_CELL_CLASS))
            .map(|cell| parse_count(&element_text(&cell)))
            .unwrap_or(0);

        Some(GalleryRecord {
            add_icon_url: GalleryRecord::add_icon_path(&id),
            id,
            name,
            icon_count,
            listing_url: href,
        })
    }

    /// The bucket has no row of its own, only a link to `.../galleries/0`.
    fn find_galleryless_anchor(document: &Html) -> Option<String> {
        document
            .select(&ANY_HREF)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| is_galleryless_href(href))
            .map(str::to_string)
    }

    /// The listing URL is the anchor's own href, whatever form it takes.
    fn galleryless_record(href: String) -> GalleryRecord {
        GalleryRecord {
            id: GALLERYLESS_ID.to_string(),
            name: GALLERYLESS_NAME.to_string(),
            icon_count: 0,
            listing_url: href,
            add_icon_url: GalleryRecord::add_icon_path(GALLERYLESS_ID),
        }
    }
}

fn parse_count(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

fn is_galleryless_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let marker = "/galleries/0";
    match path.find(marker) {
        Some(pos) => {
            let rest = &path[pos + marker.len()..];
            rest.is_empty() || rest.starts_with('/')
        }
        None => false,
    }
}
