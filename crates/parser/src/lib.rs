//! HTML extraction for the pages the uploader scrapes. Every page type has a
//! fixed, ordered list of strategies; nothing here performs I/O.

pub mod csrf;
pub mod flash;
pub mod galleries;
pub mod html;
pub mod icons;
pub mod login_state;
pub mod profile;
pub mod upload_form;

pub use csrf::{CsrfExtractor, TokenSource};
pub use flash::{flash_message, FlashKind};
pub use galleries::GalleryCatalogParser;
pub use icons::GalleryIconParser;
pub use login_state::{LoginDetector, LoginMarker};
pub use profile::{profile_links, user_id_from_links};
pub use upload_form::{parse_upload_form, UPLOAD_FORM_SELECTOR};
