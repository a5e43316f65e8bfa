//! Data models
//!
//! Database entities, the visibility and theme value types, and the input
//! records accepted by the API.

mod category;
mod comment;
mod footer;
mod page;
mod post;
mod session;
mod theme;
mod user;
mod visibility;

pub use category::{Category, CategoryInput, MISSING_CATEGORY_LABEL};
pub use comment::{Comment, CreateCommentInput, ANONYMOUS_AUTHOR};
pub use footer::{FooterContent, UpdateFooterInput};
pub use page::{Page, UpdatePageInput, ABOUT_SLUG, CONTACT_SLUG};
pub use post::{excerpt, plain_text, reading_time, Post, PostRow, PostSummary, SavePostInput};
pub use session::Session;
pub use theme::{hex_to_hsl, Palette, SiteTheme};
pub use user::User;
pub use visibility::{Section, VisibilityState};
