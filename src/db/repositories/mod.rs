//! Database repositories
//!
//! One repository per table. Each is a trait plus an SQLx implementation
//! that dispatches on the pool's backend.

pub mod category;
pub mod comment;
pub mod footer;
pub mod page;
pub mod post;
pub mod session;
pub mod settings;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use footer::{FooterRepository, SqlxFooterRepository};
pub use page::{PageRepository, SqlxPageRepository};
pub use post::{PostRepository, PublishedFilter, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use user::{SqlxUserRepository, UserRepository};
