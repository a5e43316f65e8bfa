//! Services layer - Business logic
//!
//! Services sit between the HTTP API and the repositories. They:
//! - validate input and enforce business rules
//! - keep the cache coherent with writes
//! - publish change, visibility and auth events to subscribers

pub mod admin_gate;
pub mod auth;
pub mod category;
pub mod comment;
pub mod footer;
pub mod navigation;
pub mod page;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod realtime;
pub mod secrets;
pub mod theme;
pub mod visibility;

pub use admin_gate::{AdminGate, AdminStatus, AuthListener};
pub use auth::{AuthError, AuthEvent, AuthEventKind, AuthService, AuthSession};
pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use footer::{FooterService, FooterServiceError, FooterView};
pub use navigation::{NavAction, NavLink, NavigationService};
pub use page::{PageService, PageServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError, DEFAULT_RELATED_LIMIT};
pub use rate_limiter::LoginRateLimiter;
pub use realtime::{ChangeEvent, ChangeFeed, ChangeOp, Table, TableSubscription};
pub use secrets::SecretService;
pub use theme::{ThemeDescriptor, ThemeService, ThemeServiceError};
pub use visibility::{
    Subscription, VisibilityError, VisibilityEvent, VisibilityStore, VisibilityView, WatchHandle,
};
