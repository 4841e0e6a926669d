//! Data models for the blogging backend.
//!
//! - `UserProfile` and the auth/profile request and response bodies
//! - `Blog`, `BlogDraft` and `BlogList` for the blog endpoints

pub mod blog;
pub mod user;

pub use blog::{AuthorDetails, Blog, BlogDraft, BlogList};
pub(crate) use blog::BlogListPayload;
pub use user::{
    LoginRequest, LoginResponse, MessageResponse, NewUser, OtpRequest, ProfileUpdate,
    RefreshRequest, SignupRequest, SignupResponse, TokenPair, UploadUrl, UploadUrlRequest,
    UserProfile,
};
