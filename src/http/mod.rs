//! Request translation for the Deta REST APIs.
//!
//! [`BaseHttp`] and [`DriveHttp`] map calls onto the fixed endpoints of the two
//! services; both send through a [`RequestSender`].

pub mod base;
pub mod drive;
pub mod sender;
pub mod types;

pub use base::BaseHttp;
pub use drive::DriveHttp;
pub use sender::{Body, RequestOptions, RequestSender};
