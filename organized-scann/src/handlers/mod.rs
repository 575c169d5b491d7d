//! HTTP handlers
//!
//! - [`resource`]: generic list/show/create/update/delete over a [`Resource`]
//! - [`auth`]: registration and login
//! - [`predictions`]: maintenance estimates (authenticated)
//!
//! List endpoints share one request-shaping path: [`ListQuery`] normalizes
//! paging and collects filters, [`FilterSet::build`] turns declared filters
//! into a [`Predicate`](crate::repository::Predicate), the gateway counts and
//! fetches from one snapshot, [`build_page`] assembles the [`Page`], and
//! [`LinkBuilder`] wraps it in an [`Envelope`].

pub mod auth;
mod extract;
mod hateoas;
pub mod predictions;
mod query;
pub mod resource;
mod response;

pub use extract::{IdPath, ValidJson};
pub use hateoas::{Envelope, Link, LinkBuilder};
pub use query::{
    FilterField, FilterKind, FilterSet, ListQuery, PageRequest, DEFAULT_PAGE_NUMBER,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use resource::Resource;
pub use response::{build_page, total_pages, Created, Page};
