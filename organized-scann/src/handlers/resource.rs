//! Generic CRUD endpoints
//!
//! A type implementing [`Resource`] gets the five standard endpoints by
//! mounting [`routes`]:
//!
//! | Method | Path             | Success                       | Missing |
//! |--------|------------------|-------------------------------|---------|
//! | GET    | `/api/<r>`       | 200 page envelope             |         |
//! | GET    | `/api/<r>/{id}`  | 200 item envelope             | 404     |
//! | POST   | `/api/<r>`       | 201 raw entity + `Location`   |         |
//! | PUT    | `/api/<r>/{id}`  | 204                           | 404     |
//! | DELETE | `/api/<r>/{id}`  | 204                           | 404     |

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use validator::Validate;

use super::extract::{IdPath, ValidJson};
use super::hateoas::{Envelope, LinkBuilder};
use super::query::{FilterField, ListQuery};
use super::response::{build_page, Created, Page};
use crate::error::{Error, Result};
use crate::models::{
    Motorcycle, MotorcyclePayload, Portal, PortalPayload, PortalType, Role, User, UserPayload,
};
use crate::repository::{Gateway, PgEntity, Repository};
use crate::state::AppState;

/// An entity exposed as a REST collection
pub trait Resource: PgEntity + Serialize {
    /// Create/replace request body
    type Payload: DeserializeOwned + Validate + Send + 'static;

    /// Collection path, e.g. `/api/motorcycles`
    const ROUTE: &'static str;

    /// Filters accepted by the list endpoint
    const FILTERS: &'static [FilterField];

    /// Gateway holding this resource
    fn gateway(state: &AppState) -> &Gateway<Self>;

    /// Build an unsaved record from a validated body
    fn from_payload(
        payload: Self::Payload,
        state: &AppState,
    ) -> impl Future<Output = Result<Self>> + Send;
}

fn canonical_portal_type(value: &str) -> Option<&'static str> {
    value.trim().parse::<PortalType>().ok().map(|t| t.as_str())
}

fn canonical_role(value: &str) -> Option<&'static str> {
    let value = value.trim();
    let role = match value.parse::<u8>() {
        Ok(code) => Role::from_code(code).ok(),
        Err(_) => value.parse::<Role>().ok(),
    };
    role.map(|r| r.as_str())
}

impl Resource for Motorcycle {
    type Payload = MotorcyclePayload;

    const ROUTE: &'static str = "/api/motorcycles";

    const FILTERS: &'static [FilterField] = &[
        FilterField::text("brand", "brand"),
        FilterField::integer("year", "year"),
        FilterField::integer("portalId", "portal_id"),
    ];

    fn gateway(state: &AppState) -> &Gateway<Self> {
        state.motorcycles()
    }

    async fn from_payload(payload: MotorcyclePayload, _state: &AppState) -> Result<Self> {
        Ok(payload.into())
    }
}

impl Resource for Portal {
    type Payload = PortalPayload;

    const ROUTE: &'static str = "/api/portals";

    const FILTERS: &'static [FilterField] = &[
        FilterField::keyword("type", "portal_type", canonical_portal_type),
        FilterField::text("name", "name"),
    ];

    fn gateway(state: &AppState) -> &Gateway<Self> {
        state.portals()
    }

    async fn from_payload(payload: PortalPayload, _state: &AppState) -> Result<Self> {
        Ok(payload.into())
    }
}

impl Resource for User {
    type Payload = UserPayload;

    const ROUTE: &'static str = "/api/users";

    const FILTERS: &'static [FilterField] = &[
        FilterField::keyword("role", "role", canonical_role),
        FilterField::text("email", "email"),
    ];

    fn gateway(state: &AppState) -> &Gateway<Self> {
        state.users()
    }

    async fn from_payload(payload: UserPayload, state: &AppState) -> Result<Self> {
        let hash = state.passwords().hash_blocking(payload.password).await?;
        Ok(User::new(payload.name, payload.email, hash, payload.role))
    }
}

/// `GET /api/<r>`: filtered, paginated listing
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    links: LinkBuilder,
    query: ListQuery,
) -> Result<Envelope<Page<R>>> {
    let predicate = query.filters.build(R::FILTERS)?;
    let (total, items) = R::gateway(&state)
        .count_and_fetch(&predicate, query.page.pagination())
        .await?;

    tracing::debug!(
        entity = R::NAME,
        filter = %predicate,
        page = query.page.page_number,
        page_size = query.page.page_size,
        total,
        "Listed records"
    );

    Ok(links.collection(build_page(query.page, total, items), R::ROUTE))
}

/// `GET /api/<r>/{id}`
pub async fn show<R: Resource>(
    State(state): State<AppState>,
    links: LinkBuilder,
    IdPath(id): IdPath,
) -> Result<Envelope<R>> {
    let record = R::gateway(&state)
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} {}", R::NAME, id)))?;

    Ok(links.item(record, R::ROUTE, id))
}

/// `POST /api/<r>`
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    links: LinkBuilder,
    ValidJson(payload): ValidJson<R::Payload>,
) -> Result<Created<R>> {
    let record = R::from_payload(payload, &state).await?;
    let created = R::gateway(&state).insert(record).await?;

    tracing::info!(entity = R::NAME, id = created.id(), "Created record");

    let location = links.href(&format!("{}/{}", R::ROUTE, created.id()));
    Ok(Created::new(location, created))
}

/// `PUT /api/<r>/{id}`: full replacement
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    ValidJson(payload): ValidJson<R::Payload>,
) -> Result<StatusCode> {
    let record = R::from_payload(payload, &state).await?;
    if !R::gateway(&state).update(id, record).await? {
        return Err(Error::NotFound(format!("{} {}", R::NAME, id)));
    }

    tracing::info!(entity = R::NAME, id, "Updated record");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/<r>/{id}`
pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<StatusCode> {
    if !R::gateway(&state).delete(id).await? {
        return Err(Error::NotFound(format!("{} {}", R::NAME, id)));
    }

    tracing::info!(entity = R::NAME, id, "Deleted record");
    Ok(StatusCode::NO_CONTENT)
}

/// Collection and item routes for `R`
pub fn routes<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(R::ROUTE, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/{{id}}", R::ROUTE),
            get(show::<R>).put(update::<R>).delete(remove::<R>),
        )
}
