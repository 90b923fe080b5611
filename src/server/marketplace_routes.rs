//! Skill marketplace routes, mounted under `/api/marketplace`
//!
//! Creating and deleting listings needs `TradeMarketplace` and, for Child
//! accounts with a childlock, the childlock password in `X-Childlock`.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::response::{created, ok, ApiResponse};
use super::session::Session;
use super::state::{GuardedFamilyManager, GuardedMarketplaceManager, ServerState};
use crate::error::ServiceResult;
use crate::marketplace::{Listing, ListingDraft};
use crate::user::Permission;

#[derive(Deserialize, Debug, Default)]
struct ListingQuery {
    pub skill: Option<String>,
}

fn check_restricted(session: &Session, family: &GuardedFamilyManager) -> ServiceResult<()> {
    session.require(Permission::TradeMarketplace)?;
    family.check_childlock(session.user_id, session.role, session.childlock.as_deref())
}

/// GET /listings
async fn list_listings(
    _session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
    Query(query): Query<ListingQuery>,
) -> ServiceResult<ApiResponse<Vec<Listing>>> {
    let skill = query.skill.as_deref().filter(|skill| !skill.trim().is_empty());
    Ok(ok(marketplace.list_approved(skill)?))
}

/// POST /listings
async fn create_listing(
    session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
    State(family): State<GuardedFamilyManager>,
    Json(draft): Json<ListingDraft>,
) -> ServiceResult<ApiResponse<Listing>> {
    check_restricted(&session, &family)?;
    Ok(created(marketplace.create_listing(&session.actor(), draft)?))
}

/// GET /listings/mine
async fn my_listings(
    session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
) -> ServiceResult<ApiResponse<Vec<Listing>>> {
    Ok(ok(marketplace.my_listings(&session.actor())?))
}

/// GET /listings/{id}
async fn get_listing(
    session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
    Path(listing_id): Path<String>,
) -> ServiceResult<ApiResponse<Listing>> {
    Ok(ok(marketplace.get_listing(&session.actor(), &listing_id)?))
}

/// DELETE /listings/{id}
async fn delete_listing(
    session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
    State(family): State<GuardedFamilyManager>,
    Path(listing_id): Path<String>,
) -> ServiceResult<ApiResponse<()>> {
    check_restricted(&session, &family)?;
    marketplace.delete_listing(&session.actor(), &listing_id)?;
    Ok(ok(()))
}

pub fn marketplace_routes() -> Router<ServerState> {
    Router::new()
        .route("/listings", get(list_listings).post(create_listing))
        .route("/listings/mine", get(my_listings))
        .route("/listings/{id}", get(get_listing).delete(delete_listing))
}
