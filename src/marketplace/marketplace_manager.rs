use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::marketplace_store::MarketplaceStore;
use super::models::{
    Listing, ListingDraft, ListingStatus, MarketplaceCounts, ModerationDecision,
    ModerationRequest,
};
use crate::error::{ServiceError, ServiceResult, Validator};
use crate::notifications::{NotificationType, Notifier};
use crate::sqlite_persistence::{new_entity_id, now_secs};
use crate::user::{Actor, Permission};

const MAX_TITLE_LENGTH: usize = 120;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_SKILL_LENGTH: usize = 64;
const MAX_NOTE_LENGTH: usize = 1000;

fn is_moderator(actor: &Actor) -> bool {
    actor.role.permissions().contains(&Permission::ModerateContent)
}

/// Skill listings. New listings wait in the moderation queue and only
/// become public once approved.
pub struct MarketplaceManager {
    store: Arc<dyn MarketplaceStore>,
    notifier: Notifier,
}

impl MarketplaceManager {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    fn load_listing(&self, listing_id: &str) -> ServiceResult<Listing> {
        self.store
            .get_listing(listing_id)?
            .ok_or(ServiceError::NotFound("Listing"))
    }

    pub fn create_listing(&self, seller: &Actor, draft: ListingDraft) -> ServiceResult<Listing> {
        Validator::new()
            .non_blank(&draft.title, "title")
            .max_len(&draft.title, MAX_TITLE_LENGTH, "title")
            .max_len(&draft.description, MAX_DESCRIPTION_LENGTH, "description")
            .non_blank(&draft.skill, "skill")
            .max_len(&draft.skill, MAX_SKILL_LENGTH, "skill")
            .check(draft.price_cents >= 0, "priceCents", "must not be negative")
            .finish()?;

        let listing = Listing {
            id: new_entity_id(),
            seller_id: seller.user_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            skill: draft.skill.trim().to_string(),
            price_cents: draft.price_cents,
            status: ListingStatus::Pending,
            moderation_note: None,
            reviewer_id: None,
            created: now_secs(),
            reviewed_at: None,
        };
        self.store.create_listing(&listing)?;
        info!(
            "User {} submitted listing {} for review",
            seller.user_id, listing.id
        );
        Ok(listing)
    }

    pub fn list_approved(&self, skill: Option<&str>) -> ServiceResult<Vec<Listing>> {
        Ok(self.store.list_by_status(ListingStatus::Approved, skill)?)
    }

    pub fn my_listings(&self, seller: &Actor) -> ServiceResult<Vec<Listing>> {
        Ok(self.store.list_by_seller(seller.user_id)?)
    }

    /// Approved listings are public; the rest only reach their seller and
    /// moderators.
    pub fn get_listing(&self, viewer: &Actor, listing_id: &str) -> ServiceResult<Listing> {
        let listing = self.load_listing(listing_id)?;
        if listing.status != ListingStatus::Approved
            && listing.seller_id != viewer.user_id
            && !is_moderator(viewer)
        {
            return Err(ServiceError::NotFound("Listing"));
        }
        Ok(listing)
    }

    pub fn delete_listing(&self, actor: &Actor, listing_id: &str) -> ServiceResult<()> {
        let listing = self.get_listing(actor, listing_id)?;
        if listing.seller_id != actor.user_id && !is_moderator(actor) {
            return Err(ServiceError::forbidden(
                "Only the seller can delete this listing",
            ));
        }
        self.store.delete_listing(listing_id)?;
        info!("User {} deleted listing {}", actor.user_id, listing_id);
        Ok(())
    }

    pub fn pending_listings(&self) -> ServiceResult<Vec<Listing>> {
        Ok(self.store.list_by_status(ListingStatus::Pending, None)?)
    }

    pub fn moderate(
        &self,
        moderator: &Actor,
        listing_id: &str,
        request: ModerationRequest,
    ) -> ServiceResult<Listing> {
        let note = request
            .note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());
        Validator::new()
            .max_len(note.as_deref().unwrap_or(""), MAX_NOTE_LENGTH, "note")
            .finish()?;

        let listing = self.load_listing(listing_id)?;
        if listing.status != ListingStatus::Pending {
            return Err(ServiceError::bad_request(format!(
                "Listing is already {}",
                listing.status.as_str()
            )));
        }
        let (status, notification_type) = match request.decision {
            ModerationDecision::Approve => {
                (ListingStatus::Approved, NotificationType::ListingApproved)
            }
            ModerationDecision::Reject => {
                (ListingStatus::Rejected, NotificationType::ListingRejected)
            }
        };
        if !self.store.review_listing(
            listing_id,
            status,
            moderator.user_id,
            note.as_deref(),
            now_secs(),
        )? {
            return Err(ServiceError::bad_request("Listing was reviewed concurrently"));
        }
        info!(
            "User {} marked listing {} as {}",
            moderator.user_id,
            listing_id,
            status.as_str()
        );
        self.notifier.notify(
            listing.seller_id,
            Some(moderator.user_id),
            notification_type,
            json!({ "listingId": listing_id, "title": listing.title, "note": note }),
        );
        self.load_listing(listing_id)
    }

    pub fn counts(&self) -> ServiceResult<MarketplaceCounts> {
        Ok(self.store.count()?)
    }
}
