use anyhow::Result;

use super::models::{Listing, ListingStatus, MarketplaceCounts};

pub trait MarketplaceStore: Send + Sync {
    fn create_listing(&self, listing: &Listing) -> Result<()>;

    fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>>;

    /// Listings in `status`, newest first, optionally restricted to a skill
    /// (case insensitive).
    fn list_by_status(&self, status: ListingStatus, skill: Option<&str>) -> Result<Vec<Listing>>;

    fn list_by_seller(&self, seller_id: usize) -> Result<Vec<Listing>>;

    /// Moves a pending listing to `status`. Returns false if the listing is
    /// missing or no longer pending.
    fn review_listing(
        &self,
        listing_id: &str,
        status: ListingStatus,
        reviewer_id: usize,
        note: Option<&str>,
        reviewed_at: i64,
    ) -> Result<bool>;

    fn delete_listing(&self, listing_id: &str) -> Result<bool>;

    fn count(&self) -> Result<MarketplaceCounts>;
}
