use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::models::{FamilyLinkState, FamilyRequest, FamilyRequestEntry};
use crate::error::{ServiceError, ServiceResult, Validator};
use crate::notifications::{NotificationType, Notifier};
use crate::sqlite_persistence::now_secs;
use crate::user::{auth::SkillwiseHasher, FullUserStore, PublicProfile, User, UserRole};

pub const CHILDLOCK_MIN_LENGTH: usize = 4;
pub const CHILDLOCK_MAX_LENGTH: usize = 64;

/// Parent/child supervision.
///
/// A (parent, child) pair moves `unlinked -> pending_request -> linked`.
/// Either side may open the request, only the other side may accept it, and
/// either side may reject it or later unlink.
pub struct FamilyManager {
    user_store: Arc<dyn FullUserStore>,
    notifier: Notifier,
    min_unsupervised_age: u32,
    hasher: SkillwiseHasher,
}

impl FamilyManager {
    pub fn new(
        user_store: Arc<dyn FullUserStore>,
        notifier: Notifier,
        min_unsupervised_age: u32,
    ) -> Self {
        Self {
            user_store,
            notifier,
            min_unsupervised_age,
            hasher: SkillwiseHasher::Argon2,
        }
    }

    fn require_user(&self, user_id: usize) -> ServiceResult<User> {
        self.user_store
            .get_user(user_id)?
            .ok_or(ServiceError::NotFound("User"))
    }

    /// Orders two accounts as (parent, child) based on their roles.
    fn pair(&self, acting_user_id: usize, other_user_id: usize) -> ServiceResult<(User, User)> {
        if acting_user_id == other_user_id {
            return Err(ServiceError::bad_request(
                "You cannot create a family link with yourself",
            ));
        }
        let acting = self.require_user(acting_user_id)?;
        let other = self.require_user(other_user_id)?;
        match (acting.role, other.role) {
            (UserRole::Parent, UserRole::Child) => Ok((acting, other)),
            (UserRole::Child, UserRole::Parent) => Ok((other, acting)),
            _ => Err(ServiceError::bad_request(
                "Family links connect a Parent account with a Child account",
            )),
        }
    }

    pub fn link_state(&self, parent_id: usize, child_id: usize) -> ServiceResult<FamilyLinkState> {
        if self.user_store.is_family_linked(parent_id, child_id)? {
            Ok(FamilyLinkState::Linked)
        } else if self
            .user_store
            .get_family_request(parent_id, child_id)?
            .is_some()
        {
            Ok(FamilyLinkState::PendingRequest)
        } else {
            Ok(FamilyLinkState::Unlinked)
        }
    }

    pub fn request_link(
        &self,
        acting_user_id: usize,
        other_user_id: usize,
    ) -> ServiceResult<FamilyLinkState> {
        let (parent, child) = self.pair(acting_user_id, other_user_id)?;
        match self.link_state(parent.id, child.id)? {
            FamilyLinkState::Linked => {
                return Err(ServiceError::bad_request("These accounts are already linked"))
            }
            FamilyLinkState::PendingRequest => {
                return Err(ServiceError::bad_request(
                    "A link request between these accounts is already pending",
                ))
            }
            FamilyLinkState::Unlinked => {}
        }

        self.user_store.add_family_request(&FamilyRequest {
            parent_id: parent.id,
            child_id: child.id,
            initiator_id: acting_user_id,
            created: now_secs(),
        })?;
        let initiator = if parent.id == acting_user_id {
            &parent
        } else {
            &child
        };
        self.notifier.notify(
            other_user_id,
            Some(acting_user_id),
            NotificationType::FamilyRequest,
            json!({
                "parentId": parent.id,
                "childId": child.id,
                "fromHandle": initiator.handle,
            }),
        );
        Ok(FamilyLinkState::PendingRequest)
    }

    /// Accepts the pending request between the two accounts. Only the account
    /// that did not open the request may accept it.
    pub fn accept_link(
        &self,
        acting_user_id: usize,
        other_user_id: usize,
    ) -> ServiceResult<FamilyLinkState> {
        let (parent, child) = self.pair(acting_user_id, other_user_id)?;
        let request = self
            .user_store
            .get_family_request(parent.id, child.id)?
            .ok_or_else(|| ServiceError::bad_request("No pending link request between you"))?;
        if request.initiator_id == acting_user_id {
            return Err(ServiceError::forbidden(
                "The other account has to accept this request",
            ));
        }
        if !self.user_store.accept_family_request(parent.id, child.id)? {
            return Err(ServiceError::bad_request(
                "No pending link request between you",
            ));
        }
        info!("Linked parent {} with child {}", parent.id, child.id);

        self.notifier.notify(
            other_user_id,
            Some(acting_user_id),
            NotificationType::FamilyAccepted,
            json!({ "parentId": parent.id, "childId": child.id }),
        );
        self.confirm_parent(child.id)?;
        Ok(FamilyLinkState::Linked)
    }

    /// Flags the child as parent-confirmed. On the first confirmation a child
    /// blocked for being under the unsupervised age gets unblocked.
    fn confirm_parent(&self, child_id: usize) -> ServiceResult<()> {
        if !self.user_store.set_parent_confirmed(child_id, true)? {
            debug!("Child {} was already parent-confirmed", child_id);
            return Ok(());
        }
        let child = self.require_user(child_id)?;
        if child.blocked && child.is_below_age(self.min_unsupervised_age) {
            self.user_store.set_user_blocked(child_id, false)?;
            info!("Unblocked child {} after parent confirmation", child_id);
            self.notifier.notify(
                child_id,
                None,
                NotificationType::AccountUnblocked,
                json!({ "reason": "parent_confirmed" }),
            );
        }
        Ok(())
    }

    /// Drops the pending request; the requester learns about it unless they
    /// withdrew it themselves.
    pub fn reject_link(&self, acting_user_id: usize, other_user_id: usize) -> ServiceResult<()> {
        let (parent, child) = self.pair(acting_user_id, other_user_id)?;
        let request = self
            .user_store
            .get_family_request(parent.id, child.id)?
            .ok_or_else(|| ServiceError::bad_request("No pending link request between you"))?;
        self.user_store.delete_family_request(parent.id, child.id)?;
        self.notifier.notify(
            request.initiator_id,
            Some(acting_user_id),
            NotificationType::FamilyRejected,
            json!({ "parentId": parent.id, "childId": child.id }),
        );
        Ok(())
    }

    pub fn unlink(&self, acting_user_id: usize, other_user_id: usize) -> ServiceResult<()> {
        let (parent, child) = self.pair(acting_user_id, other_user_id)?;
        if !self.user_store.delete_family_link(parent.id, child.id)? {
            return Err(ServiceError::NotFound("Family link"));
        }
        info!("Unlinked parent {} from child {}", parent.id, child.id);
        if self.user_store.list_parents(child.id)?.is_empty() {
            self.user_store.set_parent_confirmed(child.id, false)?;
        }
        Ok(())
    }

    pub fn list_requests(&self, user_id: usize) -> ServiceResult<Vec<FamilyRequestEntry>> {
        let mut entries = vec![];
        for request in self.user_store.list_family_requests(user_id)? {
            let counterpart_id = request.counterpart_of(user_id);
            if let Some(counterpart) = self.user_store.get_user(counterpart_id)? {
                entries.push(FamilyRequestEntry {
                    parent_id: request.parent_id,
                    child_id: request.child_id,
                    initiator_id: request.initiator_id,
                    counterpart: counterpart.public_profile(),
                    awaiting_me: request.initiator_id != user_id,
                    created: request.created,
                });
            }
        }
        Ok(entries)
    }

    fn profiles(&self, ids: Vec<usize>) -> ServiceResult<Vec<PublicProfile>> {
        let mut profiles = vec![];
        for id in ids {
            if let Some(user) = self.user_store.get_user(id)? {
                profiles.push(user.public_profile());
            }
        }
        Ok(profiles)
    }

    pub fn list_children(&self, parent_id: usize) -> ServiceResult<Vec<PublicProfile>> {
        self.profiles(self.user_store.list_children(parent_id)?)
    }

    pub fn list_parents(&self, child_id: usize) -> ServiceResult<Vec<PublicProfile>> {
        self.profiles(self.user_store.list_parents(child_id)?)
    }

    /// Fails with Forbidden unless `parent_id` is linked to `child_id`.
    pub fn require_linked_parent(&self, parent_id: usize, child_id: usize) -> ServiceResult<()> {
        if self.user_store.is_family_linked(parent_id, child_id)? {
            Ok(())
        } else {
            Err(ServiceError::forbidden(
                "Only a linked parent can supervise this account",
            ))
        }
    }

    /// Sets, or clears with None, the childlock of a linked child.
    pub fn set_childlock(
        &self,
        parent_id: usize,
        child_id: usize,
        password: Option<&str>,
    ) -> ServiceResult<()> {
        self.require_linked_parent(parent_id, child_id)?;
        let child = self.require_user(child_id)?;
        if child.role != UserRole::Child {
            return Err(ServiceError::bad_request(
                "Childlock only applies to Child accounts",
            ));
        }
        match password {
            Some(password) => {
                Validator::new()
                    .check(
                        password.chars().count() >= CHILDLOCK_MIN_LENGTH,
                        "password",
                        "must be at least 4 characters",
                    )
                    .max_len(password, CHILDLOCK_MAX_LENGTH, "password")
                    .finish()?;
                let hash = self.hasher.hash_with_new_salt(password)?;
                self.user_store.set_childlock_hash(child_id, Some(&hash))?;
                info!("Parent {} set the childlock of child {}", parent_id, child_id);
            }
            None => {
                self.user_store.set_childlock_hash(child_id, None)?;
                info!("Parent {} cleared the childlock of child {}", parent_id, child_id);
            }
        }
        Ok(())
    }

    pub fn verify_childlock(&self, child_id: usize, password: &str) -> ServiceResult<bool> {
        let hash = self
            .user_store
            .get_childlock_hash(child_id)?
            .ok_or_else(|| ServiceError::bad_request("No childlock is set for this account"))?;
        Ok(self.hasher.verify(password, hash.as_str())?)
    }

    /// Gate for restricted features. Only Child accounts with a childlock set
    /// have to present the password.
    pub fn check_childlock(
        &self,
        user_id: usize,
        role: UserRole,
        presented: Option<&str>,
    ) -> ServiceResult<()> {
        if role != UserRole::Child {
            return Ok(());
        }
        let Some(hash) = self.user_store.get_childlock_hash(user_id)? else {
            return Ok(());
        };
        let presented =
            presented.ok_or_else(|| ServiceError::forbidden("Childlock password required"))?;
        if self.hasher.verify(presented, hash.as_str())? {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Invalid childlock password"))
        }
    }
}
