//! Group and invitation synchronization.
//!
//! Reads are re-entrant: overlapping fetches resolve last-response-wins via a
//! generation counter, matching the card sync policy. Mutations re-fetch the
//! authoritative state on completion. Invitation responses are two explicit
//! steps, an optimistic local removal and then a reconciling refetch, kept
//! separate so each can be asserted on its own.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::api::{ApiClient, InviteAction};
use crate::error::{ClientError, ClientResult};
use crate::models::{AddCardsSelection, Group, Invitation};
use crate::tprintln;

#[derive(Default)]
struct GroupState {
    groups: Vec<Group>,
    current: Option<Group>,
    invitations: Vec<Invitation>,
    loading: bool,
    error: Option<String>,
    create_open: bool,
    list_generation: u64,
    detail_generation: u64,
}

#[derive(Clone)]
pub struct GroupService {
    api: ApiClient,
    state: Arc<RwLock<GroupState>>,
}

impl GroupService {
    pub fn new(api: ApiClient) -> Self {
        Self { api, state: Arc::new(RwLock::new(GroupState::default())) }
    }

    pub fn groups(&self) -> Vec<Group> { self.state.read().groups.clone() }

    pub fn current_group(&self) -> Option<Group> { self.state.read().current.clone() }

    pub fn invitations(&self) -> Vec<Invitation> { self.state.read().invitations.clone() }

    pub fn is_loading(&self) -> bool { self.state.read().loading }

    pub fn error(&self) -> Option<String> { self.state.read().error.clone() }

    pub fn is_create_open(&self) -> bool { self.state.read().create_open }

    pub fn open_create(&self) { self.state.write().create_open = true; }

    pub fn close_create(&self) { self.state.write().create_open = false; }

    /// Fetch the group list. Failure leaves the current list untouched; a
    /// stale response never overwrites a newer one.
    pub async fn fetch_groups(&self, token: &str) {
        let generation = {
            let mut st = self.state.write();
            st.list_generation += 1;
            st.list_generation
        };
        match self.api.groups(token).await {
            Ok(groups) => {
                let mut st = self.state.write();
                if st.list_generation != generation {
                    debug!("group list fetch superseded, dropping response");
                    return;
                }
                st.groups = groups;
            }
            Err(e) => warn!("failed to fetch groups: {}", e),
        }
    }

    /// Fetch one group into the current slot.
    pub async fn fetch_group(&self, token: &str, id: i64) {
        let generation = {
            let mut st = self.state.write();
            st.detail_generation += 1;
            st.loading = true;
            st.error = None;
            st.detail_generation
        };
        let result = self.api.group(token, id).await;
        let mut st = self.state.write();
        if st.detail_generation != generation {
            debug!("group {} fetch superseded, dropping response", id);
            return;
        }
        match result {
            Ok(group) => st.current = Some(group),
            Err(e) => {
                warn!("failed to load group {}: {}", id, e);
                st.error = Some("Failed to load group data".to_string());
            }
        }
        st.loading = false;
    }

    /// Create a group. A blank or whitespace-only name is rejected locally:
    /// no request is issued and the creation form stays open. On success the
    /// form closes and the list refreshes.
    pub async fn create_group(&self, token: &str, name: &str) -> ClientResult<()> {
        if name.trim().is_empty() {
            return Err(ClientError::validation("Group name cannot be empty"));
        }
        self.api.create_group(token, name).await?;
        self.close_create();
        tprintln!("groups.create name={:?}", name);
        self.fetch_groups(token).await;
        Ok(())
    }

    /// Associate existing cards with a group. The group is refetched on
    /// completion regardless of outcome, so the authoritative content always
    /// comes from the server.
    pub async fn add_cards_to_group(
        &self,
        token: &str,
        group_id: i64,
        selection: &AddCardsSelection,
    ) -> ClientResult<()> {
        let result = self.api.add_cards(token, group_id, selection).await;
        if let Err(e) = &result {
            warn!("failed to add cards to group {}: {}", group_id, e);
            self.state.write().error = Some("Failed to add card".to_string());
        }
        self.fetch_group(token, group_id).await;
        result
    }

    /// Invite a user to a group by email. Structured non-field errors from
    /// the server ("user already invited", "user already a member") surface
    /// verbatim in the returned error.
    pub async fn invite(&self, token: &str, group_id: i64, email: &str) -> ClientResult<()> {
        self.api.send_invitation(token, group_id, email).await
    }

    /// Fetch the pending invitation list. Failure degrades to an empty list
    /// with the error retained.
    pub async fn fetch_invitations(&self, token: &str) {
        match self.api.invitations(token).await {
            Ok(invitations) => {
                let mut st = self.state.write();
                st.invitations = invitations;
            }
            Err(e) => {
                warn!("failed to fetch invitations: {}", e);
                let mut st = self.state.write();
                st.invitations = Vec::new();
                st.error = Some("Failed to load invitations.".to_string());
            }
        }
    }

    /// Optimistic local removal of a pending invitation; the reconciling
    /// refetch happens separately in `respond_invitation`.
    pub fn discard_pending(&self, invitation_id: i64) {
        self.state.write().invitations.retain(|inv| inv.id != invitation_id);
    }

    /// Accept or reject an invitation. On success: optimistic removal, then
    /// an authoritative refetch, then the caller's callback (so dependent
    /// views like the group list can refresh). On failure the pending list is
    /// left alone and the error is retained.
    pub async fn respond_invitation<F: FnOnce()>(
        &self,
        token: &str,
        invitation_id: i64,
        action: InviteAction,
        on_response: F,
    ) -> ClientResult<()> {
        match self.api.respond_invitation(token, invitation_id, action).await {
            Ok(()) => {
                self.discard_pending(invitation_id);
                self.fetch_invitations(token).await;
                on_response();
                Ok(())
            }
            Err(e) => {
                self.state.write().error =
                    Some(format!("Failed to {} invitation.", action.as_str()));
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_invitations(&self, invitations: Vec<Invitation>) {
        self.state.write().invitations = invitations;
    }
}
