//! Card synchronization: the three card collections fetched as one unit,
//! shadow-copy editing, and delete flows.
//!
//! `refresh_data` fans out one GET per card type and joins them; a failing
//! sub-fetch is logged and degrades to an empty collection so the siblings
//! still populate and the view never crashes. Overlapping refreshes are
//! resolved by a generation counter: a response that arrives for a stale
//! generation is discarded without touching state.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join3;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::models::{CardKind, CardRecord, HealthCareCard, IdCard, StudentCard, UploadCard};

#[derive(Debug, Clone, Default)]
pub struct CardCollections {
    pub id_cards: Vec<IdCard>,
    pub student_cards: Vec<StudentCard>,
    pub health_care_cards: Vec<HealthCareCard>,
}

#[derive(Default)]
struct CardState {
    collections: CardCollections,
    loading: bool,
    generation: u64,
}

/// Shadow-copy editor for a single card record.
///
/// Entering edit mode snapshots the server-confirmed record into a draft;
/// canceling discards the draft; `commit` promotes it to the source of truth
/// and is only called after the server confirmed the save.
#[derive(Debug, Clone)]
pub struct CardEditor<T: Clone> {
    original: T,
    draft: Option<T>,
}

impl<T: Clone> CardEditor<T> {
    pub fn new(card: T) -> Self {
        Self { original: card, draft: None }
    }

    pub fn is_editing(&self) -> bool { self.draft.is_some() }

    /// The server-confirmed record.
    pub fn card(&self) -> &T { &self.original }

    pub fn begin(&mut self) {
        if self.draft.is_none() {
            self.draft = Some(self.original.clone());
        }
    }

    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// Edit toggles like the UI button: enter edit mode, or discard the draft
    /// when already editing.
    pub fn toggle_edit(&mut self) {
        if self.is_editing() { self.cancel() } else { self.begin() }
    }

    pub fn draft(&self) -> Option<&T> { self.draft.as_ref() }

    pub fn draft_mut(&mut self) -> Option<&mut T> { self.draft.as_mut() }

    /// Promote the draft to the confirmed record and leave edit mode.
    pub fn commit(&mut self) {
        if let Some(d) = self.draft.take() {
            self.original = d;
        }
    }
}

#[derive(Clone)]
pub struct CardSync {
    api: ApiClient,
    state: Arc<RwLock<CardState>>,
    deleting: Arc<RwLock<HashSet<(CardKind, i64)>>>,
}

impl CardSync {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(CardState::default())),
            deleting: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn collections(&self) -> CardCollections { self.state.read().collections.clone() }

    pub fn is_loading(&self) -> bool { self.state.read().loading }

    /// Fetch all three collections concurrently. Individual failures degrade
    /// to empty collections; `loading` ends false once the owning generation
    /// resolves. A stale response (superseded by a newer refresh) is dropped.
    pub async fn refresh_data(&self, token: &str) {
        let generation = {
            let mut st = self.state.write();
            st.generation += 1;
            st.loading = true;
            st.generation
        };

        let (id_cards, student_cards, health_care_cards) = join3(
            self.fetch_or_empty::<IdCard>(token),
            self.fetch_or_empty::<StudentCard>(token),
            self.fetch_or_empty::<HealthCareCard>(token),
        )
        .await;

        let mut st = self.state.write();
        if st.generation != generation {
            // a newer refresh owns the state and the loading flag
            debug!("card refresh generation {} superseded by {}", generation, st.generation);
            return;
        }
        st.collections = CardCollections { id_cards, student_cards, health_care_cards };
        st.loading = false;
    }

    async fn fetch_or_empty<T: CardRecord + DeserializeOwned>(&self, token: &str) -> Vec<T> {
        match self.api.list_cards::<T>(token).await {
            Ok(cards) => cards,
            Err(e) => {
                warn!("fetching {} collection failed, treating as empty: {}", T::KIND.endpoint(), e);
                Vec::new()
            }
        }
    }

    /// Send the full draft to the update endpoint. On success the draft is
    /// promoted, edit mode ends and the collections refresh; on failure the
    /// editor stays in edit mode and the error reaches the caller.
    pub async fn save_card<T>(&self, token: &str, editor: &mut CardEditor<T>) -> ClientResult<()>
    where
        T: CardRecord + Serialize + Clone,
    {
        let Some(draft) = editor.draft().cloned() else {
            return Err(ClientError::validation("card is not in edit mode"));
        };
        self.api.update_card(token, &draft).await?;
        editor.commit();
        self.refresh_data(token).await;
        Ok(())
    }

    /// True while a delete for this card is in flight; used to disable the
    /// control.
    pub fn is_deleting(&self, kind: CardKind, id: i64) -> bool {
        self.deleting.read().contains(&(kind, id))
    }

    /// Delete a card, optionally within a group context (which routes the
    /// request to the group-suffixed endpoint). The caller's callback runs
    /// exactly once on completion whether or not the request succeeded, so
    /// dependent views always get their refresh.
    pub async fn delete_card<F: FnOnce()>(
        &self,
        token: &str,
        kind: CardKind,
        id: i64,
        group_id: Option<i64>,
        on_done: F,
    ) -> ClientResult<()> {
        self.deleting.write().insert((kind, id));
        let result = self.api.delete_card(token, kind, id, group_id).await;
        self.deleting.write().remove(&(kind, id));
        if let Err(e) = &result {
            warn!("failed to delete {} {}: {}", kind.endpoint(), id, e);
        }
        on_done();
        result
    }

    /// Validate and send a base64 card scan. Front image is always required;
    /// the back side is required for id and student cards.
    pub async fn upload_card(
        &self,
        token: &str,
        kind: CardKind,
        front: Option<String>,
        back: Option<String>,
    ) -> ClientResult<()> {
        let upload = prepare_upload(kind, front, back)?;
        self.api.upload_card(token, kind, &upload).await
    }
}

/// Client-side upload validation, performed before any request is issued.
pub fn prepare_upload(
    kind: CardKind,
    front: Option<String>,
    back: Option<String>,
) -> ClientResult<UploadCard> {
    let Some(front) = front.filter(|s| !s.is_empty()) else {
        return Err(ClientError::validation("You need to provide an image of the front side."));
    };
    let back = back.filter(|s| !s.is_empty());
    if back.is_none() && kind != CardKind::Health {
        return Err(ClientError::validation(
            "You need to provide an image of the back side for this card type.",
        ));
    }
    Ok(UploadCard { image_front: front, image_back: back })
}
