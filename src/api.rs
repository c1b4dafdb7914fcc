//! Remote API surface.
//!
//! Thin reqwest wrapper owning the base URL and connection pool. Every method
//! maps one endpoint; authenticated calls carry `Authorization: Bearer`.
//! Responses are checked for status before deserialization, and error bodies
//! are mined for the structured shapes the server emits (`detail`,
//! `non_field_errors`) so validation messages reach callers verbatim.

use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};
use crate::models::{
    AddCardsSelection, CardKind, CardRecord, CompanyRegistration, CompanyRegistrationResponse,
    Group, Invitation, SignupRequest, TokenPair, UploadCard,
};

/// Accept/reject verb for invitation responses; matches the URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteAction {
    Accept,
    Reject,
}

impl InviteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteAction::Accept => "accept",
            InviteAction::Reject => "reject",
        }
    }

    pub fn parse(s: &str) -> Option<InviteAction> {
        match s {
            "accept" => Some(InviteAction::Accept),
            "reject" => Some(InviteAction::Reject),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> ClientResult<Self> {
        let base = Url::parse(base)
            .map_err(|e| ClientError::decode(format!("invalid base URL {:?}: {}", base, e)))?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::decode(format!("bad path {:?}: {}", path, e)))
    }

    /// Map a non-success response to a `ClientError`, preferring the server's
    /// own message shapes over the bare status.
    async fn error_for(resp: reqwest::Response) -> ClientError {
        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({}));
        // Non-field validation errors (e.g. "user already invited") must
        // surface verbatim.
        if let Some(msg) = body
            .get("non_field_errors")
            .and_then(|v| v.get(0))
            .and_then(|v| v.as_str())
        {
            return ClientError::validation(msg);
        }
        let detail = body
            .get("detail")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed")
            .to_string();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::auth(detail),
            StatusCode::NOT_FOUND => ClientError::not_found(detail),
            StatusCode::BAD_REQUEST => ClientError::validation(detail),
            s => ClientError::api(s.as_u16(), detail),
        }
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> ClientResult<T> {
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        resp.json::<T>().await.map_err(|e| ClientError::decode(e.to_string()))
    }

    async fn read_ok(resp: reqwest::Response) -> ClientResult<()> {
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }

    // --- token exchange -------------------------------------------------

    /// `POST /api/token/`. Any failure collapses to a generic credentials
    /// error; the client must not reveal which field was wrong.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<TokenPair> {
        let resp = self
            .client
            .post(self.url("/api/token/")?)
            .json(&serde_json::json!({"email": email, "password": password}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::credentials("Invalid email or password"));
        }
        resp.json::<TokenPair>().await.map_err(|e| ClientError::decode(e.to_string()))
    }

    /// `POST /api/token/refresh/`. Failure here ends the session upstream.
    pub async fn refresh(&self, refresh: &str) -> ClientResult<TokenPair> {
        let resp = self
            .client
            .post(self.url("/api/token/refresh/")?)
            .json(&serde_json::json!({"refresh": refresh}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::auth("Failed to refresh token"));
        }
        resp.json::<TokenPair>().await.map_err(|e| ClientError::decode(e.to_string()))
    }

    /// `POST /api/signup/`: returns a token pair like a login.
    pub async fn signup(&self, req: &SignupRequest) -> ClientResult<TokenPair> {
        let resp = self.client.post(self.url("/api/signup/")?).json(req).send().await?;
        Self::read_json(resp).await
    }

    /// `POST /api/b2b/register/`: company registration, returns an API key.
    pub async fn register_company(
        &self,
        req: &CompanyRegistration,
    ) -> ClientResult<CompanyRegistrationResponse> {
        let resp = self.client.post(self.url("/api/b2b/register/")?).json(req).send().await?;
        Self::read_json(resp).await
    }

    // --- cards ----------------------------------------------------------

    /// `GET /api/{kind}/`: the caller's own collection of one card type.
    pub async fn list_cards<T: CardRecord + DeserializeOwned>(
        &self,
        token: &str,
    ) -> ClientResult<Vec<T>> {
        let path = format!("/api/{}/", T::KIND.endpoint());
        let resp = self.client.get(self.url(&path)?).bearer_auth(token).send().await?;
        Self::read_json(resp).await
    }

    /// `PUT /api/{kind}/{id}/`: full-record update.
    pub async fn update_card<T: CardRecord + Serialize>(
        &self,
        token: &str,
        card: &T,
    ) -> ClientResult<()> {
        let path = format!("/api/{}/{}/", T::KIND.endpoint(), card.id());
        let resp = self
            .client
            .put(self.url(&path)?)
            .bearer_auth(token)
            .json(card)
            .send()
            .await?;
        Self::read_ok(resp).await
    }

    /// `DELETE /api/{kind}/{id}/[{group_id}/]`. The trailing group segment
    /// routes the delete to the group association instead of the owner's
    /// collection.
    pub async fn delete_card(
        &self,
        token: &str,
        kind: CardKind,
        id: i64,
        group_id: Option<i64>,
    ) -> ClientResult<()> {
        let mut path = format!("/api/{}/{}/", kind.endpoint(), id);
        if let Some(gid) = group_id {
            path.push_str(&format!("{}/", gid));
        }
        let resp = self.client.delete(self.url(&path)?).bearer_auth(token).send().await?;
        Self::read_ok(resp).await
    }

    /// `POST /api/{kind}/base64/`: card scan upload with base64 images.
    pub async fn upload_card(
        &self,
        token: &str,
        kind: CardKind,
        upload: &UploadCard,
    ) -> ClientResult<()> {
        let path = format!("/api/{}/base64/", kind.endpoint());
        let resp = self
            .client
            .post(self.url(&path)?)
            .bearer_auth(token)
            .json(upload)
            .send()
            .await?;
        Self::read_ok(resp).await
    }

    // --- groups ---------------------------------------------------------

    pub async fn groups(&self, token: &str) -> ClientResult<Vec<Group>> {
        let resp = self.client.get(self.url("/api/groups/")?).bearer_auth(token).send().await?;
        Self::read_json(resp).await
    }

    pub async fn group(&self, token: &str, id: i64) -> ClientResult<Group> {
        let path = format!("/api/groups/{}/", id);
        let resp = self.client.get(self.url(&path)?).bearer_auth(token).send().await?;
        Self::read_json(resp).await
    }

    pub async fn create_group(&self, token: &str, name: &str) -> ClientResult<()> {
        let resp = self
            .client
            .post(self.url("/api/groups/")?)
            .bearer_auth(token)
            .json(&serde_json::json!({"name": name}))
            .send()
            .await?;
        Self::read_ok(resp).await
    }

    /// `POST /api/groups/add_cards/{id}/`: associate existing cards.
    pub async fn add_cards(
        &self,
        token: &str,
        group_id: i64,
        selection: &AddCardsSelection,
    ) -> ClientResult<()> {
        let path = format!("/api/groups/add_cards/{}/", group_id);
        let resp = self
            .client
            .post(self.url(&path)?)
            .bearer_auth(token)
            .json(selection)
            .send()
            .await?;
        Self::read_ok(resp).await
    }

    // --- invitations ----------------------------------------------------

    pub async fn invitations(&self, token: &str) -> ClientResult<Vec<Invitation>> {
        let resp = self
            .client
            .get(self.url("/api/invitations/")?)
            .bearer_auth(token)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    /// `POST /api/invitations/{group_id}/`: invite a user by email.
    pub async fn send_invitation(&self, token: &str, group_id: i64, email: &str) -> ClientResult<()> {
        let path = format!("/api/invitations/{}/", group_id);
        let resp = self
            .client
            .post(self.url(&path)?)
            .bearer_auth(token)
            .json(&serde_json::json!({"email": email}))
            .send()
            .await?;
        Self::read_ok(resp).await
    }

    /// `POST /api/invitations/{id}/{accept|reject}/`.
    pub async fn respond_invitation(
        &self,
        token: &str,
        id: i64,
        action: InviteAction,
    ) -> ClientResult<()> {
        let path = format!("/api/invitations/{}/{}/", id, action.as_str());
        let resp = self
            .client
            .post(self.url(&path)?)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::read_ok(resp).await
    }
}
