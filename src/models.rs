//! Wire data model for the cardwallet API.
//!
//! Field names follow the server's JSON exactly, which mixes snake_case
//! (`image_front_url`) and camelCase (`birthDate`, `mothersName`) on the same
//! records; explicit `rename` attributes keep the Rust side uniform. Card
//! dates travel as plain `YYYY-MM-DD` strings bound to date inputs upstream,
//! so they stay `String` here rather than pretending to a richer type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh pair as returned by the token endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
}

impl User {
    /// Display name preferring the first name, falling back to the email,
    /// matching how the group list renders creators.
    pub fn display_name(&self) -> &str {
        match &self.first_name {
            Some(n) if !n.is_empty() => n.as_str(),
            _ => self.email.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// The three card variants share an endpoint namespace selected by this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Id,
    Student,
    Health,
}

impl CardKind {
    /// URL path segment under `/api/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            CardKind::Id => "idcard",
            CardKind::Student => "studentcard",
            CardKind::Health => "healthcard",
        }
    }

    pub fn parse(s: &str) -> Option<CardKind> {
        match s {
            "idcard" | "id" => Some(CardKind::Id),
            "studentcard" | "student" => Some(CardKind::Student),
            "healthcard" | "health" => Some(CardKind::Health),
            _ => None,
        }
    }
}

/// Common surface of the three card types: stable id plus endpoint routing.
pub trait CardRecord {
    const KIND: CardKind;
    fn id(&self) -> i64;
    fn owner(&self) -> &User;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdCard {
    pub id: i64,
    #[serde(default)]
    pub image_front_url: Option<String>,
    #[serde(default)]
    pub image_back_url: Option<String>,
    pub user: User,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub nationality: String,
    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<String>,
    #[serde(rename = "expiryDate", default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub can: String,
    #[serde(rename = "mothersName", default)]
    pub mothers_name: String,
    #[serde(rename = "birthPlace", default)]
    pub birth_place: String,
}

impl CardRecord for IdCard {
    const KIND: CardKind = CardKind::Id;
    fn id(&self) -> i64 { self.id }
    fn owner(&self) -> &User { &self.user }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentCard {
    pub id: i64,
    #[serde(default)]
    pub image_front_url: Option<String>,
    #[serde(default)]
    pub image_back_url: Option<String>,
    pub user: User,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "cardNumber", default)]
    pub card_number: String,
    #[serde(rename = "expiryDate", default)]
    pub expiry_date: Option<String>,
    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<String>,
    #[serde(rename = "issueDate", default)]
    pub issue_date: Option<String>,
    // Server-side field name, typo included.
    #[serde(rename = "OMNUmber", default)]
    pub om_number: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub address: String,
    #[serde(rename = "placeOfBirth", default)]
    pub place_of_birth: String,
}

impl CardRecord for StudentCard {
    const KIND: CardKind = CardKind::Student;
    fn id(&self) -> i64 { self.id }
    fn owner(&self) -> &User { &self.user }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCareCard {
    pub id: i64,
    #[serde(default)]
    pub image_front_url: Option<String>,
    pub user: User,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<String>,
    #[serde(rename = "issueDate", default)]
    pub issue_date: Option<String>,
    #[serde(rename = "cardNumber", default)]
    pub card_number: String,
}

impl CardRecord for HealthCareCard {
    const KIND: CardKind = CardKind::Health;
    fn id(&self) -> i64 { self.id }
    fn owner(&self) -> &User { &self.user }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "createdBy")]
    pub created_by: User,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(rename = "idCards", default)]
    pub id_cards: Vec<IdCard>,
    #[serde(rename = "studentCards", default)]
    pub student_cards: Vec<StudentCard>,
    #[serde(rename = "healthCareCards", default)]
    pub health_care_cards: Vec<HealthCareCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub sender: User,
    pub receiver: User,
    pub group: Group,
}

/// Card ids to associate with a group, one set per card type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddCardsSelection {
    #[serde(rename = "selectedIdCardIds", default)]
    pub id_card_ids: Vec<i64>,
    #[serde(rename = "selectedStudentCardIds", default)]
    pub student_card_ids: Vec<i64>,
    #[serde(rename = "selectedHealthCareCardIds", default)]
    pub health_care_card_ids: Vec<i64>,
}

impl AddCardsSelection {
    pub fn is_empty(&self) -> bool {
        self.id_card_ids.is_empty()
            && self.student_card_ids.is_empty()
            && self.health_care_card_ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRegistration {
    pub name: String,
    #[serde(rename = "vatNumber")]
    pub vat_number: String,
    #[serde(rename = "contactEmail")]
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRegistrationResponse {
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

/// Base64 card upload payload; back side is optional for health-care cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCard {
    #[serde(rename = "imageFront")]
    pub image_front: String,
    #[serde(rename = "imageBack")]
    pub image_back: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_card_round_trips_server_field_names() {
        let json = serde_json::json!({
            "id": 3,
            "image_front_url": "http://x/front.png",
            "image_back_url": "http://x/back.png",
            "user": {"id": 1, "username": "ab", "email": "a@b.com"},
            "name": "Jane Doe",
            "sex": "female",
            "nationality": "HU",
            "birthDate": "1990-02-01",
            "expiryDate": "2030-02-01",
            "identifier": "123456AB",
            "can": "112233",
            "mothersName": "Mary Doe",
            "birthPlace": "Budapest"
        });
        let card: IdCard = serde_json::from_value(json).unwrap();
        assert_eq!(card.sex, Some(Sex::Female));
        assert_eq!(card.mothers_name, "Mary Doe");
        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back["birthDate"], "1990-02-01");
        assert_eq!(back["mothersName"], "Mary Doe");
    }

    #[test]
    fn student_card_keeps_server_typo_field() {
        let card = StudentCard {
            id: 9,
            image_front_url: None,
            image_back_url: None,
            user: User { id: 1, username: String::new(), first_name: None, last_name: None, email: "a@b.com".into() },
            name: "S".into(),
            card_number: "C1".into(),
            expiry_date: None,
            birth_date: None,
            issue_date: None,
            om_number: "OM-42".into(),
            school: "ELTE".into(),
            address: String::new(),
            place_of_birth: String::new(),
        };
        let v = serde_json::to_value(&card).unwrap();
        assert_eq!(v["OMNUmber"], "OM-42");
    }

    #[test]
    fn unknown_wire_fields_are_tolerated() {
        // The server includes a password field on User; the client ignores it.
        let json = serde_json::json!({
            "id": 7, "username": "u", "email": "u@e.com", "password": "pbkdf2$..."
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "u@e.com");
    }

    #[test]
    fn card_kind_endpoints() {
        assert_eq!(CardKind::Id.endpoint(), "idcard");
        assert_eq!(CardKind::Student.endpoint(), "studentcard");
        assert_eq!(CardKind::Health.endpoint(), "healthcard");
        assert_eq!(CardKind::parse("healthcard"), Some(CardKind::Health));
        assert_eq!(CardKind::parse("passport"), None);
    }
}
