//! User profile stored in the `users` collection.

use serde::{Deserialize, Serialize};

use super::{AdditionalProfileInfo, Identity};

/// Field holding the contact link; the only field rewritten after creation.
pub const CONTACT_URL_FIELD: &str = "messengerURL";

/// Profile document, keyed by uid.
///
/// Field names match what the rest of the app reads from `users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub email: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    /// Facebook user ID
    #[serde(rename = "fbUID")]
    pub external_id: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(rename = "messengerURL")]
    pub contact_url: String,
}

impl Profile {
    /// Build the first version of a profile from sign-in data.
    pub fn new(identity: &Identity, info: &AdditionalProfileInfo, contact_url: String) -> Self {
        Self {
            email: identity.email.clone(),
            full_name: info.name.clone(),
            first_name: info.first_name.clone(),
            last_name: info.last_name.clone(),
            external_id: info.id.clone(),
            photo_url: identity.photo_url.clone(),
            contact_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_serializes_with_store_field_names() {
        let identity = Identity {
            uid: "u1".to_string(),
            display_name: Some("Ada Lovelace".to_string()),
            photo_url: Some("https://example.com/ada.jpg".to_string()),
            email: Some("ada@example.com".to_string()),
        };
        let info = AdditionalProfileInfo {
            id: "fb-42".to_string(),
            name: Some("Ada Lovelace".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
        };

        let profile = Profile::new(&identity, &info, "https://m.me/ada".to_string());
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["fullName"], "Ada Lovelace");
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["lastName"], "Lovelace");
        assert_eq!(json["fbUID"], "fb-42");
        assert_eq!(json["photoURL"], "https://example.com/ada.jpg");
        assert_eq!(json[CONTACT_URL_FIELD], "https://m.me/ada");
        assert_eq!(json["email"], "ada@example.com");
    }
}
