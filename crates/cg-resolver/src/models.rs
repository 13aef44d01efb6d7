use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Player identity returned by a name lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Profile {
    /// UUID, emitted without dashes
    #[serde(with = "mojang_id")]
    pub id: Uuid,
    /// Player name
    pub name: String,
}

impl Profile {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Signed texture property as exchanged with the session server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SkinProperty {
    #[serde(default = "textures_property_name")]
    pub name: String,
    /// Base64 encoded skin JSON
    pub value: String,
    /// Base64 encoded signature of `value`
    #[serde(default)]
    pub signature: String,
}

impl SkinProperty {
    pub fn new(value: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: textures_property_name(),
            value: value.into(),
            signature: signature.into(),
        }
    }
}

fn textures_property_name() -> String {
    "textures".to_string()
}

/// Arm model of a skin
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SkinModel {
    #[default]
    Classic,
    Slim,
}

/// Decoded form of a [`SkinProperty`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "mojang_id")]
    pub profile_id: Uuid,
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_required: Option<bool>,
    pub textures: SkinTextures,
    /// Raw signature bytes, carried outside of the JSON payload
    #[serde(skip)]
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkinTextures {
    #[serde(rename = "SKIN", default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<SkinTexture>,
    #[serde(rename = "CAPE", default, skip_serializing_if = "Option::is_none")]
    pub cape: Option<CapeTexture>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkinTexture {
    pub url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TextureMetadata>,
}

impl SkinTexture {
    /// Classic skins carry no metadata
    pub fn model(&self) -> SkinModel {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.model)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextureMetadata {
    pub model: SkinModel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapeTexture {
    pub url: Url,
}

/// Session server answer for a player that joined with a valid session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verification {
    #[serde(with = "mojang_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<SkinProperty>,
}

impl Verification {
    pub fn profile(&self) -> Profile {
        Profile::new(self.id, self.name.clone())
    }

    /// The signed textures property, if the session server sent one
    pub fn textures(&self) -> Option<&SkinProperty> {
        self.properties
            .iter()
            .find(|property| property.name == "textures")
    }
}

/// Entry of a player's name history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NameChange {
    pub name: String,
    /// Absent for the name the account was created with
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub changed_to_at: Option<DateTime<Utc>>,
}

/// Authenticated player used for skin mutations
#[derive(Clone)]
pub struct MinecraftAccount {
    pub profile: Profile,
    pub access_token: Zeroizing<String>,
    pub expires_at: DateTime<Utc>,
}

impl MinecraftAccount {
    pub fn new(profile: Profile, access_token: impl Into<String>, expires_in: u64) -> Self {
        // lifetimes beyond the representable range never expire
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            profile,
            access_token: Zeroizing::new(access_token.into()),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl std::fmt::Debug for MinecraftAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinecraftAccount")
            .field("profile", &self.profile)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of the change skin request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChangeSkinRequest<'a> {
    pub model: SkinModel,
    pub url: &'a Url,
}

/// Session server profile response carrying the textures property
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TexturesResponse {
    #[serde(default)]
    pub properties: Vec<SkinProperty>,
}

/// UUIDs in the provider's dash-less form.
///
/// Accepts every textual UUID form on input.
pub mod mojang_id {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use uuid::Uuid;

    pub fn to_string(id: &Uuid) -> String {
        id.simple().to_string()
    }

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_string(id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Uuid::parse_str(&raw).map_err(D::Error::custom)
    }
}
