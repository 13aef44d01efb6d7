use base64::{Engine, engine::general_purpose::STANDARD};

use crate::errors::Result;
use crate::models::{Skin, SkinProperty};

/// Decode a signed textures property into the skin model.
///
/// The signature is kept as raw bytes on the returned [`Skin`].
pub fn decode_skin(property: &SkinProperty) -> Result<Skin> {
    let json = STANDARD.decode(property.value.as_bytes())?;
    let mut skin: Skin = serde_json::from_slice(&json)?;
    skin.signature = STANDARD.decode(property.signature.as_bytes())?;
    Ok(skin)
}

/// Encode a skin model back into a textures property
pub fn encode_skin(skin: &Skin) -> Result<SkinProperty> {
    let json = serde_json::to_vec(skin)?;
    Ok(SkinProperty::new(
        STANDARD.encode(json),
        STANDARD.encode(&skin.signature),
    ))
}
