use crate::Error;
use policy_converter_k8s_api::ObjectMeta;
use uuid::Uuid;

/// The version and variant bytes of an RFC 4122 UUID.
const PRESERVED: [usize; 2] = [6, 8];

/// Derives the UID of a converted object from the UID of its source, so that the two never
/// collide.
///
/// The bits of each byte are reversed, except for the bytes holding the version and variant,
/// which are kept so the result is still a well-formed UUID. An empty UID converts to an empty
/// UID.
pub fn convert_uid(uid: &str) -> Result<String, Error> {
    if uid.is_empty() {
        return Ok(String::new());
    }
    let parsed = Uuid::parse_str(uid).map_err(|source| Error::InvalidUid {
        uid: uid.to_string(),
        source,
    })?;

    let mut bytes = *parsed.as_bytes();
    for (i, b) in bytes.iter_mut().enumerate() {
        if !PRESERVED.contains(&i) {
            *b = b.reverse_bits();
        }
    }
    Ok(Uuid::from_bytes(bytes).hyphenated().to_string())
}

/// Converts the UID of a source object, if it has one.
pub(crate) fn convert_meta_uid(meta: &ObjectMeta) -> Result<Option<String>, Error> {
    meta.uid
        .as_deref()
        .filter(|uid| !uid.is_empty())
        .map(convert_uid)
        .transpose()
}
