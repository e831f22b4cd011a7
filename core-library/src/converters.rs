//! Composite column converters
//!
//! Each composite field family is stored as JSON text. Decoding fails closed:
//! a corrupt or foreign value yields `None` and a warning, so one bad column
//! never aborts a whole-record read.

use crate::error::{LibraryError, Result};
use crate::models::{CollectionRef, ImageSet, SimilarItem};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

fn encode<T: Serialize + ?Sized>(value: &T, family: &'static str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| LibraryError::Conversion(format!("Failed to encode {}: {}", family, e)))
}

fn decode<T: DeserializeOwned>(text: Option<&str>, family: &'static str) -> Option<T> {
    let text = text?;
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(family, error = %e, "Discarding undecodable column value");
            None
        }
    }
}

pub fn encode_string_list(values: &[String]) -> Result<String> {
    encode(values, "string list")
}

pub fn decode_string_list(text: Option<&str>) -> Option<Vec<String>> {
    decode(text, "string list")
}

/// Cast and crew lists share one encoding.
pub fn encode_person_list<P: Serialize>(people: &[P]) -> Result<String> {
    encode(people, "person list")
}

pub fn decode_person_list<P: DeserializeOwned>(text: Option<&str>) -> Option<Vec<P>> {
    decode(text, "person list")
}

pub fn encode_image_set(images: &ImageSet) -> Result<String> {
    encode(images, "image set")
}

pub fn decode_image_set(text: Option<&str>) -> Option<ImageSet> {
    decode(text, "image set")
}

pub fn encode_collection(collection: &CollectionRef) -> Result<String> {
    encode(collection, "collection")
}

pub fn decode_collection(text: Option<&str>) -> Option<CollectionRef> {
    decode(text, "collection")
}

pub fn encode_similar_list(items: &[SimilarItem]) -> Result<String> {
    encode(items, "similar list")
}

pub fn decode_similar_list(text: Option<&str>) -> Option<Vec<SimilarItem>> {
    decode(text, "similar list")
}

pub fn encode_int_map(map: &BTreeMap<String, Option<i64>>) -> Result<String> {
    encode(map, "int map")
}

pub fn decode_int_map(text: Option<&str>) -> Option<BTreeMap<String, Option<i64>>> {
    decode(text, "int map")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CastMember, CrewMember};
    use core_runtime::kinds::MediaKind;

    #[test]
    fn test_null_decodes_to_none() {
        assert_eq!(decode_string_list(None), None);
        assert_eq!(decode_image_set(None), None);
        assert_eq!(decode_collection(None), None);
        assert_eq!(decode_int_map(None), None);
        assert_eq!(decode_person_list::<CastMember>(None), None);
    }

    #[test]
    fn test_people_round_trip() {
        let cast = vec![
            CastMember {
                id: 3894,
                name: "Christian Bale".to_string(),
                character: Some("Bruce Wayne".to_string()),
                profile_path: Some("/bale.jpg".to_string()),
                order: Some(0),
            },
            CastMember {
                id: 1810,
                name: "Heath Ledger".to_string(),
                character: None,
                profile_path: None,
                order: None,
            },
        ];
        let crew = vec![CrewMember {
            id: 525,
            name: "Christopher Nolan".to_string(),
            job: Some("Director".to_string()),
            department: Some("Directing".to_string()),
            profile_path: None,
        }];

        let text = encode_person_list(&cast).unwrap();
        assert_eq!(decode_person_list::<CastMember>(Some(&text)), Some(cast));

        let text = encode_person_list(&crew).unwrap();
        assert_eq!(decode_person_list::<CrewMember>(Some(&text)), Some(crew));
    }

    #[test]
    fn test_similar_and_map_round_trip() {
        let similar = vec![SimilarItem {
            id: 272,
            title: "Batman Begins".to_string(),
            media_kind: MediaKind::Movie,
            poster_url: Some("https://image.tmdb.org/t/p/w500/begins.jpg".to_string()),
            backdrop_url: None,
            rating: Some(7.7),
            year: Some(2005),
        }];
        let text = encode_similar_list(&similar).unwrap();
        assert_eq!(decode_similar_list(Some(&text)), Some(similar));

        let mut distribution = BTreeMap::new();
        distribution.insert("10".to_string(), Some(1520));
        distribution.insert("1".to_string(), None);
        let text = encode_int_map(&distribution).unwrap();
        assert_eq!(decode_int_map(Some(&text)), Some(distribution));
    }

    #[test]
    fn test_malformed_text_fails_closed() {
        assert_eq!(decode_string_list(Some("not json")), None);
        assert_eq!(decode_image_set(Some("[1,2,3]")), None);
        assert_eq!(decode_collection(Some(r#"{"name":42}"#)), None);
        assert_eq!(decode_int_map(Some(r#"{"1":"many"}"#)), None);
        assert_eq!(decode_person_list::<CastMember>(Some("")), None);
    }

    #[test]
    fn test_empty_values_round_trip() {
        let text = encode_string_list(&[]).unwrap();
        assert_eq!(text, "[]");
        assert_eq!(decode_string_list(Some(&text)), Some(Vec::new()));

        let images = ImageSet::default();
        let text = encode_image_set(&images).unwrap();
        assert_eq!(decode_image_set(Some(&text)), Some(images));
    }
}
