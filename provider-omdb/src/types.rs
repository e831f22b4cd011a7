//! OMDb response types and value parsing
//!
//! OMDb returns every value as a string and uses `"N/A"` for missing data.

use core_library::models::RatingScore;
use serde::Deserialize;

const NOT_AVAILABLE: &str = "N/A";

/// `/?i=<imdb id>` response. Only the rating fields are kept.
#[derive(Debug, Deserialize)]
pub struct OmdbResponse {
    #[serde(rename = "Response")]
    pub response: Option<String>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: Option<String>,
    #[serde(rename = "Metascore")]
    pub metascore: Option<String>,
    #[serde(rename = "Ratings", default)]
    pub ratings: Vec<OmdbRating>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbRating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl OmdbResponse {
    pub fn is_success(&self) -> bool {
        !self
            .response
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("false"))
    }

    fn rating_value(&self, source: &str) -> Option<&str> {
        self.ratings
            .iter()
            .find(|rating| rating.source == source)
            .map(|rating| rating.value.as_str())
    }

    /// 0-10 with the vote count
    pub fn imdb(&self) -> Option<RatingScore> {
        let score = self
            .imdb_rating
            .as_deref()
            .and_then(parse_decimal)
            .or_else(|| {
                self.rating_value("Internet Movie Database")
                    .and_then(parse_fraction)
            })?;
        let votes = self.imdb_votes.as_deref().and_then(parse_count);
        Some(RatingScore::new(score, votes))
    }

    /// Tomatometer percent, 0-100
    pub fn rotten_tomatoes(&self) -> Option<RatingScore> {
        self.rating_value("Rotten Tomatoes")
            .and_then(parse_percent)
            .map(|score| RatingScore::new(score, None))
    }

    /// 0-100
    pub fn metacritic(&self) -> Option<RatingScore> {
        self.metascore
            .as_deref()
            .and_then(parse_decimal)
            .or_else(|| self.rating_value("Metacritic").and_then(parse_fraction))
            .map(|score| RatingScore::new(score, None))
    }
}

fn available(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != NOT_AVAILABLE).then_some(value)
}

/// `"8.8"`
pub fn parse_decimal(value: &str) -> Option<f64> {
    available(value)?.parse().ok()
}

/// `"2,400,000"`
pub fn parse_count(value: &str) -> Option<i64> {
    available(value)?.replace(',', "").parse().ok()
}

/// `"91%"`
pub fn parse_percent(value: &str) -> Option<f64> {
    parse_decimal(available(value)?.trim_end_matches('%'))
}

/// `"8.8/10"` or `"74/100"`; the numerator is returned as is
pub fn parse_fraction(value: &str) -> Option<f64> {
    let numerator = available(value)?.split('/').next()?;
    parse_decimal(numerator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_decimal("8.8"), Some(8.8));
        assert_eq!(parse_decimal("N/A"), None);
        assert_eq!(parse_count("2,400,000"), Some(2_400_000));
        assert_eq!(parse_count("N/A"), None);
        assert_eq!(parse_percent("91%"), Some(91.0));
        assert_eq!(parse_percent("%"), None);
        assert_eq!(parse_fraction("74/100"), Some(74.0));
        assert_eq!(parse_fraction("N/A"), None);
    }

    #[test]
    fn test_rating_slots() {
        let response: OmdbResponse = serde_json::from_str(
            r#"{
                "Title": "Inception",
                "Ratings": [
                    {"Source": "Internet Movie Database", "Value": "8.8/10"},
                    {"Source": "Rotten Tomatoes", "Value": "87%"},
                    {"Source": "Metacritic", "Value": "74/100"}
                ],
                "Metascore": "N/A",
                "imdbRating": "N/A",
                "imdbVotes": "2,400,000",
                "imdbID": "tt1375666",
                "Response": "True"
            }"#,
        )
        .unwrap();

        assert!(response.is_success());
        assert_eq!(response.imdb(), Some(RatingScore::new(8.8, Some(2_400_000))));
        assert_eq!(response.rotten_tomatoes(), Some(RatingScore::new(87.0, None)));
        assert_eq!(response.metacritic(), Some(RatingScore::new(74.0, None)));
    }

    #[test]
    fn test_failed_response() {
        let response: OmdbResponse =
            serde_json::from_str(r#"{"Response": "False", "Error": "Incorrect IMDb ID."}"#)
                .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.imdb(), None);
        assert_eq!(response.rotten_tomatoes(), None);
    }
}
