//! Search parameters shared by every searchable domain.

use serde::{Deserialize, Serialize};

use courier_core::types::ConversationId;
use courier_core::{CourierError, Result};

/// Flat query configuration accepted by [`SearchResolver`](crate::SearchResolver).
///
/// Each filter dimension offers an exact-match list and a likeness pattern;
/// the two are mutually exclusive per dimension. `like*` patterns use SQL
/// LIKE syntax (`%` matches any run, `_` one character).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParameters {
    /// Exact MIME types to match. Mutually exclusive with `like_mime`.
    pub mime: Option<Vec<String>>,
    /// MIME likeness pattern. Mutually exclusive with `mime`.
    #[serde(rename = "likeMIME")]
    pub like_mime: Option<String>,
    /// Exact UTIs to match. Mutually exclusive with `like_uti`.
    pub uti: Option<Vec<String>>,
    /// UTI likeness pattern. Mutually exclusive with `uti`.
    #[serde(rename = "likeUTI")]
    pub like_uti: Option<String>,
    /// Substring filter on the entity's name.
    pub name: Option<String>,
    /// Restrict candidates to these conversations.
    pub conversations: Option<Vec<ConversationId>>,
    /// Page size.
    pub limit: Option<u32>,
    /// Zero-based page index. Requires `limit`.
    pub page: Option<u32>,
}

impl SearchParameters {
    /// Enforce the parameter invariants.
    ///
    /// Runs before any store access; a violation is never resolved by
    /// preferring one filter over the other.
    pub fn validate(&self) -> Result<()> {
        if self.mime.is_some() && self.like_mime.is_some() {
            return Err(CourierError::Validation(
                "mime and likeMIME are mutually exclusive".to_string(),
            ));
        }
        if self.uti.is_some() && self.like_uti.is_some() {
            return Err(CourierError::Validation(
                "uti and likeUTI are mutually exclusive".to_string(),
            ));
        }
        if self.page.is_some() && self.limit.is_none() {
            return Err(CourierError::Validation(
                "page requires limit".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_parameters_are_valid() {
        assert!(SearchParameters::default().validate().is_ok());
    }

    #[test]
    fn test_mime_dimension_mutual_exclusion() {
        let params = SearchParameters {
            mime: Some(vec!["image/png".to_string()]),
            like_mime: Some("image/%".to_string()),
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));
        assert!(err.to_string().contains("likeMIME"));
    }

    #[test]
    fn test_uti_dimension_mutual_exclusion() {
        let params = SearchParameters {
            uti: Some(vec!["public.png".to_string()]),
            like_uti: Some("public.%".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(CourierError::Validation(_))
        ));
    }

    #[test]
    fn test_one_filter_per_dimension_is_valid() {
        let exact = SearchParameters {
            mime: Some(vec!["image/png".to_string()]),
            uti: Some(vec!["public.png".to_string()]),
            ..Default::default()
        };
        assert!(exact.validate().is_ok());

        let likeness = SearchParameters {
            like_mime: Some("image/%".to_string()),
            like_uti: Some("public.%".to_string()),
            ..Default::default()
        };
        assert!(likeness.validate().is_ok());
    }

    #[test]
    fn test_page_without_limit_is_invalid() {
        let params = SearchParameters {
            page: Some(2),
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));
        assert!(err.to_string().contains("page requires limit"));
    }

    #[test]
    fn test_page_with_limit_is_valid() {
        let params = SearchParameters {
            limit: Some(25),
            page: Some(2),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_wire_field_names() {
        let params = SearchParameters {
            like_mime: Some("image/%".to_string()),
            like_uti: Some("public.%".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"likeMIME\""));
        assert!(json.contains("\"likeUTI\""));
    }

    #[test]
    fn test_deserializes_partial_input() {
        let params: SearchParameters =
            serde_json::from_str(r#"{"mime":["image/png"],"limit":10}"#).unwrap();
        assert_eq!(params.mime.as_ref().unwrap().len(), 1);
        assert_eq!(params.limit, Some(10));
        assert!(params.validate().is_ok());
    }
}
