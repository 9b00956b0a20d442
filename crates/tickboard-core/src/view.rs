//! Saved board views.
//!
//! A view is everything the user chose on a board: filters, search, sort,
//! grouping, and which groups are collapsed. It serializes to JSON so a host
//! can persist it however it likes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::TicketQuery;
use crate::model::{FilterClause, GroupBy, SortDir, SortField};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub filters: Vec<FilterClause>,
    pub sort_field: SortField,
    pub sort_dir: SortDir,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub group_by: GroupBy,
    pub collapsed: Vec<String>,
}

impl ViewState {
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ViewDecode`] when `json` is not a view
    /// object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Serialization of a view does not fail in practice; the error is
    /// forwarded from `serde_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The filter/search/sort part of the view.
    #[must_use]
    pub fn query(&self) -> TicketQuery {
        TicketQuery {
            filters: self.filters.clone(),
            sort_field: self.sort_field,
            sort_dir: self.sort_dir,
            search: self.search.clone().filter(|s| !s.is_empty()),
        }
    }

    #[must_use]
    pub fn collapsed_set(&self) -> HashSet<String> {
        self.collapsed.iter().cloned().collect()
    }

    /// Flip a group between collapsed and expanded.
    pub fn toggle_collapsed(&mut self, key: &str) {
        if let Some(pos) = self.collapsed.iter().position(|k| k == key) {
            self.collapsed.remove(pos);
        } else {
            self.collapsed.push(key.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{FilterField, FilterOperator, FilterValue};

    #[test]
    fn decodes_a_saved_view() {
        let view = ViewState::from_json(
            r#"{
                "filters": [
                    {"id": "f-1", "field": "status", "operator": "any_of", "value": ["open"]},
                    {"field": "priority", "operator": "is", "value": 1}
                ],
                "sort_field": "modified",
                "sort_dir": "desc",
                "search": "login",
                "group_by": "epic",
                "collapsed": ["e-1"]
            }"#,
        )
        .unwrap();
        assert_eq!(view.filters.len(), 2);
        assert_eq!(view.filters[0].field, FilterField::Status);
        assert_eq!(view.filters[1].operator, FilterOperator::Is);
        assert_eq!(view.filters[1].id, "");
        assert_eq!(view.sort_field, SortField::Modified);
        assert_eq!(view.group_by, GroupBy::Epic);
        assert!(view.collapsed_set().contains("e-1"));

        let query = view.query();
        assert_eq!(query.search.as_deref(), Some("login"));
        assert_eq!(query.sort_dir, SortDir::Desc);
    }

    #[test]
    fn empty_object_is_the_default_view() {
        assert_eq!(ViewState::from_json("{}").unwrap(), ViewState::default());
    }

    #[test]
    fn malformed_document_is_a_view_decode_error() {
        assert!(matches!(ViewState::from_json("[1, 2"), Err(Error::ViewDecode(_))));
        assert!(matches!(
            ViewState::from_json(r#"{"filters": 3}"#),
            Err(Error::ViewDecode(_))
        ));
    }

    #[test]
    fn json_round_trip_keeps_clauses() {
        let view = ViewState {
            filters: vec![FilterClause {
                id: "f-9".to_string(),
                field: FilterField::Tag,
                operator: FilterOperator::NoneOf,
                value: FilterValue::list(&["wontfix"]),
            }],
            group_by: GroupBy::Status,
            ..ViewState::default()
        };
        let back = ViewState::from_json(&view.to_json().unwrap()).unwrap();
        assert_eq!(back, view);
    }

    #[test]
    fn empty_search_is_dropped_from_query() {
        let view = ViewState {
            search: Some(String::new()),
            ..ViewState::default()
        };
        assert_eq!(view.query().search, None);
    }

    #[test]
    fn toggle_collapsed_flips_membership() {
        let mut view = ViewState::default();
        view.toggle_collapsed("open");
        assert_eq!(view.collapsed, vec!["open"]);
        view.toggle_collapsed("open");
        assert!(view.collapsed.is_empty());
    }
}
