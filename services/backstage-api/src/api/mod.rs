//! HTTP API module.
//!
//! # Purpose
//! Route handler modules plus shared helpers for validating request input.
pub mod error;
pub mod menu;
pub mod openapi;
pub mod permissions;
pub mod roles;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_validation_error};
use backstage_authz::Action;

/// Parse action names, rejecting unknown values and an empty list.
pub(crate) fn parse_actions(actions: &[String]) -> Result<Vec<Action>, ApiError> {
    if actions.is_empty() {
        return Err(api_validation_error("actions must not be empty"));
    }
    actions
        .iter()
        .map(|name| {
            name.trim()
                .parse::<Action>()
                .map_err(|_| api_validation_error(&format!("unknown action: {name}")))
        })
        .collect()
}

/// Split a comma-separated list, dropping blank entries.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(api_validation_error(&format!("{field} must not be empty")));
    }
    Ok(())
}
