use crate::{AuthzError, AuthzResult};

/// Name the enforcement model uses to call [`action_set_match`].
pub const ACTION_MATCH_FN: &str = "actionMatch";

/// Returns true when `requested` is one of the comma-separated tokens in the
/// stored action field. Tokens are compared exactly; `"rea"` never matches
/// `"read"`.
pub fn action_set_match(requested: &str, stored: &str) -> bool {
    stored.split(',').any(|action| action == requested)
}

/// Evaluate the matcher from a raw argument list, as the policy model would
/// pass it. Anything other than `(requested, stored)` is rejected.
pub fn invoke_action_matcher(args: &[&str]) -> AuthzResult<bool> {
    match args {
        [requested, stored] => Ok(action_set_match(requested, stored)),
        _ => Err(AuthzError::InvalidArguments(format!(
            "{ACTION_MATCH_FN} expects 2 arguments, got {}",
            args.len()
        ))),
    }
}
