//! Organization membership helpers.

use crate::domain::models::MemberSpec;

pub const MEMBER_ROLES: [&str; 3] = ["member", "moderator", "admin"];

/// Build a member payload from a CLI target: an email address when the
/// target contains `@`, otherwise a user id.
pub fn member_spec(target: &str, role: &str) -> anyhow::Result<MemberSpec> {
    let role = role.trim().to_ascii_lowercase();
    if !MEMBER_ROLES.contains(&role.as_str()) {
        anyhow::bail!(
            "unknown member role: {} (expected one of: {})",
            role,
            MEMBER_ROLES.join(", ")
        );
    }
    let target = target.trim();
    if target.is_empty() {
        anyhow::bail!("member target must be an email or user id");
    }
    if target.contains('@') {
        Ok(MemberSpec {
            email: Some(target.to_string()),
            user_id: None,
            role,
        })
    } else {
        Ok(MemberSpec {
            email: None,
            user_id: Some(target.to_string()),
            role,
        })
    }
}
