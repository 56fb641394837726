use std::collections::HashMap;

use crate::error::KgError;

/// Discriminates a human operator from an autonomous/agentic caller.
///
/// The §4.10 override gate depends on this: agents can request
/// verification but cannot override a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Agent,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }

    // Intentionally not `FromStr` — this is a narrow internal parser over
    // claim values, not a general string conversion.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of a request, resolved by the (excluded) auth subsystem before
/// it ever reaches these components — core logic never decodes a token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub actor_id: String,
    pub kind: PrincipalKind,
    pub roles: Vec<String>,
    pub claims: HashMap<String, String>,
    pub tenancy: Option<String>,
}

impl Principal {
    /// Construct from already-validated identity claims (remote mode). The
    /// composition root owns the actual token/credential verification.
    pub fn from_claims(claims: &PrincipalClaims) -> Result<Self, KgError> {
        let actor_id = claims
            .sub
            .clone()
            .ok_or_else(|| KgError::Unauthorized("missing sub claim".into()))?;
        let kind = claims
            .kind
            .as_deref()
            .and_then(PrincipalKind::from_str)
            .ok_or_else(|| KgError::Unauthorized("missing or invalid principal kind".into()))?;
        Ok(Self {
            actor_id,
            kind,
            roles: claims.roles.clone().unwrap_or_default(),
            claims: claims.extra.clone().unwrap_or_default(),
            tenancy: claims.tenancy.clone(),
        })
    }

    /// Construct explicitly for in-process/test callers. There is no
    /// implicit or thread-local identity anywhere in this codebase.
    pub fn in_process(actor_id: impl Into<String>, kind: PrincipalKind, roles: Vec<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            kind,
            roles,
            claims: HashMap::new(),
            tenancy: None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_user(&self) -> bool {
        self.kind == PrincipalKind::User
    }

    pub fn is_agent(&self) -> bool {
        self.kind == PrincipalKind::Agent
    }

    /// §4.10 override gate: agents may never override their own — or
    /// anyone else's — verification result.
    pub fn require_override_eligible(&self) -> Result<(), KgError> {
        if self.is_user() {
            Ok(())
        } else {
            Err(KgError::Forbidden(format!(
                "principal {} has kind {} — only a User may perform an override",
                self.actor_id, self.kind
            )))
        }
    }

    /// §9 admin gate: apply-mode cleanup is restricted to the process-wide
    /// admin allowlist of principal ids.
    pub fn require_admin(&self, allowlist: &[String]) -> Result<(), KgError> {
        if allowlist.iter().any(|id| id == &self.actor_id) {
            Ok(())
        } else {
            Err(KgError::Forbidden(format!(
                "principal {} is not in the admin allowlist",
                self.actor_id
            )))
        }
    }
}

/// Identity claims shape handed to core logic by the composition root once
/// the (excluded) auth subsystem has verified the caller.
#[derive(Debug, serde::Deserialize)]
pub struct PrincipalClaims {
    pub sub: Option<String>,
    pub kind: Option<String>,
    pub roles: Option<Vec<String>>,
    pub tenancy: Option<String>,
    #[serde(flatten)]
    pub extra: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_cannot_override() {
        let agent = Principal::in_process("agent-1", PrincipalKind::Agent, vec![]);
        assert!(agent.require_override_eligible().is_err());
    }

    #[test]
    fn user_can_override() {
        let user = Principal::in_process("user-1", PrincipalKind::User, vec![]);
        assert!(user.require_override_eligible().is_ok());
    }

    #[test]
    fn claims_require_kind() {
        let claims = PrincipalClaims {
            sub: Some("u1".into()),
            kind: None,
            roles: None,
            tenancy: None,
            extra: None,
        };
        assert!(Principal::from_claims(&claims).is_err());
    }

    #[test]
    fn kind_parses_human_alias() {
        assert_eq!(PrincipalKind::from_str("human"), Some(PrincipalKind::User));
        assert_eq!(PrincipalKind::from_str("AGENT"), Some(PrincipalKind::Agent));
        assert_eq!(PrincipalKind::from_str("robot"), None);
    }

    #[test]
    fn allowlisted_principal_is_admin() {
        let admin = Principal::in_process("admin-1", PrincipalKind::User, vec![]);
        assert!(admin.require_admin(&["admin-1".to_string()]).is_ok());
    }

    #[test]
    fn non_allowlisted_principal_is_not_admin() {
        let user = Principal::in_process("user-1", PrincipalKind::User, vec![]);
        assert!(user.require_admin(&["admin-1".to_string()]).is_err());
    }
}
