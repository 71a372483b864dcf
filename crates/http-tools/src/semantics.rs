//! HTTP method semantics.
//!
//! Tools generated from REST endpoints advertise MCP `ToolAnnotations` derived from the RFC 9110
//! properties of their HTTP method.

use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// Safety/idempotence properties of an HTTP method. `None` means "do not advertise".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSemantics {
    pub read_only: Option<bool>,
    pub destructive: Option<bool>,
    pub idempotent: Option<bool>,
}

impl MethodSemantics {
    const UNKNOWN: Self = Self {
        read_only: None,
        destructive: None,
        idempotent: None,
    };

    const fn known(read_only: bool, destructive: bool, idempotent: Option<bool>) -> Self {
        Self {
            read_only: Some(read_only),
            destructive: Some(destructive),
            idempotent,
        }
    }
}

/// Look up the semantics of `method`. Extension methods are [`MethodSemantics::UNKNOWN`].
#[must_use]
pub fn method_semantics(method: &Method) -> MethodSemantics {
    match method.as_str() {
        "GET" | "HEAD" | "OPTIONS" => MethodSemantics::known(true, false, Some(true)),
        "POST" => MethodSemantics::known(false, false, Some(false)),
        "PUT" | "DELETE" => MethodSemantics::known(false, true, Some(true)),
        // PATCH may or may not be idempotent; do not guess.
        "PATCH" => MethodSemantics::known(false, true, None),
        _ => MethodSemantics::UNKNOWN,
    }
}

/// Build MCP tool annotations for an HTTP-backed tool.
///
/// `openWorldHint` is always `true`: every generated tool talks to an external API.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let semantics = method_semantics(method);
    ToolAnnotations {
        title: None,
        read_only_hint: semantics.read_only,
        destructive_hint: semantics.destructive,
        idempotent_hint: semantics.idempotent,
        open_world_hint: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_is_open_world() {
        for m in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ] {
            assert_eq!(annotations_for_method(&m).open_world_hint, Some(true));
        }
    }

    #[test]
    fn safe_methods_are_read_only() {
        for m in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let a = annotations_for_method(&m);
            assert_eq!(a.read_only_hint, Some(true));
            assert_eq!(a.destructive_hint, Some(false));
            assert_eq!(a.idempotent_hint, Some(true));
        }
    }

    #[test]
    fn post_is_not_idempotent() {
        let a = annotations_for_method(&Method::POST);
        assert_eq!(a.read_only_hint, Some(false));
        assert_eq!(a.idempotent_hint, Some(false));
    }

    #[test]
    fn patch_leaves_idempotence_unset() {
        let s = method_semantics(&Method::PATCH);
        assert_eq!(s.destructive, Some(true));
        assert_eq!(s.idempotent, None);
    }

    #[test]
    fn extension_methods_only_set_open_world() {
        let custom: Method = "PROPFIND".parse().expect("valid method token");
        let a = annotations_for_method(&custom);
        assert_eq!(a.read_only_hint, None);
        assert_eq!(a.destructive_hint, None);
        assert_eq!(a.idempotent_hint, None);
        assert_eq!(a.open_world_hint, Some(true));
    }
}
