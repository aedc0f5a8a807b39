//! Domain and URL-path filtering for search candidates.
//!
//! Pure predicates over the candidate URL; nothing here touches the network.

use url::Url;

use crate::config::FilterContext;
use crate::types::RejectReason;

/// Approximate the registrable domain of a URL.
///
/// Keeps the last three host labels when there are at least three and the
/// final label is at most three characters long (`shop.example.com.pl`
/// becomes `example.com.pl`), otherwise the last two. Without a public
/// suffix list this misjudges some multi-label suffixes. Unparseable URLs
/// yield an empty string.
pub fn registrable_domain(url: &str) -> String {
    let host = match Url::parse(url) {
        Ok(u) => u.host_str().unwrap_or_default().to_string(),
        Err(_) => return String::new(),
    };
    let labels: Vec<&str> = host.split('.').collect();
    let keep = if labels.len() >= 3 && labels[labels.len() - 1].chars().count() <= 3 {
        3
    } else {
        2
    };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

/// Domain rules: allow-list suffixes first, then deny-list suffixes.
pub fn check_domain(domain: &str, ctx: &FilterContext) -> Result<(), RejectReason> {
    if !ctx.domain_allow.is_empty() && !ctx.domain_allow.iter().any(|a| domain.ends_with(a.as_str()))
    {
        return Err(RejectReason::DomainNotAllowed);
    }
    if !ctx.domain_deny.is_empty() && ctx.domain_deny.iter().any(|d| domain.ends_with(d.as_str())) {
        return Err(RejectReason::DomainDenied);
    }
    Ok(())
}

/// Path rules: the full URL must match an allow pattern (if any) and no
/// deny pattern.
pub fn check_path(url: &str, ctx: &FilterContext) -> Result<(), RejectReason> {
    if !ctx.path_allow.is_empty() && !ctx.path_allow.iter().any(|p| p.is_match(url)) {
        return Err(RejectReason::PathNotAllowed);
    }
    if !ctx.path_deny.is_empty() && ctx.path_deny.iter().any(|p| p.is_match(url)) {
        return Err(RejectReason::PathDenied);
    }
    Ok(())
}

/// Whether a domain may be handed to the renderer.
pub fn render_allowed(domain: &str, ctx: &FilterContext) -> bool {
    ctx.render.domain_allow.is_empty()
        || ctx
            .render
            .domain_allow
            .iter()
            .any(|a| domain.ends_with(a.as_str()))
}
