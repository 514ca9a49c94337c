//! Link-navigation fallback.
//!
//! When an anchor cannot be located at all, the test can often still
//! proceed by navigating straight to where the link would have gone. This
//! module turns an href fragment into a ranked list of absolute URLs to
//! try, anchored on the current page's origin and its registrable domain.

use url::Url;

/// Ensure a `goto` target has a scheme.
pub fn normalize_goto_url(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    }
}

/// Ranked absolute-URL candidates for an href fragment, most specific
/// first. `current_url` supplies the origin context; without it only
/// scheme-completion candidates are produced.
pub fn derive_url_candidates(href: &str, current_url: Option<&str>) -> Vec<String> {
    let (origin, main_origin) = domain_info(current_url);

    let mut out: Vec<String> = Vec::new();
    let push = |candidate: String, out: &mut Vec<String>| {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    };

    if href.starts_with("//") {
        push(format!("https:{}", href), &mut out);
    } else if href.starts_with('/') {
        if let Some(ref origin) = origin {
            push(format!("{}{}", origin, href), &mut out);
        }
        if let Some(ref main) = main_origin {
            if main_origin != origin {
                push(format!("{}{}", main, href), &mut out);
            }
        }
        push(
            format!("https://{}", href.trim_start_matches('/')),
            &mut out,
        );
    } else if !href.starts_with("http://") && !href.starts_with("https://") {
        if let Some(ref origin) = origin {
            if !origin_contains_host(origin, href) {
                push(format!("{}/{}", origin, href.trim_start_matches('/')), &mut out);
            }
        }
        if let Some(ref main) = main_origin {
            if main_origin != origin && !origin_contains_host(main, href) {
                push(format!("{}/{}", main, href.trim_start_matches('/')), &mut out);
            }
        }
        push(format!("https://{}", href), &mut out);
    } else {
        push(href.to_string(), &mut out);
    }

    if out.is_empty() {
        out.push(href.to_string());
    }
    out
}

/// The current page's origin and the origin reduced to its registrable
/// domain (last two host labels), both as `scheme://host`.
fn domain_info(current_url: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(parsed) = current_url.and_then(|u| Url::parse(u).ok()) else {
        return (None, None);
    };
    let Some(host) = parsed.host_str() else {
        return (None, None);
    };

    let origin = format!("{}://{}", parsed.scheme(), host);

    let labels: Vec<&str> = host.split('.').collect();
    let main_origin = if labels.len() > 2 {
        format!(
            "{}://{}",
            parsed.scheme(),
            labels[labels.len() - 2..].join(".")
        )
    } else {
        origin.clone()
    };

    (Some(origin), Some(main_origin))
}

/// Whether the href already names the origin's host.
fn origin_contains_host(origin: &str, href: &str) -> bool {
    origin
        .split_once("://")
        .map(|(_, host)| href.contains(host))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_goto_url() {
        assert_eq!(normalize_goto_url("example.com"), "https://example.com");
        assert_eq!(
            normalize_goto_url("http://example.com"),
            "http://example.com"
        );
        assert_eq!(
            normalize_goto_url("https://example.com/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_root_relative_href() {
        let candidates =
            derive_url_candidates("/settings", Some("https://app.example.com/home"));
        assert_eq!(
            candidates,
            vec![
                "https://app.example.com/settings",
                "https://example.com/settings",
                "https://settings",
            ]
        );
    }

    #[test]
    fn test_two_label_host_has_no_separate_main_domain() {
        let candidates = derive_url_candidates("/next", Some("https://example.com/"));
        assert_eq!(
            candidates,
            vec!["https://example.com/next", "https://next"]
        );
    }

    #[test]
    fn test_bare_relative_href() {
        let candidates =
            derive_url_candidates("checkout/cart", Some("https://shop.example.com/"));
        assert_eq!(
            candidates,
            vec![
                "https://shop.example.com/checkout/cart",
                "https://example.com/checkout/cart",
                "https://checkout/cart",
            ]
        );
    }

    #[test]
    fn test_absolute_href_passes_through() {
        let candidates =
            derive_url_candidates("https://other.com/x", Some("https://example.com/"));
        assert_eq!(candidates, vec!["https://other.com/x"]);
    }

    #[test]
    fn test_scheme_relative_href() {
        let candidates = derive_url_candidates("//cdn.example.com/page", None);
        assert_eq!(candidates, vec!["https://cdn.example.com/page"]);
    }

    #[test]
    fn test_no_current_url_still_yields_a_candidate() {
        let candidates = derive_url_candidates("login", None);
        assert_eq!(candidates, vec!["https://login"]);
    }

    #[test]
    fn test_href_already_naming_host_is_not_doubled() {
        let candidates =
            derive_url_candidates("example.com/deep", Some("https://example.com/"));
        assert_eq!(candidates, vec!["https://example.com/deep"]);
    }
}
