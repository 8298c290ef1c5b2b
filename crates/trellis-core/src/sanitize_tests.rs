use crate::sanitize::{
    Sanitizer, is_safe_url, is_uri_attribute, is_valid_attribute, is_valid_element, sanitize_url,
};

#[test]
fn relative_and_http_urls_are_safe() {
    assert!(is_safe_url("/path/to?x=1"));
    assert!(is_safe_url("page.html#top"));
    assert!(is_safe_url("https://example.com/a"));
    assert!(is_safe_url("mailto:someone@example.com"));
    assert!(is_safe_url("a/b:c"));
}

#[test]
fn script_urls_are_neutralized() {
    assert!(!is_safe_url("javascript:alert(1)"));
    assert!(!is_safe_url("  JavaScript:alert(1)"));
    assert_eq!(sanitize_url("javascript:x()"), "unsafe:javascript:x()");
    assert_eq!(Sanitizer::Url.apply("/ok"), "/ok");
    assert_eq!(Sanitizer::from_name("url"), Some(Sanitizer::Url));
}

#[test]
fn attribute_allow_list() {
    assert!(is_valid_attribute("title"));
    assert!(is_valid_attribute("ARIA-label"));
    assert!(is_valid_attribute("href"));
    assert!(!is_valid_attribute("onclick"));
    assert!(!is_valid_attribute("style"));
    assert!(is_uri_attribute("src"));
    assert!(!is_uri_attribute("title"));
}

#[test]
fn element_allow_list() {
    assert!(is_valid_element("b"));
    assert!(is_valid_element("SPAN"));
    assert!(!is_valid_element("script"));
    assert!(!is_valid_element("iframe"));
}
