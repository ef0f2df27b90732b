//! Tests for the view engine

use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_builtin_templates_load() {
    let views = Views::new(None).unwrap();
    for name in ["base.html", "home.html", "error.html", "auth/login.html", "admin/form.html"] {
        assert!(views.has_template(name), "missing {}", name);
    }
}

#[test]
fn test_render_error_page() {
    let views = Views::new(None).unwrap();
    let mut context = TeraContext::new();
    context.insert("status", &404);
    context.insert("message", "Not Found");

    let html = views
        .render_page("error.html", &context, &PageVars::new("none"))
        .unwrap();
    assert!(html.contains("404"));
    assert!(html.contains("Not Found"));
}

#[test]
fn test_override_directory_replaces_template() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("auth")).unwrap();
    fs::write(
        dir.path().join("auth/login.html"),
        "custom login {{ activeNav }}",
    )
    .unwrap();

    let views = Views::new(Some(dir.path())).unwrap();
    let html = views
        .render_page("auth/login.html", &TeraContext::new(), &PageVars::new("login"))
        .unwrap();
    assert_eq!(html, "custom login login");
    assert!(views.has_template("home.html"));
}

#[test]
fn test_missing_override_directory_is_ignored() {
    let dir = TempDir::new().unwrap();
    let views = Views::new(Some(&dir.path().join("nope"))).unwrap();
    assert!(views.has_template("base.html"));
}

#[test]
fn test_render_unknown_template_fails() {
    let views = Views::new(None).unwrap();
    let err = views.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(err.to_string().contains("nope.html"));
}

#[test]
fn test_render_with_fallback_uses_error_template() {
    let views = Views::new(None).unwrap();
    let html = views.render_with_fallback("nope.html", &TeraContext::new());
    assert!(html.contains("500"));
}

#[test]
fn test_flash_serializes_with_type_key() {
    let json = serde_json::to_value(Flash::danger("Nope")).unwrap();
    assert_eq!(json, serde_json::json!({"type": "danger", "message": "Nope"}));
}
