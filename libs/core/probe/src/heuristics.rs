// [libs/core/probe/src/heuristics.rs]
//! Login-surface classifier. Deterministic, ordered, first match wins.
//! The order here is load-bearing: changing it is a behavior change, not
//! a refactor, and must be covered by the tests below.

use once_cell::sync::Lazy;
use regex::Regex;

fn has_password_input(body: &str) -> bool {
    body.contains("type=\"password\"") || body.contains("type='password'")
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|needle| lower.contains(&needle.to_lowercase()))
}

static OWA_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)outlook web app|owa/auth|\boutlook\b").unwrap());

/// Runs the full ordered rule set over one probe's observable surface.
/// Returns `(login_detected, detected_login_type)`.
pub fn classify(final_url: &str, header_blob: &str, body_snippet: &str) -> (bool, Option<String>) {
    let url_lower = final_url.to_lowercase();
    let combined = format!("{header_blob}\n{body_snippet}");

    // 1. OWA
    if url_lower.contains("/owa/") || url_lower.contains("errorfe.aspx") || OWA_BODY.is_match(&combined) {
        return (true, Some("OWA".to_string()));
    }

    // 2. Rocket.Chat: strong content + a URL hint, or either alone in
    // defined combinations (two strong signals alone already qualify).
    let rocket_strong = contains_any(
        &combined,
        &["Rocket.Chat", "__meteor_runtime_config__", "meteor", "rc-root", "rocketchat"],
    );
    let rocket_url_hint = url_lower.contains("/home") || url_lower.contains("/login");
    let rocket_strong_count = ["Rocket.Chat", "__meteor_runtime_config__", "meteor", "rc-root", "rocketchat"]
        .iter()
        .filter(|needle| contains_any(&combined, &[needle]))
        .count();
    if (rocket_strong && rocket_url_hint) || rocket_strong_count >= 2 {
        return (true, Some("RocketChat".to_string()));
    }

    // 3. ERPNext / Frappe
    let frappe_strong = contains_any(
        &combined,
        &["erpnext", "frappe", "frappe.boot", "frappe.csrf_token", "/api/method/frappe."],
    );
    let frappe_url_hint = url_lower.contains("/login") || url_lower.contains("/desk");
    let frappe_header_hint =
        contains_any(header_blob, &["x-frappe-"]) || contains_any(header_blob, &["sid="]);
    if frappe_strong && (frappe_url_hint || frappe_header_hint) {
        return (true, Some("ERPNextFrappe".to_string()));
    }

    // 4. Nextcloud
    if contains_any(body_snippet, &["Nextcloud"]) || contains_any(body_snippet, &["body-login", "nc-login"]) {
        return (true, Some("Nextcloud".to_string()));
    }

    // 5. Proxmox PMG / PBS / PVE
    let proxmox_url_hint =
        url_lower.contains("/pmg") || url_lower.contains("/pbs") || url_lower.contains("/pve2/")
            || url_lower.contains(":8006") || url_lower.contains(":8007");
    if proxmox_url_hint {
        if contains_any(body_snippet, &["Proxmox Mail Gateway", "PMG"]) {
            return (true, Some("ProxmoxPMG".to_string()));
        }
        if contains_any(body_snippet, &["Proxmox Backup Server", "PBS"]) {
            return (true, Some("ProxmoxPBS".to_string()));
        }
        if contains_any(body_snippet, &["Proxmox Virtual Environment", "PVE"]) {
            return (true, Some("ProxmoxPVE".to_string()));
        }
    }

    // 6. Zabbix
    if contains_any(body_snippet, &["Zabbix"]) && has_password_input(body_snippet) {
        return (true, Some("Zabbix".to_string()));
    }

    // 7. OPNsense
    if contains_any(body_snippet, &["OPNsense"]) && has_password_input(body_snippet) {
        return (true, Some("OPNsense".to_string()));
    }

    // 8. CipherMail
    if contains_any(body_snippet, &["CipherMail", "Djigzo"]) && has_password_input(body_snippet) {
        return (true, Some("CipherMail".to_string()));
    }

    // 9. Generic fallback
    if has_password_input(body_snippet) {
        return (true, Some("PasswordForm".to_string()));
    }
    let generic_login = contains_any(body_snippet, &["login"])
        && contains_any(body_snippet, &["<form", "username", "email", "sign in"]);
    if generic_login {
        return (true, Some("LoginPage".to_string()));
    }

    (false, None)
}
