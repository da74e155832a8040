use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::HashMap;

use crate::db::{ClientConsent, Contact, TaxRequest};

// ── Shared admin shell ────────────────────────────────────────────────────────

fn shell(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="robots" content="noindex";
                title { (title) " — Admin" }
                style { (PreEscaped(ADMIN_CSS)) }
            }
            body {
                (body)
            }
        }
    }
}

// ── Login ─────────────────────────────────────────────────────────────────────

pub fn login_page(error: Option<&str>) -> Markup {
    shell(
        "Log in",
        html! {
            main class="login" {
                h1 { "Admin Login" }
                @if let Some(msg) = error {
                    p class="error" { (msg) }
                }
                form method="post" action="/admin/login" {
                    label { "Password"
                        input type="password" name="password" required autofocus;
                    }
                    button type="submit" { "Log in" }
                }
            }
        },
    )
}

// ── Dashboard ─────────────────────────────────────────────────────────────────

pub fn dashboard(
    tax_requests: &[TaxRequest],
    contacts: &[Contact],
    consents: &[ClientConsent],
    file_urls: &HashMap<String, String>,
    signature_urls: &HashMap<String, String>,
) -> Markup {
    shell(
        "Dashboard",
        html! {
            header class="topbar" {
                h1 { "Client Intake Dashboard" }
                form method="post" action="/admin/logout" {
                    button type="submit" { "Log out" }
                }
            }

            main {
                section {
                    h2 { "Tax Service Requests (" (tax_requests.len()) ")" }
                    @if tax_requests.is_empty() {
                        p class="empty" { "No requests yet." }
                    } @else {
                        table {
                            thead {
                                tr {
                                    th { "Received" }
                                    th { "Client" }
                                    th { "Province" }
                                    th { "Year" }
                                    th { "Status" }
                                    th { "Documents" }
                                    th { "Notes" }
                                }
                            }
                            tbody {
                                @for req in tax_requests {
                                    tr {
                                        td { (req.created_at) }
                                        td {
                                            (req.name)
                                            br;
                                            a href={ "mailto:" (req.email) } { (req.email) }
                                            @if let Some(phone) = &req.phone {
                                                br; (phone)
                                            }
                                        }
                                        td { (req.province.as_deref().unwrap_or("—")) }
                                        td { (req.tax_year.as_deref().unwrap_or("—")) }
                                        td {
                                            (req.employment_status.as_deref().unwrap_or("—"))
                                            br;
                                            @if req.documents_ready { "Documents ready" }
                                            @else if req.support_needed { "Needs help gathering" }
                                            @else { "Not specified" }
                                        }
                                        td {
                                            @if req.uploaded_file_urls.is_empty() {
                                                "—"
                                            } @else {
                                                ul class="files" {
                                                    @for stored in &req.uploaded_file_urls {
                                                        li {
                                                            @if let Some(url) = file_urls.get(stored) {
                                                                a href=(url) target="_blank" rel="noopener" {
                                                                    (crate::storage::object_key(stored))
                                                                }
                                                            } @else {
                                                                (crate::storage::object_key(stored))
                                                            }
                                                        }
                                                    }
                                                }
                                            }
                                        }
                                        td { (req.notes.as_deref().unwrap_or("")) }
                                    }
                                }
                            }
                        }
                    }
                }

                section {
                    h2 { "Contact Messages (" (contacts.len()) ")" }
                    @if contacts.is_empty() {
                        p class="empty" { "No messages yet." }
                    } @else {
                        table {
                            thead {
                                tr {
                                    th { "Received" }
                                    th { "Name" }
                                    th { "Email" }
                                    th { "Phone" }
                                    th { "Message" }
                                }
                            }
                            tbody {
                                @for contact in contacts {
                                    tr {
                                        td { (contact.created_at) }
                                        td { (contact.name) }
                                        td { a href={ "mailto:" (contact.email) } { (contact.email) } }
                                        td { (contact.phone.as_deref().unwrap_or("—")) }
                                        td { (contact.message) }
                                    }
                                }
                            }
                        }
                    }
                }

                section {
                    h2 { "Signed Consents (" (consents.len()) ")" }
                    @if consents.is_empty() {
                        p class="empty" { "No consents yet." }
                    } @else {
                        table {
                            thead {
                                tr {
                                    th { "Signed" }
                                    th { "Client" }
                                    th { "Consent date" }
                                    th { "Signature" }
                                    th { "Document" }
                                }
                            }
                            tbody {
                                @for consent in consents {
                                    tr {
                                        td { (consent.created_at) }
                                        td {
                                            (consent.client_name)
                                            br;
                                            (consent.client_email)
                                        }
                                        td { (consent.consent_date) }
                                        td {
                                            @if consent.signature_type == "draw" {
                                                @if let Some(data) = &consent.signature_data {
                                                    img class="signature" src=(data) alt="Drawn signature";
                                                } @else { "—" }
                                            } @else {
                                                @if let Some(stored) = &consent.signature_photo_url {
                                                    @if let Some(url) = signature_urls.get(stored) {
                                                        a href=(url) target="_blank" rel="noopener" { "Signature photo" }
                                                    } @else { "Signature photo" }
                                                } @else { "—" }
                                            }
                                        }
                                        td {
                                            a href={ "/admin/consent-doc/" (consent.id) } target="_blank" {
                                                "Printable copy"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

// ── Printable consent document ────────────────────────────────────────────────

pub fn consent_document(consent: &ClientConsent, signature_url: Option<&str>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Tax Service Consent Form — " (consent.client_name) }
                style { (PreEscaped(CONSENT_DOC_CSS)) }
            }
            body {
                div class="letterhead" {
                    p class="company-name" { "Clearwater Tax Services" }
                    p class="company-subtitle" { "Personal Tax Preparation & Filing" }
                }

                h1 class="document-title" { "Tax Service Consent Form" }

                section class="form-section" {
                    h2 { "Client Information" }
                    dl {
                        dt { "Name" }      dd { (consent.client_name) }
                        dt { "Email" }     dd { (consent.client_email) }
                        @if let Some(phone) = &consent.client_phone {
                            dt { "Phone" } dd { (phone) }
                        }
                        dt { "Date of consent" } dd { (consent.consent_date) }
                    }
                }

                section class="form-section" {
                    h2 { "Consent" }
                    p {
                        "I authorize Clearwater Tax Services to prepare and "
                        "electronically file my personal income tax return with "
                        "the Canada Revenue Agency, and to retain copies of my "
                        "documents for that purpose."
                    }
                }

                section class="form-section" {
                    h2 { "Signature" }
                    @if consent.signature_type == "draw" {
                        @if let Some(data) = &consent.signature_data {
                            img class="signature" src=(data) alt="Client signature";
                        }
                    } @else {
                        @if let Some(url) = signature_url {
                            img class="signature" src=(url) alt="Client signature";
                        }
                    }
                    p class="meta" {
                        "Signed electronically"
                        @if let Some(ip) = &consent.ip_address { " from " (ip) }
                        " on " (consent.created_at) " (UTC)."
                    }
                    @if let Some(ua) = &consent.user_agent {
                        p class="meta" { "Device: " (ua) }
                    }
                }

                p class="footer-note" {
                    "Record #" (consent.id) " · " (consent.consent_type)
                }
            }
        }
    }
}

// ── Assets ────────────────────────────────────────────────────────────────────

const ADMIN_CSS: &str = r#"
body { margin: 0; font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; color: #21272a; background: #f4f6f8; }
.topbar { display: flex; justify-content: space-between; align-items: center; background: #1d2b36; color: #fff; padding: 0.75rem 1.5rem; }
.topbar h1 { font-size: 1.1rem; margin: 0; }
.topbar button { background: transparent; color: #cfd8df; border: 1px solid #cfd8df; border-radius: 4px; padding: 0.3rem 0.9rem; cursor: pointer; }
main { max-width: 1100px; margin: 0 auto; padding: 1.5rem; }
section { background: #fff; border: 1px solid #e0e5e9; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 1.5rem; }
section h2 { margin-top: 0; font-size: 1rem; border-bottom: 1px solid #e0e5e9; padding-bottom: 0.5rem; }
table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
th, td { text-align: left; padding: 0.5rem 0.6rem; border-bottom: 1px solid #eef1f4; vertical-align: top; }
.files { margin: 0; padding-left: 1rem; }
.empty { color: #7a858e; }
img.signature { max-width: 220px; max-height: 80px; border: 1px solid #e0e5e9; background: #fff; }
.login { max-width: 360px; margin: 15vh auto; background: #fff; border: 1px solid #e0e5e9; border-radius: 8px; padding: 2rem; }
.login h1 { font-size: 1.2rem; margin-top: 0; }
.login label { display: block; font-weight: 600; margin-bottom: 0.25rem; }
.login input { width: 100%; padding: 0.5rem; margin-bottom: 1rem; border: 1px solid #c6ccd2; border-radius: 4px; box-sizing: border-box; }
.login button { width: 100%; padding: 0.6rem; background: #1d6fb8; color: #fff; border: none; border-radius: 4px; cursor: pointer; }
.login .error { color: #b02a2a; }
"#;

const CONSENT_DOC_CSS: &str = r#"
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 40px 20px; background: #fff; }
.letterhead { text-align: center; border-bottom: 3px solid #1d6fb8; padding-bottom: 20px; margin-bottom: 30px; }
.company-name { font-size: 28px; font-weight: bold; margin: 0; }
.company-subtitle { color: #6b7280; margin: 4px 0 0; }
.document-title { font-size: 24px; text-align: center; margin: 30px 0; }
.form-section { margin-bottom: 25px; padding: 20px; background: #f8fafc; border: 1px solid #e2e8f0; border-radius: 8px; }
.form-section h2 { font-size: 18px; border-bottom: 2px solid #1d6fb8; padding-bottom: 5px; margin-top: 0; }
dl { display: grid; grid-template-columns: 10em 1fr; gap: 4px 12px; margin: 0; }
dt { font-weight: bold; }
dd { margin: 0; }
img.signature { max-width: 320px; max-height: 120px; background: #fff; border: 1px solid #e2e8f0; padding: 6px; }
.meta { color: #6b7280; font-size: 13px; }
.footer-note { text-align: center; color: #9aa3ab; font-size: 12px; margin-top: 40px; }
@media print { .form-section { break-inside: avoid; } }
"#;
