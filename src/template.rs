use maud::{DOCTYPE, Markup, PreEscaped, html};

// ── Shared page shell ─────────────────────────────────────────────────────────

pub fn shell(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " — Clearwater Tax Services" }
                style { (PreEscaped(BASE_CSS)) }
            }
            body {
                (header_nav())
                main { (body) }
                (footer())
            }
        }
    }
}

fn header_nav() -> Markup {
    html! {
        header class="site-header" {
            a class="brand" href="/" { "Clearwater Tax Services" }
            nav {
                a href="/#services" { "Services" }
                a href="/#tax-request" { "Get Started" }
                a href="/#contact" { "Contact" }
                a href="/consent" { "Consent Form" }
            }
        }
    }
}

fn footer() -> Markup {
    html! {
        footer class="site-footer" {
            p { "Personal tax preparation for individuals and families across Canada." }
            nav {
                a href="/privacy" { "Privacy Policy" }
                a href="/terms" { "Terms of Service" }
            }
        }
    }
}

// ── Landing page ──────────────────────────────────────────────────────────────

const PROVINCES: &[&str] = &[
    "Alberta",
    "British Columbia",
    "Manitoba",
    "New Brunswick",
    "Newfoundland and Labrador",
    "Northwest Territories",
    "Nova Scotia",
    "Nunavut",
    "Ontario",
    "Prince Edward Island",
    "Quebec",
    "Saskatchewan",
    "Yukon Territory",
];

const EMPLOYMENT_STATUSES: &[&str] = &["Employed", "Self-employed", "Student", "Other"];

pub fn index() -> Markup {
    shell(
        "Home",
        html! {
            section class="hero" {
                h1 { "Stress-free personal tax filing" }
                p {
                    "Year-round preparation, review, and filing support from a "
                    "dedicated consultant. Upload your documents securely and "
                    "we take it from there."
                }
                a class="button" href="#tax-request" { "Request Tax Service" }
            }

            section class="trust-strip" {
                span { "CRA EFILE certified" }
                span { "Secure document handling" }
                span { "Transparent flat pricing" }
            }

            section id="services" class="services" {
                h2 { "Services" }
                div class="service-grid" {
                    article {
                        h3 { "Personal Returns" }
                        p { "T1 preparation and filing for employees, students, and retirees." }
                    }
                    article {
                        h3 { "Self-Employment" }
                        p { "Business and gig income, expenses, GST/HST guidance." }
                    }
                    article {
                        h3 { "Prior-Year Catch-Up" }
                        p { "Late and amended returns, CRA correspondence support." }
                    }
                }
            }

            section id="tax-request" class="form-section" {
                h2 { "Request Tax Service" }
                (tax_request_form())
            }

            section id="contact" class="form-section" {
                h2 { "Contact" }
                (contact_form())
            }
        },
    )
}

fn tax_request_form() -> Markup {
    html! {
        form method="post" action="/tax-request" enctype="multipart/form-data" {
            label { "Full name"
                input type="text" name="name" required;
            }
            label { "Email"
                input type="email" name="email" required;
            }
            label { "Phone"
                input type="tel" name="phone";
            }
            label { "Province or territory"
                select name="province" {
                    option value="" { "Select…" }
                    @for province in PROVINCES {
                        option value=(province) { (province) }
                    }
                }
            }
            label { "Tax year"
                input type="text" name="tax_year" placeholder="2025";
            }
            label { "Employment status"
                select name="employment_status" {
                    option value="" { "Select…" }
                    @for status in EMPLOYMENT_STATUSES {
                        option value=(status) { (status) }
                    }
                }
            }
            fieldset {
                legend { "Are your documents ready?" }
                label class="inline" {
                    input type="radio" name="documents_ready" value="yes" checked;
                    "Yes, I have everything"
                }
                label class="inline" {
                    input type="radio" name="documents_ready" value="no";
                    "No, I need help gathering them"
                }
            }
            label { "Upload documents (optional)"
                input type="file" name="documents" multiple;
            }
            label { "Notes"
                textarea name="notes" rows="4" {}
            }
            button type="submit" { "Submit request" }
        }
    }
}

fn contact_form() -> Markup {
    html! {
        form id="contact-form" {
            label { "Name"
                input type="text" name="name" required;
            }
            label { "Email"
                input type="email" name="email" required;
            }
            label { "Phone"
                input type="tel" name="phone";
            }
            label { "Message"
                textarea name="message" rows="4" required {}
            }
            button type="submit" { "Send message" }
            p id="contact-status" class="form-status" {}
        }
        script { (PreEscaped(CONTACT_JS)) }
    }
}

// ── Consent form ──────────────────────────────────────────────────────────────

pub fn consent_page() -> Markup {
    shell(
        "Consent Form",
        html! {
            section class="form-section" {
                h2 { "Tax Service Consent & E-Signature" }
                p {
                    "By signing below you authorize the preparation and "
                    "electronic filing of your personal income tax return."
                }
                form method="post" action="/consent" enctype="multipart/form-data" {
                    label { "Full legal name"
                        input type="text" name="client_name" required;
                    }
                    label { "Email"
                        input type="email" name="client_email" required;
                    }
                    label { "Phone"
                        input type="tel" name="client_phone";
                    }
                    label { "Date of consent"
                        input type="date" name="consent_date" required;
                    }

                    fieldset {
                        legend { "Signature" }
                        label class="inline" {
                            input type="radio" name="signature_type" value="draw" checked;
                            "Draw my signature"
                        }
                        label class="inline" {
                            input type="radio" name="signature_type" value="upload";
                            "Upload a photo of my signature"
                        }

                        div id="draw-pane" {
                            canvas id="signature-pad" width="500" height="160" {}
                            button type="button" id="clear-signature" { "Clear" }
                            input type="hidden" name="signature_data" id="signature-data";
                        }
                        div id="upload-pane" hidden {
                            input type="file" name="signature_photo" accept="image/*";
                        }
                    }

                    button type="submit" { "I agree and sign" }
                }
            }
            script { (PreEscaped(SIGNATURE_JS)) }
        },
    )
}

// ── Confirmation / legal pages ────────────────────────────────────────────────

pub fn submission_received(heading: &str, message: &str) -> Markup {
    shell(
        heading,
        html! {
            section class="form-section" {
                h2 { (heading) }
                p { (message) }
                a class="button" href="/" { "Back to home" }
            }
        },
    )
}

pub fn privacy() -> Markup {
    shell(
        "Privacy Policy",
        html! {
            section class="legal" {
                h2 { "Privacy Policy" }
                p {
                    "We collect only the information needed to prepare and file "
                    "your tax return: contact details, tax-situation answers, and "
                    "the documents you choose to upload."
                }
                p {
                    "Uploaded documents are stored in a private bucket and are "
                    "accessible only through time-limited links issued to the "
                    "consultant. We never sell or share your information with "
                    "third parties except as required to file with the CRA."
                }
                p {
                    "You may request deletion of your records at any time using "
                    "the contact form."
                }
            }
        },
    )
}

pub fn terms() -> Markup {
    shell(
        "Terms of Service",
        html! {
            section class="legal" {
                h2 { "Terms of Service" }
                p {
                    "Tax preparation services are provided on the basis of the "
                    "information and documents you supply. You remain responsible "
                    "for the accuracy and completeness of that information."
                }
                p {
                    "Fees are quoted before work begins. Filing occurs only after "
                    "you have signed the consent form and approved the prepared "
                    "return."
                }
            }
        },
    )
}

// ── Assets ────────────────────────────────────────────────────────────────────

const BASE_CSS: &str = r#"
:root { --accent: #1d6fb8; --ink: #21272a; --muted: #5c6670; }
* { box-sizing: border-box; }
body { margin: 0; font-family: Georgia, 'Times New Roman', serif; color: var(--ink); line-height: 1.6; }
.site-header { display: flex; justify-content: space-between; align-items: center; padding: 1rem 2rem; border-bottom: 1px solid #e3e7ea; }
.site-header .brand { font-weight: bold; font-size: 1.2rem; color: var(--ink); text-decoration: none; }
.site-header nav a { margin-left: 1.25rem; color: var(--muted); text-decoration: none; }
.site-header nav a:hover { color: var(--accent); }
main { max-width: 860px; margin: 0 auto; padding: 0 1.5rem; }
.hero { padding: 4rem 0 2rem; }
.hero h1 { font-size: 2.4rem; margin-bottom: 0.5rem; }
.hero p { max-width: 40rem; color: var(--muted); }
.trust-strip { display: flex; gap: 2rem; padding: 1rem 0 2rem; color: var(--muted); font-size: 0.9rem; flex-wrap: wrap; }
.services h2, .form-section h2, .legal h2 { border-bottom: 2px solid var(--accent); padding-bottom: 0.3rem; }
.service-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 1.25rem; }
.service-grid article { border: 1px solid #e3e7ea; border-radius: 8px; padding: 1rem 1.25rem; }
.form-section { padding: 2rem 0; }
form label { display: block; margin: 0.75rem 0 0.25rem; font-weight: bold; }
form label.inline { display: inline-flex; align-items: center; gap: 0.4rem; font-weight: normal; margin-right: 1.5rem; }
form input[type=text], form input[type=email], form input[type=tel], form input[type=date],
form select, form textarea { width: 100%; padding: 0.5rem; border: 1px solid #c6ccd2; border-radius: 4px; font: inherit; }
form fieldset { border: 1px solid #e3e7ea; border-radius: 8px; margin: 1rem 0; padding: 0.75rem 1rem; }
form button, .button { display: inline-block; margin-top: 1rem; padding: 0.6rem 1.4rem; background: var(--accent); color: #fff; border: none; border-radius: 4px; font: inherit; cursor: pointer; text-decoration: none; }
.form-status { min-height: 1.2rem; color: var(--muted); }
.form-status.error { color: #b02a2a; }
#signature-pad { border: 1px dashed #c6ccd2; border-radius: 4px; touch-action: none; display: block; margin: 0.5rem 0; background: #fff; }
.site-footer { border-top: 1px solid #e3e7ea; margin-top: 3rem; padding: 1.5rem 2rem; color: var(--muted); font-size: 0.9rem; }
.site-footer nav a { margin-right: 1rem; color: var(--muted); }
.legal { padding: 2rem 0; }
"#;

const CONTACT_JS: &str = r#"
document.getElementById('contact-form').addEventListener('submit', async (e) => {
  e.preventDefault();
  const form = e.target;
  const status = document.getElementById('contact-status');
  status.className = 'form-status';
  status.textContent = 'Sending…';
  const payload = {
    name: form.name.value,
    email: form.email.value,
    phone: form.phone.value || null,
    message: form.message.value,
  };
  try {
    const resp = await fetch('/api/contact', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(payload),
    });
    const body = await resp.json();
    if (resp.ok) {
      status.textContent = 'Thanks! We will be in touch shortly.';
      form.reset();
    } else {
      status.className = 'form-status error';
      status.textContent = body.error || 'Something went wrong. Please try again.';
    }
  } catch (err) {
    status.className = 'form-status error';
    status.textContent = 'Network error. Please try again.';
  }
});
"#;

const SIGNATURE_JS: &str = r#"
const pad = document.getElementById('signature-pad');
const ctx = pad.getContext('2d');
const hidden = document.getElementById('signature-data');
let drawing = false;

ctx.lineWidth = 2;
ctx.lineCap = 'round';
ctx.strokeStyle = '#21272a';

function pos(e) {
  const rect = pad.getBoundingClientRect();
  const p = e.touches ? e.touches[0] : e;
  return { x: p.clientX - rect.left, y: p.clientY - rect.top };
}
function start(e) { drawing = true; const p = pos(e); ctx.beginPath(); ctx.moveTo(p.x, p.y); e.preventDefault(); }
function move(e) {
  if (!drawing) return;
  const p = pos(e);
  ctx.lineTo(p.x, p.y);
  ctx.stroke();
  hidden.value = pad.toDataURL('image/png');
  e.preventDefault();
}
function end() { drawing = false; }

pad.addEventListener('mousedown', start);
pad.addEventListener('mousemove', move);
window.addEventListener('mouseup', end);
pad.addEventListener('touchstart', start);
pad.addEventListener('touchmove', move);
window.addEventListener('touchend', end);

document.getElementById('clear-signature').addEventListener('click', () => {
  ctx.clearRect(0, 0, pad.width, pad.height);
  hidden.value = '';
});

for (const radio of document.querySelectorAll('input[name=signature_type]')) {
  radio.addEventListener('change', () => {
    const draw = radio.value === 'draw' && radio.checked;
    document.getElementById('draw-pane').hidden = !draw;
    document.getElementById('upload-pane').hidden = draw;
  });
}
"#;
