use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use minijinja::{context, Environment, Value};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::marketplace::domain::Locale;

pub type TemplateVariables = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKey {
    TalentApplicationReceived,
    CompanyApplicationReceived,
    TalentStatusChanged,
    CompanyStatusChanged,
    HiringRequestStatusChanged,
    HiringRequestMatched,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 6] = [
        TemplateKey::TalentApplicationReceived,
        TemplateKey::CompanyApplicationReceived,
        TemplateKey::TalentStatusChanged,
        TemplateKey::CompanyStatusChanged,
        TemplateKey::HiringRequestStatusChanged,
        TemplateKey::HiringRequestMatched,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            TemplateKey::TalentApplicationReceived => "talent_application_received",
            TemplateKey::CompanyApplicationReceived => "company_application_received",
            TemplateKey::TalentStatusChanged => "talent_status_changed",
            TemplateKey::CompanyStatusChanged => "company_status_changed",
            TemplateKey::HiringRequestStatusChanged => "hiring_request_status_changed",
            TemplateKey::HiringRequestMatched => "hiring_request_matched",
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

// Message templates define three blocks: `subject`, `heading` and `body`.
// Body paragraphs are separated by a blank line and poured into the layouts.
// The `.html` suffix turns on auto-escaping for the HTML layout.
const LAYOUT_HTML: &str = "<!doctype html><html><body><h1>{{ heading }}</h1>\
{% for paragraph in paragraphs %}<p>{{ paragraph }}</p>{% endfor %}\
<p>The Talent Match team</p></body></html>";

const LAYOUT_TEXT: &str = "{% for paragraph in paragraphs %}{{ paragraph }}\n\n{% endfor %}The Talent Match team";

const TALENT_APPLICATION_RECEIVED_EN: &str = r#"{% block subject %}We received your Talent Match application{% endblock %}
{% block heading %}Application received{% endblock %}
{% block body %}
Hi {{ first_name | default("there") }},

Thanks for applying to Talent Match. Our team reviews every application by hand and will reach out once we have an update.
{% endblock %}"#;

const COMPANY_APPLICATION_RECEIVED_EN: &str = r#"{% block subject %}Welcome to Talent Match, {{ company_name }}{% endblock %}
{% block heading %}Application received{% endblock %}
{% block body %}
Hi {{ first_name | default("there") }},

Thanks for registering {{ company_name }}. We will review your details and follow up shortly with next steps for your first hiring request.
{% endblock %}"#;

const TALENT_STATUS_CHANGED_EN: &str = r#"{% block subject %}Your application status: {{ status | humanize }}{% endblock %}
{% block heading %}Application update{% endblock %}
{% block body %}
Hi {{ first_name | default("there") }},

Your Talent Match application has moved to: {{ status | humanize }}.

We will keep you posted as things progress.
{% endblock %}"#;

const TALENT_STATUS_CHANGED_ES: &str = r#"{% block subject %}Estado de tu solicitud: {{ status | humanize }}{% endblock %}
{% block heading %}Actualización de tu solicitud{% endblock %}
{% block body %}
Hola{% if first_name %} {{ first_name }}{% endif %},

Tu solicitud en Talent Match cambió a: {{ status | humanize }}.

Te mantendremos al tanto.
{% endblock %}"#;

const REQUEST_STATUS_CHANGED_EN: &str = r#"{% block subject %}{% if request_title %}{{ request_title }}{% else %}Your hiring status{% endif %}: {{ status | humanize }}{% endblock %}
{% block heading %}Hiring request update{% endblock %}
{% block body %}
Hi {{ first_name | default("there") }},

Your hiring request has moved to: {{ status | humanize }}.
{% endblock %}"#;

const REQUEST_STATUS_CHANGED_ES: &str = r#"{% block subject %}Estado de tu solicitud de contratación: {{ status | humanize }}{% endblock %}
{% block heading %}Actualización de contratación{% endblock %}
{% block body %}
Hola{% if first_name %} {{ first_name }}{% endif %},

Tu solicitud de contratación cambió a: {{ status | humanize }}.
{% endblock %}"#;

const HIRING_REQUEST_MATCHED_EN: &str = r#"{% block subject %}We found a match for {{ request_title }}{% endblock %}
{% block heading %}You have a match{% endblock %}
{% block body %}
Hi {{ first_name | default("there") }},

{{ talent_name }} has been matched to your request "{{ request_title }}". We will introduce you both shortly.
{% endblock %}"#;

const GENERIC_UPDATE_EN: &str = r#"{% block subject %}An update from Talent Match{% endblock %}
{% block heading %}Update{% endblock %}
{% block body %}
Hi {{ first_name | default("there") }},

There is an update on your account.
{% endblock %}"#;

const GENERIC_UPDATE: &str = "generic_update.en.txt";

const SOURCES: [(&str, &str); 10] = [
    ("layout.html", LAYOUT_HTML),
    ("layout.txt", LAYOUT_TEXT),
    ("talent_application_received.en.txt", TALENT_APPLICATION_RECEIVED_EN),
    ("company_application_received.en.txt", COMPANY_APPLICATION_RECEIVED_EN),
    ("talent_status_changed.en.txt", TALENT_STATUS_CHANGED_EN),
    ("talent_status_changed.es.txt", TALENT_STATUS_CHANGED_ES),
    ("request_status_changed.en.txt", REQUEST_STATUS_CHANGED_EN),
    ("request_status_changed.es.txt", REQUEST_STATUS_CHANGED_ES),
    ("hiring_request_matched.en.txt", HIRING_REQUEST_MATCHED_EN),
    (GENERIC_UPDATE, GENERIC_UPDATE_EN),
];

fn environment() -> &'static Environment<'static> {
    static ENVIRONMENT: OnceLock<Environment<'static>> = OnceLock::new();
    ENVIRONMENT.get_or_init(|| {
        let mut env = Environment::new();
        env.add_filter("humanize", humanize);
        for (name, source) in SOURCES {
            if let Err(err) = env.add_template(name, source) {
                error!(template = name, error = %err, "email template failed to compile");
            }
        }
        env
    })
}

fn template_name(key: TemplateKey, locale: Locale) -> Option<&'static str> {
    let name = match (key, locale) {
        (TemplateKey::TalentApplicationReceived, Locale::En) => "talent_application_received.en.txt",
        (TemplateKey::CompanyApplicationReceived, Locale::En) => "company_application_received.en.txt",
        (TemplateKey::TalentStatusChanged, Locale::En) => "talent_status_changed.en.txt",
        (TemplateKey::TalentStatusChanged, Locale::Es) => "talent_status_changed.es.txt",
        (TemplateKey::CompanyStatusChanged, Locale::En)
        | (TemplateKey::HiringRequestStatusChanged, Locale::En) => "request_status_changed.en.txt",
        (TemplateKey::CompanyStatusChanged, Locale::Es)
        | (TemplateKey::HiringRequestStatusChanged, Locale::Es) => "request_status_changed.es.txt",
        (TemplateKey::HiringRequestMatched, Locale::En) => "hiring_request_matched.en.txt",
        _ => return None,
    };
    Some(name)
}

/// Renders `key` in `locale`, falling back to English when that locale has no
/// template. Returns the locale actually used.
pub fn render(
    key: TemplateKey,
    locale: Locale,
    first_name: &str,
    variables: &TemplateVariables,
) -> Result<(Locale, RenderedEmail), minijinja::Error> {
    let (locale, name) = match template_name(key, locale) {
        Some(name) => (locale, name),
        None => (
            Locale::En,
            template_name(key, Locale::En).unwrap_or(GENERIC_UPDATE),
        ),
    };
    Ok((locale, render_named(name, first_name, variables)?))
}

fn render_named(
    name: &str,
    first_name: &str,
    variables: &TemplateVariables,
) -> Result<RenderedEmail, minijinja::Error> {
    let env = environment();

    let mut values: BTreeMap<&str, &str> = variables
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    let first_name = first_name.trim();
    if !first_name.is_empty() {
        values.insert("first_name", first_name);
    }

    let template = env.get_template(name)?;
    let mut state = template.eval_to_state(&values)?;
    let subject = state.render_block("subject")?.trim().to_string();
    let heading = state.render_block("heading")?.trim().to_string();
    let body = state.render_block("body")?;
    let paragraphs: Vec<&str> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    let html = env
        .get_template("layout.html")?
        .render(context! { heading => heading, paragraphs => paragraphs })?;
    let text = env
        .get_template("layout.txt")?
        .render(context! { paragraphs => paragraphs })?;

    Ok(RenderedEmail {
        subject,
        html,
        text,
    })
}

/// `pending_matching` -> `Pending matching`.
fn humanize(label: Value) -> String {
    let spaced = label.as_str().unwrap_or_default().replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
