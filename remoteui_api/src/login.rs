//! Login form discovery and payload construction.
//!
//! The console login page is a plain HTML form. We read it the way a browser
//! would submit it: every named control with its default value, then the
//! credentials written over the user and password fields.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::types::Credentials;

static FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("invalid selector: form"));
static INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("invalid selector: input"));
static SELECT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select").expect("invalid selector: select"));
static OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("invalid selector: option"));
static BUTTON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("button").expect("invalid selector: button"));

const USERNAME_FIELD: &str = "USERNAME";
const DOMAIN_FIELD: &str = "domainname";

/// A login form found on the console's login page.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    /// Form action as written in the markup (may be relative or empty).
    pub action: String,
    /// Upper-cased HTTP method.
    pub method: String,
    /// Named controls in document order with their default values.
    pub fields: Vec<(String, String)>,
    pub username_field: Option<String>,
    pub password_field: String,
    /// Option values offered by the `domainname` select, if the form has one.
    pub domain_options: Vec<String>,
}

impl LoginForm {
    /// Returns the first form in `html` that contains a password input.
    pub fn find(html: &str) -> Option<Self> {
        let document = Html::parse_document(html);
        document.select(&FORM).find_map(parse_form)
    }

    /// Builds the url-encoded payload for submission.
    ///
    /// `domain` is applied only when the form offers it as an option.
    pub fn payload(&self, credentials: &Credentials, domain: &str) -> Vec<(String, String)> {
        let domain_available = self.domain_options.iter().any(|o| o == domain);
        self.fields
            .iter()
            .map(|(name, value)| {
                let value = if Some(name) == self.username_field.as_ref() {
                    credentials.username.clone()
                } else if *name == self.password_field {
                    credentials.password.clone()
                } else if name == DOMAIN_FIELD && domain_available {
                    domain.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }
}

fn parse_form(form: ElementRef<'_>) -> Option<LoginForm> {
    let mut fields = Vec::new();
    let mut password_field = None;
    let mut username_field = None;
    let mut first_text_field = None;

    for input in form.select(&INPUT) {
        let el = input.value();
        let Some(name) = el.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let input_type = el.attr("type").unwrap_or("text").to_ascii_lowercase();
        let value = el.attr("value").unwrap_or("").to_string();

        match input_type.as_str() {
            "submit" | "button" | "image" | "reset" | "file" => continue,
            "checkbox" | "radio" if el.attr("checked").is_none() => continue,
            "password" => {
                if password_field.is_none() {
                    password_field = Some(name.to_string());
                }
            }
            "text" | "email" => {
                if name.eq_ignore_ascii_case(USERNAME_FIELD) {
                    username_field = Some(name.to_string());
                }
                if first_text_field.is_none() {
                    first_text_field = Some(name.to_string());
                }
            }
            _ => {}
        }
        fields.push((name.to_string(), value));
    }

    let password_field = password_field?;

    let mut domain_options = Vec::new();
    for select in form.select(&SELECT) {
        let Some(name) = select.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let options: Vec<String> = select
            .select(&OPTION)
            .map(option_value)
            .collect();
        let selected = select
            .select(&OPTION)
            .find(|o| o.value().attr("selected").is_some())
            .map(option_value)
            .or_else(|| options.first().cloned())
            .unwrap_or_default();
        if name == DOMAIN_FIELD {
            domain_options = options;
        }
        fields.push((name.to_string(), selected));
    }

    // A browser submits the name/value of the button that was clicked.
    let submit = form.select(&BUTTON).find_map(|b| {
        let el = b.value();
        let kind = el.attr("type").unwrap_or("submit");
        let name = el.attr("name").filter(|n| !n.is_empty())?;
        kind.eq_ignore_ascii_case("submit")
            .then(|| (name.to_string(), el.attr("value").unwrap_or("").to_string()))
    });
    if let Some(submit) = submit {
        fields.push(submit);
    }

    Some(LoginForm {
        action: form.value().attr("action").unwrap_or("").to_string(),
        method: form
            .value()
            .attr("method")
            .unwrap_or("post")
            .to_ascii_uppercase(),
        fields,
        username_field: username_field.or(first_text_field),
        password_field,
        domain_options,
    })
}

fn option_value(option: ElementRef<'_>) -> String {
    match option.value().attr("value") {
        Some(v) => v.to_string(),
        None => option.text().collect::<String>().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"<html><body>
        <form name="search" action="/search"><input name="q"></form>
        <form name="LoginForm" method="post" action="/login">
          <input type="hidden" name="uri" value="/rps/">
          <input type="text" id="USERNAME" name="USERNAME" value="">
          <input type="password" id="PASSWORD_T" name="PASSWORD_T" value="">
          <select name="domainname">
            <option value="ldap">LDAP</option>
            <option value="localhost" >This Device</option>
          </select>
          <input type="checkbox" name="remember">
          <button type="submit" name="LoginButton" value="Login">Log In</button>
        </form>
    </body></html>"#;

    #[test]
    fn finds_form_with_password_field() {
        let form = LoginForm::find(LOGIN_PAGE).unwrap();
        assert_eq!(form.action, "/login");
        assert_eq!(form.method, "POST");
        assert_eq!(form.username_field.as_deref(), Some("USERNAME"));
        assert_eq!(form.password_field, "PASSWORD_T");
        assert_eq!(form.domain_options, vec!["ldap", "localhost"]);
    }

    #[test]
    fn unchecked_checkbox_is_not_submitted() {
        let form = LoginForm::find(LOGIN_PAGE).unwrap();
        assert!(form.fields.iter().all(|(name, _)| name != "remember"));
    }

    #[test]
    fn payload_fills_credentials_and_domain() {
        let form = LoginForm::find(LOGIN_PAGE).unwrap();
        let payload = form.payload(&Credentials::new("Administrator", "secret"), "localhost");
        assert!(payload.contains(&("uri".to_string(), "/rps/".to_string())));
        assert!(payload.contains(&("USERNAME".to_string(), "Administrator".to_string())));
        assert!(payload.contains(&("PASSWORD_T".to_string(), "secret".to_string())));
        assert!(payload.contains(&("domainname".to_string(), "localhost".to_string())));
        assert!(payload.contains(&("LoginButton".to_string(), "Login".to_string())));
    }

    #[test]
    fn unknown_domain_keeps_default_option() {
        let form = LoginForm::find(LOGIN_PAGE).unwrap();
        let payload = form.payload(&Credentials::new("a", "b"), "corp");
        assert!(payload.contains(&("domainname".to_string(), "ldap".to_string())));
    }

    #[test]
    fn username_falls_back_to_first_text_input() {
        let html = r#"<form action="x"><input name="user"><input type="password" name="pw"></form>"#;
        let form = LoginForm::find(html).unwrap();
        assert_eq!(form.username_field.as_deref(), Some("user"));
    }

    #[test]
    fn page_without_password_field_has_no_login_form() {
        assert!(LoginForm::find("<form><input name='q'></form>").is_none());
        assert!(LoginForm::find("<html><body>Top</body></html>").is_none());
    }
}
