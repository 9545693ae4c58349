//! HTTP client for a device's Remote UI web console.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use url::Url;

use crate::{
    login::LoginForm,
    types::{Credentials, ConsolePaths, Page, Timeouts},
    Error,
};

const USER_AGENT: &str = concat!("printcount/", env!("CARGO_PKG_VERSION"));

/// HTTP client for one device console.
///
/// Holds a cookie-backed `reqwest::Client`; the session cookie issued at
/// login authenticates every later request made through the returned
/// [`Session`].
pub struct Client {
    base_url: Url,
    paths: ConsolePaths,
    http: reqwest::Client,
}

/// An authenticated console session.
///
/// Every request carries `Referer: <top page>` and `Origin: <base>`, which
/// the console checks before serving report pages.
pub struct Session {
    base_url: Url,
    top_url: String,
    headers: HeaderMap,
    http: reqwest::Client,
}

impl Client {
    /// Creates a client for the console at `base_url` (e.g. `http://10.100.1.15:8000`).
    pub fn new(base_url: &str, paths: ConsolePaths, timeouts: Timeouts) -> Result<Self, Error> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            tracing::error!("Invalid base URL {}: {}", base_url, e);
            Error::InvalidUrl(format!("{}: {}", base_url, e))
        })?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeouts.nav())
            .build()
            .map_err(|e| Error::from_reqwest(base_url.as_str(), e))?;
        Ok(Self {
            base_url,
            paths,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Logs in and establishes the console context.
    ///
    /// Fetches the login page, submits its form with the given credentials,
    /// then opens the top page so the console allocates per-session state.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
        let login_url = join(&self.base_url, &self.paths.login_path)?;
        tracing::debug!("Opening login page {}", login_url);
        let page = send(self.http.get(login_url.clone()), login_url.as_str()).await?;
        if !page.is_success() {
            return Err(Error::HttpStatus {
                status: page.status,
                url: page.url,
            });
        }

        let form = LoginForm::find(&page.body).ok_or_else(|| Error::LoginFormMissing {
            url: login_url.to_string(),
        })?;
        let action = login_url.join(&form.action).map_err(|e| {
            Error::InvalidUrl(format!("login action {:?}: {}", form.action, e))
        })?;
        let payload = form.payload(credentials, &self.paths.domain);

        tracing::debug!("Submitting login form to {}", action);
        let request = if form.method == "GET" {
            self.http.get(action.clone()).query(&payload)
        } else {
            self.http.post(action.clone()).form(&payload)
        };
        let response = send(request.header(REFERER, login_url.as_str()), action.as_str()).await?;

        if !response.is_success() {
            return Err(Error::LoginFailed(format!(
                "console answered {} to the login form",
                response.status
            )));
        }
        if LoginForm::find(&response.body).is_some() {
            return Err(Error::LoginFailed(
                "console returned the login form again".to_string(),
            ));
        }

        let top_url = join(&self.base_url, &self.paths.top_path)?;
        let top = send(self.http.get(top_url.clone()), top_url.as_str()).await?;
        tracing::debug!("Top page {} answered {}", top_url, top.status);

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, header_value(top_url.as_str())?);
        headers.insert(ORIGIN, header_value(origin(&self.base_url).as_str())?);

        tracing::info!("Logged in to {}", self.base_url);
        Ok(Session {
            base_url: self.base_url.clone(),
            top_url: top_url.to_string(),
            headers,
            http: self.http.clone(),
        })
    }
}

impl Session {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the console landing page.
    pub fn top_url(&self) -> &str {
        &self.top_url
    }

    /// The `(Referer, Origin)` pair sent with every session request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Resolves a console path against the device base URL.
    pub fn resolve(&self, path: &str) -> Result<String, Error> {
        join(&self.base_url, path).map(|u| u.to_string())
    }

    /// GETs `url` with the session headers.
    ///
    /// Returns the page for any HTTP status; only network failures and
    /// exceeding `timeout` are errors.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Page, Error> {
        let request = self
            .http
            .get(url)
            .headers(self.headers.clone())
            .timeout(timeout);
        let page = send(request, url).await?;
        tracing::debug!("GET {} -> {}", url, page.status);
        Ok(page)
    }
}

async fn send(request: reqwest::RequestBuilder, url: &str) -> Result<Page, Error> {
    let resp = request
        .send()
        .await
        .map_err(|e| Error::from_reqwest(url, e))?;
    let status = resp.status().as_u16();
    let final_url = resp.url().to_string();
    let body = resp.text().await.map_err(|e| Error::from_reqwest(url, e))?;
    Ok(Page {
        url: final_url,
        status,
        body,
    })
}

fn join(base: &Url, path: &str) -> Result<Url, Error> {
    base.join(path).map_err(|e| {
        tracing::error!("Invalid URL constructed from {} + {}: {}", base, path, e);
        Error::InvalidUrl(format!("{}{}: {}", base, path, e))
    })
}

fn origin(base: &Url) -> String {
    base.origin().ascii_serialization()
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|e| Error::InvalidUrl(format!("{}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_keeps_port() {
        let base = Url::parse("http://10.100.1.15:8000").unwrap();
        assert_eq!(origin(&base), "http://10.100.1.15:8000");
    }

    #[test]
    fn join_absolute_path_replaces_base_path() {
        let base = Url::parse("http://10.100.1.15:8000/").unwrap();
        let url = join(&base, "/rps/dcounter.cgi?CorePGTAG=14&Dummy=1").unwrap();
        assert_eq!(url.as_str(), "http://10.100.1.15:8000/rps/dcounter.cgi?CorePGTAG=14&Dummy=1");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = Client::new("not a url", ConsolePaths::default(), Timeouts::default());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
