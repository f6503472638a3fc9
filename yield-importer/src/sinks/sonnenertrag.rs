use plugwise_client::domain::YieldAggregate;
use reqwest::header::{COOKIE, SET_COOKIE};
use time::{format_description::BorrowedFormatItem, macros::format_description};

use super::http::{response_text, send_with_retry, RetryPolicy};
use crate::aggregate::Granularity;
use crate::config::SonnenErtragConfig;
use crate::pipeline::{PipelineError, Sink};

const NAME: &str = "sonnenertrag";

const DAY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Daily yield upload to solar-yield.eu (SonnenErtrag): log in once, then
/// post one form per calendar month.
pub struct SonnenErtragSink {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    facility_id: String,
    retry: RetryPolicy,
}

impl SonnenErtragSink {
    pub fn new(client: reqwest::Client, cfg: &SonnenErtragConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            user: cfg.user.clone(),
            password: cfg.password.clone(),
            facility_id: cfg.facility_id.clone(),
            retry: RetryPolicy::from(&cfg.retry),
        }
    }

    /// Log in and return the session cookie header value.
    async fn login(&self) -> Result<String, PipelineError> {
        tracing::info!(sink = NAME, user = %self.user, "logging in");

        let url = format!("{}/ajax/user/login", self.base_url);
        let form = [
            ("user", self.user.as_str()),
            ("password", self.password.as_str()),
            ("submit", "Login"),
        ];
        let resp = send_with_retry(NAME, self.retry, || self.client.post(&url).form(&form)).await?;

        let cookie = session_cookie(
            resp.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let body = response_text(NAME, resp).await?;
        tracing::debug!(sink = NAME, response = %body.trim(), "login response");

        cookie.ok_or_else(|| PipelineError::sink(NAME, "login returned no session cookie"))
    }

    async fn upload_month(&self, cookie: &str, month: &[YieldAggregate]) -> Result<(), PipelineError> {
        let form = month_form(&self.facility_id, month)?;
        let url = format!("{}/plant/insertdatadaily", self.base_url);

        let resp = send_with_retry(NAME, self.retry, || {
            self.client.post(&url).header(COOKIE, cookie).form(&form)
        })
        .await?;
        let body = response_text(NAME, resp).await?;

        if !body.contains("Data saved!") {
            return Err(PipelineError::sink(NAME, "upload not confirmed by the server"));
        }
        Ok(())
    }
}

/// Join the `name=value` part of every `Set-Cookie` header.
fn session_cookie<'a>(set_cookies: impl Iterator<Item = &'a str>) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Form fields for one calendar month of daily values. `month` must be
/// non-empty and within a single month.
fn month_form(facility_id: &str, month: &[YieldAggregate]) -> Result<Vec<(String, String)>, PipelineError> {
    let first = month
        .first()
        .ok_or_else(|| PipelineError::sink(NAME, "empty month"))?;

    let mut form = Vec::with_capacity(month.len() * 2 + 5);
    for day in month {
        let date = day
            .date
            .format(DAY)
            .map_err(|e| PipelineError::sink(NAME, e.to_string()))?;
        form.push((format!("yield[{date}]"), format!("{:.3}", day.yield_kwh)));
        form.push((format!("is_auto_update[{date}]"), "1".to_string()));
    }
    form.push(("year".to_string(), first.date.year().to_string()));
    form.push(("save".to_string(), "Save".to_string()));
    form.push(("pb_id".to_string(), facility_id.to_string()));
    form.push(("order".to_string(), "asc".to_string()));
    form.push(("month".to_string(), u8::from(first.date.month()).to_string()));
    Ok(form)
}

#[async_trait::async_trait]
impl Sink for SonnenErtragSink {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn push(
        &self,
        granularity: Granularity,
        values: &[YieldAggregate],
    ) -> Result<(), PipelineError> {
        if granularity != Granularity::Daily {
            tracing::debug!(sink = NAME, %granularity, "granularity not supported, skipping");
            return Ok(());
        }
        if values.is_empty() {
            return Ok(());
        }

        let cookie = self.login().await?;
        tracing::info!(sink = NAME, facility_id = %self.facility_id, "uploading yield");

        for month in values.chunk_by(|a, b| {
            (a.date.year(), a.date.month()) == (b.date.year(), b.date.month())
        }) {
            tracing::info!(sink = NAME, year = month[0].date.year(), month = %month[0].date.month(), "uploading month");
            self.upload_month(&cookie, month).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    #[test]
    fn session_cookie_keeps_name_value_pairs() {
        let headers = [
            "PHPSESSID=abc123; path=/; HttpOnly",
            "lang=en; expires=Wed, 21 Oct 2015 07:28:00 GMT",
        ];
        assert_eq!(
            session_cookie(headers.into_iter()).as_deref(),
            Some("PHPSESSID=abc123; lang=en")
        );
        assert_eq!(session_cookie(std::iter::empty()), None);
    }

    #[test]
    fn month_form_lists_each_day_and_the_month() {
        let month = [
            YieldAggregate::new(datetime!(2014-05-14 00:00), 1.23456, Duration::HOUR),
            YieldAggregate::new(datetime!(2014-05-15 00:00), 2.0, Duration::HOUR),
        ];

        let form = month_form("42", &month).unwrap();
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("yield[2014-05-14]"), Some("1.235"));
        assert_eq!(get("is_auto_update[2014-05-14]"), Some("1"));
        assert_eq!(get("yield[2014-05-15]"), Some("2.000"));
        assert_eq!(get("year"), Some("2014"));
        assert_eq!(get("month"), Some("5"));
        assert_eq!(get("pb_id"), Some("42"));
        assert_eq!(get("order"), Some("asc"));
    }
}
