use crate::error::JournalError;
use crate::types::calendar::{CalendarEventRequest, CalendarEventResource};
use url::Url;

/// Thin client for the provider's event-creation endpoint.
#[derive(Clone)]
pub struct CalendarApi {
    client: reqwest::Client,
    events_url: Url,
}

impl CalendarApi {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        calendar_id: &str,
    ) -> Result<Self, JournalError> {
        Ok(Self {
            client,
            events_url: events_endpoint(api_base, calendar_id)?,
        })
    }

    /// POST one event; returns the provider-assigned id. Single attempt.
    pub async fn create_event(
        &self,
        access_token: &str,
        event: &CalendarEventRequest,
    ) -> Result<String, JournalError> {
        let resp = self
            .client
            .post(self.events_url.clone())
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(JournalError::CalendarApi { status, body });
        }

        let created: CalendarEventResource = resp.json().await?;
        created
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(JournalError::MissingEventId)
    }
}

fn events_endpoint(api_base: &str, calendar_id: &str) -> Result<Url, JournalError> {
    let mut url = Url::parse(api_base)?;
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            JournalError::InvalidRequest("calendar api base URL cannot be a base".to_string())
        })?;
        segments.pop_if_empty();
        segments.push("calendars");
        segments.push(calendar_id);
        segments.push("events");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_endpoint_appends_calendar_path() {
        let url = events_endpoint(
            "https://www.googleapis.com/calendar/v3/",
            "team@group.calendar.google.com",
        )
        .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team@group.calendar.google.com/events"
        );

        let url = events_endpoint("http://127.0.0.1:9000", "primary").expect("endpoint");
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/calendars/primary/events");
    }
}
