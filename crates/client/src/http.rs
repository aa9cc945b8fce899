use crate::error::{ClientError, Result};
use lmrisk_protocol::UNSUPPORTED_STATUS;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin JSON client shared by every service call. The service hands out a
/// session id through `set-cookie`; it is replayed as `Cookie: session=<id>`.
pub struct ServiceClient {
    http: Client,
    session: Mutex<Option<String>>,
}

impl ServiceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            session: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(url, self.http.post(url).json(body)).await?;
        decode(response).await
    }

    pub async fn post_json_with_query<Q, B, T>(&self, url: &str, query: &Q, body: &B) -> Result<T>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.http.post(url).query(query).json(body);
        let response = self.send(url, builder).await?;
        decode(response).await
    }

    pub async fn post_for_bytes<B>(&self, url: &str, body: &B) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(url, self.http.post(url).json(body)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn get_json<Q, T>(&self, url: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(url, self.http.get(url).query(query)).await?;
        decode(response).await
    }

    async fn send(&self, url: &str, mut builder: RequestBuilder) -> Result<Response> {
        if let Some(session) = self.session_id() {
            builder = builder.header(COOKIE, format!("session={session}"));
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.as_u16() == UNSUPPORTED_STATUS {
            return Err(ClientError::Unsupported);
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(session) = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_session_cookie)
        {
            *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session);
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Value of the first `name=value` pair of a `set-cookie` header.
#[must_use]
pub fn parse_session_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?;
    let (_, value) = pair.split_once('=')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_takes_first_pair_value() {
        assert_eq!(
            parse_session_cookie("session=abc123; Path=/; HttpOnly").as_deref(),
            Some("abc123")
        );
        assert_eq!(parse_session_cookie("sid=xyz").as_deref(), Some("xyz"));
        assert_eq!(parse_session_cookie("garbage"), None);
        assert_eq!(parse_session_cookie("session=; Path=/"), None);
    }
}
