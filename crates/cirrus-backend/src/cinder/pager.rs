use super::wire::VolumeList;
use super::{check_response, AUTH_TOKEN_HEADER};
use crate::error::Result;
use crate::traits::VolumePager;
use async_trait::async_trait;
use cirrus_core::VolumeRecord;
use reqwest::Client;
use tracing::debug;

enum Cursor {
    /// First page: base URL plus filter query
    Start {
        url: String,
        query: Vec<(String, String)>,
    },
    /// Follow the `rel=next` link of the previous page
    Next(String),
    Done,
}

/// CinderVolumePager walks `GET /volumes/detail` one page per call,
/// following `volumes_links` until the service stops returning a next link.
pub struct CinderVolumePager {
    http: Client,
    token: String,
    cursor: Cursor,
    pages: usize,
}

impl CinderVolumePager {
    pub(crate) fn new(
        http: Client,
        token: String,
        url: String,
        query: Vec<(String, String)>,
    ) -> Self {
        Self {
            http,
            token,
            cursor: Cursor::Start { url, query },
            pages: 0,
        }
    }
}

#[async_trait]
impl VolumePager for CinderVolumePager {
    async fn next_page(&mut self) -> Result<Option<Vec<VolumeRecord>>> {
        // Any error leaves the cursor at Done
        let request = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Start { url, query } => {
                debug!("GET {} {:?}", url, query);
                self.http.get(&url).query(&query)
            }
            Cursor::Next(href) => {
                debug!("GET {}", href);
                self.http.get(&href)
            }
            Cursor::Done => return Ok(None),
        };

        let resp = request
            .header(AUTH_TOKEN_HEADER, self.token.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let list: VolumeList = resp.json().await?;

        self.pages += 1;
        if let Some(next) = list.next_href() {
            self.cursor = Cursor::Next(next);
        }

        debug!(
            "Volume listing page {} returned {} entries",
            self.pages,
            list.volumes.len()
        );

        Ok(Some(
            list.volumes.into_iter().map(VolumeRecord::from).collect(),
        ))
    }
}
