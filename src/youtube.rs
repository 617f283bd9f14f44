use serde::{Deserialize, Serialize};

use crate::error::{AppError, check_status};

/// Fixed page size for comment listing (the API maximum)
pub const PAGE_SIZE: u32 = 100;

const SERVICE: &str = "YouTube";

/// One page of top-level comments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

/// The comment endpoints of the platform API.
#[allow(async_fn_in_trait)]
pub trait CommentThreads {
    async fn list_top_level_comments(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, AppError>;

    /// Post a top-level comment, returning its id
    async fn insert_top_level_comment(&self, video_id: &str, text: &str)
    -> Result<String, AppError>;
}

/// Retrieve up to `max_comments` top-level comment texts from a video.
pub async fn collect_comments<T: CommentThreads>(
    threads: &T,
    video_id: &str,
    max_comments: usize,
) -> Result<Vec<String>, AppError> {
    let mut comments = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = threads
            .list_top_level_comments(video_id, page_token.as_deref())
            .await?;
        tracing::debug!(
            received = page.comments.len(),
            has_next = page.next_page_token.is_some(),
            "Fetched comment page"
        );

        for comment in page.comments {
            tracing::trace!(author = %comment.author, "Comment");
            comments.push(comment.text);
            if comments.len() >= max_comments {
                return Ok(comments);
            }
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => return Ok(comments),
        }
    }
}

// Wire types, camelCase like the API

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThreadItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadItem {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: TopLevelCommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopLevelCommentSnippet {
    text_display: String,
    #[serde(default)]
    author_display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertCommentThread<'a> {
    snippet: InsertThreadSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertThreadSnippet<'a> {
    video_id: &'a str,
    top_level_comment: InsertTopLevelComment<'a>,
}

#[derive(Debug, Serialize)]
struct InsertTopLevelComment<'a> {
    snippet: InsertCommentSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertCommentSnippet<'a> {
    text_original: &'a str,
}

#[derive(Debug, Deserialize)]
struct InsertedCommentThread {
    id: String,
}

/// YouTube Data API v3 client authenticated with an OAuth access token
pub struct YouTubeClient {
    client: reqwest::Client,
    rest_api_address: String,
    access_token: String,
}

impl YouTubeClient {
    pub fn new(client: reqwest::Client, rest_api_address: &str, access_token: &str) -> Self {
        Self {
            client,
            rest_api_address: rest_api_address.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn comment_threads_url(&self) -> String {
        format!("{}/youtube/v3/commentThreads", self.rest_api_address)
    }
}

impl CommentThreads for YouTubeClient {
    async fn list_top_level_comments(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, AppError> {
        let page_size = PAGE_SIZE.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", page_size.as_str()),
            ("textFormat", "plainText"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(self.comment_threads_url())
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;
        let body: CommentThreadListResponse = check_status(SERVICE, response).await?.json().await?;

        Ok(CommentPage {
            comments: body
                .items
                .into_iter()
                .map(|item| {
                    let snippet = item.snippet.top_level_comment.snippet;
                    Comment {
                        author: snippet.author_display_name,
                        text: snippet.text_display,
                    }
                })
                .collect(),
            next_page_token: body.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    async fn insert_top_level_comment(
        &self,
        video_id: &str,
        text: &str,
    ) -> Result<String, AppError> {
        let body = InsertCommentThread {
            snippet: InsertThreadSnippet {
                video_id,
                top_level_comment: InsertTopLevelComment {
                    snippet: InsertCommentSnippet {
                        text_original: text,
                    },
                },
            },
        };

        let response = self
            .client
            .post(self.comment_threads_url())
            .bearer_auth(&self.access_token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await?;
        let inserted: InsertedCommentThread = check_status(SERVICE, response).await?.json().await?;
        Ok(inserted.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves canned pages and records the tokens it was asked for
    struct PagedThreads {
        pages: Mutex<VecDeque<CommentPage>>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl PagedThreads {
        fn new(pages: Vec<CommentPage>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommentThreads for PagedThreads {
        async fn list_top_level_comments(
            &self,
            _video_id: &str,
            page_token: Option<&str>,
        ) -> Result<CommentPage, AppError> {
            self.requested
                .lock()
                .unwrap()
                .push(page_token.map(str::to_string));
            Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn insert_top_level_comment(&self, _: &str, _: &str) -> Result<String, AppError> {
            unreachable!("collect_comments never posts")
        }
    }

    fn page(texts: &[&str], next: Option<&str>) -> CommentPage {
        CommentPage {
            comments: texts
                .iter()
                .map(|text| Comment {
                    author: "viewer".to_string(),
                    text: text.to_string(),
                })
                .collect(),
            next_page_token: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn follows_page_tokens_until_exhausted() {
        let threads = PagedThreads::new(vec![
            page(&["a", "b"], Some("p2")),
            page(&["c"], Some("p3")),
            page(&["d"], None),
        ]);

        let comments = collect_comments(&threads, "vid", 20).await.unwrap();

        assert_eq!(comments, vec!["a", "b", "c", "d"]);
        assert_eq!(
            *threads.requested.lock().unwrap(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn stops_once_enough_comments_are_held() {
        let threads = PagedThreads::new(vec![
            page(&["a", "b"], Some("p2")),
            page(&["c", "d", "e"], Some("p3")),
            page(&["f"], None),
        ]);

        let comments = collect_comments(&threads, "vid", 3).await.unwrap();

        assert_eq!(comments, vec!["a", "b", "c"]);
        assert_eq!(threads.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_video_yields_nothing() {
        let threads = PagedThreads::new(vec![page(&[], None)]);
        assert!(collect_comments(&threads, "vid", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_comments_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/commentThreads"))
            .and(query_param("videoId", "dQw4w9WgXcQ"))
            .and(query_param("maxResults", "100"))
            .and(query_param("textFormat", "plainText"))
            .and(query_param("pageToken", "next-1"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nextPageToken": "next-2",
                "items": [
                    {"snippet": {"topLevelComment": {"snippet": {
                        "textDisplay": "Great video!",
                        "authorDisplayName": "@fan"
                    }}}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = YouTubeClient::new(reqwest::Client::new(), &server.uri(), "ya29.token");
        let page = client
            .list_top_level_comments("dQw4w9WgXcQ", Some("next-1"))
            .await
            .unwrap();

        assert_eq!(
            page.comments,
            vec![Comment {
                author: "@fan".to_string(),
                text: "Great video!".to_string()
            }]
        );
        assert_eq!(page.next_page_token.as_deref(), Some("next-2"));
    }

    #[tokio::test]
    async fn api_errors_are_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/commentThreads"))
            .respond_with(ResponseTemplate::new(403).set_body_string("commentsDisabled"))
            .mount(&server)
            .await;

        let client = YouTubeClient::new(reqwest::Client::new(), &server.uri(), "ya29.token");
        let err = client
            .list_top_level_comments("dQw4w9WgXcQ", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::RemoteApi { service: "YouTube", status: 403, ref body } if body == "commentsDisabled"
        ));
    }

    #[tokio::test]
    async fn inserts_top_level_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/youtube/v3/commentThreads"))
            .and(query_param("part", "snippet"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_json(serde_json::json!({
                "snippet": {
                    "videoId": "dQw4w9WgXcQ",
                    "topLevelComment": {"snippet": {"textOriginal": "Thanks everyone!"}}
                }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "Ugz-posted"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = YouTubeClient::new(reqwest::Client::new(), &server.uri(), "ya29.token");
        let id = client
            .insert_top_level_comment("dQw4w9WgXcQ", "Thanks everyone!")
            .await
            .unwrap();

        assert_eq!(id, "Ugz-posted");
    }
}
