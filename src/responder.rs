use crate::error::AppError;
use crate::openai::{ReplyGenerator, build_prompt};
use crate::youtube::{CommentThreads, collect_comments};

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Reply generated, posting skipped
    DryRun { reply: String },
    Posted { reply: String, comment_id: String },
}

/// Fetch comments, generate a reply and post it unless `dry_run` is set.
pub async fn respond<Y: CommentThreads, M: ReplyGenerator>(
    youtube: &Y,
    model: &M,
    video_id: &str,
    max_comments: usize,
    dry_run: bool,
) -> Result<Outcome, AppError> {
    eprintln!("Fetching comments...");
    let comments = collect_comments(youtube, video_id, max_comments).await?;
    if comments.is_empty() {
        return Err(AppError::NoComments);
    }
    tracing::info!(count = comments.len(), video_id, "Comments retrieved");

    eprintln!("Generating AI response from {} comments...", comments.len());
    let reply = model.generate_reply(&build_prompt(&comments)).await?;

    println!("\n--- Generated response ---");
    println!("{}", reply);

    if dry_run {
        eprintln!("\nDry run enabled. Skipping YouTube post.");
        return Ok(Outcome::DryRun { reply });
    }

    let comment_id = youtube.insert_top_level_comment(video_id, &reply).await?;
    tracing::info!(%comment_id, "Comment posted");
    eprintln!("\nComment posted successfully.");
    Ok(Outcome::Posted { reply, comment_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{Comment, CommentPage};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeYouTube {
        comments: Vec<&'static str>,
        posted: Mutex<Vec<(String, String)>>,
    }

    impl CommentThreads for FakeYouTube {
        async fn list_top_level_comments(
            &self,
            _video_id: &str,
            _page_token: Option<&str>,
        ) -> Result<CommentPage, AppError> {
            Ok(CommentPage {
                comments: self
                    .comments
                    .iter()
                    .map(|text| Comment {
                        author: "viewer".to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
                next_page_token: None,
            })
        }

        async fn insert_top_level_comment(
            &self,
            video_id: &str,
            text: &str,
        ) -> Result<String, AppError> {
            self.posted
                .lock()
                .unwrap()
                .push((video_id.to_string(), text.to_string()));
            Ok("posted-id".to_string())
        }
    }

    #[derive(Default)]
    struct FakeModel {
        prompts: Mutex<Vec<String>>,
    }

    impl ReplyGenerator for FakeModel {
        async fn generate_reply(&self, prompt: &str) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Thanks for watching!".to_string())
        }
    }

    fn youtube(comments: Vec<&'static str>) -> FakeYouTube {
        FakeYouTube {
            comments,
            ..FakeYouTube::default()
        }
    }

    #[tokio::test]
    async fn posts_generated_reply() {
        let youtube = youtube(vec!["nice", "more please"]);
        let model = FakeModel::default();

        let outcome = respond(&youtube, &model, "vid", 20, false).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Posted {
                reply: "Thanks for watching!".to_string(),
                comment_id: "posted-id".to_string(),
            }
        );
        assert_eq!(
            *youtube.posted.lock().unwrap(),
            vec![("vid".to_string(), "Thanks for watching!".to_string())]
        );
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("- nice\n- more please"));
    }

    #[tokio::test]
    async fn dry_run_generates_but_never_posts() {
        let youtube = youtube(vec!["nice"]);
        let model = FakeModel::default();

        let outcome = respond(&youtube, &model, "vid", 20, true).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::DryRun {
                reply: "Thanks for watching!".to_string()
            }
        );
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
        assert!(youtube.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_comments_stops_before_the_model() {
        let youtube = youtube(vec![]);
        let model = FakeModel::default();

        let err = respond(&youtube, &model, "vid", 20, false).await.unwrap_err();

        assert!(matches!(err, AppError::NoComments));
        assert!(model.prompts.lock().unwrap().is_empty());
        assert!(youtube.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prompt_respects_max_comments() {
        let youtube = youtube(vec!["one", "two", "three"]);
        let model = FakeModel::default();

        respond(&youtube, &model, "vid", 2, true).await.unwrap();

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("- one\n- two"));
        assert!(!prompt.contains("three"));
    }
}
