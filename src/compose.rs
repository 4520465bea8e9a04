use crate::api::{ApiResult, PostId, SocialApi};
use crate::feed::Post;

pub const MAX_POST_CHARS: usize = 500;

/// A post ready to send: trimmed text and the post it replies to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text: String,
    pub reply_to: Option<PostId>,
}

impl Submission {
    pub async fn send(&self, api: &dyn SocialApi, viewer: &str) -> ApiResult<()> {
        api.create_tweet(viewer, &self.text, self.reply_to.as_ref()).await
    }
}

/// The post prompt. Input past `max_chars` is dropped.
#[derive(Debug, Clone)]
pub struct Composer {
    text: String,
    max_chars: usize,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(MAX_POST_CHARS)
    }
}

impl Composer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Returns false if the buffer is full.
    pub fn push(&mut self, c: char) -> bool {
        if self.len() >= self.max_chars {
            return false;
        }
        self.text.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn can_submit(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn counter(&self) -> String {
        format!("{}/{}", self.len(), self.max_chars)
    }

    /// At or past 90% of the limit.
    pub fn near_limit(&self) -> bool {
        self.len() * 10 >= self.max_chars * 9
    }

    pub fn placeholder(root: Option<&Post>) -> String {
        match root {
            Some(post) => format!("Reply to @{}...", post.author_display_name),
            None => "What's happening?".to_string(),
        }
    }

    pub fn submit_label(root: Option<&Post>) -> &'static str {
        if root.is_some() {
            "Reply"
        } else {
            "Post"
        }
    }

    /// Clear the buffer and hand back what to send. `None` while the text is blank.
    pub fn take_submission(&mut self, root: Option<&Post>) -> Option<Submission> {
        if !self.can_submit() {
            return None;
        }
        let text = self.text.trim().to_string();
        self.text.clear();
        Some(Submission {
            text,
            reply_to: root.map(|p| p.post_id.clone()),
        })
    }
}
