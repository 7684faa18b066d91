use crate::{Error, RecordId, Time};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_text: String,
    pub timestamp: Time,
    pub author: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: RecordId,
    pub post_text: String,
    /// Creation time, assigned by the server
    pub timestamp: Time,
    pub author: String,
    pub category: String,

    /// Comments in the order they were posted
    pub comments: Vec<Comment>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
    pub post_text: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub comments: Option<Vec<Comment>>,
}

impl NewThread {
    pub fn into_thread(self, id: RecordId, now: Time) -> Result<Thread, Error> {
        Ok(Thread {
            id,
            post_text: crate::require_str("postText", self.post_text)?,
            timestamp: now,
            author: crate::require_str("author", self.author)?,
            category: crate::require_str("category", self.category)?,
            // an empty list still counts as present
            comments: self
                .comments
                .ok_or_else(|| Error::MissingField(String::from("comments")))?,
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub comment_text: Option<String>,
    pub author: Option<String>,
}

impl NewComment {
    pub fn into_comment(self, now: Time) -> Result<Comment, Error> {
        Ok(Comment {
            comment_text: crate::require_str("commentText", self.comment_text)?,
            timestamp: now,
            author: crate::require_str("author", self.author)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[test]
    fn thread_with_empty_comment_list() {
        let new: NewThread = serde_json::from_value(json!({
            "postText": "hi",
            "author": "a",
            "category": "general",
            "comments": [],
        }))
        .unwrap();
        let now = Utc::now();
        let thread = new.into_thread(RecordId::from("abc234"), now).unwrap();
        assert_eq!(thread.category, "general");
        assert_eq!(thread.timestamp, now);
        assert!(thread.comments.is_empty());
    }

    #[test]
    fn thread_missing_fields() {
        let new: NewThread = serde_json::from_value(json!({
            "postText": "hi",
            "author": "",
            "category": "general",
            "comments": [],
        }))
        .unwrap();
        assert_eq!(
            new.into_thread(RecordId::from("abc234"), Utc::now()),
            Err(Error::MissingField(String::from("author")))
        );

        let new: NewThread = serde_json::from_value(json!({
            "postText": "hi",
            "author": "a",
            "category": "general",
            "comments": null,
        }))
        .unwrap();
        assert_eq!(
            new.into_thread(RecordId::from("abc234"), Utc::now()),
            Err(Error::MissingField(String::from("comments")))
        );
    }

    #[test]
    fn comment_gets_server_timestamp() {
        let new = NewComment {
            comment_text: Some(String::from("see you there")),
            author: Some(String::from("b")),
        };
        let now = Utc::now();
        let comment = new.into_comment(now).unwrap();
        assert_eq!(comment.timestamp, now);
        assert_eq!(
            NewComment::default().into_comment(now),
            Err(Error::MissingField(String::from("commentText")))
        );
    }
}
