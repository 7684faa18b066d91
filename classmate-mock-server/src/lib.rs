use std::collections::BTreeSet;

use chrono::Utc;
use classmate_api::{
    Comment, Error, Event, NewComment, NewEvent, NewThread, RecordId, Thread,
};

/// In-memory model of the server, without any persistence
pub struct MockServer {
    events: Vec<Event>,
    threads: Vec<Thread>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            events: Vec::new(),
            threads: Vec::new(),
        }
    }

    /// Return the id of event number `idx`, in insertion order
    pub fn test_event_id(&self, idx: usize) -> &RecordId {
        &self.events[idx].id
    }

    /// Return the id of thread number `idx`, in insertion order
    pub fn test_thread_id(&self, idx: usize) -> &RecordId {
        &self.threads[idx].id
    }

    pub fn test_num_events(&self) -> usize {
        self.events.len()
    }

    pub fn test_num_threads(&self) -> usize {
        self.threads.len()
    }

    pub fn fetch_events(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn fetch_event(&self, id: &RecordId) -> Result<Event, Error> {
        self.events
            .iter()
            .find(|e| e.id == *id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.0.clone()))
    }

    pub fn fetch_threads(&self) -> Vec<Thread> {
        self.threads.clone()
    }

    pub fn fetch_thread(&self, id: &RecordId) -> Result<Thread, Error> {
        self.threads
            .iter()
            .find(|t| t.id == *id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.0.clone()))
    }

    pub fn fetch_categories(&self) -> Vec<String> {
        self.threads
            .iter()
            .map(|t| t.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn create_event(&mut self, e: NewEvent) -> Result<Event, Error> {
        let event = e.into_event(RecordId::random())?;
        self.events.push(event.clone());
        Ok(event)
    }

    pub fn create_thread(&mut self, t: NewThread) -> Result<Thread, Error> {
        let thread = t.into_thread(RecordId::random(), Utc::now())?;
        self.threads.push(thread.clone());
        Ok(thread)
    }

    pub fn create_comment(&mut self, thread: &RecordId, c: NewComment) -> Result<Comment, Error> {
        let comment = c.into_comment(Utc::now())?;
        let parent = self
            .threads
            .iter_mut()
            .find(|t| t.id == *thread)
            .ok_or_else(|| Error::UnknownThread(thread.0.clone()))?;
        parent.comments.push(comment.clone());
        Ok(comment)
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}
